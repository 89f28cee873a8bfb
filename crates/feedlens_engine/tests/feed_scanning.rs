use feedlens_engine::{decode_snapshot, FeedScanner, FeedSelectors};
use pretty_assertions::assert_eq;

const FEED: &str = r#"
<html><body>
  <div class="feed-shared-update-v2" data-urn="urn:li:activity:1">
    <div class="update-components-actor__meta"><a href="/in/a">  Camille   Durand </a></div>
    <div class="feed-shared-update-v2__description-wrapper">
      <span>Nous recrutons</span> <span>un développeur   Rust</span>
    </div>
  </div>
  <div class="feed-shared-update-v2" data-urn="urn:li:activity:2">
    <div class="update-components-actor__meta"><a href="/in/b">Meir Ankri</a></div>
    <div class="feed-shared-update-v2__description-wrapper">Bonjour</div>
  </div>
  <div class="feed-shared-update-v2">
    <div class="feed-shared-update-v2__description-wrapper">Sans identifiant</div>
  </div>
  <div class="feed-shared-update-v2" data-urn="urn:li:activity:4"></div>
</body></html>
"#;

fn scanner() -> FeedScanner {
    FeedScanner::new(&FeedSelectors::default()).unwrap()
}

#[test]
fn items_are_read_in_document_order() {
    let items = scanner().scan(FEED);
    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(&keys[..2], &["urn:li:activity:1", "urn:li:activity:2"]);
    assert_eq!(keys[3], "urn:li:activity:4");
}

#[test]
fn text_and_author_are_collapsed() {
    let items = scanner().scan(FEED);
    assert_eq!(items[0].text, "Nous recrutons un développeur Rust");
    assert_eq!(items[0].author.as_deref(), Some("Camille Durand"));
    assert_eq!(items[2].author, None);
}

#[test]
fn items_without_description_have_empty_text() {
    let items = scanner().scan(FEED);
    assert_eq!(items[3].text, "");
}

#[test]
fn missing_identity_falls_back_to_a_stable_hash() {
    let first = scanner().scan(FEED);
    let second = scanner().scan(FEED);
    assert!(first[2].key.starts_with("sha:"));
    assert_eq!(first[2].key.len(), "sha:".len() + 16);
    assert_eq!(first[2].key, second[2].key);
}

#[test]
fn invalid_selector_is_rejected() {
    let selectors = FeedSelectors {
        item: "div[".to_string(),
        ..FeedSelectors::default()
    };
    let err = FeedScanner::new(&selectors).err().unwrap();
    assert_eq!(err.selector, "div[");
}

#[test]
fn legacy_encoded_snapshot_is_scanned() {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(FEED);
    let decoded = decode_snapshot(&bytes, Some("windows-1252"));
    let items = scanner().scan(&decoded.html);
    assert_eq!(items[0].text, "Nous recrutons un développeur Rust");
}

fn unkeyed_post(likes: u32, text: &str) -> String {
    format!(
        r#"<div class="feed-shared-update-v2">
             <div class="update-components-actor__meta"><a>Camille Durand</a></div>
             <div class="feed-shared-update-v2__description-wrapper">{text}</div>
             <span class="social-counts">{likes} likes</span>
           </div>"#
    )
}

#[test]
fn fallback_key_survives_counter_rerender() {
    let before = scanner().scan(&unkeyed_post(3, "Nous recrutons"));
    let after = scanner().scan(&unkeyed_post(4, "Nous recrutons"));
    assert!(before[0].key.starts_with("sha:"));
    assert_eq!(before[0].key, after[0].key);

    let edited = scanner().scan(&unkeyed_post(3, "Nous recrutons encore"));
    assert_ne!(before[0].key, edited[0].key);
}
