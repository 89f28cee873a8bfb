use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

/// CSS shape of a feed item inside a page snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelectors {
    pub item: String,
    pub description: String,
    pub author: String,
    /// Attribute carrying a stable item identity, when the page provides one.
    pub key_attribute: String,
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self {
            item: ".feed-shared-update-v2".to_string(),
            description: ".feed-shared-update-v2__description-wrapper".to_string(),
            author: ".update-components-actor__meta a".to_string(),
            key_attribute: "data-urn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItemSnapshot {
    pub key: String,
    pub author: Option<String>,
    /// Description text with whitespace collapsed; empty when the item has none.
    pub text: String,
}

pub struct FeedScanner {
    item: Selector,
    description: Selector,
    author: Selector,
    key_attribute: String,
}

impl FeedScanner {
    pub fn new(selectors: &FeedSelectors) -> Result<Self, SelectorError> {
        Ok(Self {
            item: parse_selector(&selectors.item)?,
            description: parse_selector(&selectors.description)?,
            author: parse_selector(&selectors.author)?,
            key_attribute: selectors.key_attribute.clone(),
        })
    }

    /// All feed items present in the document, in document order.
    pub fn scan(&self, html: &str) -> Vec<FeedItemSnapshot> {
        let doc = Html::parse_document(html);
        doc.select(&self.item).map(|item| self.read_item(item)).collect()
    }

    fn read_item(&self, item: ElementRef<'_>) -> FeedItemSnapshot {
        let text = item
            .select(&self.description)
            .next()
            .map(collapse_text)
            .unwrap_or_default();
        let author = item
            .select(&self.author)
            .next()
            .map(collapse_text)
            .filter(|name| !name.is_empty());
        let key = item
            .value()
            .attr(&self.key_attribute)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| fallback_key(author.as_deref(), &text));

        FeedItemSnapshot { key, author, text }
    }
}

fn parse_selector(raw: &str) -> Result<Selector, SelectorError> {
    Selector::parse(raw).map_err(|err| SelectorError {
        selector: raw.to_string(),
        message: err.to_string(),
    })
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hashes author and description only; counters and other chrome are ignored.
fn fallback_key(author: Option<&str>, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(author.unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("sha:{}", short_hex(&hasher.finalize()))
}

fn short_hex(digest: &[u8]) -> String {
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
