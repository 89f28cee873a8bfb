use std::collections::HashSet;

use feedlens_logging::lens_warn;

use crate::stopwords::StopwordSource;

/// Code-point ranges removed before classification: emoticons, pictographs,
/// transport symbols, regional indicators, misc symbols and dingbats.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
];

pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

/// Lowercases, splits on whitespace and drops stopwords.
pub fn filter_stopwords(text: &str, stopwords: &HashSet<String>) -> String {
    text.to_lowercase()
        .split_whitespace()
        .filter(|word| !stopwords.contains(*word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keeps at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Emoji removal, stopword filtering and truncation, in that order.
///
/// A failing stopword lookup leaves the text unfiltered.
pub async fn prepare_content(
    raw: &str,
    stopwords: &dyn StopwordSource,
    language: &str,
    max_chars: usize,
) -> String {
    let without_emoji = strip_emoji(raw);
    let filtered = match stopwords.fetch(language).await {
        Ok(words) => {
            let words: HashSet<String> = words.into_iter().map(|w| w.to_lowercase()).collect();
            filter_stopwords(&without_emoji, &words)
        }
        Err(err) => {
            lens_warn!("Error while retrieving stopwords, keeping text unfiltered: {err}");
            without_emoji
        }
    };
    truncate_chars(&filtered, max_chars).to_string()
}
