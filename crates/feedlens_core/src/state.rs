use std::collections::HashMap;
use std::time::Duration;

use crate::view_model::{AppViewModel, ItemRowView, LoaderView, StyleMarker};
use crate::{Classification, FailureKind, ItemKey, LoaderState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverSettings {
    /// Delay before re-running an item whose worker context was gone.
    pub context_gone_retry_delay: Duration,
    /// Delay between the terminal progress event and the loader removal.
    pub loader_removal_delay: Duration,
    /// Lowercase author name fragments whose posts are never classified.
    pub author_allow_list: Vec<String>,
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            context_gone_retry_delay: Duration::from_millis(2000),
            loader_removal_delay: Duration::from_millis(1000),
            author_allow_list: vec!["meir ankri".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AllowListedAuthor,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemPhase {
    /// Processed without ever being sent for classification.
    Skipped(SkipReason),
    Pending { attempt: u32 },
    Classified(Classification),
    /// The worker had no labels configured.
    NoLabels,
    Errored(FailureKind),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemRecord {
    pub(crate) key: ItemKey,
    pub(crate) text: String,
    pub(crate) phase: ItemPhase,
    /// Classification requests sent for this item so far.
    pub(crate) attempts: u32,
    pub(crate) details_open: bool,
    pub(crate) negative_marked: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    settings: ObserverSettings,
    items: Vec<ItemRecord>,
    /// Processed markers: every key here has been handled once.
    processed: HashMap<ItemKey, usize>,
    loader: LoaderState,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ObserverSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &ObserverSettings {
        &self.settings
    }

    pub fn is_processed(&self, key: &str) -> bool {
        self.processed.contains_key(key)
    }

    pub fn phase(&self, key: &str) -> Option<&ItemPhase> {
        self.record(key).map(|record| &record.phase)
    }

    pub fn loader(&self) -> LoaderState {
        self.loader
    }

    pub fn view(&self) -> AppViewModel {
        let items = self.items.iter().map(row_view).collect::<Vec<_>>();
        let pending = self
            .items
            .iter()
            .filter(|r| matches!(r.phase, ItemPhase::Pending { .. }))
            .count();
        let classified = self
            .items
            .iter()
            .filter(|r| matches!(r.phase, ItemPhase::Classified(_)))
            .count();
        let loader = match self.loader {
            LoaderState::Showing { progress: Some(p) } => LoaderView::Visible {
                text: format!("Loading model: {}%", p.round() as u32),
            },
            LoaderState::Showing { progress: None } => LoaderView::Visible {
                text: "Loading model...".to_string(),
            },
            LoaderState::Completing => LoaderView::Visible {
                text: "Loading model: 100%".to_string(),
            },
            LoaderState::NotShown | LoaderState::Removed => LoaderView::Hidden,
        };
        AppViewModel {
            processed_count: self.processed.len(),
            pending_count: pending,
            classified_count: classified,
            items,
            loader,
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Sets the processed marker. Returns false if it was already set.
    pub(crate) fn mark_processed(&mut self, key: &str, text: String, phase: ItemPhase) -> bool {
        if self.processed.contains_key(key) {
            return false;
        }
        let attempts = match phase {
            ItemPhase::Pending { attempt } => attempt,
            _ => 0,
        };
        self.processed.insert(key.to_string(), self.items.len());
        self.items.push(ItemRecord {
            key: key.to_string(),
            text,
            phase,
            attempts,
            details_open: false,
            negative_marked: false,
        });
        self.mark_dirty();
        true
    }

    pub(crate) fn record(&self, key: &str) -> Option<&ItemRecord> {
        self.processed.get(key).map(|&idx| &self.items[idx])
    }

    pub(crate) fn record_mut(&mut self, key: &str) -> Option<&mut ItemRecord> {
        match self.processed.get(key) {
            Some(&idx) => self.items.get_mut(idx),
            None => None,
        }
    }

    pub(crate) fn set_loader(&mut self, loader: LoaderState) {
        if self.loader != loader {
            self.loader = loader;
            self.mark_dirty();
        }
    }

    pub(crate) fn is_allow_listed(&self, author: Option<&str>) -> bool {
        let Some(author) = author else {
            return false;
        };
        let author = author.to_lowercase();
        self.settings
            .author_allow_list
            .iter()
            .any(|fragment| !fragment.is_empty() && author.contains(&fragment.to_lowercase()))
    }
}

fn row_view(record: &ItemRecord) -> ItemRowView {
    let (scores, style) = match &record.phase {
        ItemPhase::Classified(classification) => {
            let style = if classification.is_negative && record.negative_marked {
                StyleMarker::Negative
            } else if classification.is_negative {
                StyleMarker::Cleared
            } else {
                StyleMarker::Positive
            };
            (classification.scores.clone(), Some(style))
        }
        _ => (Vec::new(), None),
    };
    ItemRowView {
        key: record.key.clone(),
        phase: record.phase.clone(),
        status_line: format!("Post processed - \"{}...\"", first_two_words(&record.text)),
        scores,
        details_open: record.details_open,
        style,
        can_revoke: record.negative_marked,
    }
}

pub(crate) fn first_two_words(text: &str) -> String {
    text.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}
