use crate::{ItemKey, ItemPhase, LabelScore};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub processed_count: usize,
    pub pending_count: usize,
    pub classified_count: usize,
    pub items: Vec<ItemRowView>,
    pub loader: LoaderView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRowView {
    pub key: ItemKey,
    pub phase: ItemPhase,
    pub status_line: String,
    pub scores: Vec<LabelScore>,
    pub details_open: bool,
    /// `None` until the item is classified.
    pub style: Option<StyleMarker>,
    pub can_revoke: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleMarker {
    Negative,
    Positive,
    /// Negative verdict whose marker the user revoked.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoaderView {
    #[default]
    Hidden,
    Visible { text: String },
}
