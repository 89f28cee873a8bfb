//! Feedlens core: pure feed-observer state machine and view-model helpers.
mod effect;
mod loader;
mod msg;
mod state;
mod types;
mod update;
mod view_model;

pub use effect::Effect;
pub use loader::{LoaderInput, LoaderState};
pub use msg::Msg;
pub use state::{AppState, ItemPhase, ObserverSettings, SkipReason};
pub use types::{
    Classification, DiscoveredItem, FailureKind, ItemKey, LabelScore, ProgressEvent,
    ProgressStatus, NEGATIVE_THRESHOLD,
};
pub use update::update;
pub use view_model::{AppViewModel, ItemRowView, LoaderView, StyleMarker};
