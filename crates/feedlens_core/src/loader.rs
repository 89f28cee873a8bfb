use std::time::Duration;

use crate::{Effect, ProgressEvent};

/// Lifecycle of the "Loading model" overlay.
///
/// Every change goes through [`LoaderState::transition`]; once `Removed`
/// the overlay never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoaderState {
    #[default]
    NotShown,
    Showing {
        progress: Option<f32>,
    },
    /// Terminal progress seen; removal is scheduled.
    Completing,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoaderInput {
    PageLoaded,
    Progress(ProgressEvent),
    ModelLoaded,
    RemovalDue,
}

impl LoaderState {
    pub fn transition(self, input: LoaderInput, removal_delay: Duration) -> (Self, Option<Effect>) {
        use LoaderInput::*;
        use LoaderState::*;

        match (self, input) {
            (Removed, _) => (Removed, None),
            (_, ModelLoaded) => (Removed, None),

            (NotShown, PageLoaded) => (Showing { progress: None }, None),
            // The model finished before the overlay was ever shown.
            (NotShown, Progress(event)) if event.is_terminal() => (Removed, None),
            (NotShown, _) => (NotShown, None),

            (Showing { .. }, Progress(event)) if event.is_terminal() => (
                Completing,
                Some(Effect::ScheduleLoaderRemoval {
                    delay: removal_delay,
                }),
            ),
            (Showing { progress }, Progress(event)) => match event.progress {
                Some(p) => (
                    Showing {
                        progress: Some(p.clamp(0.0, 100.0)),
                    },
                    None,
                ),
                None => (Showing { progress }, None),
            },
            (Showing { progress }, PageLoaded | RemovalDue) => (Showing { progress }, None),

            (Completing, RemovalDue) => (Removed, None),
            (Completing, _) => (Completing, None),
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, LoaderState::Showing { .. } | LoaderState::Completing)
    }
}
