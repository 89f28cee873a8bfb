use feedlens_logging::{lens_debug, lens_error, lens_info, lens_trace};

use crate::{
    AppState, DiscoveredItem, Effect, FailureKind, ItemPhase, LoaderInput, Msg, SkipReason,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ItemsDiscovered(items) => {
            let mut effects = Vec::new();
            for item in items {
                effects.extend(discover(&mut state, item));
            }
            effects
        }
        Msg::ClassificationSucceeded { key, result } => {
            let Some(record) = state.record_mut(&key) else {
                return (state, Vec::new());
            };
            if !matches!(record.phase, ItemPhase::Pending { .. }) {
                lens_debug!("Ignoring late classification for {key}");
                return (state, Vec::new());
            }
            match result {
                Some(classification) => {
                    record.negative_marked = classification.is_negative;
                    record.phase = ItemPhase::Classified(classification);
                }
                None => {
                    lens_debug!("No labels configured; leaving {key} unannotated");
                    record.phase = ItemPhase::NoLabels;
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::ClassificationFailed { key, failure } => {
            let delay = state.settings().context_gone_retry_delay;
            let Some(record) = state.record_mut(&key) else {
                return (state, Vec::new());
            };
            if !matches!(record.phase, ItemPhase::Pending { .. }) {
                return (state, Vec::new());
            }
            let effects = match &failure {
                FailureKind::ContextGone => {
                    lens_info!("Worker context gone; retrying {key} in {delay:?}");
                    vec![Effect::ScheduleRetry {
                        key: key.clone(),
                        delay,
                    }]
                }
                FailureKind::Other(message) => {
                    lens_error!("Failed to classify {key}: {message}");
                    Vec::new()
                }
            };
            record.phase = ItemPhase::Errored(failure);
            state.mark_dirty();
            effects
        }
        Msg::RetryDue { key } => {
            let Some(record) = state.record_mut(&key) else {
                return (state, Vec::new());
            };
            match record.phase {
                ItemPhase::Errored(FailureKind::ContextGone) => {
                    let content = record.text.clone();
                    record.attempts += 1;
                    record.phase = ItemPhase::Pending {
                        attempt: record.attempts,
                    };
                    state.mark_dirty();
                    vec![Effect::RequestClassification { key, content }]
                }
                _ => Vec::new(),
            }
        }
        Msg::DetailsToggled { key } => {
            if let Some(record) = state.record_mut(&key) {
                if matches!(record.phase, ItemPhase::Classified(_)) {
                    record.details_open = !record.details_open;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::RevokeNegativeClicked { key } => {
            if let Some(record) = state.record_mut(&key) {
                if record.negative_marked {
                    record.negative_marked = false;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::PageLoaded => drive_loader(&mut state, LoaderInput::PageLoaded),
        Msg::LoaderProgress(event) => drive_loader(&mut state, LoaderInput::Progress(event)),
        Msg::ModelLoaded => drive_loader(&mut state, LoaderInput::ModelLoaded),
        Msg::LoaderRemovalDue => drive_loader(&mut state, LoaderInput::RemovalDue),
    };

    (state, effects)
}

/// Sets the processed marker before anything else so a later batch containing
/// the same item is a no-op even while its request is still in flight.
fn discover(state: &mut AppState, item: DiscoveredItem) -> Option<Effect> {
    if state.is_processed(&item.key) {
        lens_trace!("Item {} already processed, ignored", item.key);
        return None;
    }

    if state.is_allow_listed(item.author.as_deref()) {
        lens_debug!("Skipping {}: allow-listed author", item.key);
        state.mark_processed(
            &item.key,
            item.text,
            ItemPhase::Skipped(SkipReason::AllowListedAuthor),
        );
        return None;
    }

    if item.text.trim().is_empty() {
        lens_debug!("Skipping {}: empty description", item.key);
        state.mark_processed(&item.key, item.text, ItemPhase::Skipped(SkipReason::EmptyText));
        return None;
    }

    let content = item.text.clone();
    state.mark_processed(&item.key, item.text, ItemPhase::Pending { attempt: 1 });
    Some(Effect::RequestClassification {
        key: item.key,
        content,
    })
}

fn drive_loader(state: &mut AppState, input: LoaderInput) -> Vec<Effect> {
    let (next, effect) = state
        .loader()
        .transition(input, state.settings().loader_removal_delay);
    state.set_loader(next);
    effect.into_iter().collect()
}
