use std::sync::Arc;
use std::time::Duration;

use feedlens_core::{Classification, Effect, FailureKind, LabelScore, Msg, ProgressEvent, ProgressStatus};
use feedlens_engine::{ClassificationResult, ClassifyReply, RetryChannel, SendError, WireMessage};
use feedlens_logging::{lens_debug, lens_info, lens_warn, preview};
use tokio::sync::mpsc;

/// Runs observer effects as tasks; their outcomes come back as messages.
pub struct EffectRunner {
    channel: Arc<RetryChannel>,
    msg_tx: mpsc::UnboundedSender<Msg>,
}

impl EffectRunner {
    pub fn new(channel: Arc<RetryChannel>, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self { channel, msg_tx }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RequestClassification { key, content } => {
                    lens_debug!("Classify {} \"{}\"", key, preview(&content, 40));
                    let channel = self.channel.clone();
                    let msg_tx = self.msg_tx.clone();
                    tokio::spawn(async move {
                        let msg = classify(&channel, key, content).await;
                        let _ = msg_tx.send(msg);
                    });
                }
                Effect::ScheduleRetry { key, delay } => {
                    self.send_after(delay, Msg::RetryDue { key });
                }
                Effect::ScheduleLoaderRemoval { delay } => {
                    self.send_after(delay, Msg::LoaderRemovalDue);
                }
            }
        }
    }

    fn send_after(&self, delay: Duration, msg: Msg) {
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = msg_tx.send(msg);
        });
    }
}

async fn classify(channel: &RetryChannel, key: String, content: String) -> Msg {
    let reply = channel
        .request::<ClassifyReply>(&WireMessage::ClassifyPost { content })
        .await;
    match reply {
        Ok(reply) => match reply.into_outcome() {
            Ok(result) => Msg::ClassificationSucceeded {
                key,
                result: result.map(map_classification),
            },
            Err(error) => Msg::ClassificationFailed {
                key,
                failure: FailureKind::Other(error),
            },
        },
        Err(SendError::ContextGone) => Msg::ClassificationFailed {
            key,
            failure: FailureKind::ContextGone,
        },
        Err(err) => Msg::ClassificationFailed {
            key,
            failure: FailureKind::Other(err.to_string()),
        },
    }
}

/// Forwards `SHOW_LOADER` messages from the worker until the relay closes.
pub async fn relay_loader_messages(
    mut rx: mpsc::UnboundedReceiver<WireMessage>,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    while let Some(message) = rx.recv().await {
        let msg = match message {
            WireMessage::ShowLoader {
                model_loaded: true, ..
            } => {
                lens_info!("Model loaded");
                Msg::ModelLoaded
            }
            WireMessage::ShowLoader { data, .. } => Msg::LoaderProgress(map_progress(data)),
            WireMessage::ClassifyPost { .. } => {
                lens_warn!("Unexpected classification request on the loader relay");
                continue;
            }
        };
        if msg_tx.send(msg).is_err() {
            return;
        }
    }
}

fn map_classification(result: ClassificationResult) -> Classification {
    Classification {
        scores: result
            .scores
            .into_iter()
            .map(|s| LabelScore {
                label: s.label,
                score: s.score,
            })
            .collect(),
        is_negative: result.is_negative,
    }
}

fn map_progress(event: feedlens_engine::ProgressEvent) -> ProgressEvent {
    ProgressEvent {
        status: match event.status {
            feedlens_engine::ProgressStatus::Downloading => ProgressStatus::Downloading,
            feedlens_engine::ProgressStatus::Ready => ProgressStatus::Ready,
            feedlens_engine::ProgressStatus::Error => ProgressStatus::Error,
        },
        progress: event.progress,
    }
}
