use std::collections::HashSet;
use std::sync::Arc;

use feedlens_logging::{lens_debug, lens_info, preview};

use crate::broker::{BrokerError, ProgressSubscriber, ResourceBroker};
use crate::model::{InvokeOptions, ModelError, ModelOutput};
use crate::preprocess::prepare_content;
use crate::stopwords::StopwordSource;
use crate::storage::{LabelStore, StorageError};
use crate::{ClassificationResult, LabelScore, LabelSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Cleaned text is cut to this many characters before reaching the model.
    pub max_content_chars: usize,
    pub stopword_language: String,
    pub multi_label: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_content_chars: 200,
            stopword_language: "fr".to_string(),
            multi_label: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("label storage: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Pipeline(#[from] BrokerError),
    #[error("model invocation: {0}")]
    Model(#[from] ModelError),
    #[error("model output does not match the label set: {0}")]
    Mismatch(String),
}

/// Turns raw post text into per-label scores. No retries happen here.
pub struct ClassificationCoordinator {
    broker: Arc<ResourceBroker>,
    labels: LabelStore,
    stopwords: Arc<dyn StopwordSource>,
    settings: CoordinatorSettings,
}

impl ClassificationCoordinator {
    pub fn new(
        broker: Arc<ResourceBroker>,
        labels: LabelStore,
        stopwords: Arc<dyn StopwordSource>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            broker,
            labels,
            stopwords,
            settings,
        }
    }

    pub fn broker(&self) -> &Arc<ResourceBroker> {
        &self.broker
    }

    /// Returns `Ok(None)` when no labels are configured; the model is not touched then.
    pub async fn classify(
        &self,
        raw_text: &str,
        on_progress: Option<ProgressSubscriber>,
    ) -> Result<Option<ClassificationResult>, CoordinatorError> {
        let content = prepare_content(
            raw_text,
            self.stopwords.as_ref(),
            &self.settings.stopword_language,
            self.settings.max_content_chars,
        )
        .await;

        let labels = self.labels.load()?;
        if labels.is_empty() {
            lens_info!("No labels configured, skipping classification");
            return Ok(None);
        }

        let pipeline = self.broker.acquire(on_progress).await?;
        let output = pipeline
            .invoke(
                &content,
                labels.as_slice(),
                InvokeOptions {
                    multi_label: self.settings.multi_label,
                },
            )
            .await?;

        let result = ClassificationResult::from_scores(pair_scores(&labels, output)?);
        lens_debug!(
            "Classified \"{}\": negative={} scores={:?}",
            preview(&content, 40),
            result.is_negative,
            result.scores
        );
        Ok(Some(result))
    }
}

/// Zips the model's parallel arrays, checking they cover exactly `labels`.
fn pair_scores(labels: &LabelSet, output: ModelOutput) -> Result<Vec<LabelScore>, CoordinatorError> {
    if output.labels.len() != output.scores.len() {
        return Err(CoordinatorError::Mismatch(format!(
            "{} labels but {} scores",
            output.labels.len(),
            output.scores.len()
        )));
    }
    if output.labels.len() != labels.len() {
        return Err(CoordinatorError::Mismatch(format!(
            "expected {} labels, got {}",
            labels.len(),
            output.labels.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut scores = Vec::with_capacity(output.labels.len());
    for (label, score) in output.labels.into_iter().zip(output.scores) {
        if !labels.contains(&label) || !seen.insert(label.clone()) {
            return Err(CoordinatorError::Mismatch(format!("unexpected label {label}")));
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(CoordinatorError::Mismatch(format!(
                "score {score} for {label} is out of range"
            )));
        }
        scores.push(LabelScore { label, score });
    }
    Ok(scores)
}
