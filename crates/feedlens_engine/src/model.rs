use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::ProgressEvent;

/// Receives progress while a model is being loaded.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Which model to load and for which task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub task: String,
    pub model_id: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            task: "zero-shot-classification".to_string(),
            model_id: "facebook/bart-large-mnli".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Score every label independently instead of normalizing across labels.
    pub multi_label: bool,
}

/// Raw model answer: parallel label and score arrays.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelOutput {
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid model endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("undecodable model response: {0}")]
    Decode(String),
    #[error("model load failed: {0}")]
    Load(String),
}

#[async_trait::async_trait]
pub trait ZeroShotModel: Send + Sync {
    async fn invoke(
        &self,
        text: &str,
        labels: &[String],
        options: InvokeOptions,
    ) -> Result<ModelOutput, ModelError>;
}

#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    /// Downloads and initializes the model, reporting progress along the way.
    async fn load(
        &self,
        spec: &ModelSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineHandle, ModelError>;
}

/// Shared capability over a loaded model.
#[derive(Clone)]
pub struct PipelineHandle {
    model: Arc<dyn ZeroShotModel>,
}

impl PipelineHandle {
    pub fn new(model: impl ZeroShotModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub async fn invoke(
        &self,
        text: &str,
        labels: &[String],
        options: InvokeOptions,
    ) -> Result<ModelOutput, ModelError> {
        self.model.invoke(text, labels, options).await
    }

    /// True when both handles wrap the same loaded model.
    pub fn same_as(&self, other: &PipelineHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.model) as *const (),
            Arc::as_ptr(&other.model) as *const (),
        )
    }
}

impl fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("model", &(Arc::as_ptr(&self.model) as *const ()))
            .finish()
    }
}
