use std::time::Duration;

use feedlens_logging::{lens_debug, lens_warn};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::model::{
    InvokeOptions, ModelError, ModelLoader, ModelOutput, ModelSpec, PipelineHandle, ProgressSink,
    ZeroShotModel,
};
use crate::{ProgressEvent, ProgressStatus};

#[derive(Debug, Clone)]
pub struct InferenceSettings {
    /// Base URL of the inference server; models live under `{endpoint}/models/{model_id}`.
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Delay between two status polls while the server is still loading.
    pub poll_interval: Duration,
    /// Upper bound for the whole load, polls included.
    pub load_timeout: Duration,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            load_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: ProgressStatus,
    #[serde(default)]
    progress: Option<f32>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    inputs: &'a str,
    parameters: InvokeParameters<'a>,
}

#[derive(Debug, Serialize)]
struct InvokeParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

/// Loads models hosted by a zero-shot inference server.
#[derive(Debug, Clone)]
pub struct HttpModelLoader {
    settings: InferenceSettings,
}

impl HttpModelLoader {
    pub fn new(settings: InferenceSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, ModelError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| ModelError::Network(err.to_string()))
    }

    fn model_url(&self, model_id: &str) -> Result<reqwest::Url, ModelError> {
        let raw = format!(
            "{}/models/{}",
            self.settings.endpoint.trim_end_matches('/'),
            model_id
        );
        reqwest::Url::parse(&raw).map_err(|err| ModelError::InvalidEndpoint(err.to_string()))
    }

    async fn poll_until_ready(
        &self,
        client: &reqwest::Client,
        url: &reqwest::Url,
        progress: &dyn ProgressSink,
    ) -> Result<(), ModelError> {
        loop {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(map_reqwest_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(ModelError::HttpStatus(status.as_u16()));
            }
            let bytes = response.bytes().await.map_err(map_reqwest_error)?;
            let body: StatusBody = serde_json::from_slice(&bytes)
                .map_err(|err| ModelError::Decode(err.to_string()))?;

            match body.status {
                ProgressStatus::Ready => {
                    progress.emit(ProgressEvent::ready());
                    return Ok(());
                }
                ProgressStatus::Error => {
                    return Err(ModelError::Load(
                        body.message.unwrap_or_else(|| "server reported an error".to_string()),
                    ));
                }
                ProgressStatus::Downloading => {
                    let pct = body.progress.map(|p| p.clamp(0.0, 100.0));
                    lens_debug!("Model download at {:?}%", pct);
                    progress.emit(ProgressEvent::downloading(pct));
                }
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(
        &self,
        spec: &ModelSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineHandle, ModelError> {
        if spec.task != "zero-shot-classification" {
            return Err(ModelError::Load(format!("unsupported task {}", spec.task)));
        }
        let url = self.model_url(&spec.model_id)?;
        let client = self.build_client()?;

        tokio::time::timeout(
            self.settings.load_timeout,
            self.poll_until_ready(&client, &url, progress),
        )
        .await
        .map_err(|_| {
            lens_warn!("Model {} did not become ready in time", spec.model_id);
            ModelError::Load("timed out waiting for the model".to_string())
        })??;

        Ok(PipelineHandle::new(HttpZeroShotModel { client, url }))
    }
}

/// A loaded model served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpZeroShotModel {
    client: reqwest::Client,
    url: reqwest::Url,
}

#[async_trait::async_trait]
impl ZeroShotModel for HttpZeroShotModel {
    async fn invoke(
        &self,
        text: &str,
        labels: &[String],
        options: InvokeOptions,
    ) -> Result<ModelOutput, ModelError> {
        let body = serde_json::to_vec(&InvokeBody {
            inputs: text,
            parameters: InvokeParameters {
                candidate_labels: labels,
                multi_label: options.multi_label,
            },
        })
        .map_err(|err| ModelError::Decode(err.to_string()))?;

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::HttpStatus(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|err| ModelError::Decode(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ModelError {
    if let Some(status) = err.status() {
        return ModelError::HttpStatus(status.as_u16());
    }
    ModelError::Network(err.to_string())
}
