use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct StopwordSettings {
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl Default for StopwordSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://stopwordapi.com/api/v1/stopwords".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StopwordError {
    #[error("invalid stopword endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("undecodable stopword list: {0}")]
    Decode(String),
}

/// Supplies the stopword list for a language. Treated as unreliable.
#[async_trait::async_trait]
pub trait StopwordSource: Send + Sync {
    async fn fetch(&self, language: &str) -> Result<Vec<String>, StopwordError>;
}

/// The service answers either with a bare list or with lists keyed by language.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StopwordBody {
    List(Vec<String>),
    ByLanguage(HashMap<String, Vec<String>>),
}

#[derive(Debug, Clone)]
pub struct HttpStopwordSource {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpStopwordSource {
    pub fn new(settings: &StopwordSettings) -> Result<Self, StopwordError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint)
            .map_err(|err| StopwordError::InvalidEndpoint(err.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| StopwordError::Network(err.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait::async_trait]
impl StopwordSource for HttpStopwordSource {
    async fn fetch(&self, language: &str) -> Result<Vec<String>, StopwordError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("langs", language)
            .append_pair("format", "json");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| StopwordError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StopwordError::HttpStatus(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| StopwordError::Network(err.to_string()))?;

        match serde_json::from_slice(&bytes) {
            Ok(StopwordBody::List(words)) => Ok(words),
            Ok(StopwordBody::ByLanguage(mut by_language)) => by_language
                .remove(language)
                .ok_or_else(|| StopwordError::Decode(format!("no list for language {language}"))),
            Err(err) => Err(StopwordError::Decode(err.to_string())),
        }
    }
}
