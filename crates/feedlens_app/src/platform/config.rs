//! Optional `feedlens.ron` configuration.
//!
//! Every field has a default; a file only needs to name what it overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use feedlens_core::ObserverSettings;
use feedlens_engine::{
    ChannelSettings, CoordinatorSettings, FeedSelectors, InferenceSettings, ModelSpec,
    StopwordSettings, WorkerSettings,
};
use feedlens_logging::{lens_info, lens_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "feedlens.ron";
pub const DEFAULT_STORE_FILENAME: &str = "feedlens-store.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file holding the label store.
    pub store: PathBuf,
    pub observer: ObserverConfig,
    pub channel: ChannelConfig,
    pub coordinator: CoordinatorConfig,
    pub model: ModelConfig,
    pub stopwords: StopwordConfig,
    pub worker: WorkerConfig,
    pub selectors: SelectorConfig,
    /// How often a watched snapshot is checked for changes.
    pub watch_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from(DEFAULT_STORE_FILENAME),
            observer: ObserverConfig::default(),
            channel: ChannelConfig::default(),
            coordinator: CoordinatorConfig::default(),
            model: ModelConfig::default(),
            stopwords: StopwordConfig::default(),
            worker: WorkerConfig::default(),
            selectors: SelectorConfig::default(),
            watch_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub context_gone_retry_ms: u64,
    pub loader_removal_ms: u64,
    pub author_allow_list: Vec<String>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        let defaults = ObserverSettings::default();
        Self {
            context_gone_retry_ms: millis(defaults.context_gone_retry_delay),
            loader_removal_ms: millis(defaults.loader_removal_delay),
            author_allow_list: defaults.author_allow_list,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let defaults = ChannelSettings::default();
        Self {
            max_attempts: defaults.max_attempts,
            retry_delay_ms: millis(defaults.retry_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub max_content_chars: usize,
    pub stopword_language: String,
    pub multi_label: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        let defaults = CoordinatorSettings::default();
        Self {
            max_content_chars: defaults.max_content_chars,
            stopword_language: defaults.stopword_language,
            multi_label: defaults.multi_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub task: String,
    pub model_id: String,
    /// Base URL of the inference server.
    pub endpoint: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub load_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let spec = ModelSpec::default();
        let inference = InferenceSettings::default();
        Self {
            task: spec.task,
            model_id: spec.model_id,
            endpoint: inference.endpoint,
            poll_interval_ms: millis(inference.poll_interval),
            request_timeout_secs: inference.request_timeout.as_secs(),
            load_timeout_secs: inference.load_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopwordConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for StopwordConfig {
    fn default() -> Self {
        let defaults = StopwordSettings::default();
        Self {
            endpoint: defaults.endpoint,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub queue_capacity: usize,
    /// Seconds without requests before the worker context is recycled.
    pub idle_timeout_secs: Option<u64>,
    pub respawn_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let defaults = WorkerSettings::default();
        Self {
            queue_capacity: defaults.queue_capacity,
            idle_timeout_secs: defaults.idle_timeout.map(|d| d.as_secs()),
            respawn_delay_ms: millis(defaults.respawn_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub item: String,
    pub description: String,
    pub author: String,
    pub key_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let defaults = FeedSelectors::default();
        Self {
            item: defaults.item,
            description: defaults.description,
            author: defaults.author,
            key_attribute: defaults.key_attribute,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    /// Reads `path`. A missing file yields defaults; so does a malformed one, with a warning.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Self::default();
            }
            Err(err) => {
                lens_warn!("Failed to read config from {:?}: {}", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(config) => {
                lens_info!("Loaded config from {:?}", path);
                config
            }
            Err(err) => {
                lens_warn!("Failed to parse config from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn observer_settings(&self) -> ObserverSettings {
        ObserverSettings {
            context_gone_retry_delay: Duration::from_millis(self.observer.context_gone_retry_ms),
            loader_removal_delay: Duration::from_millis(self.observer.loader_removal_ms),
            author_allow_list: self
                .observer
                .author_allow_list
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            max_attempts: self.channel.max_attempts,
            retry_delay: Duration::from_millis(self.channel.retry_delay_ms),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            max_content_chars: self.coordinator.max_content_chars,
            stopword_language: self.coordinator.stopword_language.clone(),
            multi_label: self.coordinator.multi_label,
        }
    }

    pub fn model_spec(&self) -> ModelSpec {
        ModelSpec {
            task: self.model.task.clone(),
            model_id: self.model.model_id.clone(),
        }
    }

    pub fn inference_settings(&self) -> InferenceSettings {
        InferenceSettings {
            endpoint: self.model.endpoint.clone(),
            poll_interval: Duration::from_millis(self.model.poll_interval_ms),
            request_timeout: Duration::from_secs(self.model.request_timeout_secs),
            load_timeout: Duration::from_secs(self.model.load_timeout_secs),
            ..InferenceSettings::default()
        }
    }

    pub fn stopword_settings(&self) -> StopwordSettings {
        StopwordSettings {
            endpoint: self.stopwords.endpoint.clone(),
            request_timeout: Duration::from_secs(self.stopwords.request_timeout_secs),
        }
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            queue_capacity: self.worker.queue_capacity,
            idle_timeout: self.worker.idle_timeout_secs.map(Duration::from_secs),
            respawn_delay: Duration::from_millis(self.worker.respawn_delay_ms),
        }
    }

    pub fn feed_selectors(&self) -> FeedSelectors {
        FeedSelectors {
            item: self.selectors.item.clone(),
            description: self.selectors.description.clone(),
            author: self.selectors.author.clone(),
            key_attribute: self.selectors.key_attribute.clone(),
        }
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms.max(50))
    }
}
