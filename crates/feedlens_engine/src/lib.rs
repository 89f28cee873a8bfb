//! Feedlens engine: the worker context, its collaborators and the channel to it.
mod broker;
mod channel;
mod coordinator;
mod decode;
mod discover;
mod inference;
mod messages;
mod model;
mod preprocess;
mod stopwords;
mod storage;
mod types;
mod worker;

pub use broker::{BrokerError, ProgressSubscriber, ResourceBroker};
pub use channel::{
    ChannelSettings, DeliveryError, Envelope, Reply, RetryChannel, SendError, Transport,
};
pub use coordinator::{ClassificationCoordinator, CoordinatorError, CoordinatorSettings};
pub use decode::{decode_snapshot, DecodedSnapshot};
pub use discover::{FeedItemSnapshot, FeedScanner, FeedSelectors, SelectorError};
pub use inference::{HttpModelLoader, HttpZeroShotModel, InferenceSettings};
pub use messages::{ClassifyReply, WireMessage};
pub use model::{
    InvokeOptions, ModelError, ModelLoader, ModelOutput, ModelSpec, PipelineHandle, ProgressSink,
    ZeroShotModel,
};
pub use preprocess::{filter_stopwords, prepare_content, strip_emoji, truncate_chars};
pub use stopwords::{HttpStopwordSource, StopwordError, StopwordSettings, StopwordSource};
pub use storage::{JsonFileStore, KeyValueStore, LabelStore, MemoryStore, StorageError, LABELS_KEY};
pub use types::{
    ClassificationResult, LabelScore, LabelSet, ProgressEvent, ProgressStatus, NEGATIVE_THRESHOLD,
};
pub use worker::{
    ChannelLoaderRelay, CoordinatorFactory, LoaderRelay, LocalTransport, WorkerHost,
    WorkerSettings,
};
