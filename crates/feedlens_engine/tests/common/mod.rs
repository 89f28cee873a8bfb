#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use feedlens_engine::{
    ClassificationCoordinator, CoordinatorSettings, InvokeOptions, KeyValueStore, LabelSet,
    LabelStore, MemoryStore, ModelError, ModelLoader, ModelOutput, ModelSpec, PipelineHandle,
    ProgressEvent, ProgressSink, ResourceBroker, StopwordError, StopwordSource, ZeroShotModel,
};
use tokio::sync::Notify;

/// Answers every label with the configured scores, in label order.
pub struct FixedModel {
    scores: Vec<f32>,
    pub invocations: Arc<AtomicUsize>,
    pub seen_texts: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl ZeroShotModel for FixedModel {
    async fn invoke(
        &self,
        text: &str,
        labels: &[String],
        _options: InvokeOptions,
    ) -> Result<ModelOutput, ModelError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.seen_texts.lock().unwrap().push(text.to_string());
        Ok(ModelOutput {
            labels: labels.to_vec(),
            scores: labels
                .iter()
                .enumerate()
                .map(|(i, _)| self.scores.get(i).copied().unwrap_or(0.0))
                .collect(),
        })
    }
}

/// Loader double: emits progress steps, optionally pausing on a gate after the first.
pub struct FakeLoader {
    pub loads: Arc<AtomicUsize>,
    pub invocations: Arc<AtomicUsize>,
    pub seen_texts: Arc<Mutex<Vec<String>>>,
    pub gate: Option<Arc<Notify>>,
    steps: Vec<f32>,
    scores: Vec<f32>,
    fail: bool,
}

impl FakeLoader {
    pub fn new(scores: &[f32]) -> Self {
        Self {
            loads: Arc::new(AtomicUsize::new(0)),
            invocations: Arc::new(AtomicUsize::new(0)),
            seen_texts: Arc::new(Mutex::new(Vec::new())),
            gate: None,
            steps: vec![10.0, 50.0],
            scores: scores.to_vec(),
            fail: false,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelLoader for FakeLoader {
    async fn load(
        &self,
        _spec: &ModelSpec,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineHandle, ModelError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        for (i, step) in self.steps.iter().enumerate() {
            progress.emit(ProgressEvent::downloading(Some(*step)));
            if i == 0 {
                match &self.gate {
                    Some(gate) => gate.notified().await,
                    None => tokio::task::yield_now().await,
                }
            }
        }
        if self.fail {
            return Err(ModelError::Load("weights corrupted".to_string()));
        }
        progress.emit(ProgressEvent::ready());
        Ok(PipelineHandle::new(FixedModel {
            scores: self.scores.clone(),
            invocations: self.invocations.clone(),
            seen_texts: self.seen_texts.clone(),
        }))
    }
}

pub struct StaticStopwords(pub Vec<&'static str>);

#[async_trait::async_trait]
impl StopwordSource for StaticStopwords {
    async fn fetch(&self, _language: &str) -> Result<Vec<String>, StopwordError> {
        Ok(self.0.iter().map(|w| w.to_string()).collect())
    }
}

pub struct UnreachableStopwords;

#[async_trait::async_trait]
impl StopwordSource for UnreachableStopwords {
    async fn fetch(&self, _language: &str) -> Result<Vec<String>, StopwordError> {
        Err(StopwordError::Network("connection refused".to_string()))
    }
}

pub fn label_store(labels: &[&str]) -> LabelStore {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let labels_store = LabelStore::new(store);
    labels_store
        .save(&LabelSet::new(labels.iter().copied()))
        .unwrap();
    labels_store
}

pub fn coordinator(
    loader: Arc<FakeLoader>,
    labels: &[&str],
    stopwords: Arc<dyn StopwordSource>,
) -> ClassificationCoordinator {
    let broker = Arc::new(ResourceBroker::new(loader, ModelSpec::default()));
    ClassificationCoordinator::new(
        broker,
        label_store(labels),
        stopwords,
        CoordinatorSettings::default(),
    )
}

/// Collects progress events seen by one subscriber.
pub fn recorder() -> (feedlens_engine::ProgressSubscriber, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscriber: feedlens_engine::ProgressSubscriber = Arc::new(move |event: &ProgressEvent| {
        sink.lock().unwrap().push(*event);
    });
    (subscriber, events)
}
