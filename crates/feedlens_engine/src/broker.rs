//! Single-flight, memoized construction of the classification pipeline.
//!
//! The first [`ResourceBroker::acquire`] starts loading; callers that arrive
//! while loading is in flight await the same shared future and receive the
//! progress events emitted after they subscribed. Once settled, the outcome is
//! kept for the lifetime of the broker: later callers get the same handle, or
//! the same initialization error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use feedlens_logging::{lens_error, lens_info, lens_trace};
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::model::{ModelLoader, ModelSpec, PipelineHandle, ProgressSink};
use crate::ProgressEvent;

/// Callback registered by an `acquire` caller to follow loading progress.
pub type ProgressSubscriber = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("pipeline initialization failed: {0}")]
    Init(String),
}

type LoadFuture = Shared<BoxFuture<'static, Result<PipelineHandle, BrokerError>>>;

enum Slot {
    Empty,
    Loading(LoadFuture),
    Ready(PipelineHandle),
    Failed(BrokerError),
}

#[derive(Default)]
struct Subscribers {
    list: Mutex<Vec<ProgressSubscriber>>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, Vec<ProgressSubscriber>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for Subscribers {
    fn emit(&self, event: ProgressEvent) {
        // Snapshot so a subscriber may call back into the broker.
        let subscribers = self.lock().clone();
        lens_trace!("Pipeline progress {:?} to {} subscribers", event, subscribers.len());
        for subscriber in subscribers {
            subscriber(&event);
        }
    }
}

pub struct ResourceBroker {
    loader: Arc<dyn ModelLoader>,
    spec: ModelSpec,
    slot: Mutex<Slot>,
    subscribers: Arc<Subscribers>,
    constructions: AtomicUsize,
}

impl ResourceBroker {
    pub fn new(loader: Arc<dyn ModelLoader>, spec: ModelSpec) -> Self {
        Self {
            loader,
            spec,
            slot: Mutex::new(Slot::Empty),
            subscribers: Arc::new(Subscribers::default()),
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Resolves to the shared pipeline, loading it on first demand.
    pub async fn acquire(
        &self,
        on_progress: Option<ProgressSubscriber>,
    ) -> Result<PipelineHandle, BrokerError> {
        let pending = {
            let mut slot = self.lock_slot();
            let in_flight = match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Failed(err) => return Err(err.clone()),
                Slot::Loading(pending) => Some(pending.clone()),
                Slot::Empty => None,
            };
            if let Some(subscriber) = on_progress {
                self.subscribers.lock().push(subscriber);
            }
            match in_flight {
                Some(pending) => pending,
                None => {
                    let pending = self.start_construction();
                    *slot = Slot::Loading(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.await;
        self.settle(&outcome);
        outcome
    }

    /// Number of constructions ever started; never exceeds one.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock_slot(), Slot::Ready(_))
    }

    fn start_construction(&self) -> LoadFuture {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        let loader = self.loader.clone();
        let spec = self.spec.clone();
        let subscribers = self.subscribers.clone();

        async move {
            lens_info!("Loading {} pipeline with model {}", spec.task, spec.model_id);
            match loader.load(&spec, subscribers.as_ref()).await {
                Ok(handle) => {
                    lens_info!("Pipeline ready: {}", spec.model_id);
                    Ok(handle)
                }
                Err(err) => {
                    lens_error!("Pipeline initialization failed for {}: {}", spec.model_id, err);
                    subscribers.emit(ProgressEvent::error());
                    Err(BrokerError::Init(err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Records the outcome of the in-flight construction. The first waiter to
    /// return does the work; the rest find the slot already settled.
    fn settle(&self, outcome: &Result<PipelineHandle, BrokerError>) {
        let mut slot = self.lock_slot();
        if !matches!(*slot, Slot::Loading(_)) {
            return;
        }
        *slot = match outcome {
            Ok(handle) => Slot::Ready(handle.clone()),
            Err(err) => Slot::Failed(err.clone()),
        };
        self.subscribers.lock().clear();
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
