//! The privileged worker context and the host that creates and tears it down.
//!
//! A context owns one [`ClassificationCoordinator`] (and therefore one
//! pipeline) for its whole lifetime. Tearing it down drops queued and
//! in-flight requests without replies; until a new context is spawned every
//! delivery fails with [`DeliveryError::ContextGone`].

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use feedlens_logging::{lens_debug, lens_info, lens_trace, lens_warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::broker::ProgressSubscriber;
use crate::channel::{DeliveryError, Envelope, Reply, Transport};
use crate::coordinator::ClassificationCoordinator;
use crate::messages::{ClassifyReply, WireMessage};
use crate::ProgressEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Requests waiting for the worker beyond this count are refused.
    pub queue_capacity: usize,
    /// The context shuts itself down after this long with no request queued or running.
    pub idle_timeout: Option<Duration>,
    /// Delay before an idle-stopped context is recreated.
    pub respawn_delay: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            idle_timeout: None,
            respawn_delay: Duration::from_millis(500),
        }
    }
}

/// Fire-and-forget path from the worker to the observer.
pub trait LoaderRelay: Send + Sync {
    fn relay(&self, message: WireMessage);
}

/// Relays into an unbounded channel; a closed channel means nobody is watching.
pub struct ChannelLoaderRelay {
    tx: mpsc::UnboundedSender<WireMessage>,
}

impl ChannelLoaderRelay {
    pub fn new(tx: mpsc::UnboundedSender<WireMessage>) -> Self {
        Self { tx }
    }
}

impl LoaderRelay for ChannelLoaderRelay {
    fn relay(&self, message: WireMessage) {
        if self.tx.send(message).is_err() {
            lens_trace!("Loader relay dropped: observer gone");
        }
    }
}

/// Builds the coordinator for each new context.
pub type CoordinatorFactory = Arc<dyn Fn() -> ClassificationCoordinator + Send + Sync>;

struct Job {
    envelope: Envelope,
    reply_tx: oneshot::Sender<Reply>,
}

struct LiveContext {
    generation: u64,
    tx: mpsc::Sender<Job>,
    token: CancellationToken,
}

struct HostInner {
    factory: CoordinatorFactory,
    relay: Arc<dyn LoaderRelay>,
    settings: WorkerSettings,
    live: Mutex<Option<LiveContext>>,
    generations: AtomicU64,
}

#[derive(Clone)]
pub struct WorkerHost {
    inner: Arc<HostInner>,
}

impl WorkerHost {
    /// Creates the host and spawns the first context. Must run inside a tokio runtime.
    pub fn start(
        factory: CoordinatorFactory,
        relay: Arc<dyn LoaderRelay>,
        settings: WorkerSettings,
    ) -> Self {
        let host = Self {
            inner: Arc::new(HostInner {
                factory,
                relay,
                settings,
                live: Mutex::new(None),
                generations: AtomicU64::new(0),
            }),
        };
        host.spawn_context();
        host
    }

    /// Replaces any live context with a fresh one.
    pub fn spawn_context(&self) {
        spawn_context(&self.inner);
    }

    /// Destroys the live context. Pending requests are dropped unanswered.
    pub fn teardown(&self) {
        if let Some(live) = self.inner.lock_live().take() {
            lens_info!("Tearing down worker context #{}", live.generation);
            live.token.cancel();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock_live().is_some()
    }

    pub fn transport(&self) -> LocalTransport {
        LocalTransport {
            inner: self.inner.clone(),
        }
    }
}

impl HostInner {
    fn lock_live(&self) -> std::sync::MutexGuard<'_, Option<LiveContext>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_sender(&self) -> Option<mpsc::Sender<Job>> {
        self.lock_live().as_ref().map(|live| live.tx.clone())
    }
}

fn spawn_context(inner: &Arc<HostInner>) {
    let generation = inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
    let (tx, rx) = mpsc::channel(inner.settings.queue_capacity.max(1));
    let token = CancellationToken::new();
    let context = WorkerContext {
        generation,
        coordinator: Arc::new((inner.factory)()),
        relay: inner.relay.clone(),
        announced: Arc::new(AtomicBool::new(false)),
    };

    let previous = inner.lock_live().replace(LiveContext {
        generation,
        tx,
        token: token.clone(),
    });
    if let Some(previous) = previous {
        previous.token.cancel();
    }

    lens_info!("Worker context #{generation} started");
    let idle_timeout = inner.settings.idle_timeout;
    let host = Arc::downgrade(inner);
    tokio::spawn(async move {
        let idled = context.run(rx, token, idle_timeout).await;
        if idled {
            on_idle_exit(host, generation).await;
        }
    });
}

async fn on_idle_exit(host: Weak<HostInner>, generation: u64) {
    let Some(inner) = host.upgrade() else {
        return;
    };
    {
        let mut live = inner.lock_live();
        if live.as_ref().map(|l| l.generation) != Some(generation) {
            return;
        }
        *live = None;
    }
    lens_info!(
        "Worker context #{generation} stopped while idle; respawning in {:?}",
        inner.settings.respawn_delay
    );
    tokio::time::sleep(inner.settings.respawn_delay).await;
    if inner.lock_live().is_none() {
        spawn_context(&inner);
    }
}

struct WorkerContext {
    generation: u64,
    coordinator: Arc<ClassificationCoordinator>,
    relay: Arc<dyn LoaderRelay>,
    /// Whether the `modelLoaded` signal was sent by this context.
    announced: Arc<AtomicBool>,
}

impl WorkerContext {
    /// Serves jobs until cancelled or idle. Returns true on idle shutdown.
    async fn run(
        self,
        mut rx: mpsc::Receiver<Job>,
        token: CancellationToken,
        idle_timeout: Option<Duration>,
    ) -> bool {
        let in_flight = Arc::new(AtomicUsize::new(0));
        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return false,
                next = recv_or_idle(&mut rx, idle_timeout) => next,
            };
            let job = match next {
                Next::Job(job) => job,
                Next::Closed => return false,
                Next::Quiet if in_flight.load(Ordering::SeqCst) > 0 => {
                    lens_trace!("Context #{} quiet but busy; staying up", self.generation);
                    continue;
                }
                Next::Quiet => return !token.is_cancelled(),
            };

            let coordinator = self.coordinator.clone();
            let relay = self.relay.clone();
            let announced = self.announced.clone();
            let token = token.clone();
            let generation = self.generation;
            let busy = InFlight::enter(&in_flight);
            tokio::spawn(async move {
                let _busy = busy;
                tokio::select! {
                    _ = token.cancelled() => {
                        lens_debug!("Context #{generation} dropped request {}", job.envelope.request_id);
                    }
                    reply = handle_envelope(&coordinator, relay, announced, &job.envelope) => {
                        if job.reply_tx.send(reply).is_err() {
                            lens_trace!("Reply for request {} had no listener", job.envelope.request_id);
                        }
                    }
                }
            });
        }
    }
}

/// Counts a running job for as long as it is alive.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Next {
    Job(Job),
    /// Nothing arrived within the idle timeout.
    Quiet,
    Closed,
}

async fn recv_or_idle(rx: &mut mpsc::Receiver<Job>, idle_timeout: Option<Duration>) -> Next {
    let received = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, rx.recv()).await {
            Ok(received) => received,
            Err(_) => return Next::Quiet,
        },
        None => rx.recv().await,
    };
    received.map_or(Next::Closed, Next::Job)
}

async fn handle_envelope(
    coordinator: &ClassificationCoordinator,
    relay: Arc<dyn LoaderRelay>,
    announced: Arc<AtomicBool>,
    envelope: &Envelope,
) -> Reply {
    let message: WireMessage = match serde_json::from_value(envelope.body.clone()) {
        Ok(message) => message,
        Err(err) => {
            lens_warn!("Undecodable request {}: {err}", envelope.request_id);
            return envelope.reply(reply_body(ClassifyReply::Failed {
                error: format!("bad request: {err}"),
            }));
        }
    };

    match message {
        WireMessage::ClassifyPost { content } => {
            let progress_relay = relay.clone();
            let subscriber: ProgressSubscriber = Arc::new(move |event: &ProgressEvent| {
                progress_relay.relay(WireMessage::ShowLoader {
                    data: *event,
                    model_loaded: false,
                });
            });
            let reply = match coordinator.classify(&content, Some(subscriber)).await {
                Ok(outcome) => ClassifyReply::from_outcome(outcome),
                Err(err) => {
                    lens_warn!("Classification failed: {err}");
                    ClassifyReply::Failed {
                        error: err.to_string(),
                    }
                }
            };
            if coordinator.broker().is_ready() && !announced.swap(true, Ordering::SeqCst) {
                relay.relay(WireMessage::ShowLoader {
                    data: ProgressEvent::ready(),
                    model_loaded: true,
                });
            }
            envelope.reply(reply_body(reply))
        }
        // Loader messages flow the other way; acknowledge and ignore.
        WireMessage::ShowLoader { .. } => envelope.reply(Value::Null),
    }
}

fn reply_body(reply: ClassifyReply) -> Value {
    serde_json::to_value(reply).unwrap_or(Value::Null)
}

/// In-process transport into the host's live context.
#[derive(Clone)]
pub struct LocalTransport {
    inner: Arc<HostInner>,
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn deliver(&self, envelope: Envelope) -> Result<Reply, DeliveryError> {
        let sender = self
            .inner
            .current_sender()
            .ok_or(DeliveryError::ContextGone)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        match sender.try_send(Job { envelope, reply_tx }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                return Err(DeliveryError::Transient("worker queue full".to_string()));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(DeliveryError::ContextGone),
        }
        reply_rx.await.map_err(|_| {
            DeliveryError::Transient("worker dropped the request without replying".to_string())
        })
    }
}
