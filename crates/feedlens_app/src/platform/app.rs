use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use feedlens_core::{update, AppState, AppViewModel, FailureKind, ItemPhase, Msg};
use feedlens_engine::{
    ChannelLoaderRelay, ClassificationCoordinator, CoordinatorFactory, FeedScanner,
    HttpModelLoader, HttpStopwordSource, JsonFileStore, KeyValueStore, LabelStore, ModelLoader,
    ResourceBroker, RetryChannel, StopwordSource, WorkerHost,
};
use feedlens_logging::{lens_info, lens_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::commands::UserCommand;
use super::config::AppConfig;
use super::effects::{relay_loader_messages, EffectRunner};
use super::render::{render, TerminalPainter};
use super::snapshots::feed_snapshots;

/// Runs the observer over `snapshots` until the user quits, or until every
/// item has settled once stdin is closed and nothing is being watched.
pub async fn run(config: AppConfig, snapshots: Vec<PathBuf>, watch: bool) -> Result<()> {
    let scanner = Arc::new(
        FeedScanner::new(&config.feed_selectors()).context("invalid feed selectors")?,
    );

    let (relay_tx, relay_rx) = mpsc::unbounded_channel();
    let host = WorkerHost::start(
        coordinator_factory(&config)?,
        Arc::new(ChannelLoaderRelay::new(relay_tx)),
        config.worker_settings(),
    );
    let channel = Arc::new(RetryChannel::new(
        Arc::new(host.transport()),
        config.channel_settings(),
    ));

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    tokio::spawn(relay_loader_messages(relay_rx, msg_tx.clone()));
    let mut feeding = tokio::spawn(feed_snapshots(
        snapshots,
        watch.then(|| config.watch_interval()),
        scanner,
        msg_tx.clone(),
    ));

    let mut observer = Observer::new(
        AppState::with_settings(config.observer_settings()),
        EffectRunner::new(channel, msg_tx),
        TerminalPainter::new(io::stdout()),
    );
    observer.paint()?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut feeding_done = false;

    loop {
        tokio::select! {
            Some(msg) = msg_rx.recv() => observer.dispatch(msg)?,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match UserCommand::parse(&line) {
                    Some(Ok(UserCommand::Quit)) => break,
                    Some(Ok(command)) => {
                        if let Some(msg) = command.into_msg() {
                            observer.dispatch(msg)?;
                        }
                    }
                    Some(Err(hint)) => eprintln!("{hint}"),
                    None => {}
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    lens_warn!("Stopped reading commands: {err}");
                    stdin_open = false;
                }
            },
            joined = &mut feeding, if !feeding_done => {
                if let Err(err) = joined {
                    lens_warn!("Snapshot feeding stopped: {err}");
                }
                feeding_done = true;
            }
        }

        if feeding_done && !stdin_open {
            while let Ok(msg) = msg_rx.try_recv() {
                observer.dispatch(msg)?;
            }
            if is_settled(&observer.view()) {
                break;
            }
        }
    }

    let view = observer.view();
    lens_info!(
        "Observer stopped: {} posts seen, {} classified",
        view.processed_count,
        view.classified_count
    );
    host.teardown();
    Ok(())
}

fn coordinator_factory(config: &AppConfig) -> Result<CoordinatorFactory> {
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.store.clone()));
    let labels = LabelStore::new(store);
    let stopwords: Arc<dyn StopwordSource> = Arc::new(
        HttpStopwordSource::new(&config.stopword_settings())
            .context("configuring the stopword client")?,
    );
    let loader: Arc<dyn ModelLoader> = Arc::new(HttpModelLoader::new(config.inference_settings()));
    let spec = config.model_spec();
    let settings = config.coordinator_settings();

    Ok(Arc::new(move || {
        let broker = Arc::new(ResourceBroker::new(loader.clone(), spec.clone()));
        ClassificationCoordinator::new(broker, labels.clone(), stopwords.clone(), settings.clone())
    }))
}

/// Nothing in flight and no retry scheduled.
fn is_settled(view: &AppViewModel) -> bool {
    view.pending_count == 0
        && !view
            .items
            .iter()
            .any(|row| row.phase == ItemPhase::Errored(FailureKind::ContextGone))
}

struct Observer<W: Write> {
    state: AppState,
    runner: EffectRunner,
    painter: TerminalPainter<W>,
}

impl<W: Write> Observer<W> {
    fn new(state: AppState, runner: EffectRunner, painter: TerminalPainter<W>) -> Self {
        Self {
            state,
            runner,
            painter,
        }
    }

    fn view(&self) -> AppViewModel {
        self.state.view()
    }

    fn paint(&mut self) -> io::Result<()> {
        let view = self.state.view();
        self.painter.apply(render(&view))
    }

    fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.enqueue(effects);
        if was_dirty {
            self.paint()?;
        }
        Ok(())
    }
}
