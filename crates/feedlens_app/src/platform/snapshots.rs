//! Feed snapshots: each saved page is one mutation batch for the observer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use feedlens_core::{DiscoveredItem, Msg};
use feedlens_engine::{decode_snapshot, FeedScanner};
use feedlens_logging::{lens_debug, lens_info, lens_warn};
use tokio::sync::mpsc;

pub async fn load_snapshot(path: &Path, scanner: &FeedScanner) -> Result<Vec<DiscoveredItem>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let decoded = decode_snapshot(&bytes, None);
    let items = scanner
        .scan(&decoded.html)
        .into_iter()
        .map(|item| DiscoveredItem {
            key: item.key,
            author: item.author,
            text: item.text,
        })
        .collect::<Vec<_>>();
    lens_info!(
        "Snapshot {} ({}): {} feed items",
        path.display(),
        decoded.encoding_label,
        items.len()
    );
    Ok(items)
}

/// Feeds the snapshots in order, then keeps rescanning the last one on change
/// when `watch` is set. Resolves once feeding is over.
pub async fn feed_snapshots(
    paths: Vec<PathBuf>,
    watch: Option<Duration>,
    scanner: Arc<FeedScanner>,
    msg_tx: mpsc::UnboundedSender<Msg>,
) {
    if msg_tx.send(Msg::PageLoaded).is_err() {
        return;
    }
    for path in &paths {
        if !send_batch(path, &scanner, &msg_tx).await {
            return;
        }
    }

    let (Some(interval), Some(path)) = (watch, paths.last()) else {
        return;
    };
    lens_info!("Watching {} for changes", path.display());
    let mut last_seen = modified_at(path).await;
    loop {
        tokio::time::sleep(interval).await;
        let current = modified_at(path).await;
        if current.is_none() || current == last_seen {
            continue;
        }
        last_seen = current;
        lens_debug!("{} changed, rescanning", path.display());
        if !send_batch(path, &scanner, &msg_tx).await {
            return;
        }
    }
}

/// Returns false once the observer is gone.
async fn send_batch(
    path: &Path,
    scanner: &FeedScanner,
    msg_tx: &mpsc::UnboundedSender<Msg>,
) -> bool {
    match load_snapshot(path, scanner).await {
        Ok(items) => msg_tx.send(Msg::ItemsDiscovered(items)).is_ok(),
        Err(err) => {
            lens_warn!("Skipping snapshot: {err:#}");
            !msg_tx.is_closed()
        }
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
