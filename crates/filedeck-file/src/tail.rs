//! Change log tailing for realtime subscriptions.
//!
//! The change log is append-only JSON lines. A subscription remembers its
//! byte offset and reads whatever was appended since, woken by a filesystem
//! watcher and, as a fallback for watchers that miss events, a fixed poll.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use filedeck_core::error::{SubscriptionError, TransportError};
use filedeck_core::{ChangeSender, RawChange, Result, Topic};

/// Fallback poll interval.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Reads complete lines appended after `*position` and advances it.
///
/// A trailing partial line is left for the next read.
pub(crate) fn read_changes(path: &Path, position: &mut u64) -> Result<Vec<Result<RawChange>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TransportError::from(e).into()),
    };

    let len = file.metadata().map_err(TransportError::from)?.len();
    if len < *position {
        warn!(path = %path.display(), "Change log shrank, starting over");
        *position = 0;
    }

    file.seek(SeekFrom::Start(*position))
        .map_err(TransportError::from)?;
    let mut appended = Vec::new();
    file.read_to_end(&mut appended)
        .map_err(TransportError::from)?;

    let Some(end) = appended.iter().rposition(|&b| b == b'\n') else {
        return Ok(Vec::new());
    };
    *position += end as u64 + 1;

    let changes = appended[..end]
        .split(|&b| b == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(|line| {
            serde_json::from_slice::<RawChange>(line).map_err(|e| {
                SubscriptionError::MalformedEvent {
                    event: "change log line".to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
        })
        .collect();

    Ok(changes)
}

/// Watches the change log's directory, sending a wake-up per event.
fn watch(path: &Path) -> Option<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let dir = path.parent()?;
    let (tx, rx) = mpsc::unbounded_channel();
    let file_name = path.file_name()?.to_os_string();

    let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(
            event.kind,
            notify::EventKind::Modify(_) | notify::EventKind::Create(_)
        ) {
            return;
        }
        if event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
        {
            let _ = tx.send(());
        }
    });

    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!(error = %e, "File watcher unavailable, polling only");
            return None;
        }
    };
    if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
        warn!(dir = %dir.display(), error = %e, "Failed to watch directory, polling only");
        return None;
    }

    Some((watcher, rx))
}

/// Producer for one subscription: forwards changes matching `topic` that
/// were logged after `start`.
pub(crate) async fn tail(path: PathBuf, start: u64, topic: Topic, tx: ChangeSender) {
    let (_watcher, mut wakeups) = match watch(&path) {
        Some((watcher, rx)) => (Some(watcher), Some(rx)),
        None => (None, None),
    };

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    let mut position = start;

    debug!(%topic, position, "Tailing change log");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            woke = next_wakeup(&mut wakeups) => {
                if !woke {
                    wakeups = None;
                }
            }
        }

        let changes = match read_changes(&path, &mut position) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(%topic, error = %e, "Failed to read change log");
                if tx.send(Err(e)).is_err() {
                    return;
                }
                continue;
            }
        };

        for change in changes {
            if let Ok(change) = &change {
                let collection = change.collection().unwrap_or_default();
                if !topic.matches(collection, change.id()) {
                    trace!(%topic, id = %change.id(), "Change for another topic");
                    continue;
                }
            }
            if tx.send(change).is_err() {
                debug!(%topic, "Subscriber gone");
                return;
            }
        }

        if tx.is_closed() {
            return;
        }
    }
}

/// Resolves on the next watcher event; `false` once the watcher is gone.
/// Never resolves without a watcher.
async fn next_wakeup(wakeups: &mut Option<mpsc::UnboundedReceiver<()>>) -> bool {
    match wakeups {
        Some(rx) => rx.recv().await.is_some(),
        None => std::future::pending().await,
    }
}
