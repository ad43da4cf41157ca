//! Filesystem watcher & debouncer (§4.F): observes the writable rules
//! directory and triggers a reload once a burst of events settles.
//!
//! Read-only directories are never watched — they're read once at startup
//! (§4.F, and the Design Notes open question on that behavior is preserved
//! rather than guessed at).

use std::path::Path;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Owns the native watcher and the debounce task. Dropping it stops both.
pub struct RulesWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl RulesWatcher {
    /// Starts watching `dir` non-recursively, calling `on_reload` after
    /// `debounce` has elapsed with no further relevant events (§4.F: fixed
    /// 250 ms window, arriving events restart the timer).
    ///
    /// `on_reload` runs on this watcher's own task, one invocation at a
    /// time — the "single dedicated serial executor" of §4.F and §5.
    pub fn start<F>(dir: &Path, debounce: Duration, on_reload: F) -> notify::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<notify::Event>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if is_relevant(&event) => {
                    let _ = tx.send(event);
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "filesystem watcher error"),
            }
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let task = tokio::spawn(debounce_loop(rx, debounce, on_reload));

        Ok(Self { _watcher: watcher, task })
    }
}

impl Drop for RulesWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Events relevant to a reload: creation, modification (including renames
/// onto the watched directory, covering `moved-to`/`moved-from`), or
/// removal of a path ending in `.xml` — the exact event kinds §4.F names
/// (`create | moved-to | close-write | delete | moved-from`) collapse onto
/// this crate's three `notify::EventKind` buckets.
fn is_relevant(event: &notify::Event) -> bool {
    use notify::EventKind::{Create, Modify, Remove};
    let kind_matches = matches!(event.kind, Create(_) | Modify(_) | Remove(_));
    kind_matches && event.paths.iter().any(|p| p.extension().is_some_and(|e| e == "xml"))
}

async fn debounce_loop<F>(mut rx: mpsc::UnboundedReceiver<notify::Event>, debounce: Duration, on_reload: F)
where
    F: Fn() + Send + 'static,
{
    loop {
        if rx.recv().await.is_none() {
            return;
        }
        loop {
            tokio::select! {
                more = rx.recv() => {
                    if more.is_none() {
                        return;
                    }
                    // another event arrived inside the window: restart it.
                }
                _ = sleep(debounce) => break,
            }
        }
        debug!("debounce window elapsed, reloading rules");
        on_reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn burst_of_events_collapses_to_one_reload() {
        let dir = tempfile::tempdir().unwrap();
        let reloads = Arc::new(AtomicUsize::new(0));
        let counter = reloads.clone();

        let watcher = RulesWatcher::start(dir.path(), Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for i in 0..5 {
            std::fs::write(dir.path().join(format!("r{i}.xml")), "<rules/>").unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(reloads.load(Ordering::SeqCst), 1);
        drop(watcher);
    }
}
