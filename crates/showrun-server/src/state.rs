use crate::broadcaster::Broadcaster;
use crate::watcher::{self, WatchState};
use showrun_core::config::{Config, WarnLevel};
use showrun_core::coordinator::Coordinator;
use showrun_core::events::EventSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub coordinator: Arc<Coordinator>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        let config = Config::load_or_default(&root).unwrap_or_else(|e| {
            warn!(error = %e, "unreadable config; using defaults");
            Config::default()
        });
        for w in config.validate() {
            match w.level {
                WarnLevel::Error => error!("config: {}", w.message),
                WarnLevel::Warning => warn!("config: {}", w.message),
            }
        }

        let broadcaster = Arc::new(Broadcaster::new(config.sync.session_buffer));
        let coordinator = Arc::new(Coordinator::with_file_store(
            root.clone(),
            broadcaster.clone(),
        ));
        let state = Self {
            root,
            config: Arc::new(config),
            coordinator,
            broadcaster,
        };

        // Background tasks need a runtime; sync unit tests construct state without one.
        if tokio::runtime::Handle::try_current().is_ok() {
            state.spawn_watcher();
            state.spawn_pruner();
        }

        state
    }

    /// Publish hints for store writes made by other processes.
    fn spawn_watcher(&self) {
        let root = self.root.clone();
        let broadcaster = self.broadcaster.clone();
        let interval = self.config.sync.watch_interval();
        tokio::spawn(async move {
            let mut watch = WatchState::default();
            loop {
                tokio::time::sleep(interval).await;
                let scan_root = root.clone();
                let scanned = tokio::task::spawn_blocking(move || {
                    let events = watcher::scan(&scan_root, &mut watch);
                    (watch, events)
                })
                .await;
                match scanned {
                    Ok((next, events)) => {
                        watch = next;
                        for event in events {
                            broadcaster.publish(event);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "store scan failed; reseeding");
                        watch = WatchState::default();
                    }
                }
            }
        });
    }

    /// Reclaim sessions marked stale by failed deliveries.
    fn spawn_pruner(&self) {
        let broadcaster = self.broadcaster.clone();
        let interval = self.config.sync.prune_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pruned = broadcaster.prune();
                if pruned > 0 {
                    debug!(pruned, "pruner pass");
                }
            }
        });
    }
}
