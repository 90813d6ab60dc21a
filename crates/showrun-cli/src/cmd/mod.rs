pub mod artist;
pub mod broadcast;
pub mod config;
pub mod event;
pub mod init;
pub mod order;
pub mod serve;
pub mod watch;

use showrun_core::config::Config;
use showrun_core::coordinator::Coordinator;
use showrun_core::events::NullSink;
use std::path::Path;
use std::sync::Arc;

/// Local coordinator for one-shot commands. A running server notices the
/// writes through its store watcher and notifies dashboards.
pub fn coordinator(root: &Path) -> anyhow::Result<Coordinator> {
    Config::load(root).map_err(|e| anyhow::anyhow!("{e} (run `showrun init` first)"))?;
    Ok(Coordinator::with_file_store(root, Arc::new(NullSink)))
}
