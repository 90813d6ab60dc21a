//! Store watcher: turns writes made by other processes (the CLI, a second
//! server) into invalidation hints.
//!
//! The store is polled by document mtime. The first scan only records a
//! baseline. Writes made by this server are noticed too; the duplicate hint
//! is harmless since hints only ask clients to reload.

use showrun_core::emergency::EmergencyBroadcast;
use showrun_core::events::{ClearHint, DomainEvent, ShowOrderHint};
use showrun_core::paths;
use showrun_core::store::{EmergencyStore, FileStore};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

type Fingerprint = (SystemTime, u64);

#[derive(Debug, Default)]
pub struct WatchState {
    seeded: bool,
    documents: HashMap<PathBuf, Fingerprint>,
    /// Active broadcast ids per event, as of the last scan.
    active: HashMap<String, BTreeSet<String>>,
}

fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

fn event_ids(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(paths::events_dir(root)) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    ids.sort();
    ids
}

impl WatchState {
    /// Record the document's fingerprint; true when it differs from the last scan.
    fn touched(&mut self, path: PathBuf) -> bool {
        let now = fingerprint(&path);
        let before = match now {
            Some(fp) => self.documents.insert(path, fp),
            None => self.documents.remove(&path),
        };
        before != now
    }
}

/// Compare the store against `state` and return the hints to publish.
pub fn scan(root: &Path, state: &mut WatchState) -> Vec<DomainEvent> {
    let store = FileStore::new(root);
    let mut events = Vec::new();

    for event_id in event_ids(root) {
        // lineup metadata: one hint per changed date
        let mut dated = false;
        if let Ok(entries) = std::fs::read_dir(paths::lineups_dir(root, &event_id)) {
            let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
            files.sort();
            for file in files {
                let date = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| paths::parse_date(s).ok());
                let Some(date) = date else { continue };
                if state.touched(file) {
                    dated = true;
                    events.push(DomainEvent::ShowOrderChanged {
                        event_id: event_id.clone(),
                        payload: ShowOrderHint {
                            date: Some(date),
                            revision: None,
                            cursor: None,
                        },
                    });
                }
            }
        }

        // artist or cue documents changed without a lineup commit
        let artists = state.touched(paths::artists_path(root, &event_id));
        let cues = state.touched(paths::cues_path(root, &event_id));
        if (artists || cues) && !dated {
            events.push(DomainEvent::ShowOrderChanged {
                event_id: event_id.clone(),
                payload: ShowOrderHint {
                    date: None,
                    revision: None,
                    cursor: None,
                },
            });
        }

        if state.touched(paths::emergency_path(root, &event_id)) {
            match store.load_broadcasts(&event_id) {
                Ok(all) => diff_broadcasts(&event_id, all, state, &mut events),
                Err(e) => warn!(event_id = %event_id, error = %e, "could not read broadcasts"),
            }
        }
    }

    if !state.seeded {
        state.seeded = true;
        events.clear();
    }
    events
}

fn diff_broadcasts(
    event_id: &str,
    all: Vec<EmergencyBroadcast>,
    state: &mut WatchState,
    events: &mut Vec<DomainEvent>,
) {
    let previous = state.active.remove(event_id).unwrap_or_default();
    let mut current = BTreeSet::new();
    for broadcast in all.into_iter().filter(|b| b.is_active) {
        current.insert(broadcast.id.clone());
        if !previous.contains(&broadcast.id) {
            events.push(DomainEvent::EmergencyAlert {
                event_id: event_id.to_string(),
                payload: broadcast,
            });
        }
    }
    for cleared in previous.difference(&current) {
        events.push(DomainEvent::EmergencyClear {
            event_id: event_id.to_string(),
            payload: ClearHint {
                broadcast_id: cleared.clone(),
            },
        });
    }
    state.active.insert(event_id.to_string(), current);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
