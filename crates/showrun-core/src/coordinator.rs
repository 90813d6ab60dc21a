//! Single-writer command surface over the stores.
//!
//! Every show-order command runs inside the critical section for its
//! `(event_id, date)` key: load, mutate through [`Lineup`], commit against the
//! loaded revision, then publish the invalidation hint. Reads take no lock.

use crate::emergency::{self, Deactivated, EmergencyBroadcast, EmergencyCode};
use crate::error::{Result, ShowError};
use crate::events::{ClearHint, DomainEvent, EventSink, ShowOrderHint};
use crate::paths;
use crate::show_order::{Cursor, Lineup, Outcome};
use crate::store::{
    ArtistSlotRecord, CuePatch, CueRecord, EmergencyStore, EventRecord, FileStore, ItemStore,
    SlotPatch,
};
use crate::types::{CueType, ItemStatus, PerformanceItem};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Something to schedule onto a lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewItem {
    /// An artist already registered for the event.
    Artist {
        artist_id: String,
        #[serde(default)]
        order: Option<u32>,
    },
    /// A new cue record.
    Cue {
        cue_type: CueType,
        title: String,
        #[serde(default)]
        planned_duration: u32,
        #[serde(default)]
        notes: String,
        #[serde(default)]
        order: Option<u32>,
    },
}

/// Result of a show-order command.
#[derive(Debug, Clone, Serialize)]
pub struct LineupUpdate {
    /// False when the command was a replay of one already applied.
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub lineup: Lineup,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Lineup(String, NaiveDate),
    /// Read-modify-write of an event's shared documents (artists, cues).
    Documents(String),
    Emergency(String),
}

pub struct Coordinator {
    items: Arc<dyn ItemStore>,
    emergencies: Arc<dyn EmergencyStore>,
    sink: Arc<dyn EventSink>,
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl Coordinator {
    pub fn new(
        items: Arc<dyn ItemStore>,
        emergencies: Arc<dyn EmergencyStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            items,
            emergencies,
            sink,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Coordinator over a [`FileStore`] rooted at `root`.
    pub fn with_file_store(root: impl Into<PathBuf>, sink: Arc<dyn EventSink>) -> Self {
        let store = Arc::new(FileStore::new(root));
        Self::new(store.clone(), store, sink)
    }

    pub fn item_store(&self) -> &dyn ItemStore {
        self.items.as_ref()
    }

    fn lock_for(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(key).or_default().clone()
    }

    /// Run `f` while holding the lock for `key`. A poisoned lock is recovered:
    /// the guarded state lives in the store, not behind the mutex.
    fn exclusive<T>(&self, key: LockKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    // -----------------------------------------------------------------------
    // Events and artists
    // -----------------------------------------------------------------------

    pub fn create_event(&self, event: &EventRecord) -> Result<()> {
        paths::validate_id(&event.id)?;
        self.items.create_event(event)
    }

    pub fn list_events(&self) -> Result<Vec<EventRecord>> {
        self.items.list_events()
    }

    pub fn register_artist(&self, event_id: &str, record: &ArtistSlotRecord) -> Result<()> {
        paths::validate_id(&record.artist_id)?;
        self.exclusive(LockKey::Documents(event_id.to_string()), || {
            self.items.register_artist(event_id, record)
        })
    }

    pub fn list_artists(&self, event_id: &str) -> Result<Vec<ArtistSlotRecord>> {
        self.items.get_artist_slots(event_id)
    }

    /// Patch an artist's scheduling metadata (durations, notes, ...). Never
    /// touches order or status. Scheduled artists produce a show-order hint.
    pub fn update_artist(
        &self,
        event_id: &str,
        artist_id: &str,
        patch: &SlotPatch,
    ) -> Result<ArtistSlotRecord> {
        if patch.is_empty() {
            return Err(ShowError::InvalidInput("nothing to update".to_string()));
        }
        let record = self.exclusive(LockKey::Documents(event_id.to_string()), || {
            self.items.patch_artist_slot(event_id, artist_id, patch)
        })?;
        if let Some(date) = record.performance_date {
            self.sink.publish(DomainEvent::ShowOrderChanged {
                event_id: event_id.to_string(),
                payload: ShowOrderHint {
                    date: Some(date),
                    revision: None,
                    cursor: None,
                },
            });
        }
        Ok(record)
    }

    /// Record how long an artist actually played, in minutes.
    pub fn record_duration(
        &self,
        event_id: &str,
        artist_id: &str,
        minutes: u32,
    ) -> Result<ArtistSlotRecord> {
        let patch = SlotPatch {
            actual_duration: Some(minutes),
            ..SlotPatch::default()
        };
        self.update_artist(event_id, artist_id, &patch)
    }

    /// Patch a cue's title, type, duration or notes. Placement stays with the
    /// lineup commands.
    pub fn update_cue(&self, event_id: &str, cue_id: &str, patch: &CuePatch) -> Result<CueRecord> {
        if *patch == CuePatch::default() {
            return Err(ShowError::InvalidInput("nothing to update".to_string()));
        }
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ShowError::InvalidInput(
                "cue title must not be empty".to_string(),
            ));
        }
        let record = self.exclusive(LockKey::Documents(event_id.to_string()), || {
            self.items.patch_cue(event_id, cue_id, patch)
        })?;
        self.sink.publish(DomainEvent::ShowOrderChanged {
            event_id: event_id.to_string(),
            payload: ShowOrderHint {
                date: Some(record.performance_date),
                revision: None,
                cursor: None,
            },
        });
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Show order
    // -----------------------------------------------------------------------

    /// Current lineup. Unlocked; may trail an in-flight command.
    pub fn load(&self, event_id: &str, date: NaiveDate) -> Result<Lineup> {
        Lineup::load(self.items.as_ref(), event_id, date)
    }

    pub fn advance(
        &self,
        event_id: &str,
        date: NaiveDate,
        from: Option<Cursor>,
    ) -> Result<LineupUpdate> {
        self.mutate(event_id, date, |lineup| lineup.advance(from))
    }

    pub fn retreat(
        &self,
        event_id: &str,
        date: NaiveDate,
        from: Option<Cursor>,
    ) -> Result<LineupUpdate> {
        self.mutate(event_id, date, |lineup| lineup.retreat(from))
    }

    /// Manual status override. Without `date` the item's scheduled date is
    /// looked up.
    pub fn set_status(
        &self,
        event_id: &str,
        item_id: &str,
        date: Option<NaiveDate>,
        status: ItemStatus,
    ) -> Result<LineupUpdate> {
        let date = match date {
            Some(date) => date,
            None => self.locate(event_id, item_id)?,
        };
        self.mutate(event_id, date, |lineup| lineup.set_status(item_id, status))
    }

    pub fn insert(&self, event_id: &str, date: NaiveDate, item: NewItem) -> Result<LineupUpdate> {
        let mut inserted = None;
        let mut update = self.mutate(event_id, date, |lineup| {
            let order = |order: Option<u32>| order.unwrap_or(lineup.len() as u32 + 1);
            let item = match &item {
                NewItem::Artist {
                    artist_id,
                    order: requested,
                } => self.schedulable_artist(event_id, date, artist_id, order(*requested))?,
                NewItem::Cue {
                    cue_type,
                    title,
                    planned_duration,
                    notes,
                    order: requested,
                } => {
                    let title = title.trim();
                    if title.is_empty() {
                        return Err(ShowError::InvalidInput(
                            "cue title must not be empty".to_string(),
                        ));
                    }
                    let record = CueRecord {
                        id: new_cue_id(),
                        performance_date: date,
                        cue_type: *cue_type,
                        title: title.to_string(),
                        planned_duration: *planned_duration,
                        notes: notes.clone(),
                        order: Some(order(*requested)),
                        status: ItemStatus::NotStarted,
                    };
                    PerformanceItem::from_cue(event_id, record)
                }
            };
            inserted = Some(item.id.clone());
            lineup.insert(item)?;
            Ok(Outcome::Applied)
        })?;
        update.item_id = inserted;
        Ok(update)
    }

    pub fn remove(&self, event_id: &str, date: NaiveDate, item_id: &str) -> Result<LineupUpdate> {
        self.mutate(event_id, date, |lineup| {
            lineup.remove(item_id)?;
            Ok(Outcome::Applied)
        })
    }

    /// Move an item to a 0-based position in the lineup.
    pub fn move_item(
        &self,
        event_id: &str,
        date: NaiveDate,
        item_id: &str,
        to_index: usize,
    ) -> Result<LineupUpdate> {
        self.mutate(event_id, date, |lineup| lineup.move_item(item_id, to_index))
    }

    fn mutate(
        &self,
        event_id: &str,
        date: NaiveDate,
        op: impl FnOnce(&mut Lineup) -> Result<Outcome>,
    ) -> Result<LineupUpdate> {
        paths::validate_id(event_id)?;
        self.exclusive(LockKey::Lineup(event_id.to_string(), date), || {
            let mut lineup = self.load(event_id, date)?;
            let outcome = op(&mut lineup)?;
            if outcome == Outcome::Unchanged {
                return Ok(LineupUpdate {
                    changed: false,
                    item_id: None,
                    lineup,
                });
            }

            let changes = lineup.take_changes();
            let stage = lineup.stage();
            let revision = self.exclusive(LockKey::Documents(event_id.to_string()), || {
                self.items
                    .commit_lineup(event_id, date, lineup.revision(), &stage, &changes)
            })?;
            lineup.set_revision(revision);

            // Published under the key's lock so hints leave in commit order.
            self.sink.publish(DomainEvent::ShowOrderChanged {
                event_id: event_id.to_string(),
                payload: ShowOrderHint {
                    date: Some(date),
                    revision: Some(revision),
                    cursor: Some(lineup.cursor()),
                },
            });
            Ok(LineupUpdate {
                changed: true,
                item_id: None,
                lineup,
            })
        })
    }

    fn schedulable_artist(
        &self,
        event_id: &str,
        date: NaiveDate,
        artist_id: &str,
        order: u32,
    ) -> Result<PerformanceItem> {
        let mut record = self
            .items
            .get_artist_slots(event_id)?
            .into_iter()
            .find(|a| a.artist_id == artist_id)
            .ok_or_else(|| ShowError::ArtistNotFound(artist_id.to_string()))?;
        match record.performance_date {
            Some(scheduled) if scheduled == date => {
                return Err(ShowError::ItemExists(artist_id.to_string()));
            }
            Some(scheduled) => {
                return Err(ShowError::Conflict(format!(
                    "artist '{artist_id}' is already scheduled on {scheduled}; remove it there first"
                )));
            }
            None => {}
        }
        record.order = Some(order);
        record.status = ItemStatus::NotStarted;
        Ok(PerformanceItem::from_slot(event_id, date, record))
    }

    /// Date an item is scheduled on.
    fn locate(&self, event_id: &str, item_id: &str) -> Result<NaiveDate> {
        if let Some(artist) = self
            .items
            .get_artist_slots(event_id)?
            .into_iter()
            .find(|a| a.artist_id == item_id)
        {
            return artist
                .performance_date
                .ok_or_else(|| ShowError::ItemNotFound(item_id.to_string()));
        }
        self.items
            .list_cues(event_id)?
            .into_iter()
            .find(|c| c.id == item_id)
            .map(|c| c.performance_date)
            .ok_or_else(|| ShowError::ItemNotFound(item_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Emergency broadcasts
    // -----------------------------------------------------------------------

    pub fn create_broadcast(
        &self,
        event_id: &str,
        message: &str,
        code: EmergencyCode,
    ) -> Result<EmergencyBroadcast> {
        self.items.get_event(event_id)?;
        self.exclusive(LockKey::Emergency(event_id.to_string()), || {
            let broadcast = emergency::create(self.emergencies.as_ref(), event_id, message, code)?;
            self.sink.publish(DomainEvent::EmergencyAlert {
                event_id: event_id.to_string(),
                payload: broadcast.clone(),
            });
            Ok(broadcast)
        })
    }

    /// Clear a broadcast. Repeats succeed without publishing again.
    pub fn deactivate_broadcast(&self, event_id: &str, broadcast_id: &str) -> Result<Deactivated> {
        self.items.get_event(event_id)?;
        self.exclusive(LockKey::Emergency(event_id.to_string()), || {
            let result = emergency::deactivate(self.emergencies.as_ref(), event_id, broadcast_id)?;
            if result.was_active {
                self.sink.publish(DomainEvent::EmergencyClear {
                    event_id: event_id.to_string(),
                    payload: ClearHint {
                        broadcast_id: broadcast_id.to_string(),
                    },
                });
            }
            Ok(result)
        })
    }

    pub fn list_broadcasts(&self, event_id: &str) -> Result<Vec<EmergencyBroadcast>> {
        self.items.get_event(event_id)?;
        emergency::list(self.emergencies.as_ref(), event_id)
    }

    pub fn broadcast_history(&self, event_id: &str) -> Result<Vec<EmergencyBroadcast>> {
        self.items.get_event(event_id)?;
        emergency::history(self.emergencies.as_ref(), event_id)
    }

    pub fn get_broadcast(&self, event_id: &str, broadcast_id: &str) -> Result<EmergencyBroadcast> {
        self.items.get_event(event_id)?;
        emergency::get(self.emergencies.as_ref(), event_id, broadcast_id)
    }
}

fn new_cue_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("cue-{}", &raw[..8])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NullSink, Topic};
    use crate::io;
    use std::thread;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<DomainEvent>>);

    impl EventSink for Recorder {
        fn publish(&self, event: DomainEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn kinds(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().iter().map(|e| e.kind()).collect()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()
    }

    fn setup() -> (TempDir, Arc<Recorder>, Coordinator) {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(Recorder::default());
        let coord = Coordinator::with_file_store(dir.path(), recorder.clone());
        coord
            .create_event(&EventRecord::new("fest", "Summer Fest", vec![date()]))
            .unwrap();
        for id in ["a", "b"] {
            coord
                .register_artist("fest", &ArtistSlotRecord::new(id, id.to_uppercase()))
                .unwrap();
        }
        (dir, recorder, coord)
    }

    fn artist(id: &str) -> NewItem {
        NewItem::Artist {
            artist_id: id.into(),
            order: None,
        }
    }

    fn mc_break() -> NewItem {
        NewItem::Cue {
            cue_type: CueType::McBreak,
            title: "MC break".into(),
            planned_duration: 5,
            notes: String::new(),
            order: None,
        }
    }

    /// [a, cue, b]
    fn scheduled() -> (TempDir, Arc<Recorder>, Coordinator, String) {
        let (dir, rec, coord) = setup();
        coord.insert("fest", date(), artist("a")).unwrap();
        let cue_id = coord
            .insert("fest", date(), mc_break())
            .unwrap()
            .item_id
            .unwrap();
        coord.insert("fest", date(), artist("b")).unwrap();
        (dir, rec, coord, cue_id)
    }

    #[test]
    fn advance_commits_and_publishes() {
        let (_dir, rec, coord, cue_id) = scheduled();
        let update = coord.advance("fest", date(), None).unwrap();
        assert!(update.changed);

        let reloaded = coord.load("fest", date()).unwrap();
        assert_eq!(reloaded.cursor(), Cursor::OnStage(0));
        assert_eq!(reloaded.revision(), update.lineup.revision());
        assert_eq!(
            reloaded.get(&cue_id).unwrap().status,
            ItemStatus::NextOnStage
        );
        assert_eq!(rec.kinds().last(), Some(&"show-order-changed"));
    }

    #[test]
    fn replayed_advance_does_not_commit_or_publish() {
        let (_dir, rec, coord, _) = scheduled();
        let first = coord.advance("fest", date(), Some(Cursor::PreShow)).unwrap();
        let published = rec.kinds().len();

        let replay = coord.advance("fest", date(), Some(Cursor::PreShow)).unwrap();
        assert!(!replay.changed);
        assert_eq!(replay.lineup.revision(), first.lineup.revision());
        assert_eq!(rec.kinds().len(), published);
    }

    #[test]
    fn partial_commit_keeps_previous_stage() {
        let (dir, _rec, coord, cue_id) = scheduled();
        coord.advance("fest", date(), None).unwrap();
        let before = coord.load("fest", date()).unwrap();

        // artists.yaml lands, cues.yaml fails, the lineup document is never written.
        let store = Arc::new(
            FileStore::new(dir.path()).failing_writes_to(paths::cues_path(dir.path(), "fest")),
        );
        let faulty = Coordinator::new(store.clone(), store, Arc::new(NullSink));
        assert!(faulty.advance("fest", date(), Some(Cursor::OnStage(0))).is_err());

        let after = coord.load("fest", date()).unwrap();
        assert_eq!(after.cursor(), Cursor::OnStage(0));
        assert_eq!(after.revision(), before.revision());
        let statuses = |l: &Lineup| l.items().iter().map(|i| i.status).collect::<Vec<_>>();
        assert_eq!(statuses(&after), statuses(&before));
        assert_eq!(after.get(&cue_id).unwrap().status, ItemStatus::NextOnStage);

        // The show continues from where it was.
        let update = coord.advance("fest", date(), Some(Cursor::OnStage(0))).unwrap();
        assert_eq!(update.lineup.cursor(), Cursor::OnStage(1));
    }

    #[test]
    fn stored_stage_wins_over_record_statuses() {
        let (dir, _rec, coord, _) = scheduled();
        coord.advance("fest", date(), None).unwrap();

        let path = paths::artists_path(dir.path(), "fest");
        let mut records: Vec<ArtistSlotRecord> = io::read_yaml_list(&path).unwrap();
        for rec in &mut records {
            rec.status = ItemStatus::NotStarted;
        }
        io::write_yaml(&path, &records).unwrap();

        let lineup = coord.load("fest", date()).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(0));
        assert_eq!(lineup.get("a").unwrap().status, ItemStatus::CurrentlyOnStage);
    }

    #[test]
    fn failed_transition_leaves_store_untouched() {
        let (_dir, rec, coord, _) = scheduled();
        let before = coord.load("fest", date()).unwrap();
        let published = rec.kinds().len();
        let err = coord.retreat("fest", date(), None).unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        assert_eq!(coord.load("fest", date()).unwrap(), before);
        assert_eq!(rec.kinds().len(), published);
    }

    #[test]
    fn unknown_event_is_not_found() {
        let (_dir, _rec, coord) = setup();
        assert!(matches!(
            coord.advance("nope", date(), None),
            Err(ShowError::EventNotFound(_))
        ));
        assert!(matches!(
            coord.load("nope", date()),
            Err(ShowError::EventNotFound(_))
        ));
    }

    #[test]
    fn insert_unregistered_artist_is_not_found() {
        let (_dir, _rec, coord) = setup();
        assert!(matches!(
            coord.insert("fest", date(), artist("ghost")),
            Err(ShowError::ArtistNotFound(_))
        ));
    }

    #[test]
    fn insert_artist_twice_is_rejected() {
        let (_dir, _rec, coord, _) = scheduled();
        assert!(matches!(
            coord.insert("fest", date(), artist("a")),
            Err(ShowError::ItemExists(_))
        ));
        let other_day = NaiveDate::from_ymd_opt(2026, 7, 5).unwrap();
        assert!(matches!(
            coord.insert("fest", other_day, artist("a")),
            Err(ShowError::Conflict(_))
        ));
    }

    #[test]
    fn remove_unschedules_artist_and_deletes_cue() {
        let (_dir, _rec, coord, cue_id) = scheduled();
        coord.remove("fest", date(), "a").unwrap();
        coord.remove("fest", date(), &cue_id).unwrap();

        let lineup = coord.load("fest", date()).unwrap();
        assert_eq!(lineup.len(), 1);
        assert_eq!(lineup.items()[0].order, 1);

        let a = coord
            .list_artists("fest")
            .unwrap()
            .into_iter()
            .find(|r| r.artist_id == "a")
            .unwrap();
        assert_eq!(a.performance_date, None);
        assert!(coord.item_store().list_cues("fest").unwrap().is_empty());

        // unscheduled artists can be scheduled again
        coord.insert("fest", date(), artist("a")).unwrap();
    }

    #[test]
    fn set_status_locates_date() {
        let (_dir, _rec, coord, _) = scheduled();
        let update = coord
            .set_status("fest", "b", None, ItemStatus::CurrentlyOnStage)
            .unwrap();
        assert_eq!(update.lineup.cursor(), Cursor::OnStage(2));

        assert!(matches!(
            coord.set_status("fest", "ghost", None, ItemStatus::Completed),
            Err(ShowError::ItemNotFound(_))
        ));
    }

    #[test]
    fn record_duration_keeps_status() {
        let (_dir, rec, coord, _) = scheduled();
        coord.advance("fest", date(), None).unwrap();
        let record = coord.record_duration("fest", "a", 42).unwrap();
        assert_eq!(record.actual_duration, Some(42));
        assert_eq!(record.status, ItemStatus::CurrentlyOnStage);
        assert_eq!(rec.kinds().last(), Some(&"show-order-changed"));
    }

    #[test]
    fn update_cue_renames_without_moving() {
        let (_dir, rec, coord, cue_id) = scheduled();
        let patch = CuePatch {
            title: Some("Sponsor video".into()),
            cue_type: Some(CueType::VideoBreak),
            ..CuePatch::default()
        };
        let record = coord.update_cue("fest", &cue_id, &patch).unwrap();
        assert_eq!(record.title, "Sponsor video");
        assert_eq!(record.order, Some(2));
        assert_eq!(rec.kinds().last(), Some(&"show-order-changed"));

        let lineup = coord.load("fest", date()).unwrap();
        assert_eq!(lineup.position(&cue_id), Some(1));
        assert_eq!(lineup.get(&cue_id).unwrap().label(), "Sponsor video");

        let blank = CuePatch {
            title: Some("  ".into()),
            ..CuePatch::default()
        };
        assert!(matches!(
            coord.update_cue("fest", &cue_id, &blank),
            Err(ShowError::InvalidInput(_))
        ));
        assert!(matches!(
            coord.update_cue("fest", "cue-missing", &patch),
            Err(ShowError::ItemNotFound(_))
        ));
    }

    #[test]
    fn concurrent_advances_leave_one_item_on_stage() {
        let (_dir, _rec, coord, _) = scheduled();
        let coord = Arc::new(coord);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coord = coord.clone();
                thread::spawn(move || coord.advance("fest", date(), Some(Cursor::PreShow)))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let applied = results
            .iter()
            .filter(|r| matches!(r, Ok(update) if update.changed))
            .count();
        assert_eq!(applied, 1);
        assert!(results.iter().all(|r| r.is_ok()));

        let lineup = coord.load("fest", date()).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(0));
        let on_stage = lineup
            .items()
            .iter()
            .filter(|i| i.status == ItemStatus::CurrentlyOnStage)
            .count();
        assert_eq!(on_stage, 1);
    }

    #[test]
    fn broadcast_lifecycle_publishes_alert_then_single_clear() {
        let (_dir, rec, coord) = setup();
        let b = coord
            .create_broadcast("fest", "Evacuate", EmergencyCode::Red)
            .unwrap();
        assert_eq!(coord.list_broadcasts("fest").unwrap().len(), 1);

        assert!(coord.deactivate_broadcast("fest", &b.id).unwrap().was_active);
        assert!(!coord.deactivate_broadcast("fest", &b.id).unwrap().was_active);
        assert!(coord.list_broadcasts("fest").unwrap().is_empty());
        assert_eq!(coord.broadcast_history("fest").unwrap().len(), 1);

        assert_eq!(rec.kinds(), vec!["emergency-alert", "emergency-clear"]);
        let events = rec.0.lock().unwrap();
        assert!(events.iter().all(|e| e.topic() == Topic::Emergency));
    }

    #[test]
    fn broadcast_for_unknown_event_is_not_found() {
        let (_dir, _rec, coord) = setup();
        assert!(matches!(
            coord.create_broadcast("nope", "Evacuate", EmergencyCode::Red),
            Err(ShowError::EventNotFound(_))
        ));
    }
}
