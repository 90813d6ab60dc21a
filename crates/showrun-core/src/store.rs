//! Item store adapter: the read/write contract to durable storage.
//!
//! Layout (one document per collection):
//!   .showrun/events/<event>/event.yaml           event record
//!   .showrun/events/<event>/artists.yaml         registered artist slots
//!   .showrun/events/<event>/cues.yaml            cues for every date
//!   .showrun/events/<event>/lineups/<date>.yaml  lineup revision
//!   .showrun/events/<event>/emergency.yaml       emergency broadcasts

use crate::emergency::EmergencyBroadcast;
use crate::error::{Result, ShowError};
use crate::io;
use crate::paths;
use crate::types::{CueType, ItemRef, ItemStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            dates,
            created_at: Utc::now(),
        }
    }
}

/// An artist registered for an event. Scheduling fields are set only when the
/// artist is placed in a lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSlotRecord {
    pub artist_id: String,
    pub display_name: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub planned_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,
    #[serde(default)]
    pub rehearsal_completed: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl ArtistSlotRecord {
    pub fn new(artist_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            artist_id: artist_id.into(),
            display_name: display_name.into(),
            style: String::new(),
            planned_duration: 0,
            actual_duration: None,
            rehearsal_completed: false,
            notes: String::new(),
            performance_date: None,
            order: None,
            status: ItemStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueRecord {
    pub id: String,
    pub performance_date: NaiveDate,
    pub cue_type: CueType,
    pub title: String,
    #[serde(default)]
    pub planned_duration: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub status: ItemStatus,
}

/// Where the show stands on a date. Written last in every lineup commit, so
/// it is the commit point: statuses on artist and cue records are a
/// projection of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMark {
    /// Id of the item on stage; `None` before the show.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_stage: Option<String>,
    /// Index of the on-stage item, used when the id no longer resolves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineupMeta {
    pub revision: u64,
    /// Absent until the first commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Metadata an external editor may change on an artist slot. Status and
/// placement are owned by the show-order state machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotPatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub planned_duration: Option<u32>,
    #[serde(default)]
    pub actual_duration: Option<u32>,
    #[serde(default)]
    pub rehearsal_completed: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SlotPatch {
    pub fn is_empty(&self) -> bool {
        *self == SlotPatch::default()
    }

    fn apply(&self, record: &mut ArtistSlotRecord) {
        if let Some(v) = &self.display_name {
            record.display_name = v.clone();
        }
        if let Some(v) = &self.style {
            record.style = v.clone();
        }
        if let Some(v) = self.planned_duration {
            record.planned_duration = v;
        }
        if let Some(v) = self.actual_duration {
            record.actual_duration = Some(v);
        }
        if let Some(v) = self.rehearsal_completed {
            record.rehearsal_completed = v;
        }
        if let Some(v) = &self.notes {
            record.notes = v.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CuePatch {
    #[serde(default)]
    pub cue_type: Option<CueType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub planned_duration: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CuePatch {
    fn apply(&self, record: &mut CueRecord) {
        if let Some(v) = self.cue_type {
            record.cue_type = v;
        }
        if let Some(v) = &self.title {
            record.title = v.clone();
        }
        if let Some(v) = self.planned_duration {
            record.planned_duration = v;
        }
        if let Some(v) = &self.notes {
            record.notes = v.clone();
        }
    }
}

/// One write in a lineup commit.
#[derive(Debug, Clone, PartialEq)]
pub enum LineupChange {
    /// Schedule or re-place an item on the lineup's date with its derived status.
    Place {
        item: ItemRef,
        order: u32,
        status: ItemStatus,
    },
    InsertCue(CueRecord),
    Unschedule { artist_id: String },
    DeleteCue { cue_id: String },
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait ItemStore: Send + Sync {
    fn get_event(&self, event_id: &str) -> Result<EventRecord>;

    fn list_events(&self) -> Result<Vec<EventRecord>>;

    fn create_event(&self, event: &EventRecord) -> Result<()>;

    fn get_artist_slots(&self, event_id: &str) -> Result<Vec<ArtistSlotRecord>>;

    /// Register an artist, or replace the registration's metadata. Scheduling
    /// fields of an existing record are preserved.
    fn register_artist(&self, event_id: &str, record: &ArtistSlotRecord) -> Result<()>;

    fn list_cues(&self, event_id: &str) -> Result<Vec<CueRecord>>;

    fn get_cues(&self, event_id: &str, date: NaiveDate) -> Result<Vec<CueRecord>> {
        Ok(self
            .list_cues(event_id)?
            .into_iter()
            .filter(|c| c.performance_date == date)
            .collect())
    }

    fn patch_artist_slot(
        &self,
        event_id: &str,
        artist_id: &str,
        patch: &SlotPatch,
    ) -> Result<ArtistSlotRecord>;

    fn patch_cue(&self, event_id: &str, cue_id: &str, patch: &CuePatch) -> Result<CueRecord>;

    fn lineup_meta(&self, event_id: &str, date: NaiveDate) -> Result<LineupMeta>;

    /// Apply `changes` and record `stage` if the lineup is still at
    /// `expected_revision`, returning the new revision. A mismatch is a
    /// [`ShowError::Conflict`]. On any error the previous lineup stays the
    /// one that loads.
    fn commit_lineup(
        &self,
        event_id: &str,
        date: NaiveDate,
        expected_revision: u64,
        stage: &StageMark,
        changes: &[LineupChange],
    ) -> Result<u64>;
}

pub trait EmergencyStore: Send + Sync {
    fn load_broadcasts(&self, event_id: &str) -> Result<Vec<EmergencyBroadcast>>;

    fn append_broadcast(&self, event_id: &str, broadcast: &EmergencyBroadcast) -> Result<()>;

    /// Replace the stored record with the same id.
    fn patch_broadcast(&self, event_id: &str, broadcast: &EmergencyBroadcast) -> Result<()>;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// YAML-document store rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    /// Document whose writes fail, for exercising partial commits.
    #[cfg(test)]
    fail_writes_to: Option<PathBuf>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            #[cfg(test)]
            fail_writes_to: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn failing_writes_to(mut self, path: PathBuf) -> Self {
        self.fail_writes_to = Some(path);
        self
    }

    fn write_doc<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        #[cfg(test)]
        if self.fail_writes_to.as_deref() == Some(path) {
            return Err(ShowError::StoreUnavailable(format!(
                "write to {} failed",
                path.display()
            )));
        }
        io::write_yaml(path, value)
    }

    fn require_event(&self, event_id: &str) -> Result<()> {
        paths::validate_id(event_id)?;
        if !paths::event_manifest(&self.root, event_id).exists() {
            return Err(ShowError::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }

    fn read_artists(&self, event_id: &str) -> Result<Vec<ArtistSlotRecord>> {
        io::read_yaml_list(&paths::artists_path(&self.root, event_id))
    }

    fn read_cues(&self, event_id: &str) -> Result<Vec<CueRecord>> {
        io::read_yaml_list(&paths::cues_path(&self.root, event_id))
    }

    fn read_meta(&self, event_id: &str, date: NaiveDate) -> Result<LineupMeta> {
        Ok(io::read_yaml(&paths::lineup_path(&self.root, event_id, date))?.unwrap_or_default())
    }
}

fn apply_change(
    change: &LineupChange,
    date: NaiveDate,
    artists: &mut [ArtistSlotRecord],
    cues: &mut Vec<CueRecord>,
) -> Result<()> {
    match change {
        LineupChange::Place {
            item: ItemRef::Artist(id),
            order,
            status,
        } => {
            let record = artists
                .iter_mut()
                .find(|a| &a.artist_id == id)
                .ok_or_else(|| ShowError::ArtistNotFound(id.clone()))?;
            record.performance_date = Some(date);
            record.order = Some(*order);
            record.status = *status;
        }
        LineupChange::Place {
            item: ItemRef::Cue(id),
            order,
            status,
        } => {
            let record = cues
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or_else(|| ShowError::ItemNotFound(id.clone()))?;
            record.order = Some(*order);
            record.status = *status;
        }
        LineupChange::InsertCue(cue) => {
            if cues.iter().any(|c| c.id == cue.id) {
                return Err(ShowError::ItemExists(cue.id.clone()));
            }
            cues.push(cue.clone());
        }
        LineupChange::Unschedule { artist_id } => {
            let record = artists
                .iter_mut()
                .find(|a| &a.artist_id == artist_id)
                .ok_or_else(|| ShowError::ArtistNotFound(artist_id.clone()))?;
            record.performance_date = None;
            record.order = None;
            record.status = ItemStatus::NotStarted;
        }
        LineupChange::DeleteCue { cue_id } => {
            let before = cues.len();
            cues.retain(|c| &c.id != cue_id);
            if cues.len() == before {
                return Err(ShowError::ItemNotFound(cue_id.clone()));
            }
        }
    }
    Ok(())
}

impl ItemStore for FileStore {
    fn get_event(&self, event_id: &str) -> Result<EventRecord> {
        self.require_event(event_id)?;
        io::read_yaml(&paths::event_manifest(&self.root, event_id))?
            .ok_or_else(|| ShowError::EventNotFound(event_id.to_string()))
    }

    fn list_events(&self) -> Result<Vec<EventRecord>> {
        let dir = paths::events_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            match self.get_event(&id) {
                Ok(event) => events.push(event),
                Err(ShowError::EventNotFound(_)) | Err(ShowError::InvalidInput(_)) => {}
                Err(e) => return Err(e),
            }
        }
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }

    fn create_event(&self, event: &EventRecord) -> Result<()> {
        paths::validate_id(&event.id)?;
        let manifest = paths::event_manifest(&self.root, &event.id);
        if manifest.exists() {
            return Err(ShowError::EventExists(event.id.clone()));
        }
        self.write_doc(&manifest, event)
    }

    fn get_artist_slots(&self, event_id: &str) -> Result<Vec<ArtistSlotRecord>> {
        self.require_event(event_id)?;
        self.read_artists(event_id)
    }

    fn register_artist(&self, event_id: &str, record: &ArtistSlotRecord) -> Result<()> {
        self.require_event(event_id)?;
        paths::validate_id(&record.artist_id)?;
        let mut artists = self.read_artists(event_id)?;
        match artists.iter_mut().find(|a| a.artist_id == record.artist_id) {
            Some(existing) => {
                let (date, order, status) =
                    (existing.performance_date, existing.order, existing.status);
                *existing = record.clone();
                existing.performance_date = date;
                existing.order = order;
                existing.status = status;
            }
            None => {
                let mut fresh = record.clone();
                fresh.performance_date = None;
                fresh.order = None;
                fresh.status = ItemStatus::NotStarted;
                artists.push(fresh);
            }
        }
        self.write_doc(&paths::artists_path(&self.root, event_id), &artists)
    }

    fn list_cues(&self, event_id: &str) -> Result<Vec<CueRecord>> {
        self.require_event(event_id)?;
        self.read_cues(event_id)
    }

    fn patch_artist_slot(
        &self,
        event_id: &str,
        artist_id: &str,
        patch: &SlotPatch,
    ) -> Result<ArtistSlotRecord> {
        self.require_event(event_id)?;
        let mut artists = self.read_artists(event_id)?;
        let record = artists
            .iter_mut()
            .find(|a| a.artist_id == artist_id)
            .ok_or_else(|| ShowError::ArtistNotFound(artist_id.to_string()))?;
        patch.apply(record);
        let updated = record.clone();
        self.write_doc(&paths::artists_path(&self.root, event_id), &artists)?;
        Ok(updated)
    }

    fn patch_cue(&self, event_id: &str, cue_id: &str, patch: &CuePatch) -> Result<CueRecord> {
        self.require_event(event_id)?;
        let mut cues = self.read_cues(event_id)?;
        let record = cues
            .iter_mut()
            .find(|c| c.id == cue_id)
            .ok_or_else(|| ShowError::ItemNotFound(cue_id.to_string()))?;
        patch.apply(record);
        let updated = record.clone();
        self.write_doc(&paths::cues_path(&self.root, event_id), &cues)?;
        Ok(updated)
    }

    fn lineup_meta(&self, event_id: &str, date: NaiveDate) -> Result<LineupMeta> {
        self.require_event(event_id)?;
        self.read_meta(event_id, date)
    }

    fn commit_lineup(
        &self,
        event_id: &str,
        date: NaiveDate,
        expected_revision: u64,
        stage: &StageMark,
        changes: &[LineupChange],
    ) -> Result<u64> {
        self.require_event(event_id)?;
        let meta = self.read_meta(event_id, date)?;
        if meta.revision != expected_revision {
            return Err(ShowError::Conflict(format!(
                "lineup {event_id}/{date} is at revision {}, expected {expected_revision}; reload and retry",
                meta.revision
            )));
        }

        let original_artists = self.read_artists(event_id)?;
        let original_cues = self.read_cues(event_id)?;
        let mut artists = original_artists.clone();
        let mut cues = original_cues.clone();
        for change in changes {
            apply_change(change, date, &mut artists, &mut cues)?;
        }

        let touches_artists = changes.iter().any(|c| {
            matches!(
                c,
                LineupChange::Place {
                    item: ItemRef::Artist(_),
                    ..
                } | LineupChange::Unschedule { .. }
            )
        });
        let touches_cues = changes.iter().any(|c| {
            matches!(
                c,
                LineupChange::Place {
                    item: ItemRef::Cue(_),
                    ..
                } | LineupChange::InsertCue(_)
                    | LineupChange::DeleteCue { .. }
            )
        });

        // Everything is validated in memory before the first write. The
        // lineup document goes last: until it lands, the previous stage is
        // the one that loads.
        let artists_path = paths::artists_path(&self.root, event_id);
        let cues_path = paths::cues_path(&self.root, event_id);
        let next = LineupMeta {
            revision: meta.revision + 1,
            stage: Some(stage.clone()),
            updated_at: Some(Utc::now()),
        };
        let mut artists_written = false;
        let written = (|| -> Result<()> {
            if touches_artists {
                self.write_doc(&artists_path, &artists)?;
                artists_written = true;
            }
            if touches_cues {
                self.write_doc(&cues_path, &cues)?;
            }
            self.write_doc(&paths::lineup_path(&self.root, event_id, date), &next)
        })();

        if let Err(e) = written {
            // Best effort: put back the member documents so order and
            // membership match the stage that still loads.
            if artists_written {
                let _ = self.write_doc(&artists_path, &original_artists);
            }
            if touches_cues {
                let _ = self.write_doc(&cues_path, &original_cues);
            }
            return Err(e);
        }
        Ok(next.revision)
    }
}

impl EmergencyStore for FileStore {
    fn load_broadcasts(&self, event_id: &str) -> Result<Vec<EmergencyBroadcast>> {
        self.require_event(event_id)?;
        io::read_yaml_list(&paths::emergency_path(&self.root, event_id))
    }

    fn append_broadcast(&self, event_id: &str, broadcast: &EmergencyBroadcast) -> Result<()> {
        let mut all = self.load_broadcasts(event_id)?;
        if all.iter().any(|b| b.id == broadcast.id) {
            return Err(ShowError::Conflict(format!(
                "broadcast id '{}' already used",
                broadcast.id
            )));
        }
        all.push(broadcast.clone());
        self.write_doc(&paths::emergency_path(&self.root, event_id), &all)
    }

    fn patch_broadcast(&self, event_id: &str, broadcast: &EmergencyBroadcast) -> Result<()> {
        let mut all = self.load_broadcasts(event_id)?;
        let slot = all
            .iter_mut()
            .find(|b| b.id == broadcast.id)
            .ok_or_else(|| ShowError::BroadcastNotFound(broadcast.id.clone()))?;
        *slot = broadcast.clone();
        self.write_doc(&paths::emergency_path(&self.root, event_id), &all)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
