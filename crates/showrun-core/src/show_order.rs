//! Show-order state machine.
//!
//! A [`Lineup`] is the canonical running order for one (event, date) and the
//! cursor marking the item on stage. Statuses are never authored directly:
//! every mutation moves the cursor or the items and then runs the single
//! derivation pass, so all viewers see the same spotlight.

use crate::error::{Result, ShowError};
use crate::store::{ArtistSlotRecord, CueRecord, ItemStore, LineupChange, StageMark};
use crate::types::{ArtistSlot, Cue, ItemKind, ItemRef, ItemStatus, PerformanceItem};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Position of the on-stage item. Serialized as `null` (pre-show) or an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum Cursor {
    #[default]
    PreShow,
    OnStage(usize),
}

impl Cursor {
    pub fn index(self) -> Option<usize> {
        match self {
            Cursor::PreShow => None,
            Cursor::OnStage(i) => Some(i),
        }
    }

    /// The cursor one step forward, if a lineup of `len` items has one.
    pub fn next(self, len: usize) -> Option<Cursor> {
        let to = match self {
            Cursor::PreShow => 0,
            Cursor::OnStage(i) => i + 1,
        };
        (to < len).then_some(Cursor::OnStage(to))
    }

    /// The cursor one step back. The first item has no predecessor.
    pub fn prev(self) -> Option<Cursor> {
        match self {
            Cursor::OnStage(i) if i > 0 => Some(Cursor::OnStage(i - 1)),
            _ => None,
        }
    }
}

impl From<Option<usize>> for Cursor {
    fn from(index: Option<usize>) -> Self {
        index.map_or(Cursor::PreShow, Cursor::OnStage)
    }
}

impl From<Cursor> for Option<usize> {
    fn from(cursor: Cursor) -> Self {
        cursor.index()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::PreShow => f.write_str("pre-show"),
            Cursor::OnStage(i) => write!(f, "#{}", i + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Status of the item at `index` given the cursor.
pub fn status_at(index: usize, cursor: Cursor) -> ItemStatus {
    let Some(on_stage) = cursor.index() else {
        return ItemStatus::NotStarted;
    };
    if index < on_stage {
        return ItemStatus::Completed;
    }
    match index - on_stage {
        0 => ItemStatus::CurrentlyOnStage,
        1 => ItemStatus::NextOnStage,
        2 => ItemStatus::NextOnDeck,
        _ => ItemStatus::NotStarted,
    }
}

/// The derivation pass: one linear sweep recomputing every status.
pub fn derive_statuses(items: &mut [PerformanceItem], cursor: Cursor) {
    for (index, item) in items.iter_mut().enumerate() {
        item.status = status_at(index, cursor);
    }
}

// ---------------------------------------------------------------------------
// Record conversion
// ---------------------------------------------------------------------------

impl PerformanceItem {
    pub fn from_slot(event_id: &str, date: NaiveDate, record: ArtistSlotRecord) -> Self {
        Self {
            id: record.artist_id.clone(),
            event_id: event_id.to_string(),
            performance_date: date,
            order: record.order.unwrap_or(0),
            status: record.status,
            kind: ItemKind::ArtistSlot(ArtistSlot {
                artist_id: record.artist_id,
                display_name: record.display_name,
                style: record.style,
                planned_duration: record.planned_duration,
                actual_duration: record.actual_duration,
                rehearsal_completed: record.rehearsal_completed,
                notes: record.notes,
            }),
        }
    }

    pub fn from_cue(event_id: &str, record: CueRecord) -> Self {
        Self {
            id: record.id,
            event_id: event_id.to_string(),
            performance_date: record.performance_date,
            order: record.order.unwrap_or(0),
            status: record.status,
            kind: ItemKind::Cue(Cue {
                cue_type: record.cue_type,
                title: record.title,
                planned_duration: record.planned_duration,
                notes: record.notes,
            }),
        }
    }

    fn to_cue_record(&self) -> Option<CueRecord> {
        match &self.kind {
            ItemKind::Cue(cue) => Some(CueRecord {
                id: self.id.clone(),
                performance_date: self.performance_date,
                cue_type: cue.cue_type,
                title: cue.title.clone(),
                planned_duration: cue.planned_duration,
                notes: cue.notes.clone(),
                order: Some(self.order),
                status: self.status,
            }),
            ItemKind::ArtistSlot(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lineup
// ---------------------------------------------------------------------------

/// Whether an operation changed the lineup. Replays report `Unchanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged,
}

/// Structural edits not yet committed to the store.
#[derive(Debug, Clone, Default, PartialEq)]
struct Journal {
    inserted: Vec<String>,
    removed: Vec<ItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    event_id: String,
    date: NaiveDate,
    revision: u64,
    cursor: Cursor,
    items: Vec<PerformanceItem>,
    #[serde(skip)]
    journal: Journal,
}

/// The three items a live board highlights.
#[derive(Debug, Clone, Serialize)]
pub struct Spotlight<'a> {
    pub current: Option<&'a PerformanceItem>,
    pub next_on_stage: Option<&'a PerformanceItem>,
    pub next_on_deck: Option<&'a PerformanceItem>,
}

impl Lineup {
    /// Read the lineup for `(event_id, date)`. Takes no lock; the snapshot may
    /// trail a concurrent commit.
    pub fn load(store: &dyn ItemStore, event_id: &str, date: NaiveDate) -> Result<Self> {
        store.get_event(event_id)?;
        // Lineup document first: a commit landing between the reads leaves
        // this snapshot with an older revision, so committing from it conflicts.
        let meta = store.lineup_meta(event_id, date)?;
        let artists = store.get_artist_slots(event_id)?;
        let cues = store.get_cues(event_id, date)?;
        let mut lineup = Self::from_records(event_id, date, meta.revision, artists, cues);
        if let Some(stage) = &meta.stage {
            lineup.restore(stage);
        }
        Ok(lineup)
    }

    /// Put the cursor where `stage` says and re-derive every status. The
    /// on-stage id wins; a stale id falls back to the recorded index.
    pub fn restore(&mut self, stage: &StageMark) {
        let by_id = stage.on_stage.as_deref().and_then(|id| self.position(id));
        self.cursor = match (by_id, stage.cursor) {
            (Some(i), _) => Cursor::OnStage(i),
            (None, Some(i)) if !self.items.is_empty() => {
                Cursor::OnStage(i.min(self.items.len() - 1))
            }
            _ => Cursor::PreShow,
        };
        self.settle();
    }

    /// The stage record a commit of this lineup writes.
    pub fn stage(&self) -> StageMark {
        StageMark {
            on_stage: self
                .cursor
                .index()
                .and_then(|i| self.items.get(i))
                .map(|item| item.id.clone()),
            cursor: self.cursor.index(),
        }
    }

    /// Merge the artist slots scheduled on `date` with the date's cues. The
    /// cursor is recovered from record statuses; [`Lineup::load`] then
    /// replaces it with the committed stage when there is one.
    ///
    /// Items sort by stored order; equal orders keep insertion order (artists
    /// before cues, each in document order) and records lacking an order go
    /// last. The result is renumbered 1..N and re-derived.
    pub fn from_records(
        event_id: &str,
        date: NaiveDate,
        revision: u64,
        artists: Vec<ArtistSlotRecord>,
        cues: Vec<CueRecord>,
    ) -> Self {
        let mut staged: Vec<(Option<u32>, PerformanceItem)> = artists
            .into_iter()
            .filter(|a| a.performance_date == Some(date))
            .map(|a| (a.order, PerformanceItem::from_slot(event_id, date, a)))
            .chain(
                cues.into_iter()
                    .filter(|c| c.performance_date == date)
                    .map(|c| (c.order, PerformanceItem::from_cue(event_id, c))),
            )
            .collect();
        staged.sort_by_key(|(order, _)| (order.is_none(), order.unwrap_or(0)));

        let cursor = staged
            .iter()
            .position(|(_, item)| item.status == ItemStatus::CurrentlyOnStage)
            .map_or(Cursor::PreShow, Cursor::OnStage);

        let mut lineup = Self {
            event_id: event_id.to_string(),
            date,
            revision,
            cursor,
            items: staged.into_iter().map(|(_, item)| item).collect(),
            journal: Journal::default(),
        };
        lineup.settle();
        lineup
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn items(&self) -> &[PerformanceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.id == item_id)
    }

    pub fn get(&self, item_id: &str) -> Option<&PerformanceItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn spotlight(&self) -> Spotlight<'_> {
        let at = |offset: usize| {
            self.cursor
                .index()
                .and_then(|c| self.items.get(c + offset))
        };
        Spotlight {
            current: at(0),
            next_on_stage: at(1),
            next_on_deck: at(2),
        }
    }

    // -----------------------------------------------------------------------
    // Cursor moves
    // -----------------------------------------------------------------------

    /// Move the cursor one item forward from `expected` (the current cursor
    /// when `None`). Replaying a move that already happened is a no-op.
    pub fn advance(&mut self, expected: Option<Cursor>) -> Result<Outcome> {
        let from = expected.unwrap_or(self.cursor);
        if from != self.cursor {
            if from.next(self.items.len()) == Some(self.cursor) {
                return Ok(Outcome::Unchanged);
            }
            return Err(self.stale(from));
        }
        let to = self
            .cursor
            .next(self.items.len())
            .ok_or_else(|| ShowError::InvalidTransition {
                from: self.describe(self.cursor),
                to: "next item".to_string(),
                reason: if self.items.is_empty() {
                    "the lineup is empty".to_string()
                } else {
                    "no item after the last slot".to_string()
                },
            })?;
        self.cursor = to;
        self.settle();
        Ok(Outcome::Applied)
    }

    /// Inverse of [`Lineup::advance`].
    pub fn retreat(&mut self, expected: Option<Cursor>) -> Result<Outcome> {
        let from = expected.unwrap_or(self.cursor);
        if from != self.cursor {
            if from.prev() == Some(self.cursor) {
                return Ok(Outcome::Unchanged);
            }
            return Err(self.stale(from));
        }
        let to = self
            .cursor
            .prev()
            .ok_or_else(|| ShowError::InvalidTransition {
                from: self.describe(self.cursor),
                to: "previous item".to_string(),
                reason: match self.cursor {
                    Cursor::PreShow => "the show has not started".to_string(),
                    Cursor::OnStage(_) => "already at the first item".to_string(),
                },
            })?;
        self.cursor = to;
        self.settle();
        Ok(Outcome::Applied)
    }

    /// Manual override: place the cursor so that `item_id` shows `status`.
    pub fn set_status(&mut self, item_id: &str, status: ItemStatus) -> Result<Outcome> {
        let idx = self
            .position(item_id)
            .ok_or_else(|| ShowError::ItemNotFound(item_id.to_string()))?;
        let current = self.items[idx].status;
        if current == status {
            return Ok(Outcome::Unchanged);
        }
        let target = match status {
            ItemStatus::CurrentlyOnStage => Some(Cursor::OnStage(idx)),
            ItemStatus::NextOnStage => idx.checked_sub(1).map(Cursor::OnStage),
            ItemStatus::NextOnDeck => idx.checked_sub(2).map(Cursor::OnStage),
            ItemStatus::Completed => (idx + 1 < self.items.len()).then_some(Cursor::OnStage(idx + 1)),
            ItemStatus::NotStarted => Some(idx.checked_sub(3).map_or(Cursor::PreShow, Cursor::OnStage)),
        };
        let Some(target) = target else {
            return Err(ShowError::InvalidTransition {
                from: current.to_string(),
                to: status.to_string(),
                reason: format!(
                    "no cursor position gives '{}' (#{}) that status",
                    self.items[idx].label(),
                    idx + 1
                ),
            });
        };
        self.cursor = target;
        self.settle();
        Ok(Outcome::Applied)
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Schedule `item` at its `order`. Ties go after existing items. Once the
    /// show is running, items land no earlier than right after the on-stage
    /// item. Returns the index the item landed at.
    pub fn insert(&mut self, item: PerformanceItem) -> Result<usize> {
        if item.event_id != self.event_id || item.performance_date != self.date {
            return Err(ShowError::InvalidInput(format!(
                "item '{}' belongs to {}/{}, not {}/{}",
                item.id, item.event_id, item.performance_date, self.event_id, self.date
            )));
        }
        if self.position(&item.id).is_some() {
            return Err(ShowError::ItemExists(item.id));
        }
        let mut idx = self
            .items
            .iter()
            .position(|existing| existing.order > item.order)
            .unwrap_or(self.items.len());
        if let Cursor::OnStage(on_stage) = self.cursor {
            idx = idx.max(on_stage + 1);
        }

        let item_ref = item.item_ref();
        if let Some(pos) = self.journal.removed.iter().position(|r| *r == item_ref) {
            // Re-scheduled before commit: the stored record still exists.
            self.journal.removed.remove(pos);
        } else if item.is_cue() {
            self.journal.inserted.push(item.id.clone());
        }
        self.items.insert(idx, item);
        self.settle();
        Ok(idx)
    }

    /// Unschedule an item. The item on stage cannot be removed.
    pub fn remove(&mut self, item_id: &str) -> Result<PerformanceItem> {
        let idx = self
            .position(item_id)
            .ok_or_else(|| ShowError::ItemNotFound(item_id.to_string()))?;
        match self.cursor {
            Cursor::OnStage(on_stage) if on_stage == idx => {
                return Err(ShowError::InvalidTransition {
                    from: ItemStatus::CurrentlyOnStage.to_string(),
                    to: "removed".to_string(),
                    reason: format!(
                        "'{}' is on stage; advance past it first",
                        self.items[idx].label()
                    ),
                });
            }
            Cursor::OnStage(on_stage) if idx < on_stage => {
                self.cursor = Cursor::OnStage(on_stage - 1);
            }
            _ => {}
        }

        let item = self.items.remove(idx);
        if let Some(pos) = self.journal.inserted.iter().position(|id| *id == item.id) {
            self.journal.inserted.remove(pos);
        } else {
            self.journal.removed.push(item.item_ref());
        }
        self.settle();
        Ok(item)
    }

    /// Move an item to `to_index` (0-based, clamped). The cursor follows the
    /// item that is on stage.
    pub fn move_item(&mut self, item_id: &str, to_index: usize) -> Result<Outcome> {
        let from = self
            .position(item_id)
            .ok_or_else(|| ShowError::ItemNotFound(item_id.to_string()))?;
        let to = to_index.min(self.items.len() - 1);
        if from == to {
            return Ok(Outcome::Unchanged);
        }
        let on_stage_id = self
            .cursor
            .index()
            .map(|c| self.items[c].id.clone());

        let item = self.items.remove(from);
        self.items.insert(to, item);
        if let Some(id) = on_stage_id {
            self.cursor = self.position(&id).map_or(Cursor::PreShow, Cursor::OnStage);
        }
        self.settle();
        Ok(Outcome::Applied)
    }

    // -----------------------------------------------------------------------
    // Commit support
    // -----------------------------------------------------------------------

    /// The writes that persist this lineup: removals first, then every item
    /// with its order and derived status. Clears the journal.
    pub fn take_changes(&mut self) -> Vec<LineupChange> {
        let mut changes: Vec<LineupChange> = self
            .journal
            .removed
            .drain(..)
            .map(|r| match r {
                ItemRef::Artist(artist_id) => LineupChange::Unschedule { artist_id },
                ItemRef::Cue(cue_id) => LineupChange::DeleteCue { cue_id },
            })
            .collect();

        for item in &self.items {
            let fresh_cue = self
                .journal
                .inserted
                .iter()
                .any(|id| *id == item.id)
                .then(|| item.to_cue_record())
                .flatten();
            match fresh_cue {
                Some(record) => changes.push(LineupChange::InsertCue(record)),
                None => changes.push(LineupChange::Place {
                    item: item.item_ref(),
                    order: item.order,
                    status: item.status,
                }),
            }
        }
        self.journal.inserted.clear();
        changes
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Renumber 1..N and run the derivation pass.
    fn settle(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.order = i as u32 + 1;
        }
        derive_statuses(&mut self.items, self.cursor);
    }

    fn describe(&self, cursor: Cursor) -> String {
        match cursor.index().and_then(|i| self.items.get(i)) {
            Some(item) => format!("'{}' ({cursor})", item.label()),
            None => cursor.to_string(),
        }
    }

    fn stale(&self, expected: Cursor) -> ShowError {
        ShowError::Conflict(format!(
            "expected cursor {expected}, lineup {}/{} is at {}; reload and retry",
            self.event_id, self.date, self.cursor
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CueType;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()
    }

    fn artist(id: &str, order: Option<u32>) -> ArtistSlotRecord {
        let mut rec = ArtistSlotRecord::new(id, id.to_uppercase());
        rec.performance_date = Some(date());
        rec.order = order;
        rec
    }

    fn cue(id: &str, order: Option<u32>) -> CueRecord {
        CueRecord {
            id: id.into(),
            performance_date: date(),
            cue_type: CueType::McBreak,
            title: format!("cue {id}"),
            planned_duration: 5,
            notes: String::new(),
            order,
            status: ItemStatus::NotStarted,
        }
    }

    fn new_cue_item(id: &str, order: u32) -> PerformanceItem {
        PerformanceItem::from_cue("fest", cue(id, Some(order)))
    }

    /// [Artist A, Cue X, Artist B], all not started.
    fn scenario() -> Lineup {
        Lineup::from_records(
            "fest",
            date(),
            0,
            vec![artist("a", Some(1)), artist("b", Some(3))],
            vec![cue("x", Some(2))],
        )
    }

    fn statuses(lineup: &Lineup) -> Vec<ItemStatus> {
        lineup.items().iter().map(|i| i.status).collect()
    }

    fn ids(lineup: &Lineup) -> Vec<&str> {
        lineup.items().iter().map(|i| i.id.as_str()).collect()
    }

    fn assert_invariants(lineup: &Lineup) {
        let on_stage = lineup
            .items()
            .iter()
            .filter(|i| i.status == ItemStatus::CurrentlyOnStage)
            .count();
        assert!(on_stage <= 1, "{on_stage} items on stage");
        let orders: Vec<u32> = lineup.items().iter().map(|i| i.order).collect();
        let expected: Vec<u32> = (1..=lineup.len() as u32).collect();
        assert_eq!(orders, expected);
    }

    #[test]
    fn first_advance_brings_first_item_on_stage() {
        let mut lineup = scenario();
        assert!(statuses(&lineup)
            .iter()
            .all(|s| *s == ItemStatus::NotStarted));

        assert_eq!(lineup.advance(None).unwrap(), Outcome::Applied);
        assert_eq!(
            statuses(&lineup),
            vec![
                ItemStatus::CurrentlyOnStage,
                ItemStatus::NextOnStage,
                ItemStatus::NextOnDeck
            ]
        );
    }

    #[test]
    fn second_advance_completes_first_item() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.advance(None).unwrap();
        assert_eq!(
            statuses(&lineup),
            vec![
                ItemStatus::Completed,
                ItemStatus::CurrentlyOnStage,
                ItemStatus::NextOnStage
            ]
        );
        assert_eq!(lineup.spotlight().current.unwrap().id, "x");
        assert_eq!(lineup.spotlight().next_on_stage.unwrap().id, "b");
        assert!(lineup.spotlight().next_on_deck.is_none());
    }

    #[test]
    fn stage_round_trips_through_restore() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.advance(None).unwrap();
        let stage = lineup.stage();
        assert_eq!(stage.on_stage.as_deref(), Some("x"));
        assert_eq!(stage.cursor, Some(1));

        let mut fresh = scenario();
        fresh.restore(&stage);
        assert_eq!(fresh.cursor(), Cursor::OnStage(1));
        assert_eq!(statuses(&fresh), statuses(&lineup));
    }

    #[test]
    fn restore_falls_back_to_clamped_index() {
        let mut lineup = scenario();
        lineup.restore(&StageMark {
            on_stage: Some("gone".into()),
            cursor: Some(9),
        });
        assert_eq!(lineup.cursor(), Cursor::OnStage(2));
        assert_invariants(&lineup);

        lineup.restore(&StageMark::default());
        assert_eq!(lineup.cursor(), Cursor::PreShow);
        assert!(statuses(&lineup)
            .iter()
            .all(|s| *s != ItemStatus::CurrentlyOnStage));
    }

    #[test]
    fn replayed_advance_is_a_no_op() {
        let mut lineup = scenario();
        lineup.advance(Some(Cursor::PreShow)).unwrap();
        let after_first = lineup.clone();

        let replay = lineup.advance(Some(Cursor::PreShow)).unwrap();
        assert_eq!(replay, Outcome::Unchanged);
        assert_eq!(lineup, after_first);
    }

    #[test]
    fn advance_from_a_stale_cursor_conflicts() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.advance(None).unwrap();
        let err = lineup.advance(Some(Cursor::PreShow)).unwrap_err();
        assert!(matches!(err, ShowError::Conflict(_)));
        assert_eq!(lineup.cursor(), Cursor::OnStage(1));
    }

    #[test]
    fn advance_past_end_mutates_nothing() {
        let mut lineup = scenario();
        for _ in 0..3 {
            lineup.advance(None).unwrap();
        }
        let before = lineup.clone();
        let err = lineup.advance(None).unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        assert_eq!(lineup, before);
    }

    #[test]
    fn advance_on_empty_lineup_is_invalid() {
        let mut lineup = Lineup::from_records("fest", date(), 0, vec![], vec![]);
        assert!(matches!(
            lineup.advance(None),
            Err(ShowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn retreat_at_first_item_is_invalid() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        let before = lineup.clone();
        let err = lineup.retreat(None).unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        assert_eq!(lineup, before);
    }

    #[test]
    fn retreat_before_show_is_invalid() {
        let mut lineup = scenario();
        assert!(matches!(
            lineup.retreat(None),
            Err(ShowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn retreat_undoes_advance() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        let one = lineup.clone();
        lineup.advance(None).unwrap();
        lineup.retreat(Some(Cursor::OnStage(1))).unwrap();
        assert_eq!(lineup, one);
        // replay of the same retreat
        assert_eq!(
            lineup.retreat(Some(Cursor::OnStage(1))).unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(lineup, one);
    }

    #[test]
    fn set_status_places_cursor() {
        let mut lineup = scenario();
        lineup.set_status("b", ItemStatus::CurrentlyOnStage).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(2));
        assert_eq!(
            statuses(&lineup),
            vec![
                ItemStatus::Completed,
                ItemStatus::Completed,
                ItemStatus::CurrentlyOnStage
            ]
        );

        lineup.set_status("x", ItemStatus::CurrentlyOnStage).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(1));

        lineup.set_status("b", ItemStatus::NextOnDeck).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(0));

        lineup.set_status("a", ItemStatus::Completed).unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(1));
        assert_invariants(&lineup);
    }

    #[test]
    fn set_status_rejects_unreachable_status() {
        let mut lineup = scenario();
        let err = lineup.set_status("a", ItemStatus::NextOnStage).unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        let err = lineup.set_status("b", ItemStatus::Completed).unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        assert_eq!(lineup.cursor(), Cursor::PreShow);
    }

    #[test]
    fn set_status_not_started_rewinds() {
        let mut lineup = scenario();
        lineup.set_status("b", ItemStatus::CurrentlyOnStage).unwrap();
        lineup.set_status("a", ItemStatus::NotStarted).unwrap();
        assert_eq!(lineup.cursor(), Cursor::PreShow);
        assert_eq!(
            lineup.set_status("a", ItemStatus::NotStarted).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn set_status_unknown_item_is_not_found() {
        let mut lineup = scenario();
        assert!(matches!(
            lineup.set_status("ghost", ItemStatus::Completed),
            Err(ShowError::ItemNotFound(_))
        ));
    }

    #[test]
    fn from_records_sorts_with_stable_ties() {
        let lineup = Lineup::from_records(
            "fest",
            date(),
            0,
            vec![artist("late", None), artist("a", Some(2)), artist("b", Some(1))],
            vec![cue("x", Some(2)), cue("y", Some(7))],
        );
        assert_eq!(ids(&lineup), vec!["b", "a", "x", "y", "late"]);
        assert_invariants(&lineup);
    }

    #[test]
    fn from_records_ignores_other_dates() {
        let mut elsewhere = artist("z", Some(1));
        elsewhere.performance_date = NaiveDate::from_ymd_opt(2026, 7, 5);
        let mut unscheduled = artist("u", None);
        unscheduled.performance_date = None;
        let lineup =
            Lineup::from_records("fest", date(), 0, vec![elsewhere, unscheduled], vec![]);
        assert!(lineup.is_empty());
    }

    #[test]
    fn drifted_statuses_are_rederived_on_load() {
        let mut a = artist("a", Some(1));
        a.status = ItemStatus::Completed;
        let mut b = artist("b", Some(2));
        b.status = ItemStatus::CurrentlyOnStage;
        let mut c = artist("c", Some(3));
        c.status = ItemStatus::CurrentlyOnStage;
        let lineup = Lineup::from_records("fest", date(), 4, vec![a, b, c], vec![]);
        assert_eq!(lineup.cursor(), Cursor::OnStage(1));
        assert_eq!(
            statuses(&lineup),
            vec![
                ItemStatus::Completed,
                ItemStatus::CurrentlyOnStage,
                ItemStatus::NextOnStage
            ]
        );
    }

    #[test]
    fn insert_then_remove_restores_lineup() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        let before = lineup.clone();

        let idx = lineup.insert(new_cue_item("video", 3)).unwrap();
        assert_eq!(idx, 3);
        assert_eq!(ids(&lineup), vec!["a", "x", "b", "video"]);
        assert_invariants(&lineup);

        lineup.remove("video").unwrap();
        assert_eq!(lineup.items(), before.items());
        assert_eq!(lineup.cursor(), before.cursor());
        assert!(lineup.take_changes().iter().all(|c| matches!(c, LineupChange::Place { .. })));
    }

    #[test]
    fn insert_during_show_lands_after_stage() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.advance(None).unwrap();
        let idx = lineup.insert(new_cue_item("early", 1)).unwrap();
        assert_eq!(idx, 2);
        assert_eq!(lineup.cursor(), Cursor::OnStage(1));
        assert_eq!(lineup.get("early").unwrap().status, ItemStatus::NextOnStage);
        assert_invariants(&lineup);
    }

    #[test]
    fn insert_duplicate_rejected() {
        let mut lineup = scenario();
        let err = lineup.insert(new_cue_item("x", 9)).unwrap_err();
        assert!(matches!(err, ShowError::ItemExists(_)));
    }

    #[test]
    fn remove_on_stage_item_is_invalid() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        let err = lineup.remove("a").unwrap_err();
        assert!(matches!(err, ShowError::InvalidTransition { .. }));
        assert_eq!(lineup.len(), 3);
    }

    #[test]
    fn remove_before_cursor_keeps_same_item_on_stage() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.advance(None).unwrap();
        lineup.remove("a").unwrap();
        assert_eq!(lineup.cursor(), Cursor::OnStage(0));
        assert_eq!(lineup.spotlight().current.unwrap().id, "x");
        assert_invariants(&lineup);
    }

    #[test]
    fn move_item_keeps_on_stage_item() {
        let mut lineup = scenario();
        lineup.advance(None).unwrap();
        lineup.move_item("b", 0).unwrap();
        assert_eq!(ids(&lineup), vec!["b", "a", "x"]);
        assert_eq!(lineup.spotlight().current.unwrap().id, "a");
        assert_eq!(
            lineup.move_item("b", 0).unwrap(),
            Outcome::Unchanged
        );
        assert_invariants(&lineup);
    }

    #[test]
    fn take_changes_journals_inserts_and_removals() {
        let mut lineup = scenario();
        lineup.insert(new_cue_item("video", 10)).unwrap();
        lineup.remove("a").unwrap();
        let changes = lineup.take_changes();

        assert_eq!(
            changes[0],
            LineupChange::Unschedule {
                artist_id: "a".into()
            }
        );
        assert!(changes
            .iter()
            .any(|c| matches!(c, LineupChange::InsertCue(r) if r.id == "video" && r.order == Some(3))));
        assert_eq!(changes.len(), 4);
        // second call has nothing structural left
        assert!(lineup
            .take_changes()
            .iter()
            .all(|c| matches!(c, LineupChange::Place { .. })));
    }

    #[test]
    fn every_reachable_state_has_at_most_one_on_stage() {
        let mut lineup = Lineup::from_records(
            "fest",
            date(),
            0,
            (1..=5).map(|n| artist(&format!("act-{n}"), Some(n))).collect(),
            vec![cue("intro", Some(0))],
        );
        let ops: Vec<Box<dyn Fn(&mut Lineup)>> = vec![
            Box::new(|l: &mut Lineup| drop(l.advance(None))),
            Box::new(|l: &mut Lineup| drop(l.advance(None))),
            Box::new(|l: &mut Lineup| drop(l.retreat(None))),
            Box::new(|l: &mut Lineup| drop(l.set_status("act-4", ItemStatus::NextOnDeck))),
            Box::new(|l: &mut Lineup| drop(l.insert(new_cue_item("encore", 99)))),
            Box::new(|l: &mut Lineup| drop(l.remove("act-1"))),
            Box::new(|l: &mut Lineup| drop(l.move_item("encore", 1))),
            Box::new(|l: &mut Lineup| drop(l.advance(None))),
            Box::new(|l: &mut Lineup| drop(l.set_status("encore", ItemStatus::CurrentlyOnStage))),
            Box::new(|l: &mut Lineup| drop(l.remove("intro"))),
        ];
        for op in ops.iter().cycle().take(40) {
            op(&mut lineup);
            assert_invariants(&lineup);
        }
    }

    #[test]
    fn cursor_serializes_as_nullable_index() {
        assert_eq!(serde_json::to_string(&Cursor::PreShow).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Cursor::OnStage(2)).unwrap(), "2");
        let parsed: Cursor = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Cursor::OnStage(1));
    }
}
