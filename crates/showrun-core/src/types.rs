use crate::error::ShowError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Display status of a performance item. Always derived from the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    NotStarted,
    NextOnDeck,
    NextOnStage,
    CurrentlyOnStage,
    Completed,
}

impl ItemStatus {
    pub fn all() -> &'static [ItemStatus] {
        &[
            ItemStatus::NotStarted,
            ItemStatus::NextOnDeck,
            ItemStatus::NextOnStage,
            ItemStatus::CurrentlyOnStage,
            ItemStatus::Completed,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "not_started",
            ItemStatus::NextOnDeck => "next_on_deck",
            ItemStatus::NextOnStage => "next_on_stage",
            ItemStatus::CurrentlyOnStage => "currently_on_stage",
            ItemStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = ShowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ShowError::InvalidInput(format!(
                    "unknown status '{s}': must be not_started, next_on_deck, next_on_stage, \
                     currently_on_stage, or completed"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// CueType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueType {
    McBreak,
    VideoBreak,
    Intermission,
    Announcement,
    Changeover,
}

impl CueType {
    pub fn as_str(self) -> &'static str {
        match self {
            CueType::McBreak => "mc_break",
            CueType::VideoBreak => "video_break",
            CueType::Intermission => "intermission",
            CueType::Announcement => "announcement",
            CueType::Changeover => "changeover",
        }
    }
}

impl fmt::Display for CueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CueType {
    type Err = ShowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mc_break" => Ok(CueType::McBreak),
            "video_break" => Ok(CueType::VideoBreak),
            "intermission" => Ok(CueType::Intermission),
            "announcement" => Ok(CueType::Announcement),
            "changeover" => Ok(CueType::Changeover),
            _ => Err(ShowError::InvalidInput(format!(
                "unknown cue type '{s}': must be mc_break, video_break, intermission, \
                 announcement, or changeover"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PerformanceItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSlot {
    pub artist_id: String,
    pub display_name: String,
    pub style: String,
    /// Minutes.
    pub planned_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,
    pub rehearsal_completed: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub cue_type: CueType,
    pub title: String,
    /// Minutes.
    pub planned_duration: u32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    ArtistSlot(ArtistSlot),
    Cue(Cue),
}

/// One slot of the running order: an artist performance or a scripted cue,
/// sharing the order/status envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceItem {
    pub id: String,
    pub event_id: String,
    pub performance_date: NaiveDate,
    pub order: u32,
    pub status: ItemStatus,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl PerformanceItem {
    /// Name shown on stage boards.
    pub fn label(&self) -> &str {
        match &self.kind {
            ItemKind::ArtistSlot(slot) => &slot.display_name,
            ItemKind::Cue(cue) => &cue.title,
        }
    }

    pub fn planned_duration(&self) -> u32 {
        match &self.kind {
            ItemKind::ArtistSlot(slot) => slot.planned_duration,
            ItemKind::Cue(cue) => cue.planned_duration,
        }
    }

    pub fn item_ref(&self) -> ItemRef {
        match &self.kind {
            ItemKind::ArtistSlot(slot) => ItemRef::Artist(slot.artist_id.clone()),
            ItemKind::Cue(_) => ItemRef::Cue(self.id.clone()),
        }
    }

    pub fn is_cue(&self) -> bool {
        matches!(self.kind, ItemKind::Cue(_))
    }
}

/// Storage key of an item: artist slots are keyed by artist, cues by cue id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Artist(String),
    Cue(String),
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Artist(id) => write!(f, "artist '{id}'"),
            ItemRef::Cue(id) => write!(f, "cue '{id}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_from_wire_names() {
        for status in ItemStatus::all() {
            let parsed: ItemStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert!("on_stage".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn item_serializes_with_kind_tag() {
        let item = PerformanceItem {
            id: "cue-1".into(),
            event_id: "fest".into(),
            performance_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            order: 2,
            status: ItemStatus::NextOnStage,
            kind: ItemKind::Cue(Cue {
                cue_type: CueType::McBreak,
                title: "MC banter".into(),
                planned_duration: 5,
                notes: String::new(),
            }),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "cue");
        assert_eq!(json["cue_type"], "mc_break");
        assert_eq!(json["status"], "next_on_stage");
        let back: PerformanceItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
        assert_eq!(back.label(), "MC banter");
    }
}
