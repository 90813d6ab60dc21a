//! Emergency broadcasts: urgent operator alerts that override normal display.
//!
//! Records are append-only. A broadcast goes inactive exactly once and is
//! never reactivated; raising the same alert again creates a new record.
//! Ids are sequential per event: B1, B2, B3, …

use crate::error::{Result, ShowError};
use crate::store::EmergencyStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyCode {
    Red,
    Orange,
    Yellow,
    Blue,
    Green,
}

impl EmergencyCode {
    pub fn as_str(self) -> &'static str {
        match self {
            EmergencyCode::Red => "red",
            EmergencyCode::Orange => "orange",
            EmergencyCode::Yellow => "yellow",
            EmergencyCode::Blue => "blue",
            EmergencyCode::Green => "green",
        }
    }
}

impl fmt::Display for EmergencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmergencyCode {
    type Err = ShowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "red" => Ok(EmergencyCode::Red),
            "orange" => Ok(EmergencyCode::Orange),
            "yellow" => Ok(EmergencyCode::Yellow),
            "blue" => Ok(EmergencyCode::Blue),
            "green" => Ok(EmergencyCode::Green),
            _ => Err(ShowError::InvalidInput(format!(
                "unknown emergency code '{s}': must be red, orange, yellow, blue, or green"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyBroadcast {
    pub id: String,
    pub event_id: String,
    pub message: String,
    pub code: EmergencyCode,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl EmergencyBroadcast {
    /// Returns `false` when the broadcast was already inactive.
    fn deactivate(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.deactivated_at = Some(Utc::now());
        true
    }
}

/// Result of [`deactivate`]; `was_active` is false for a repeated call.
#[derive(Debug, Clone, Serialize)]
pub struct Deactivated {
    pub broadcast: EmergencyBroadcast,
    pub was_active: bool,
}

fn next_id(items: &[EmergencyBroadcast]) -> String {
    let highest = items
        .iter()
        .filter_map(|b| b.id.strip_prefix('B')?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("B{}", highest + 1)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Raise a new active alert. Other active alerts are left alone: a facility
/// alert and a security alert may run at the same time.
pub fn create(
    store: &dyn EmergencyStore,
    event_id: &str,
    message: &str,
    code: EmergencyCode,
) -> Result<EmergencyBroadcast> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ShowError::InvalidInput(
            "broadcast message must not be empty".to_string(),
        ));
    }
    let existing = store.load_broadcasts(event_id)?;
    let broadcast = EmergencyBroadcast {
        id: next_id(&existing),
        event_id: event_id.to_string(),
        message: message.to_string(),
        code,
        is_active: true,
        created_at: Utc::now(),
        deactivated_at: None,
    };
    store.append_broadcast(event_id, &broadcast)?;
    Ok(broadcast)
}

/// Clear an alert. Repeating the call is a no-op that still succeeds.
pub fn deactivate(store: &dyn EmergencyStore, event_id: &str, id: &str) -> Result<Deactivated> {
    let mut broadcast = get(store, event_id, id)?;
    let was_active = broadcast.deactivate();
    if was_active {
        store.patch_broadcast(event_id, &broadcast)?;
    }
    Ok(Deactivated {
        broadcast,
        was_active,
    })
}

/// Active broadcasts, oldest first.
pub fn list(store: &dyn EmergencyStore, event_id: &str) -> Result<Vec<EmergencyBroadcast>> {
    Ok(store
        .load_broadcasts(event_id)?
        .into_iter()
        .filter(|b| b.is_active)
        .collect())
}

/// Every broadcast ever raised for the event, newest first.
pub fn history(store: &dyn EmergencyStore, event_id: &str) -> Result<Vec<EmergencyBroadcast>> {
    let mut all = store.load_broadcasts(event_id)?;
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    Ok(all)
}

pub fn get(store: &dyn EmergencyStore, event_id: &str, id: &str) -> Result<EmergencyBroadcast> {
    store
        .load_broadcasts(event_id)?
        .into_iter()
        .find(|b| b.id == id)
        .ok_or_else(|| ShowError::BroadcastNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
