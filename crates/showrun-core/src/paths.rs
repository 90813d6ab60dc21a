use crate::error::{Result, ShowError};
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SHOWRUN_DIR: &str = ".showrun";
pub const EVENTS_DIR: &str = ".showrun/events";
pub const CONFIG_FILE: &str = ".showrun/config.yaml";

pub const EVENT_FILE: &str = "event.yaml";
pub const ARTISTS_FILE: &str = "artists.yaml";
pub const CUES_FILE: &str = "cues.yaml";
pub const EMERGENCY_FILE: &str = "emergency.yaml";
pub const LINEUPS_DIR: &str = "lineups";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn showrun_dir(root: &Path) -> PathBuf {
    root.join(SHOWRUN_DIR)
}

pub fn events_dir(root: &Path) -> PathBuf {
    root.join(EVENTS_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn event_dir(root: &Path, event_id: &str) -> PathBuf {
    events_dir(root).join(event_id)
}

pub fn event_manifest(root: &Path, event_id: &str) -> PathBuf {
    event_dir(root, event_id).join(EVENT_FILE)
}

pub fn artists_path(root: &Path, event_id: &str) -> PathBuf {
    event_dir(root, event_id).join(ARTISTS_FILE)
}

pub fn cues_path(root: &Path, event_id: &str) -> PathBuf {
    event_dir(root, event_id).join(CUES_FILE)
}

pub fn emergency_path(root: &Path, event_id: &str) -> PathBuf {
    event_dir(root, event_id).join(EMERGENCY_FILE)
}

pub fn lineups_dir(root: &Path, event_id: &str) -> PathBuf {
    event_dir(root, event_id).join(LINEUPS_DIR)
}

pub fn lineup_path(root: &Path, event_id: &str, date: NaiveDate) -> PathBuf {
    lineups_dir(root, event_id).join(format!("{date}.yaml"))
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").expect("static id pattern")
    })
}

/// Event and artist ids double as directory and document keys.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(ShowError::InvalidInput(format!(
            "invalid id '{id}': must be lowercase alphanumeric with hyphens"
        )));
    }
    Ok(())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ShowError::InvalidInput(format!("invalid date '{raw}': expected YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        for id in ["summer-fest", "a", "stage-2", "x1"] {
            validate_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_ids() {
        for id in ["", "-lead", "trail-", "has space", "UPPER", "a_b", "../etc"] {
            assert!(validate_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn lineup_path_is_keyed_by_date() {
        let root = Path::new("/tmp/show");
        let date = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();
        assert_eq!(
            lineup_path(root, "fest", date),
            PathBuf::from("/tmp/show/.showrun/events/fest/lineups/2026-07-04.yaml")
        );
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2026-13-40").is_err());
        assert_eq!(
            parse_date("2026-07-04").unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()
        );
    }
}
