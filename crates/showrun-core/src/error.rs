use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShowError {
    #[error("not initialized: run 'showrun init'")]
    NotInitialized,

    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("event already exists: {0}")]
    EventExists(String),

    #[error("artist not found: {0}")]
    ArtistNotFound(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("item already scheduled: {0}")]
    ItemExists(String),

    #[error("broadcast not found: {0}")]
    BroadcastNotFound(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Error codes reported on the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    InvalidTransition,
    Conflict,
    StoreUnavailable,
    BadRequest,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::Conflict => "conflict",
            ErrorCode::StoreUnavailable => "store_unavailable",
            ErrorCode::BadRequest => "bad_request",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ShowError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ShowError::EventNotFound(_)
            | ShowError::ArtistNotFound(_)
            | ShowError::ItemNotFound(_)
            | ShowError::BroadcastNotFound(_) => ErrorCode::NotFound,
            ShowError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            ShowError::Conflict(_) | ShowError::EventExists(_) | ShowError::ItemExists(_) => {
                ErrorCode::Conflict
            }
            ShowError::InvalidInput(_) | ShowError::NotInitialized => ErrorCode::BadRequest,
            ShowError::StoreUnavailable(_)
            | ShowError::Io(_)
            | ShowError::Yaml(_)
            | ShowError::Json(_) => ErrorCode::StoreUnavailable,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShowError>;
