pub mod broadcasts;
pub mod events;
pub mod order;
pub mod sync;
pub mod ws;

use crate::error::AppError;
use crate::state::AppState;
use showrun_core::coordinator::Coordinator;

/// Run a store-touching command on the blocking pool, bounded by
/// `store.timeout_ms`. A timed-out command is reported as `store_unavailable`;
/// the blocking task itself cannot be cancelled and may still complete.
///
/// A 503 therefore means "outcome unknown". Callers reload before retrying,
/// and cursor moves are retried with an explicit `from`, which turns a late
/// commit into a no-op replay instead of a second move.
pub(crate) async fn blocking<T, F>(app: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Coordinator) -> showrun_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let coordinator = app.coordinator.clone();
    let limit = app.config.store.timeout();
    let task = tokio::task::spawn_blocking(move || f(&coordinator));
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => Ok(joined.map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??),
        Err(_) => Err(AppError::unavailable(format!(
            "store did not respond within {}ms; the command may still apply, reload before retrying",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::NaiveDate;
    use showrun_core::config::Config;
    use showrun_core::coordinator::NewItem;
    use showrun_core::show_order::Cursor;
    use showrun_core::store::{ArtistSlotRecord, EventRecord};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()
    }

    /// One scheduled artist and a 1ms store timeout.
    fn impatient_app() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let mut app = AppState::new(dir.path().to_path_buf());
        let mut config = Config::default();
        config.store.timeout_ms = 1;
        app.config = Arc::new(config);

        let c = &app.coordinator;
        c.create_event(&EventRecord::new("fest", "Summer Fest", vec![date()]))
            .unwrap();
        c.register_artist("fest", &ArtistSlotRecord::new("a", "A"))
            .unwrap();
        c.insert(
            "fest",
            date(),
            NewItem::Artist {
                artist_id: "a".into(),
                order: None,
            },
        )
        .unwrap();
        (dir, app)
    }

    #[tokio::test]
    async fn slow_command_answers_503() {
        let (_dir, app) = impatient_app();
        let err = blocking(&app, |_| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn retry_with_from_after_timeout_moves_once() {
        let (_dir, app) = impatient_app();
        let err = blocking(&app, |c| {
            std::thread::sleep(Duration::from_millis(100));
            c.advance("fest", date(), Some(Cursor::PreShow))
        })
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        // The timed-out advance still lands in the background.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let retry = app
            .coordinator
            .advance("fest", date(), Some(Cursor::PreShow))
            .unwrap();
        assert!(!retry.changed);
        assert_eq!(retry.lineup.cursor(), Cursor::OnStage(0));
    }
}
