use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use showrun_core::emergency::EmergencyCode;

use super::blocking;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub message: String,
    pub code: String,
}

/// GET /api/events/{event_id}/broadcasts: active alerts, or `?all=true` for history.
pub async fn list_broadcasts(
    State(app): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = blocking(&app, move |c| {
        let list = if query.all {
            c.broadcast_history(&event_id)?
        } else {
            c.list_broadcasts(&event_id)?
        };
        Ok(serde_json::to_value(list)?)
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/broadcasts: raise an alert.
pub async fn create_broadcast(
    State(app): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<CreateBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let code: EmergencyCode = body.code.parse()?;
    let result = blocking(&app, move |c| {
        let broadcast = c.create_broadcast(&event_id, &body.message, code)?;
        Ok(serde_json::to_value(broadcast)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/events/{event_id}/broadcasts/{id}
pub async fn get_broadcast(
    State(app): State<AppState>,
    Path((event_id, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = blocking(&app, move |c| {
        Ok(serde_json::to_value(c.get_broadcast(&event_id, &id)?)?)
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/broadcasts/{id}/deactivate: idempotent.
pub async fn deactivate_broadcast(
    State(app): State<AppState>,
    Path((event_id, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = blocking(&app, move |c| {
        let outcome = c.deactivate_broadcast(&event_id, &id)?;
        Ok(serde_json::to_value(outcome)?)
    })
    .await?;
    Ok(Json(result))
}
