use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer};
use showrun_core::coordinator::{LineupUpdate, NewItem};
use showrun_core::paths;
use showrun_core::show_order::{Cursor, Lineup};
use showrun_core::store::{CuePatch, SlotPatch};
use showrun_core::types::ItemStatus;

use super::blocking;
use crate::error::AppError;
use crate::state::AppState;

/// `{ "from": null }` expects pre-show; an absent `from` means "wherever it is now".
/// Retries after a 503 must carry `from`: the timed-out move may have landed,
/// and only an explicit `from` makes the retry a replay.
fn present<'de, D>(d: D) -> Result<Option<Cursor>, D::Error>
where
    D: Deserializer<'de>,
{
    Cursor::deserialize(d).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct MoveBody {
    #[serde(default, deserialize_with = "present")]
    pub from: Option<Cursor>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: ItemStatus,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub to_index: usize,
}

fn lineup_json(lineup: &Lineup) -> serde_json::Value {
    serde_json::json!({
        "event_id": lineup.event_id(),
        "date": lineup.date(),
        "revision": lineup.revision(),
        "cursor": lineup.cursor(),
        "items": lineup.items(),
        "spotlight": lineup.spotlight(),
    })
}

fn update_json(update: &LineupUpdate) -> serde_json::Value {
    let mut body = serde_json::json!({
        "changed": update.changed,
        "lineup": lineup_json(&update.lineup),
    });
    if let Some(id) = &update.item_id {
        body["item_id"] = serde_json::json!(id);
    }
    body
}

/// GET /api/events/{event_id}/order/{date}: current lineup and spotlight.
pub async fn get_lineup(
    State(app): State<AppState>,
    Path((event_id, date)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = paths::parse_date(&date)?;
    let result = blocking(&app, move |c| {
        let lineup = c.load(&event_id, date)?;
        Ok(lineup_json(&lineup))
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/order/{date}/advance
pub async fn advance(
    State(app): State<AppState>,
    Path((event_id, date)): Path<(String, String)>,
    body: Option<Json<MoveBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = paths::parse_date(&date)?;
    let from = body.map(|Json(b)| b.from).unwrap_or_default();
    let result = blocking(&app, move |c| {
        let update = c.advance(&event_id, date, from)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/order/{date}/retreat
pub async fn retreat(
    State(app): State<AppState>,
    Path((event_id, date)): Path<(String, String)>,
    body: Option<Json<MoveBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = paths::parse_date(&date)?;
    let from = body.map(|Json(b)| b.from).unwrap_or_default();
    let result = blocking(&app, move |c| {
        let update = c.retreat(&event_id, date, from)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/order/{date}/items: schedule an artist or cue.
pub async fn insert_item(
    State(app): State<AppState>,
    Path((event_id, date)): Path<(String, String)>,
    Json(item): Json<NewItem>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let date = paths::parse_date(&date)?;
    let result = blocking(&app, move |c| {
        let update = c.insert(&event_id, date, item)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// DELETE /api/events/{event_id}/order/{date}/items/{item_id}
pub async fn remove_item(
    State(app): State<AppState>,
    Path((event_id, date, item_id)): Path<(String, String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = paths::parse_date(&date)?;
    let result = blocking(&app, move |c| {
        let update = c.remove(&event_id, date, &item_id)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok(Json(result))
}

/// PUT /api/events/{event_id}/order/{date}/items/{item_id}/position
pub async fn move_item(
    State(app): State<AppState>,
    Path((event_id, date, item_id)): Path<(String, String, String)>,
    Json(body): Json<PositionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = paths::parse_date(&date)?;
    let result = blocking(&app, move |c| {
        let update = c.move_item(&event_id, date, &item_id, body.to_index)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/events/{event_id}/items/{item_id}/status: manual override.
pub async fn set_status(
    State(app): State<AppState>,
    Path((event_id, item_id)): Path<(String, String)>,
    Json(body): Json<StatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = body.date.as_deref().map(paths::parse_date).transpose()?;
    let result = blocking(&app, move |c| {
        let update = c.set_status(&event_id, &item_id, date, body.status)?;
        Ok(update_json(&update))
    })
    .await?;
    Ok(Json(result))
}

/// PATCH /api/events/{event_id}/artists/{artist_id}: scheduling metadata.
pub async fn patch_artist(
    State(app): State<AppState>,
    Path((event_id, artist_id)): Path<(String, String)>,
    Json(patch): Json<SlotPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = blocking(&app, move |c| {
        let record = c.update_artist(&event_id, &artist_id, &patch)?;
        Ok(serde_json::to_value(record)?)
    })
    .await?;
    Ok(Json(result))
}

pub async fn patch_cue(
    State(app): State<AppState>,
    Path((event_id, cue_id)): Path<(String, String)>,
    Json(patch): Json<CuePatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = blocking(&app, move |c| {
        let record = c.update_cue(&event_id, &cue_id, &patch)?;
        Ok(serde_json::to_value(record)?)
    })
    .await?;
    Ok(Json(result))
}
