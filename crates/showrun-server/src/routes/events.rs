use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::Stream;
use serde::Deserialize;
use showrun_core::events::{ChannelKey, DomainEvent, Topic};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_stream::wrappers::ReceiverStream;

use super::blocking;
use crate::broadcaster::{Broadcaster, SessionId};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SseQuery {
    pub event_id: String,
    pub topic: String,
}

/// Session-backed event stream. Dropping it (client gone) closes the session.
struct SessionStream {
    id: SessionId,
    broadcaster: Arc<Broadcaster>,
    inner: ReceiverStream<DomainEvent>,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx).map(|next| {
            next.map(|event| {
                let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                Ok(Event::default().event(event.kind()).data(data))
            })
        })
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.broadcaster.disconnect(self.id);
    }
}

/// GET /api/events?event_id=..&topic=..: SSE variant of the push channel
/// with a single subscription fixed by the query.
pub async fn sse_events(
    State(app): State<AppState>,
    Query(query): Query<SseQuery>,
) -> Result<impl IntoResponse, AppError> {
    let topic: Topic = query.topic.parse()?;
    let event_id = query.event_id.clone();
    blocking(&app, move |c| c.item_store().get_event(&event_id).map(|_| ())).await?;

    let handle = app.broadcaster.connect();
    app.broadcaster
        .subscribe(handle.id, ChannelKey::new(query.event_id, topic));
    let stream = SessionStream {
        id: handle.id,
        broadcaster: app.broadcaster.clone(),
        inner: ReceiverStream::new(handle.rx),
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
