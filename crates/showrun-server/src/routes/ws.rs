use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use showrun_core::events::{ClientFrame, ServerFrame};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::broadcaster::{Broadcaster, SessionHandle, SessionId};
use crate::state::AppState;

/// GET /api/ws: push channel for dashboards.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app.broadcaster.clone()))
}

async fn send_json<T: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(value).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

fn handle_frame(broadcaster: &Broadcaster, id: SessionId, frame: ClientFrame) -> ServerFrame {
    match frame {
        ClientFrame::Subscribe { channel } => {
            if broadcaster.subscribe(id, channel.clone()) {
                debug!(session = %id, channel = %channel, "subscribed");
                ServerFrame::Subscribed { channel }
            } else {
                ServerFrame::Error {
                    message: "session is no longer registered".to_string(),
                }
            }
        }
        ClientFrame::Unsubscribe { channel } => {
            broadcaster.unsubscribe(id, &channel);
            ServerFrame::Unsubscribed { channel }
        }
        ClientFrame::Ping => ServerFrame::Pong,
    }
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let SessionHandle { id, mut rx } = broadcaster.connect();
    let (mut sender, mut receiver) = socket.split();
    info!(session = %id, "dashboard connected");

    let welcome = ServerFrame::Welcome {
        session: id.to_string(),
    };
    if send_json(&mut sender, &welcome).await.is_err() {
        broadcaster.disconnect(id);
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    if let Err(e) = send_json(&mut sender, &event).await {
                        warn!(session = %id, error = %e, "push failed");
                        break;
                    }
                }
                None => {
                    debug!(session = %id, "session pruned");
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                        Ok(frame) => handle_frame(&broadcaster, id, frame),
                        Err(e) => ServerFrame::Error {
                            message: format!("invalid frame: {e}"),
                        },
                    };
                    if send_json(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session = %id, error = %e, "websocket error");
                    break;
                }
            }
        }
    }

    broadcaster.disconnect(id);
    info!(session = %id, "dashboard disconnected");
}
