//! `showrun watch`: a live board for one lineup.
//!
//! Push frames over `/api/ws` are only hints; every hint triggers a fresh
//! fetch of the lineup and active alerts. While the socket is down the board
//! polls on the configured interval and reconnects on a fixed delay.

use crate::output::{print_json, print_lineup, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use showrun_core::config::Config;
use showrun_core::emergency::EmergencyBroadcast;
use showrun_core::events::{ChannelKey, DomainEvent, ServerFrame, Topic};
use showrun_core::paths;
use showrun_core::session::{ClientSession, ReconnectPolicy};
use showrun_core::show_order::Lineup;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub fn run(
    root: &Path,
    event_id: &str,
    date: &str,
    url: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    paths::validate_id(event_id)?;
    let date = paths::parse_date(date)?;
    let config = Config::load_or_default(root).context("failed to read config")?;
    let base = url.unwrap_or_else(|| format!("http://localhost:{}", config.server.port));

    let board = Board {
        http: reqwest::Client::new(),
        base: base.trim_end_matches('/').to_string(),
        event_id: event_id.to_string(),
        date,
        json,
        poll_interval: config.sync.poll_interval(),
    };
    let mut session = ClientSession::new(ReconnectPolicy::Fixed {
        interval: config.sync.reconnect_interval(),
    });
    session.subscribe(ChannelKey::new(event_id, Topic::ShowOrder));
    session.subscribe(ChannelKey::new(event_id, Topic::Emergency));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            result = follow(&board, &mut session) => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}

/// `http://host:port` to the push endpoint URL.
fn ws_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws}/api/ws")
}

struct Board {
    http: reqwest::Client,
    base: String,
    event_id: String,
    date: NaiveDate,
    json: bool,
    poll_interval: Duration,
}

impl Board {
    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = format!("{}{path}", self.base);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Re-read the lineup and active alerts and redraw.
    async fn refresh(&self) -> anyhow::Result<()> {
        let lineup: Lineup = self
            .fetch(&format!("/api/events/{}/order/{}", self.event_id, self.date))
            .await?;
        let alerts: Vec<EmergencyBroadcast> = self
            .fetch(&format!("/api/events/{}/broadcasts", self.event_id))
            .await?;

        if self.json {
            return print_json(&serde_json::json!({
                "lineup": lineup,
                "alerts": alerts,
            }));
        }
        if !alerts.is_empty() {
            println!("!! EMERGENCY");
            let rows = alerts
                .iter()
                .map(|a| vec![a.id.clone(), a.code.to_string(), a.message.clone()])
                .collect();
            print_table(&["ID", "CODE", "MESSAGE"], rows);
            println!();
        }
        print_lineup(&lineup);
        println!();
        Ok(())
    }

    async fn refresh_or_warn(&self) {
        if let Err(e) = self.refresh().await {
            warn!(event_id = %self.event_id, "refresh failed: {e:#}");
        }
    }
}

async fn follow(board: &Board, session: &mut ClientSession) -> anyhow::Result<()> {
    let url = ws_url(&board.base);
    let mut next_poll = Instant::now();

    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(%url, "connected");
                let (mut sink, mut stream) = socket.split();
                let mut replay_failed = false;
                for frame in session.on_connected() {
                    let text = serde_json::to_string(&frame)?;
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!("subscribe failed: {e}");
                        replay_failed = true;
                        break;
                    }
                }
                if !replay_failed {
                    // Resync once the server has every channel registered, so
                    // no commit falls between the fetch and the first hint.
                    if !session.awaiting_acks() {
                        board.refresh_or_warn().await;
                    }
                    while let Some(msg) = stream.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                on_frame(board, session, text.as_str()).await
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                warn!("push connection error: {e}");
                                break;
                            }
                        }
                    }
                }
                session.on_disconnected();
                warn!("push connection lost; polling every {:?}", board.poll_interval);
            }
            Err(e) => {
                session.on_connect_failed();
                debug!(attempt = session.attempts(), "connect failed: {e}");
            }
        }

        let delay = session.begin_reconnect();
        let reconnect_at = Instant::now() + delay;
        loop {
            if session.should_poll() && Instant::now() >= next_poll {
                board.refresh_or_warn().await;
                next_poll = Instant::now() + board.poll_interval;
            }
            if Instant::now() >= reconnect_at {
                break;
            }
            tokio::time::sleep_until(next_poll.min(reconnect_at)).await;
        }
    }
}

async fn on_frame(board: &Board, session: &mut ClientSession, text: &str) {
    if let Ok(event) = serde_json::from_str::<DomainEvent>(text) {
        debug!(kind = event.kind(), "hint");
        board.refresh_or_warn().await;
        return;
    }
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Welcome { session: id }) => debug!(session = %id, "welcome"),
        Ok(ServerFrame::Subscribed { channel }) => {
            debug!(%channel, "subscribed");
            if session.on_subscribed(&channel) {
                // Anything committed while disconnected shows up here.
                board.refresh_or_warn().await;
            }
        }
        Ok(ServerFrame::Error { message }) => warn!("server: {message}"),
        Ok(_) => {}
        Err(e) => warn!("unreadable frame: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_swaps_scheme() {
        assert_eq!(ws_url("http://localhost:4150"), "ws://localhost:4150/api/ws");
        assert_eq!(ws_url("https://stage.example/"), "wss://stage.example/api/ws");
    }
}
