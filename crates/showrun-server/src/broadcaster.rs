//! Session registry and channel fan-out.
//!
//! Sessions are transient: they exist while a dashboard is connected and hold
//! no durable subscription state. A session whose outbound queue is full or
//! closed is marked stale and stops receiving; the pruner reclaims it, which
//! closes its receiver and ends the connection so the client reconnects and
//! reloads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use showrun_core::events::{ChannelKey, DomainEvent, EventSink};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

pub type SessionId = Uuid;

struct Session {
    tx: mpsc::Sender<DomainEvent>,
    channels: HashSet<ChannelKey>,
    stale: bool,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, Session>,
    channels: HashMap<ChannelKey, HashSet<SessionId>>,
}

impl Registry {
    fn detach(&mut self, id: SessionId, channel: &ChannelKey) {
        if let Some(members) = self.channels.get_mut(channel) {
            members.remove(&id);
            if members.is_empty() {
                self.channels.remove(channel);
            }
        }
    }

    fn drop_session(&mut self, id: SessionId) -> bool {
        let Some(session) = self.sessions.remove(&id) else {
            return false;
        };
        for channel in &session.channels {
            self.detach(id, channel);
        }
        true
    }
}

/// A connected session's identity and its event queue.
pub struct SessionHandle {
    pub id: SessionId,
    pub rx: mpsc::Receiver<DomainEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub channel: ChannelKey,
    pub subscribers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub id: SessionId,
    pub channels: usize,
    pub stale: bool,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStats {
    pub sessions: Vec<SessionStats>,
    pub channels: Vec<ChannelStats>,
}

pub struct Broadcaster {
    buffer: usize,
    registry: Mutex<Registry>,
}

impl Broadcaster {
    /// `buffer` is the per-session queue depth.
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            registry: Mutex::new(Registry::default()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self) -> SessionHandle {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.registry().sessions.insert(
            id,
            Session {
                tx,
                channels: HashSet::new(),
                stale: false,
                connected_at: Utc::now(),
            },
        );
        debug!(session = %id, "session registered");
        SessionHandle { id, rx }
    }

    /// Add `channel` to the session. Returns false for an unknown session.
    pub fn subscribe(&self, id: SessionId, channel: ChannelKey) -> bool {
        let mut registry = self.registry();
        let Some(session) = registry.sessions.get_mut(&id) else {
            return false;
        };
        session.channels.insert(channel.clone());
        registry.channels.entry(channel).or_default().insert(id);
        true
    }

    pub fn unsubscribe(&self, id: SessionId, channel: &ChannelKey) -> bool {
        let mut registry = self.registry();
        let removed = registry
            .sessions
            .get_mut(&id)
            .is_some_and(|s| s.channels.remove(channel));
        if removed {
            registry.detach(id, channel);
        }
        removed
    }

    pub fn disconnect(&self, id: SessionId) {
        if self.registry().drop_session(id) {
            debug!(session = %id, "session closed");
        }
    }

    /// Queue `event` for every live session subscribed to its channel.
    /// Never blocks; returns the number of sessions it was queued for.
    pub fn fan_out(&self, event: &DomainEvent) -> usize {
        let channel = event.channel();
        let mut guard = self.registry();
        let registry = &mut *guard;
        let Some(members) = registry.channels.get(&channel) else {
            return 0;
        };

        let mut delivered = 0;
        for id in members {
            let Some(session) = registry.sessions.get_mut(id) else {
                continue;
            };
            if session.stale {
                continue;
            }
            match session.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(session = %id, channel = %channel, "session queue full; marking stale");
                    session.stale = true;
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(session = %id, channel = %channel, "session gone; marking stale");
                    session.stale = true;
                }
            }
        }
        delivered
    }

    /// Drop stale sessions. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut registry = self.registry();
        let stale: Vec<SessionId> = registry
            .sessions
            .iter()
            .filter(|(_, s)| s.stale || s.tx.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            registry.drop_session(*id);
        }
        if !stale.is_empty() {
            debug!(pruned = stale.len(), "pruned stale sessions");
        }
        stale.len()
    }

    pub fn stats(&self) -> SyncStats {
        let registry = self.registry();
        let mut sessions: Vec<SessionStats> = registry
            .sessions
            .iter()
            .map(|(id, s)| SessionStats {
                id: *id,
                channels: s.channels.len(),
                stale: s.stale,
                connected_at: s.connected_at,
            })
            .collect();
        sessions.sort_by_key(|s| s.connected_at);
        let mut channels: Vec<ChannelStats> = registry
            .channels
            .iter()
            .map(|(channel, members)| ChannelStats {
                channel: channel.clone(),
                subscribers: members.len(),
            })
            .collect();
        channels.sort_by(|a, b| a.channel.cmp(&b.channel));
        SyncStats { sessions, channels }
    }
}

impl EventSink for Broadcaster {
    fn publish(&self, event: DomainEvent) {
        let delivered = self.fan_out(&event);
        debug!(
            event_id = %event.event_id(),
            kind = event.kind(),
            delivered,
            "published"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use showrun_core::events::{ClearHint, ShowOrderHint, Topic};

    fn show_order(event_id: &str) -> DomainEvent {
        DomainEvent::ShowOrderChanged {
            event_id: event_id.into(),
            payload: ShowOrderHint {
                date: None,
                revision: Some(1),
                cursor: None,
            },
        }
    }

    fn clear(event_id: &str) -> DomainEvent {
        DomainEvent::EmergencyClear {
            event_id: event_id.into(),
            payload: ClearHint {
                broadcast_id: "B1".into(),
            },
        }
    }

    #[test]
    fn fan_out_reaches_only_matching_channel() {
        let b = Broadcaster::new(8);
        let mut orders = b.connect();
        let mut alerts = b.connect();
        b.subscribe(orders.id, ChannelKey::new("fest", Topic::ShowOrder));
        b.subscribe(alerts.id, ChannelKey::new("fest", Topic::Emergency));

        assert_eq!(b.fan_out(&show_order("fest")), 1);
        assert_eq!(b.fan_out(&show_order("other")), 0);
        assert_eq!(orders.rx.try_recv().unwrap(), show_order("fest"));
        assert!(alerts.rx.try_recv().is_err());
    }

    #[test]
    fn delivery_preserves_publish_order() {
        let b = Broadcaster::new(8);
        let mut s = b.connect();
        b.subscribe(s.id, ChannelKey::new("fest", Topic::Emergency));
        for n in 1..=3 {
            b.publish(DomainEvent::EmergencyClear {
                event_id: "fest".into(),
                payload: ClearHint {
                    broadcast_id: format!("B{n}"),
                },
            });
        }
        let ids: Vec<String> = (0..3)
            .map(|_| match s.rx.try_recv().unwrap() {
                DomainEvent::EmergencyClear { payload, .. } => payload.broadcast_id,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["B1", "B2", "B3"]);
    }

    #[test]
    fn full_queue_marks_stale_without_blocking_others() {
        let b = Broadcaster::new(1);
        let slow = b.connect();
        let mut fast = b.connect();
        let channel = ChannelKey::new("fest", Topic::Emergency);
        b.subscribe(slow.id, channel.clone());
        b.subscribe(fast.id, channel);

        assert_eq!(b.fan_out(&clear("fest")), 2);
        fast.rx.try_recv().unwrap();
        // slow never drains its queue
        assert_eq!(b.fan_out(&clear("fest")), 1);
        assert!(b.stats().sessions.iter().any(|s| s.id == slow.id && s.stale));

        assert_eq!(b.prune(), 1);
        assert_eq!(b.stats().sessions.len(), 1);
        drop(slow);
    }

    #[test]
    fn dropped_receiver_is_pruned() {
        let b = Broadcaster::new(4);
        let gone = b.connect();
        b.subscribe(gone.id, ChannelKey::new("fest", Topic::ShowOrder));
        drop(gone.rx);
        assert_eq!(b.fan_out(&show_order("fest")), 0);
        assert_eq!(b.prune(), 1);
        assert!(b.stats().channels.is_empty());
    }

    #[test]
    fn empty_channels_are_reclaimed() {
        let b = Broadcaster::new(4);
        let s = b.connect();
        let channel = ChannelKey::new("fest", Topic::ShowOrder);
        b.subscribe(s.id, channel.clone());
        assert_eq!(b.stats().channels.len(), 1);

        assert!(b.unsubscribe(s.id, &channel));
        assert!(b.stats().channels.is_empty());

        b.subscribe(s.id, channel);
        b.disconnect(s.id);
        let stats = b.stats();
        assert!(stats.sessions.is_empty());
        assert!(stats.channels.is_empty());
    }

    #[test]
    fn subscribe_unknown_session_is_refused() {
        let b = Broadcaster::new(4);
        assert!(!b.subscribe(Uuid::new_v4(), ChannelKey::new("fest", Topic::ShowOrder)));
        assert!(b.stats().channels.is_empty());
    }
}
