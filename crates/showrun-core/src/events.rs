//! Domain events and the wire frames exchanged with dashboard sessions.
//!
//! A domain event is an invalidation hint: receivers re-load the lineup or
//! re-list broadcasts instead of trusting the payload as data of record.

use crate::emergency::EmergencyBroadcast;
use crate::error::ShowError;
use crate::show_order::Cursor;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Topic / ChannelKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    ShowOrder,
    Emergency,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::ShowOrder => "show-order",
            Topic::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = ShowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show-order" => Ok(Topic::ShowOrder),
            "emergency" => Ok(Topic::Emergency),
            _ => Err(ShowError::InvalidInput(format!(
                "unknown topic '{s}': must be show-order or emergency"
            ))),
        }
    }
}

/// Subscription channel: one topic scoped to one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub event_id: String,
    pub topic: Topic,
}

impl ChannelKey {
    pub fn new(event_id: impl Into<String>, topic: Topic) -> Self {
        Self {
            event_id: event_id.into(),
            topic,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.topic)
    }
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowOrderHint {
    /// `None` when the change was noticed without knowing the date (external writer).
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearHint {
    pub broadcast_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DomainEvent {
    ShowOrderChanged {
        event_id: String,
        payload: ShowOrderHint,
    },
    EmergencyAlert {
        event_id: String,
        payload: EmergencyBroadcast,
    },
    EmergencyClear {
        event_id: String,
        payload: ClearHint,
    },
}

impl DomainEvent {
    pub fn event_id(&self) -> &str {
        match self {
            DomainEvent::ShowOrderChanged { event_id, .. }
            | DomainEvent::EmergencyAlert { event_id, .. }
            | DomainEvent::EmergencyClear { event_id, .. } => event_id,
        }
    }

    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::ShowOrderChanged { .. } => Topic::ShowOrder,
            DomainEvent::EmergencyAlert { .. } | DomainEvent::EmergencyClear { .. } => {
                Topic::Emergency
            }
        }
    }

    pub fn channel(&self) -> ChannelKey {
        ChannelKey::new(self.event_id(), self.topic())
    }

    /// Wire name of the event type (`show-order-changed`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::ShowOrderChanged { .. } => "show-order-changed",
            DomainEvent::EmergencyAlert { .. } => "emergency-alert",
            DomainEvent::EmergencyClear { .. } => "emergency-clear",
        }
    }
}

/// Receiver of committed mutations. Publishing never fails the mutation.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Sink for callers with no connected sessions (CLI, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: DomainEvent) {}
}

// ---------------------------------------------------------------------------
// Session wire frames
// ---------------------------------------------------------------------------

/// Frames a dashboard sends after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { channel: ChannelKey },
    Unsubscribe { channel: ChannelKey },
    Ping,
}

/// Control frames the server sends; domain events travel as [`DomainEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Welcome { session: String },
    Subscribed { channel: ChannelKey },
    Unsubscribed { channel: ChannelKey },
    Pong,
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_event_wire_shape() {
        let event = DomainEvent::EmergencyClear {
            event_id: "fest".into(),
            payload: ClearHint {
                broadcast_id: "B1".into(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "emergency-clear");
        assert_eq!(json["event_id"], "fest");
        assert_eq!(json["payload"]["broadcast_id"], "B1");
        assert_eq!(event.kind(), "emergency-clear");
        assert_eq!(event.channel(), ChannelKey::new("fest", Topic::Emergency));
    }

    #[test]
    fn subscribe_frame_parses() {
        let raw = r#"{"type":"subscribe","channel":{"event_id":"fest","topic":"show-order"}}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Subscribe {
                channel: ChannelKey::new("fest", Topic::ShowOrder)
            }
        );
    }

    #[test]
    fn topic_round_trips_through_str() {
        assert_eq!("show-order".parse::<Topic>().unwrap(), Topic::ShowOrder);
        assert_eq!(Topic::Emergency.to_string(), "emergency");
        assert!("alerts".parse::<Topic>().is_err());
    }
}
