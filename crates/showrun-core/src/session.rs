//! Dashboard-side connection state machine.
//!
//! Subscriptions live with the client: the server keeps only a transient
//! registry, so every (re)connect replays the remembered channels.

use crate::events::{ChannelKey, ClientFrame};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// First connection attempt in progress.
    Connecting,
    /// Live push channel; subscriptions have been sent.
    Connected,
    /// Link lost; waiting out the reconnect interval.
    Disconnected,
    /// A reconnect attempt is in progress.
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// How long to wait before the next reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay every time, unbounded attempts.
    Fixed { interval: Duration },
}

impl ReconnectPolicy {
    pub fn delay(&self, _attempt: u32) -> Duration {
        match self {
            ReconnectPolicy::Fixed { interval } => *interval,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed {
            interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    state: SessionState,
    policy: ReconnectPolicy,
    subscriptions: BTreeSet<ChannelKey>,
    /// Replayed channels the server has not acknowledged yet.
    pending_acks: BTreeSet<ChannelKey>,
    attempts: u32,
}

impl ClientSession {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: SessionState::Connecting,
            policy,
            subscriptions: BTreeSet::new(),
            pending_acks: BTreeSet::new(),
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reconnect attempts since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Remember `channel`. Returns the frame to send now when connected; the
    /// channel is otherwise sent on the next connect.
    pub fn subscribe(&mut self, channel: ChannelKey) -> Option<ClientFrame> {
        let fresh = self.subscriptions.insert(channel.clone());
        (fresh && self.state == SessionState::Connected)
            .then_some(ClientFrame::Subscribe { channel })
    }

    pub fn unsubscribe(&mut self, channel: &ChannelKey) -> Option<ClientFrame> {
        let removed = self.subscriptions.remove(channel);
        (removed && self.state == SessionState::Connected).then(|| ClientFrame::Unsubscribe {
            channel: channel.clone(),
        })
    }

    /// The link is up. Returns the subscribe frames to replay.
    pub fn on_connected(&mut self) -> Vec<ClientFrame> {
        self.state = SessionState::Connected;
        self.attempts = 0;
        self.pending_acks = self.subscriptions.clone();
        self.subscriptions
            .iter()
            .cloned()
            .map(|channel| ClientFrame::Subscribe { channel })
            .collect()
    }

    /// True until the server has acknowledged every replayed channel. Hints
    /// published before then may not reach this client.
    pub fn awaiting_acks(&self) -> bool {
        !self.pending_acks.is_empty()
    }

    /// The server acknowledged `channel`. Returns true when this was the last
    /// outstanding ack of the replay, which is the moment to resynchronize.
    pub fn on_subscribed(&mut self, channel: &ChannelKey) -> bool {
        self.pending_acks.remove(channel) && self.pending_acks.is_empty()
    }

    pub fn on_disconnected(&mut self) {
        self.state = SessionState::Disconnected;
        self.pending_acks.clear();
    }

    /// A connect or reconnect attempt failed.
    pub fn on_connect_failed(&mut self) {
        self.state = SessionState::Disconnected;
        self.pending_acks.clear();
    }

    /// Start the next attempt. Returns the delay to wait first.
    pub fn begin_reconnect(&mut self) -> Duration {
        let delay = self.policy.delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        self.state = SessionState::Reconnecting;
        delay
    }

    /// True whenever push is not live and the client must poll.
    pub fn should_poll(&self) -> bool {
        self.state != SessionState::Connected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;

    fn session() -> ClientSession {
        ClientSession::new(ReconnectPolicy::Fixed {
            interval: Duration::from_secs(3),
        })
    }

    #[test]
    fn subscriptions_before_connect_are_replayed() {
        let mut s = session();
        assert!(s.subscribe(ChannelKey::new("fest", Topic::ShowOrder)).is_none());
        assert!(s.should_poll());

        let frames = s.on_connected();
        assert_eq!(
            frames,
            vec![ClientFrame::Subscribe {
                channel: ChannelKey::new("fest", Topic::ShowOrder)
            }]
        );
        assert!(!s.should_poll());
    }

    #[test]
    fn subscribe_while_connected_sends_once() {
        let mut s = session();
        s.on_connected();
        let channel = ChannelKey::new("fest", Topic::Emergency);
        assert!(s.subscribe(channel.clone()).is_some());
        assert!(s.subscribe(channel.clone()).is_none());
        assert!(s.unsubscribe(&channel).is_some());
        s.on_disconnected();
        assert!(s.on_connected().is_empty());
    }

    #[test]
    fn resync_waits_for_the_last_ack() {
        let order = ChannelKey::new("fest", Topic::ShowOrder);
        let alerts = ChannelKey::new("fest", Topic::Emergency);
        let mut s = session();
        s.subscribe(order.clone());
        s.subscribe(alerts.clone());

        s.on_connected();
        assert!(s.awaiting_acks());
        assert!(!s.on_subscribed(&order));
        assert!(s.awaiting_acks());
        // A duplicate ack does not complete the replay early.
        assert!(!s.on_subscribed(&order));
        assert!(s.on_subscribed(&alerts));
        assert!(!s.awaiting_acks());
        // Late or unknown acks never trigger a second resync.
        assert!(!s.on_subscribed(&alerts));
    }

    #[test]
    fn lost_link_drops_outstanding_acks() {
        let order = ChannelKey::new("fest", Topic::ShowOrder);
        let mut s = session();
        s.subscribe(order.clone());
        s.on_connected();
        s.on_disconnected();
        assert!(!s.awaiting_acks());
        assert!(!s.on_subscribed(&order));

        s.on_connected();
        assert!(s.on_subscribed(&order));
    }

    #[test]
    fn nothing_to_ack_without_subscriptions() {
        let mut s = session();
        assert!(s.on_connected().is_empty());
        assert!(!s.awaiting_acks());
    }

    #[test]
    fn reconnect_cycle_replays_every_channel() {
        let mut s = session();
        s.subscribe(ChannelKey::new("fest", Topic::ShowOrder));
        s.subscribe(ChannelKey::new("fest", Topic::Emergency));
        s.on_connected();

        s.on_disconnected();
        assert_eq!(s.state(), SessionState::Disconnected);
        assert!(s.should_poll());

        assert_eq!(s.begin_reconnect(), Duration::from_secs(3));
        s.on_connect_failed();
        assert_eq!(s.begin_reconnect(), Duration::from_secs(3));
        assert_eq!(s.attempts(), 2);
        assert_eq!(s.state(), SessionState::Reconnecting);

        let frames = s.on_connected();
        assert_eq!(frames.len(), 2);
        assert_eq!(s.attempts(), 0);
    }

    #[test]
    fn fixed_policy_is_unbounded() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), policy.delay(10_000));
    }
}
