//! Edge-triggered connectivity monitoring.
//!
//! The agent watches two independent links: the WiFi association and
//! the telemetry session. Each gets a [`LinkMonitor`] that compares the
//! state seen this driver pass against the previous pass and reports
//! only the transitions, so a long outage counts once no matter how
//! many passes observe it.

use serde::{Deserialize, Serialize};

/// The two independently monitored connectivity layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkChannel {
    /// Station-mode WiFi association.
    Wifi,
    /// Authenticated telemetry session on top of the network.
    Telemetry,
}

impl LinkChannel {
    /// Short name used in logs.
    pub fn label(self) -> &'static str {
        match self {
            LinkChannel::Wifi => "wifi",
            LinkChannel::Telemetry => "telemetry",
        }
    }
}

/// A state transition observed on one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkEvent {
    /// The link was up last pass and is down now.
    Down,
    /// The link was down last pass and is up now.
    Up,
}

/// Tracks one link's previous state and reports transitions.
///
/// Reconnection policy lives with the caller. The agent reissues a
/// fire-and-forget connect on every pass that observes the link down,
/// with no backoff and no retry cap; a deployment behind a flaky
/// gateway will want to bound that before reusing the loop.
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    channel: LinkChannel,
    was_connected: bool,
}

impl LinkMonitor {
    /// Create a monitor seeded with the state observed at startup, so
    /// the first pass of the loop does not fire a spurious edge.
    pub fn new(channel: LinkChannel, initially_connected: bool) -> Self {
        Self {
            channel,
            was_connected: initially_connected,
        }
    }

    /// Which link this monitor watches.
    pub fn channel(&self) -> LinkChannel {
        self.channel
    }

    /// The state seen on the most recent observation.
    pub fn is_connected(&self) -> bool {
        self.was_connected
    }

    /// Record the state seen this pass and return the edge, if any.
    pub fn observe(&mut self, connected: bool) -> Option<LinkEvent> {
        let event = match (self.was_connected, connected) {
            (true, false) => Some(LinkEvent::Down),
            (false, true) => Some(LinkEvent::Up),
            _ => None,
        };
        self.was_connected = connected;
        event
    }
}
