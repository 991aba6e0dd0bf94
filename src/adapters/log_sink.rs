//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing failover events to the ESP-IDF
//! logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::FailoverEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`FailoverEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &FailoverEvent) {
        match event {
            FailoverEvent::Started(role) => info!("START | role={}", role.as_str()),
            FailoverEvent::Stopped(role) => info!("STOP  | role={}", role.as_str()),
            FailoverEvent::RoleChanged { from, to } => {
                info!("ROLE  | {} -> {}", from.as_str(), to.as_str());
            }
            FailoverEvent::PeerJoined(mac) => info!("PEER  | + {}", mac),
            FailoverEvent::PeerLost(mac) => warn!("PEER  | - {} (timed out)", mac),
            FailoverEvent::PeerCountChanged(n) => info!("PEERS | {} live", n),
            FailoverEvent::HeartbeatSendFailed(e) => warn!("SEND  | heartbeat failed: {}", e),
        }
    }
}
