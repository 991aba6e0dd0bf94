//! Link heartbeat protocol.
//!
//! | Module      | Role                                                  |
//! |-------------|-------------------------------------------------------|
//! | `heartbeat` | Wire format: encode / decode / group filtering        |
//! | `queue`     | Radio-callback → control-loop handoff                 |
//! | (this)      | [`Beacon`]: round timing and outbound heartbeats      |
//!
//! Sends are fire-and-forget.  A failed broadcast is reported to the
//! caller and simply retried at the next round; heartbeats are periodic,
//! so one lost send only delays convergence.

pub mod heartbeat;
pub mod queue;

use log::debug;

use crate::app::ports::RadioPort;
use crate::config::{FailoverConfig, GroupId};
use crate::error::RadioError;
use crate::fsm::Role;
use crate::registry::MacAddress;
use heartbeat::HeartbeatMessage;

/// Outbound side of the protocol: decides when a round is due and builds
/// the heartbeat for it.
pub struct Beacon {
    group_id: GroupId,
    local: MacAddress,
    priority: u8,
    master_eligible: bool,
    interval_ms: u64,
    /// Next sequence number to send.
    sequence: u32,
    /// Start of the last round; `None` until the first round after start.
    last_round_ms: Option<u64>,
}

impl Beacon {
    pub fn new(config: &FailoverConfig, local: MacAddress) -> Self {
        Self {
            group_id: config.group_id.clone(),
            local,
            priority: config.priority,
            master_eligible: config.master_eligible,
            interval_ms: u64::from(config.heartbeat_interval_ms),
            sequence: 0,
            last_round_ms: None,
        }
    }

    /// Restart round timing; the next [`round_due`](Self::round_due) fires
    /// immediately.  The sequence counter keeps counting so peers that
    /// still hold our old entry accept the new heartbeats.
    pub fn reset(&mut self) {
        self.last_round_ms = None;
    }

    /// Whether a heartbeat round should run at `now_ms`.
    pub fn round_due(&self, now_ms: u64) -> bool {
        self.last_round_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    /// Record that a round started at `now_ms`.
    pub fn mark_round(&mut self, now_ms: u64) {
        self.last_round_ms = Some(now_ms);
    }

    /// Build the next heartbeat, consuming a sequence number.
    pub fn next_message(&mut self, role: Role, now_ms: u64) -> HeartbeatMessage {
        self.sequence = self.sequence.wrapping_add(1);
        HeartbeatMessage {
            group_id: self.group_id.clone(),
            sender: self.local,
            role,
            priority: self.priority,
            master_eligible: self.master_eligible,
            sequence: self.sequence,
            uptime_secs: (now_ms / 1000) as u32,
        }
    }

    /// Build and broadcast the heartbeat for this round.
    pub fn broadcast(
        &mut self,
        role: Role,
        now_ms: u64,
        radio: &mut impl RadioPort,
    ) -> Result<(), RadioError> {
        let msg = self.next_message(role, now_ms);
        radio.broadcast(&msg.encode())?;
        debug!("Heartbeat sent: seq={} role={}", msg.sequence, role.as_str());
        Ok(())
    }

    /// Last sequence number handed out.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}
