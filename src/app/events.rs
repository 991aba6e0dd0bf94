//! Outbound component events.
//!
//! The [`FailoverComponent`](super::service::FailoverComponent) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use serde::Serialize;

use crate::error::RadioError;
use crate::fsm::Role;
use crate::registry::MacAddress;

/// Structured events emitted by the failover core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverEvent {
    /// The component started (carries the initial role).
    Started(Role),

    /// The component stopped; the role stays as last computed.
    Stopped(Role),

    /// The local role changed.
    RoleChanged { from: Role, to: Role },

    /// First heartbeat from a new peer.
    PeerJoined(MacAddress),

    /// A peer was purged after the liveness timeout.
    PeerLost(MacAddress),

    /// The number of live peers changed.
    PeerCountChanged(usize),

    /// A heartbeat broadcast failed; retried next round.
    HeartbeatSendFailed(RadioError),
}

/// Running counters since the last `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailoverStats {
    pub heartbeats_sent: u32,
    pub send_failures: u32,
    /// Heartbeats that updated the registry.
    pub heartbeats_accepted: u32,
    /// Duplicate or out-of-order heartbeats ignored by the registry.
    pub stale_heartbeats: u32,
    /// Heartbeats from new peers dropped because the registry was full.
    pub registry_full_drops: u32,
    /// Malformed, corrupt or foreign frames dropped on receive (since boot).
    pub frames_rejected: u32,
    /// Frames dropped because the receive queue was full (since boot).
    pub queue_overflows: u32,
    pub role_changes: u32,
    pub peers_lost: u32,
}

/// Point-in-time snapshot suitable for logging or telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct FailoverStatus {
    pub group_id: String,
    pub local_address: MacAddress,
    pub role: Role,
    pub is_master: bool,
    pub peer_count: usize,
    pub running: bool,
    pub stats: FailoverStats,
}
