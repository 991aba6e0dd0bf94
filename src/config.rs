//! Failover configuration parameters.
//!
//! Built once by the firmware entry point (or a test) and validated
//! before the component is constructed.  There is no runtime schema:
//! the group id is a typed [`GroupId`] that cannot hold an invalid value.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shortest accepted group id.
pub const GROUP_ID_MIN_LEN: usize = 2;
/// Longest accepted group id (also the wire field width).
pub const GROUP_ID_MAX_LEN: usize = 8;

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(crate) fn is_printable_ascii(s: &[u8]) -> bool {
    s.iter().all(|b| (0x20..=0x7E).contains(b))
}

// ---------------------------------------------------------------------------
// Group identity
// ---------------------------------------------------------------------------

/// Identity of the failover group this device belongs to (2-8 printable
/// ASCII characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(heapless::String<GROUP_ID_MAX_LEN>);

impl GroupId {
    pub fn new(id: &str) -> Result<Self, ConfigError> {
        if id.len() < GROUP_ID_MIN_LEN || id.len() > GROUP_ID_MAX_LEN {
            return Err(ConfigError::GroupIdLength);
        }
        if !is_printable_ascii(id.as_bytes()) {
            return Err(ConfigError::GroupIdCharset);
        }
        let mut s = heapless::String::new();
        s.push_str(id).map_err(|()| ConfigError::GroupIdLength)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for GroupId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GroupId> for String {
    fn from(value: GroupId) -> Self {
        value.as_str().into()
    }
}

// ---------------------------------------------------------------------------
// Component configuration
// ---------------------------------------------------------------------------

/// Core failover configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Which failover group this device coordinates with.
    pub group_id: GroupId,

    // --- Tie-break ---
    /// Election priority.  Lower wins; equal priorities fall back to the
    /// lowest MAC address.
    pub priority: u8,
    /// Whether this device may ever act as master.
    pub master_eligible: bool,

    // --- Timing ---
    /// Heartbeat broadcast period (milliseconds).  One period is a round.
    pub heartbeat_interval_ms: u32,
    /// A peer silent for longer than this is purged (milliseconds).
    pub peer_timeout_ms: u32,
    /// Rounds to listen for an existing master before electing one.
    pub discovery_window_rounds: u32,
}

impl FailoverConfig {
    /// Default priority shared by every device unless overridden.
    pub const DEFAULT_PRIORITY: u8 = 128;

    /// Configuration for `group_id` with default timing.
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            priority: Self::DEFAULT_PRIORITY,
            master_eligible: true,
            heartbeat_interval_ms: 10_000, // 0.1 Hz
            peer_timeout_ms: 30_000,       // three missed heartbeats
            discovery_window_rounds: 3,
        }
    }

    /// Check the timing parameters for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ZeroHeartbeatInterval);
        }
        if u64::from(self.peer_timeout_ms) < 2 * u64::from(self.heartbeat_interval_ms) {
            return Err(ConfigError::TimeoutTooShort);
        }
        if self.discovery_window_rounds == 0 {
            return Err(ConfigError::ZeroDiscoveryWindow);
        }
        Ok(())
    }
}
