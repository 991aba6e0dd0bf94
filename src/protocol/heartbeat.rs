//! Heartbeat wire codec.
//!
//! Wire format (fixed 28 bytes, little-endian integers):
//! ```text
//! ┌─────┬─────┬──────────┬─────────┬──────┬───────┬──────┬──────────┬──────────┬─────┐
//! │ ver │ len │ group[8] │ mac[6]  │ role │ flags │ prio │ seq u32  │ uptime   │ xor │
//! │ 1B  │ 1B  │ 0-padded │         │ 1B   │ 1B    │ 1B   │          │ u32 secs │ 1B  │
//! └─────┴─────┴──────────┴─────────┴──────┴───────┴──────┴──────────┴──────────┴─────┘
//!   0     1     2          10        16     17      18     19         23         27
//! ```
//!
//! The trailing byte is an XOR checksum over everything before it,
//! seeded so that an all-zero frame never validates.

use crate::config::{GROUP_ID_MAX_LEN, GROUP_ID_MIN_LEN, GroupId, is_printable_ascii};
use crate::error::WireError;
use crate::fsm::Role;
use crate::registry::{MacAddress, PeerClaim, TieBreakKey};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Encoded heartbeat size in bytes.
pub const HEARTBEAT_LEN: usize = 28;

const CHECKSUM_SEED: u8 = 0xA5;

/// `flags` bit: sender may become master.
const FLAG_MASTER_ELIGIBLE: u8 = 0b0000_0001;

// Field offsets.
const OFF_VERSION: usize = 0;
const OFF_GROUP_LEN: usize = 1;
const OFF_GROUP: usize = 2;
const OFF_MAC: usize = OFF_GROUP + GROUP_ID_MAX_LEN;
const OFF_ROLE: usize = OFF_MAC + 6;
const OFF_FLAGS: usize = OFF_ROLE + 1;
const OFF_PRIORITY: usize = OFF_FLAGS + 1;
const OFF_SEQUENCE: usize = OFF_PRIORITY + 1;
const OFF_UPTIME: usize = OFF_SEQUENCE + 4;
const OFF_CHECKSUM: usize = OFF_UPTIME + 4;

/// One encoded heartbeat frame.
pub type HeartbeatFrame = [u8; HEARTBEAT_LEN];

/// Presence / role announcement broadcast once per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatMessage {
    pub group_id: GroupId,
    pub sender: MacAddress,
    pub role: Role,
    pub priority: u8,
    pub master_eligible: bool,
    pub sequence: u32,
    pub uptime_secs: u32,
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(CHECKSUM_SEED, |acc, b| acc ^ b)
}

impl HeartbeatMessage {
    /// The sender's election key.
    pub fn key(&self) -> TieBreakKey {
        TieBreakKey::new(self.priority, self.sender)
    }

    /// The registry-facing part of the message.
    pub fn claim(&self) -> PeerClaim {
        PeerClaim {
            role: self.role,
            priority: self.priority,
            master_eligible: self.master_eligible,
            uptime_secs: self.uptime_secs,
        }
    }

    /// Serialise into a fixed-size frame.
    pub fn encode(&self) -> HeartbeatFrame {
        let mut out = [0u8; HEARTBEAT_LEN];
        let group = self.group_id.as_bytes();

        out[OFF_VERSION] = PROTOCOL_VERSION;
        out[OFF_GROUP_LEN] = group.len() as u8;
        out[OFF_GROUP..OFF_GROUP + group.len()].copy_from_slice(group);
        out[OFF_MAC..OFF_ROLE].copy_from_slice(&self.sender.octets());
        out[OFF_ROLE] = self.role as u8;
        out[OFF_FLAGS] = if self.master_eligible {
            FLAG_MASTER_ELIGIBLE
        } else {
            0
        };
        out[OFF_PRIORITY] = self.priority;
        out[OFF_SEQUENCE..OFF_UPTIME].copy_from_slice(&self.sequence.to_le_bytes());
        out[OFF_UPTIME..OFF_CHECKSUM].copy_from_slice(&self.uptime_secs.to_le_bytes());
        out[OFF_CHECKSUM] = checksum(&out[..OFF_CHECKSUM]);
        out
    }

    /// Parse and integrity-check a received frame.
    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        if frame.len() != HEARTBEAT_LEN {
            return Err(WireError::Length);
        }
        if frame[OFF_VERSION] != PROTOCOL_VERSION {
            return Err(WireError::Version(frame[OFF_VERSION]));
        }
        if checksum(&frame[..OFF_CHECKSUM]) != frame[OFF_CHECKSUM] {
            return Err(WireError::Checksum);
        }

        let group_len = frame[OFF_GROUP_LEN] as usize;
        if !(GROUP_ID_MIN_LEN..=GROUP_ID_MAX_LEN).contains(&group_len) {
            return Err(WireError::GroupLength);
        }
        let group_bytes = &frame[OFF_GROUP..OFF_GROUP + group_len];
        if !is_printable_ascii(group_bytes) {
            return Err(WireError::GroupCharset);
        }
        let group_str = core::str::from_utf8(group_bytes).map_err(|_| WireError::GroupCharset)?;
        let group_id = GroupId::new(group_str).map_err(|_| WireError::GroupCharset)?;

        let role = Role::from_wire(frame[OFF_ROLE]).ok_or(WireError::Role(frame[OFF_ROLE]))?;

        let mut mac = [0u8; 6];
        mac.copy_from_slice(&frame[OFF_MAC..OFF_ROLE]);
        let mut seq = [0u8; 4];
        seq.copy_from_slice(&frame[OFF_SEQUENCE..OFF_UPTIME]);
        let mut uptime = [0u8; 4];
        uptime.copy_from_slice(&frame[OFF_UPTIME..OFF_CHECKSUM]);

        Ok(Self {
            group_id,
            sender: MacAddress(mac),
            role,
            priority: frame[OFF_PRIORITY],
            master_eligible: frame[OFF_FLAGS] & FLAG_MASTER_ELIGIBLE != 0,
            sequence: u32::from_le_bytes(seq),
            uptime_secs: u32::from_le_bytes(uptime),
        })
    }

    /// Decode a frame and require it to belong to `group`.
    pub fn decode_for_group(frame: &[u8], group: &GroupId) -> Result<Self, WireError> {
        let msg = Self::decode(frame)?;
        if msg.group_id != *group {
            return Err(WireError::ForeignGroup);
        }
        Ok(msg)
    }
}
