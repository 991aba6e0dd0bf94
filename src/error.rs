//! Unified error types for the failover component.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! firmware entry point handles failures uniformly.  All variants are
//! `Copy`; none of them carry heap data.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the component funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration failed validation.
    Config(ConfigError),
    /// The radio link rejected an operation.
    Radio(RadioError),
    /// A heartbeat frame could not be decoded.
    Wire(WireError),
    /// Peripheral or driver initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Group id must be 2-8 characters.
    GroupIdLength,
    /// Group id must be printable ASCII.
    GroupIdCharset,
    /// Heartbeat interval must be non-zero.
    ZeroHeartbeatInterval,
    /// Peer timeout must cover at least two heartbeat intervals.
    TimeoutTooShort,
    /// Discovery window must be at least one round.
    ZeroDiscoveryWindow,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupIdLength => write!(f, "group id must be 2-8 characters"),
            Self::GroupIdCharset => write!(f, "group id must be printable ASCII"),
            Self::ZeroHeartbeatInterval => write!(f, "heartbeat interval must be > 0"),
            Self::TimeoutTooShort => {
                write!(f, "peer timeout must be at least 2x the heartbeat interval")
            }
            Self::ZeroDiscoveryWindow => write!(f, "discovery window must be >= 1 round"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The radio driver is not initialised.
    NotInitialized,
    /// The driver's transmit queue is full; try again next round.
    Busy,
    /// The driver refused the frame (ESP-IDF error code attached).
    SendFailed(i32),
    /// Registering the broadcast peer failed.
    PeerRegistration(i32),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "radio not initialised"),
            Self::Busy => write!(f, "radio busy"),
            Self::SendFailed(code) => write!(f, "send failed (esp_err={code})"),
            Self::PeerRegistration(code) => {
                write!(f, "broadcast peer registration failed (esp_err={code})")
            }
        }
    }
}

impl std::error::Error for RadioError {}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Wire errors
// ---------------------------------------------------------------------------

/// Reasons a received frame is dropped.  None of these are surfaced to
/// the caller of `tick`; the receive path absorbs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Frame length is not exactly one heartbeat.
    Length,
    /// Unknown protocol version byte.
    Version(u8),
    /// Group id length byte is outside 2..=8.
    GroupLength,
    /// Group id contains non-printable bytes.
    GroupCharset,
    /// Role byte does not map to a known role.
    Role(u8),
    /// Checksum mismatch (corrupted frame).
    Checksum,
    /// Frame belongs to another failover group.
    ForeignGroup,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => write!(f, "bad frame length"),
            Self::Version(v) => write!(f, "unsupported protocol version {v}"),
            Self::GroupLength => write!(f, "bad group id length"),
            Self::GroupCharset => write!(f, "bad group id bytes"),
            Self::Role(r) => write!(f, "unknown role {r}"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::ForeignGroup => write!(f, "foreign group"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
