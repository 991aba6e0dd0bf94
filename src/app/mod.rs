//! Application core: failover logic behind port traits.
//!
//! The [`service::FailoverComponent`] ties together the peer registry,
//! the heartbeat protocol and the role FSM.  All interaction with the
//! radio and the rest of the firmware happens through the traits in
//! [`ports`], keeping this layer testable without hardware.

pub mod events;
pub mod ports;
pub mod service;
