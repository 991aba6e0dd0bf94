//! ESP-NOW failover library.
//!
//! A group of devices sharing a group id elects one MASTER over ESP-NOW
//! heartbeats; the others stay BACKUP and take over when the master goes
//! silent.  The pure-logic modules are exposed for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod protocol;
pub mod registry;

#[cfg(target_os = "espidf")]
mod esp_link_shims;

pub use app::service::FailoverComponent;
pub use config::{FailoverConfig, GroupId};
pub use error::{Error, Result};
pub use fsm::Role;
pub use registry::MacAddress;
