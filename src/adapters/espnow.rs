//! ESP-NOW radio adapter.
//!
//! Implements [`RadioPort`] for heartbeat broadcasts and wires
//! the driver's receive callback into the component's [`ReceiveQueue`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver via `esp_idf_svc::espnow`.
//!   WiFi must already be started in STA mode before [`EspNowRadio::new`].
//! - **all other targets**: in-memory simulation that records sent frames
//!   and lets tests inject received ones.

use std::sync::Arc;

use log::info;

use crate::app::ports::RadioPort;
use crate::error::RadioError;
#[cfg(not(target_os = "espidf"))]
use crate::protocol::queue::ReceiveOutcome;
use crate::protocol::queue::ReceiveQueue;
use crate::registry::MacAddress;

/// ESP-NOW link shared by the heartbeat protocol.
pub struct EspNowRadio {
    #[cfg(target_os = "espidf")]
    driver: esp_idf_svc::espnow::EspNow<'static>,

    #[cfg(not(target_os = "espidf"))]
    queue: Arc<ReceiveQueue>,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<Vec<u8>>,
    #[cfg(not(target_os = "espidf"))]
    failures_pending: u32,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl EspNowRadio {
    /// Take the ESP-NOW driver, register the broadcast peer and route
    /// every received frame into `queue`.
    pub fn new(queue: Arc<ReceiveQueue>) -> Result<Self, RadioError> {
        use esp_idf_svc::espnow::{EspNow, PeerInfo, BROADCAST};

        let driver = EspNow::take().map_err(|e| {
            log::error!("ESP-NOW init failed: {}", e);
            RadioError::NotInitialized
        })?;

        let peer = PeerInfo {
            peer_addr: BROADCAST,
            channel: 0,
            ifidx: esp_idf_svc::sys::wifi_interface_t_WIFI_IF_STA,
            encrypt: false,
            ..Default::default()
        };
        driver
            .add_peer(peer)
            .map_err(|e| RadioError::PeerRegistration(e.code()))?;

        // Runs in the WiFi task: validate and enqueue only.
        driver
            .register_recv_cb(move |_info, data: &[u8]| {
                let _ = queue.push_frame(data);
            })
            .map_err(|e| RadioError::PeerRegistration(e.code()))?;

        info!("ESP-NOW ready (broadcast peer registered)");
        Ok(Self { driver })
    }
}

#[cfg(target_os = "espidf")]
impl RadioPort for EspNowRadio {
    fn broadcast(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        use esp_idf_svc::sys::ESP_ERR_ESPNOW_NO_MEM;

        self.driver
            .send(MacAddress::BROADCAST.octets(), frame)
            .map_err(|e| {
                if e.code() == ESP_ERR_ESPNOW_NO_MEM as i32 {
                    RadioError::Busy
                } else {
                    RadioError::SendFailed(e.code())
                }
            })
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl EspNowRadio {
    pub fn new(queue: Arc<ReceiveQueue>) -> Result<Self, RadioError> {
        info!("ESP-NOW(sim): broadcast peer registered to {}", MacAddress::BROADCAST);
        Ok(Self {
            queue,
            sent: Vec::new(),
            failures_pending: 0,
        })
    }

    /// Simulate a frame arriving over the air.
    pub fn inject(&self, frame: &[u8]) -> ReceiveOutcome {
        self.queue.push_frame(frame)
    }

    /// Make the next `n` broadcasts fail with [`RadioError::Busy`].
    pub fn fail_next(&mut self, n: u32) {
        self.failures_pending = n;
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Hand over everything broadcast so far.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        core::mem::take(&mut self.sent)
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for EspNowRadio {
    fn broadcast(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(RadioError::Busy);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }
}
