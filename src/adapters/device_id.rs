//! Device identity derived from the WiFi station MAC address.
//!
//! The station MAC is the source address ESP-NOW stamps on every frame,
//! so it is also the address peers use for tie-breaking.  The short id
//! `FO-XXYYZZ` (last 3 bytes, uppercase hex) is only for log lines.

use crate::error::Error;
use crate::registry::MacAddress;

/// Fixed-size device ID string: "FO-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Read the station MAC from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> Result<MacAddress, Error> {
    use esp_idf_svc::sys::{esp_mac_type_t_ESP_MAC_WIFI_STA, esp_read_mac, ESP_OK};

    let mut mac = [0u8; 6];
    let rc = unsafe { esp_read_mac(mac.as_mut_ptr(), esp_mac_type_t_ESP_MAC_WIFI_STA) };
    if rc != ESP_OK as i32 {
        return Err(Error::Init("station MAC unavailable"));
    }
    Ok(MacAddress(mac))
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> Result<MacAddress, Error> {
    Ok(MacAddress([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]))
}

/// Derive the short device ID from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    use core::fmt::Write;
    let [.., a, b, c] = mac.octets();
    let mut id = DeviceIdString::new();
    let _ = write!(id, "FO-{:02X}{:02X}{:02X}", a, b, c);
    id
}
