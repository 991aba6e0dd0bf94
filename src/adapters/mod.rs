//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements | Connects to                     |
//! |-------------|------------|---------------------------------|
//! | `espnow`    | RadioPort  | ESP-NOW broadcast + recv queue  |
//! | `log_sink`  | EventSink  | Serial log output               |
//! | `device_id` | -          | eFuse station MAC               |
//! | `time`      | -          | ESP32 system timer              |

pub mod device_id;
pub mod espnow;
pub mod log_sink;
pub mod time;
