//! Port traits: the hexagonal boundary between the failover core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FailoverComponent (domain)
//! ```
//!
//! Driven adapters (radio, event sinks, sensor bindings) implement these
//! traits.  The [`FailoverComponent`](super::service::FailoverComponent)
//! consumes them via generics or boxed observers, so the core never
//! touches the ESP-NOW driver directly.

use crate::error::RadioError;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → ESP-NOW)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the broadcast link.
pub trait RadioPort {
    /// Broadcast one frame to every device in range.
    ///
    /// Must not block waiting for delivery.  Errors are transient from the
    /// component's point of view; it retries on the next round.
    fn broadcast(&mut self, frame: &[u8]) -> Result<(), RadioError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`FailoverEvent`](super::events::FailoverEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::FailoverEvent);
}

// ───────────────────────────────────────────────────────────────
// State observers (driven adapter: domain → platform sensors)
// ───────────────────────────────────────────────────────────────

/// Receives a published value, e.g. a binary sensor bound to `is_master`
/// or a numeric sensor bound to `peer_count`.
pub trait StateObserver<T> {
    fn publish_state(&mut self, value: T);
}

/// Closures work as observers, which keeps simple bindings short.
impl<T, F: FnMut(T)> StateObserver<T> for F {
    fn publish_state(&mut self, value: T) {
        self(value);
    }
}
