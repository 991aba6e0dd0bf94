//! Receive queue bridging the radio callback and the control loop.
//!
//! ```text
//! ┌──────────────┐  push_frame()   ┌──────────────┐  drain()  ┌──────────────┐
//! │ ESP-NOW recv │────────────────▶│ bounded chan │──────────▶│ control loop │
//! │ (WiFi task)  │  filter+decode  │  (10 slots)  │           │ tick()       │
//! └──────────────┘                 └──────────────┘           └──────────────┘
//! ```
//!
//! The ESP-NOW receive callback runs in the WiFi driver task, not in the
//! control loop.  It only validates the frame and enqueues it; registry
//! updates happen when the loop drains the queue at the start of a tick.
//! Foreign-group, corrupt and self-sent frames never enter the queue.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};

use super::heartbeat::HeartbeatMessage;
use crate::config::GroupId;
use crate::registry::MacAddress;

/// Pending heartbeats held between two ticks.
pub const RECEIVE_QUEUE_DEPTH: usize = 10;

/// What happened to a frame handed to [`ReceiveQueue::push_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Valid heartbeat queued for the next tick.
    Queued,
    /// Malformed, corrupt or foreign-group frame; dropped silently.
    Rejected,
    /// Our own broadcast echoed back.
    OwnFrame,
    /// Queue full; frame dropped.
    Overflow,
}

/// Bounded, interrupt-safe heartbeat queue.
pub struct ReceiveQueue {
    group_id: GroupId,
    local: MacAddress,
    channel: Channel<CriticalSectionRawMutex, HeartbeatMessage, RECEIVE_QUEUE_DEPTH>,
    rejected: AtomicU32,
    overflows: AtomicU32,
}

impl ReceiveQueue {
    pub fn new(group_id: GroupId, local: MacAddress) -> Self {
        Self {
            group_id,
            local,
            channel: Channel::new(),
            rejected: AtomicU32::new(0),
            overflows: AtomicU32::new(0),
        }
    }

    /// Validate `frame` and enqueue it.  Safe to call from the radio task.
    pub fn push_frame(&self, frame: &[u8]) -> ReceiveOutcome {
        let msg = match HeartbeatMessage::decode_for_group(frame, &self.group_id) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Heartbeat dropped: {}", e);
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return ReceiveOutcome::Rejected;
            }
        };
        if msg.sender == self.local {
            return ReceiveOutcome::OwnFrame;
        }
        if self.channel.try_send(msg).is_err() {
            warn!("Receive queue full, heartbeat dropped");
            self.overflows.fetch_add(1, Ordering::Relaxed);
            return ReceiveOutcome::Overflow;
        }
        ReceiveOutcome::Queued
    }

    /// Pop every pending heartbeat, in arrival order.
    pub fn drain(&self, mut handler: impl FnMut(HeartbeatMessage)) -> usize {
        let mut n = 0;
        while let Ok(msg) = self.channel.try_receive() {
            handler(msg);
            n += 1;
        }
        n
    }

    /// Drop anything still queued (component restart).
    pub fn clear(&self) {
        self.channel.clear();
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Frames rejected as malformed or foreign since boot.
    pub fn rejected_count(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Frames dropped because the queue was full since boot.
    pub fn overflow_count(&self) -> u32 {
        self.overflows.load(Ordering::Relaxed)
    }
}
