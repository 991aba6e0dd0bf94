//! Simulated ESP-NOW broadcast medium for multi-device tests.
//!
//! Every node owns a real [`FailoverComponent`].  After a node ticks, the
//! frames it broadcast are delivered to every other online node whose
//! link is not blocked, exactly like a shared radio channel.

use espnow_failover::app::events::FailoverEvent;
use espnow_failover::app::ports::{EventSink, RadioPort};
use espnow_failover::error::RadioError;
use espnow_failover::{FailoverComponent, FailoverConfig, GroupId, MacAddress, Role};

pub const INTERVAL_MS: u64 = 1_000;
pub const TIMEOUT_MS: u64 = 3_000;
pub const STEP_MS: u64 = 100;

/// Test timings: 1 s heartbeat, 3 s timeout, 3-round discovery window.
pub fn fast_config(group: &str) -> FailoverConfig {
    let mut config = FailoverConfig::new(GroupId::new(group).unwrap());
    config.heartbeat_interval_ms = INTERVAL_MS as u32;
    config.peer_timeout_ms = TIMEOUT_MS as u32;
    config.discovery_window_rounds = 3;
    config
}

pub fn mac(last: u8) -> MacAddress {
    MacAddress([0x24, 0x6F, 0x28, 0x00, 0x00, last])
}

// ── Per-node radio ────────────────────────────────────────────

#[derive(Default)]
pub struct BusRadio {
    outbox: Vec<Vec<u8>>,
    pub fail_remaining: u32,
}

impl RadioPort for BusRadio {
    fn broadcast(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(RadioError::SendFailed(-1));
        }
        self.outbox.push(frame.to_vec());
        Ok(())
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<FailoverEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn role_changes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, FailoverEvent::RoleChanged { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &FailoverEvent) {
        self.events.push(event.clone());
    }
}

// ── Node + bus ────────────────────────────────────────────────

pub struct Node {
    pub component: FailoverComponent,
    pub radio: BusRadio,
    pub sink: RecordingSink,
    pub online: bool,
}

pub struct Bus {
    pub nodes: Vec<Node>,
    blocked: Vec<(usize, usize)>,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Bus {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            blocked: Vec::new(),
            now_ms: 0,
        }
    }

    /// Add and start a node; returns its index.
    pub fn add(&mut self, config: FailoverConfig, address: MacAddress) -> usize {
        let mut component = FailoverComponent::new(config, address).unwrap();
        let mut sink = RecordingSink::default();
        component.start(&mut sink);
        self.nodes.push(Node {
            component,
            radio: BusRadio::default(),
            sink,
            online: true,
        });
        self.nodes.len() - 1
    }

    /// Power a node off.  It neither ticks nor hears anything.
    pub fn power_off(&mut self, idx: usize) {
        self.nodes[idx].online = false;
    }

    /// Power a node back on with a fresh start.
    pub fn reboot(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.online = true;
        node.component.start(&mut node.sink);
    }

    pub fn block(&mut self, a: usize, b: usize) {
        self.blocked.push((a, b));
    }

    pub fn heal(&mut self) {
        self.blocked.clear();
    }

    fn linked(&self, a: usize, b: usize) -> bool {
        !self.blocked.contains(&(a, b)) && !self.blocked.contains(&(b, a))
    }

    /// One scheduler step for every node, in index order.
    pub fn step(&mut self) {
        let now = self.now_ms;
        for i in 0..self.nodes.len() {
            if !self.nodes[i].online {
                continue;
            }
            let frames = {
                let node = &mut self.nodes[i];
                node.component.tick(now, &mut node.radio, &mut node.sink);
                std::mem::take(&mut node.radio.outbox)
            };
            for frame in &frames {
                for j in 0..self.nodes.len() {
                    if j != i && self.nodes[j].online && self.linked(i, j) {
                        self.nodes[j].component.on_receive(frame);
                    }
                }
            }
        }
        self.now_ms += STEP_MS;
    }

    /// Step until the clock reaches `until_ms` (exclusive).
    pub fn run_until(&mut self, until_ms: u64) {
        while self.now_ms < until_ms {
            self.step();
        }
    }

    pub fn role(&self, idx: usize) -> Role {
        self.nodes[idx].component.role()
    }

    pub fn peer_count(&self, idx: usize) -> usize {
        self.nodes[idx].component.peer_count()
    }

    /// Indices of online nodes currently acting as master.
    pub fn masters(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].online && self.nodes[i].component.is_master())
            .collect()
    }
}
