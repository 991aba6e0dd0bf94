//! Failover component: the hexagonal core.
//!
//! [`FailoverComponent`] owns the peer registry, the role FSM, the
//! heartbeat beacon and the receive queue.  All I/O flows through port
//! traits injected at call sites, so the whole component runs against a
//! simulated radio in tests.
//!
//! ```text
//!  radio callback ──▶ ReceiveQueue ──┐
//!                                    ▼
//!  tick(now) ──▶ drain ─▶ upsert ─▶ purge ─▶ FSM ─▶ publish ─▶ broadcast
//!                                                      │           │
//!                                    EventSink ◀───────┘    RadioPort
//! ```
//!
//! Ordering inside one tick is fixed: every pending heartbeat is applied
//! to the registry before stale peers are purged and before the FSM runs,
//! so a transition always sees the freshest information available.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{FailoverConfig, GroupId};
use crate::error::Result;
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Role};
use crate::protocol::Beacon;
use crate::protocol::queue::{ReceiveOutcome, ReceiveQueue};
use crate::registry::{MacAddress, Peer, PeerRegistry, TieBreakKey, UpsertOutcome};

use super::events::{FailoverEvent, FailoverStats, FailoverStatus};
use super::ports::{EventSink, RadioPort, StateObserver};

// ───────────────────────────────────────────────────────────────
// FailoverComponent
// ───────────────────────────────────────────────────────────────

/// One failover participant.  Create exactly one per device and hand it
/// to whatever code needs `is_master` / `peer_count`.
pub struct FailoverComponent {
    config: FailoverConfig,
    local_key: TieBreakKey,
    registry: PeerRegistry,
    fsm: Fsm,
    ctx: FsmContext,
    beacon: Beacon,
    queue: Arc<ReceiveQueue>,
    running: bool,
    stats: FailoverStats,
    /// Last values handed to observers / sinks; `None` forces a publish.
    published_master: Option<bool>,
    published_count: Option<usize>,
    is_master_observer: Option<Box<dyn StateObserver<bool>>>,
    peer_count_observer: Option<Box<dyn StateObserver<u32>>>,
}

impl FailoverComponent {
    /// Construct the component.  Fails if the timing parameters are
    /// inconsistent; the group id is already valid by construction.
    ///
    /// Does **not** start it; call [`start`](Self::start) next.
    pub fn new(config: FailoverConfig, local_address: MacAddress) -> Result<Self> {
        config.validate()?;

        let local_key = TieBreakKey::new(config.priority, local_address);
        let ctx = FsmContext::new(
            local_key,
            config.master_eligible,
            config.discovery_window_rounds,
        );
        let fsm = Fsm::new(build_state_table(), Role::Undetermined);
        let beacon = Beacon::new(&config, local_address);
        let queue = Arc::new(ReceiveQueue::new(config.group_id.clone(), local_address));

        Ok(Self {
            config,
            local_key,
            registry: PeerRegistry::new(),
            fsm,
            ctx,
            beacon,
            queue,
            running: false,
            stats: FailoverStats::default(),
            published_master: None,
            published_count: None,
            is_master_observer: None,
            peer_count_observer: None,
        })
    }

    // ── Observer bindings ─────────────────────────────────────

    /// Bind a boolean observer (e.g. a connectivity binary sensor).
    pub fn set_is_master_observer(&mut self, observer: impl StateObserver<bool> + 'static) {
        self.is_master_observer = Some(Box::new(observer));
        self.published_master = None;
    }

    /// Bind an integer observer (e.g. a peer-count sensor).
    pub fn set_peer_count_observer(&mut self, observer: impl StateObserver<u32> + 'static) {
        self.peer_count_observer = Some(Box::new(observer));
        self.published_count = None;
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start (or restart) in `Undetermined` with an empty registry.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.registry.clear();
        self.queue.clear();
        self.fsm.reset(Role::Undetermined);
        self.ctx = FsmContext::new(
            self.local_key,
            self.config.master_eligible,
            self.config.discovery_window_rounds,
        );
        self.beacon.reset();
        self.stats = FailoverStats::default();
        self.published_master = None;
        self.published_count = None;

        self.fsm.start(&mut self.ctx);
        self.running = true;
        sink.emit(&FailoverEvent::Started(self.role()));
        self.publish(sink);
        info!(
            "Failover started (group='{}', key={}, eligible={})",
            self.config.group_id, self.local_key, self.config.master_eligible
        );
    }

    /// Stop heartbeats and role evaluation.  The role keeps its last
    /// computed value.
    pub fn stop(&mut self, sink: &mut impl EventSink) {
        if !self.running {
            return;
        }
        self.running = false;
        sink.emit(&FailoverEvent::Stopped(self.role()));
        info!("Failover stopped as {}", self.role().as_str());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduler tick: drain received heartbeats → purge stale
    /// peers → FSM → publish → broadcast (when a round is due).
    ///
    /// Call as often as the loop allows; heartbeats go out once per
    /// configured interval.
    pub fn tick(&mut self, now_ms: u64, radio: &mut impl RadioPort, sink: &mut impl EventSink) {
        if !self.running {
            return;
        }

        // 1. Apply everything received since the last tick.
        let received = self.drain_receive_queue(now_ms, sink);

        // 2. Liveness
        let timeout = u64::from(self.config.peer_timeout_ms);
        let stats = &mut self.stats;
        let purged = self.registry.purge_stale_with(now_ms, timeout, |peer| {
            warn!("Peer lost: {} (was {})", peer.address, peer.role.as_str());
            stats.peers_lost += 1;
            sink.emit(&FailoverEvent::PeerLost(peer.address));
        });

        // 3. Role decision.  Rounds advance the discovery window; fresh
        //    information between rounds is evaluated without advancing it.
        let round_due = self.beacon.round_due(now_ms);
        let prev = self.role();
        self.ctx.view = self.registry.view(self.local_key.address);
        let changed = if round_due {
            self.fsm.tick(&mut self.ctx)
        } else if received > 0 || purged > 0 {
            self.fsm.evaluate(&mut self.ctx)
        } else {
            None
        };
        if let Some(to) = changed {
            self.stats.role_changes += 1;
            sink.emit(&FailoverEvent::RoleChanged { from: prev, to });
        }

        // 4. Observers
        self.publish(sink);

        // 5. Heartbeat round
        if round_due {
            self.beacon.mark_round(now_ms);
            match self.beacon.broadcast(self.role(), now_ms, radio) {
                Ok(()) => self.stats.heartbeats_sent += 1,
                Err(e) => {
                    warn!("Failed to send heartbeat: {} (retrying next round)", e);
                    self.stats.send_failures += 1;
                    sink.emit(&FailoverEvent::HeartbeatSendFailed(e));
                }
            }
        }
    }

    /// Radio receive entry point.  Validates and queues the frame; the
    /// registry sees it on the next [`tick`](Self::tick).
    pub fn on_receive(&self, frame: &[u8]) -> ReceiveOutcome {
        self.queue.push_frame(frame)
    }

    /// Shared handle for a radio callback running in another task.
    pub fn receive_queue(&self) -> Arc<ReceiveQueue> {
        Arc::clone(&self.queue)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.fsm.current_state()
    }

    pub fn is_master(&self) -> bool {
        self.role() == Role::Master
    }

    /// Number of live peers, excluding this device.
    pub fn peer_count(&self) -> usize {
        self.registry.count()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn local_key(&self) -> TieBreakKey {
        self.local_key
    }

    pub fn local_address(&self) -> MacAddress {
        self.local_key.address
    }

    pub fn group_id(&self) -> &GroupId {
        &self.config.group_id
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.registry.iter()
    }

    /// Counters since the last start, plus receive-path counters since boot.
    pub fn stats(&self) -> FailoverStats {
        FailoverStats {
            frames_rejected: self.queue.rejected_count(),
            queue_overflows: self.queue.overflow_count(),
            ..self.stats
        }
    }

    pub fn status(&self) -> FailoverStatus {
        FailoverStatus {
            group_id: self.config.group_id.as_str().into(),
            local_address: self.local_address(),
            role: self.role(),
            is_master: self.is_master(),
            peer_count: self.peer_count(),
            running: self.running,
            stats: self.stats(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn drain_receive_queue(&mut self, now_ms: u64, sink: &mut impl EventSink) -> usize {
        let registry = &mut self.registry;
        let stats = &mut self.stats;
        let mut accepted = 0;
        self.queue.drain(|msg| {
            match registry.upsert(msg.sender, msg.claim(), msg.sequence, now_ms) {
                UpsertOutcome::Inserted => {
                    info!("Peer joined: {} as {}", msg.sender, msg.role.as_str());
                    sink.emit(&FailoverEvent::PeerJoined(msg.sender));
                    accepted += 1;
                }
                UpsertOutcome::Updated => accepted += 1,
                UpsertOutcome::Stale => stats.stale_heartbeats += 1,
                UpsertOutcome::Full => stats.registry_full_drops += 1,
            }
        });
        self.stats.heartbeats_accepted += accepted;
        accepted as usize
    }

    fn publish(&mut self, sink: &mut impl EventSink) {
        let is_master = self.is_master();
        if self.published_master != Some(is_master) {
            self.published_master = Some(is_master);
            if let Some(observer) = self.is_master_observer.as_mut() {
                observer.publish_state(is_master);
            }
        }

        let count = self.peer_count();
        if self.published_count != Some(count) {
            let first = self.published_count.is_none();
            self.published_count = Some(count);
            if let Some(observer) = self.peer_count_observer.as_mut() {
                observer.publish_state(count as u32);
            }
            if !first {
                sink.emit(&FailoverEvent::PeerCountChanged(count));
            }
        }
    }
}
