//! Peer registry: who else is in the group and what they claim.
//!
//! One entry per peer address, refreshed by every accepted heartbeat and
//! purged once the peer has been silent for longer than the liveness
//! timeout.  No I/O happens here; the heartbeat protocol feeds it and the
//! failover FSM reads a [`RegistryView`] snapshot of it.
//!
//! Storage is a fixed-capacity `heapless` map so the registry never
//! allocates after boot.

use core::fmt;

use log::{debug, warn};
use serde::Serialize;

use crate::fsm::Role;

/// Maximum number of peers tracked at once.  Must be a power of two.
pub const MAX_PEERS: usize = 16;

// ---------------------------------------------------------------------------
// Addressing and tie-break
// ---------------------------------------------------------------------------

/// 6-byte radio (WiFi STA) MAC address.  Ordered byte-wise, like `memcmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// ESP-NOW broadcast address.
    pub const BROADCAST: Self = Self([0xFF; 6]);

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Deterministic election key.  The **lowest** key in the group wins.
///
/// Field order matters: priority is compared first, the address breaks
/// ties.  Every device computes the same ordering from heartbeat data, so
/// the group agrees on a single winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TieBreakKey {
    pub priority: u8,
    pub address: MacAddress,
}

impl TieBreakKey {
    pub const fn new(priority: u8, address: MacAddress) -> Self {
        Self { priority, address }
    }
}

impl fmt::Display for TieBreakKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.priority, self.address)
    }
}

// ---------------------------------------------------------------------------
// Peer record
// ---------------------------------------------------------------------------

/// What a heartbeat tells us about its sender, besides the sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerClaim {
    pub role: Role,
    pub priority: u8,
    pub master_eligible: bool,
    pub uptime_secs: u32,
}

/// One other device in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub address: MacAddress,
    pub role: Role,
    pub priority: u8,
    pub master_eligible: bool,
    /// Last accepted heartbeat sequence number.
    pub sequence: u32,
    /// Peer-reported uptime at its last heartbeat.
    pub uptime_secs: u32,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
}

impl Peer {
    pub fn key(&self) -> TieBreakKey {
        TieBreakKey::new(self.priority, self.address)
    }

    pub fn claims_master(&self) -> bool {
        self.role == Role::Master
    }
}

/// Result of [`PeerRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First heartbeat from this address.
    Inserted,
    /// Existing entry refreshed.
    Updated,
    /// Sequence number not newer than the stored one; nothing changed.
    Stale,
    /// Registry is at capacity; the new peer was not recorded.
    Full,
}

impl UpsertOutcome {
    /// Whether the registry changed.
    pub fn accepted(self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// `true` if `incoming` is newer than `stored` under 32-bit serial-number
/// arithmetic, so the counter may wrap without freezing a peer out.
fn sequence_is_newer(incoming: u32, stored: u32) -> bool {
    let delta = incoming.wrapping_sub(stored);
    delta != 0 && delta < 0x8000_0000
}

// ---------------------------------------------------------------------------
// Registry snapshot
// ---------------------------------------------------------------------------

/// Everything the FSM needs from the registry, captured at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryView {
    /// Number of live peers (excluding this device).
    pub live_peers: usize,
    /// Lowest key among live peers currently claiming master.
    pub best_master_claim: Option<TieBreakKey>,
    /// Lowest key among live peers eligible to become master.
    pub best_eligible_peer: Option<TieBreakKey>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Address → [`Peer`] map.  At most one entry per address.
pub struct PeerRegistry {
    peers: heapless::FnvIndexMap<MacAddress, Peer, MAX_PEERS>,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: heapless::FnvIndexMap::new(),
        }
    }

    /// Insert or refresh the entry for `address`.
    ///
    /// Heartbeats whose sequence number is not newer than the stored one
    /// (duplicates, reordered deliveries) are ignored.
    pub fn upsert(
        &mut self,
        address: MacAddress,
        claim: PeerClaim,
        sequence: u32,
        now_ms: u64,
    ) -> UpsertOutcome {
        if let Some(peer) = self.peers.get_mut(&address) {
            if !sequence_is_newer(sequence, peer.sequence) {
                debug!(
                    "Registry: stale heartbeat from {} (seq {} <= {})",
                    address, sequence, peer.sequence
                );
                return UpsertOutcome::Stale;
            }
            peer.role = claim.role;
            peer.priority = claim.priority;
            peer.master_eligible = claim.master_eligible;
            peer.sequence = sequence;
            peer.uptime_secs = claim.uptime_secs;
            peer.last_seen_ms = now_ms;
            return UpsertOutcome::Updated;
        }

        let peer = Peer {
            address,
            role: claim.role,
            priority: claim.priority,
            master_eligible: claim.master_eligible,
            sequence,
            uptime_secs: claim.uptime_secs,
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
        };
        match self.peers.insert(address, peer) {
            Ok(_) => UpsertOutcome::Inserted,
            Err(_) => {
                warn!("Registry: full ({} peers), ignoring {}", MAX_PEERS, address);
                UpsertOutcome::Full
            }
        }
    }

    /// Remove every peer silent for strictly longer than `timeout_ms`.
    /// Returns the number removed.
    pub fn purge_stale(&mut self, now_ms: u64, timeout_ms: u64) -> usize {
        self.purge_stale_with(now_ms, timeout_ms, |_| {})
    }

    /// Like [`purge_stale`](Self::purge_stale), reporting each removed peer.
    pub fn purge_stale_with(
        &mut self,
        now_ms: u64,
        timeout_ms: u64,
        mut on_removed: impl FnMut(&Peer),
    ) -> usize {
        let mut expired: heapless::Vec<MacAddress, MAX_PEERS> = heapless::Vec::new();
        for (addr, peer) in &self.peers {
            if now_ms.saturating_sub(peer.last_seen_ms) > timeout_ms {
                // Capacity equals the map's, so this cannot overflow.
                let _ = expired.push(*addr);
            }
        }
        for addr in &expired {
            if let Some(peer) = self.peers.remove(addr) {
                debug!("Registry: peer {} timed out", peer.address);
                on_removed(&peer);
            }
        }
        expired.len()
    }

    /// Number of live peers.
    pub fn count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether any peer other than `excluding` currently claims master.
    pub fn has_active_master(&self, excluding: MacAddress) -> bool {
        self.peers
            .values()
            .any(|p| p.address != excluding && p.claims_master())
    }

    pub fn get(&self, address: &MacAddress) -> Option<&Peer> {
        self.peers.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Forget every peer (component restart).
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Snapshot the facts the FSM decides on.  `local` is skipped should
    /// it ever appear in the map.
    pub fn view(&self, local: MacAddress) -> RegistryView {
        let mut view = RegistryView::default();
        for peer in self.peers.values().filter(|p| p.address != local) {
            view.live_peers += 1;
            let key = peer.key();
            if peer.claims_master() {
                view.best_master_claim = Some(view.best_master_claim.map_or(key, |k| k.min(key)));
            }
            if peer.master_eligible {
                view.best_eligible_peer =
                    Some(view.best_eligible_peer.map_or(key, |k| k.min(key)));
            }
        }
        view
    }
}
