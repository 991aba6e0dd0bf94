//! Context threaded through every FSM handler.
//!
//! Holds the inputs the role decision depends on (local tie-break key,
//! eligibility, discovery window, latest registry snapshot) plus the
//! round counters maintained by the engine.

use crate::registry::{RegistryView, TieBreakKey};

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Rounds elapsed since the current state was entered.
    pub rounds_in_state: u64,
    /// Rounds elapsed since start.
    pub total_rounds: u64,
    /// Rounds to wait for an existing master before electing one.
    pub discovery_window_rounds: u32,

    // -- Identity --
    /// This device's election key.
    pub local_key: TieBreakKey,
    /// Whether this device may become master.
    pub master_eligible: bool,

    // -- Peers --
    /// Registry snapshot, refreshed by the component before each evaluation.
    pub view: RegistryView,
}

impl FsmContext {
    pub fn new(local_key: TieBreakKey, master_eligible: bool, discovery_window_rounds: u32) -> Self {
        Self {
            rounds_in_state: 0,
            total_rounds: 0,
            discovery_window_rounds,
            local_key,
            master_eligible,
            view: RegistryView::default(),
        }
    }

    /// Some live peer currently claims master.
    pub fn master_present(&self) -> bool {
        self.view.best_master_claim.is_some()
    }

    /// A live peer claims master with a key that beats ours.
    pub fn outranked_by_master(&self) -> bool {
        self.view
            .best_master_claim
            .is_some_and(|k| k < self.local_key)
    }

    /// This device is eligible and its key beats every live eligible peer.
    pub fn wins_tie_break(&self) -> bool {
        self.master_eligible
            && self
                .view
                .best_eligible_peer
                .is_none_or(|k| self.local_key < k)
    }

    /// The discovery window has fully elapsed in the current state.
    pub fn discovery_window_elapsed(&self) -> bool {
        self.rounds_in_state >= u64::from(self.discovery_window_rounds)
    }
}
