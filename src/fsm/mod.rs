//! Function-pointer finite state machine engine for the local role.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────────┬───────────┬──────────┬──────────────┐  │
//! │  │ Role         │ on_enter  │ on_exit  │ on_update    │  │
//! │  ├──────────────┼───────────┼──────────┼──────────────┤  │
//! │  │ Undetermined │ fn(ctx)   │ -        │ fn(ctx)->Opt │  │
//! │  │ Backup       │ fn(ctx)   │ -        │ fn(ctx)->Opt │  │
//! │  │ Master       │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Opt │  │
//! │  └──────────────┴───────────┴──────────┴──────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each heartbeat round the engine calls `on_update` for the **current**
//! state via [`Fsm::tick`].  Between rounds, fresh heartbeats trigger
//! [`Fsm::evaluate`], which runs the same handler without advancing the
//! round counter.  If the handler returns `Some(next)`, the engine runs
//! `on_exit` for the current state, then `on_enter` for the next.
//!
//! Handlers only read the [`FsmContext`]: a registry snapshot, the local
//! tie-break key and the round counters.  The machine is therefore a pure
//! function of its inputs and runs without a radio in tests.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;
use serde::Serialize;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Local (or claimed) failover role.  Doubles as the FSM state id.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Role {
    Undetermined = 0,
    Backup = 1,
    Master = 2,
}

impl Role {
    /// Total number of roles, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a table index back to `Role`.  Panics on out-of-range in
    /// debug builds; returns `Undetermined` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Undetermined,
            1 => Self::Backup,
            2 => Self::Master,
            _ => {
                debug_assert!(false, "invalid role index: {idx}");
                Self::Undetermined
            }
        }
    }

    /// Decode the wire representation.
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Undetermined),
            1 => Some(Self::Backup),
            2 => Some(Self::Master),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undetermined => "UNDETERMINED",
            Self::Backup => "BACKUP",
            Self::Master => "MASTER",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<Role>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: Role,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The role state machine.
pub struct Fsm {
    /// Fixed-size table indexed by `Role as usize`.
    table: [StateDescriptor; Role::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Heartbeat rounds since start.
    round_count: u64,
    /// Round at which the current state was entered.
    state_entry_round: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; Role::COUNT], initial: Role) -> Self {
        Self {
            table,
            current: initial as usize,
            round_count: 0,
            state_entry_round: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Put the engine back into `initial` with zeroed counters (component
    /// restart).  Does not run any handler; call [`start`](Self::start) next.
    pub fn reset(&mut self, initial: Role) {
        self.current = initial as usize;
        self.round_count = 0;
        self.state_entry_round = 0;
    }

    /// Advance by one heartbeat round and evaluate.
    /// Returns the new role if a transition happened.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<Role> {
        self.round_count += 1;
        self.evaluate(ctx)
    }

    /// Evaluate the current state's update handler without advancing time.
    /// Returns the new role if a transition happened.
    pub fn evaluate(&mut self, ctx: &mut FsmContext) -> Option<Role> {
        ctx.rounds_in_state = self.round_count - self.state_entry_round;
        ctx.total_rounds = self.round_count;

        let next = (self.table[self.current].on_update)(ctx)?;
        if next as usize == self.current {
            return None;
        }
        self.transition(next, ctx);
        Some(next)
    }

    /// Force an immediate transition regardless of the update handlers.
    pub fn force_transition(&mut self, next: Role, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current role.
    pub fn current_state(&self) -> Role {
        Role::from_index(self.current)
    }

    /// How many rounds the FSM has been in the current state.
    pub fn rounds_in_current_state(&self) -> u64 {
        self.round_count - self.state_entry_round
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Role, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_round = self.round_count;
        ctx.rounds_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::FsmContext;
    use super::*;
    use crate::registry::{MacAddress, RegistryView, TieBreakKey};

    fn key(last: u8) -> TieBreakKey {
        TieBreakKey::new(128, MacAddress([0, 0, 0, 0, 0, last]))
    }

    fn make_ctx(local: u8, window: u32) -> FsmContext {
        FsmContext::new(key(local), true, window)
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), Role::Undetermined)
    }

    fn view(live: usize, master: Option<u8>, eligible: Option<u8>) -> RegistryView {
        RegistryView {
            live_peers: live,
            best_master_claim: master.map(key),
            best_eligible_peer: eligible.map(key),
        }
    }

    #[test]
    fn starts_undetermined() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), Role::Undetermined);
    }

    #[test]
    fn lone_device_becomes_master_exactly_at_window() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 5);
        fsm.start(&mut ctx);
        for _ in 0..4 {
            fsm.tick(&mut ctx);
            assert_eq!(fsm.current_state(), Role::Undetermined);
        }
        assert_eq!(fsm.tick(&mut ctx), Some(Role::Master));
        assert_eq!(fsm.current_state(), Role::Master);
    }

    #[test]
    fn evaluate_does_not_advance_window() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 2);
        fsm.start(&mut ctx);
        for _ in 0..10 {
            fsm.evaluate(&mut ctx);
        }
        assert_eq!(fsm.current_state(), Role::Undetermined);
        assert_eq!(fsm.rounds_in_current_state(), 0);
    }

    #[test]
    fn existing_master_makes_newcomer_backup_before_window() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 5);
        fsm.start(&mut ctx);
        ctx.view = view(1, Some(7), Some(7));
        assert_eq!(fsm.tick(&mut ctx), Some(Role::Backup));
    }

    #[test]
    fn loser_of_tie_break_becomes_backup_after_window() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(3, 2);
        fsm.start(&mut ctx);
        ctx.view = view(2, None, Some(1));
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Undetermined);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Backup);
    }

    #[test]
    fn ineligible_device_never_becomes_master() {
        let mut fsm = make_fsm();
        let mut ctx = FsmContext::new(key(1), false, 1);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Backup);
        for _ in 0..10 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), Role::Backup);
    }

    #[test]
    fn backup_takes_over_when_master_disappears() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(2, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Backup, &mut ctx);

        ctx.view = view(2, Some(1), Some(1));
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Backup);

        // Master purged; device 3 remains.
        ctx.view = view(1, None, Some(3));
        assert_eq!(fsm.evaluate(&mut ctx), Some(Role::Master));
    }

    #[test]
    fn backup_defers_to_better_peer_after_master_loss() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(3, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Backup, &mut ctx);
        ctx.view = view(1, None, Some(2));
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Backup);
    }

    #[test]
    fn backup_is_not_preemptive() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Backup, &mut ctx);
        ctx.view = view(1, Some(5), Some(5));
        for _ in 0..5 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), Role::Backup);
    }

    #[test]
    fn master_yields_to_lower_master_claim() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(2, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Master, &mut ctx);
        ctx.view = view(1, Some(1), Some(1));
        assert_eq!(fsm.evaluate(&mut ctx), Some(Role::Backup));
    }

    #[test]
    fn master_keeps_role_against_higher_master_claim() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Master, &mut ctx);
        ctx.view = view(1, Some(2), Some(2));
        assert_eq!(fsm.evaluate(&mut ctx), None);
        assert_eq!(fsm.current_state(), Role::Master);
    }

    #[test]
    fn master_ignores_better_non_master_peer() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(5, 1);
        fsm.start(&mut ctx);
        fsm.force_transition(Role::Master, &mut ctx);
        ctx.view = view(1, None, Some(1));
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Master);
    }

    #[test]
    fn reset_returns_to_undetermined() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx(1, 1);
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Role::Master);
        fsm.reset(Role::Undetermined);
        assert_eq!(fsm.current_state(), Role::Undetermined);
        assert_eq!(fsm.rounds_in_current_state(), 0);
    }

    #[test]
    fn role_from_index_roundtrip() {
        for i in 0..Role::COUNT {
            assert_eq!(Role::from_index(i) as usize, i);
        }
    }

    #[test]
    fn role_wire_values() {
        assert_eq!(Role::from_wire(2), Some(Role::Master));
        assert_eq!(Role::from_wire(3), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::context::FsmContext;
    use super::*;
    use crate::registry::{MacAddress, RegistryView, TieBreakKey};
    use proptest::prelude::*;

    fn key(last: u8) -> TieBreakKey {
        TieBreakKey::new(128, MacAddress([0, 0, 0, 0, 0, last]))
    }

    fn arb_view() -> impl Strategy<Value = (usize, Option<u8>, Option<u8>, bool)> {
        (
            0usize..8,
            proptest::option::of(0u8..10),
            proptest::option::of(0u8..10),
            any::<bool>(), // round tick vs. mid-round evaluation
        )
    }

    proptest! {
        #[test]
        fn ineligible_never_master(steps in proptest::collection::vec(arb_view(), 1..100)) {
            let mut fsm = Fsm::new(states::build_state_table(), Role::Undetermined);
            let mut ctx = FsmContext::new(key(0), false, 3);
            fsm.start(&mut ctx);
            for (live, master, eligible, round) in steps {
                ctx.view = RegistryView {
                    live_peers: live,
                    best_master_claim: master.map(key),
                    best_eligible_peer: eligible.map(key),
                };
                if round { fsm.tick(&mut ctx); } else { fsm.evaluate(&mut ctx); }
                prop_assert_ne!(fsm.current_state(), Role::Master);
            }
        }

        #[test]
        fn lone_eligible_device_always_ends_master(start in 0usize..3, window in 1u32..10) {
            let mut fsm = Fsm::new(states::build_state_table(), Role::Undetermined);
            let mut ctx = FsmContext::new(key(4), true, window);
            fsm.start(&mut ctx);
            fsm.force_transition(Role::from_index(start), &mut ctx);
            for _ in 0..window {
                fsm.tick(&mut ctx);
            }
            prop_assert_eq!(fsm.current_state(), Role::Master);
        }
    }
}
