//! Concrete state handler functions and table builder.
//!
//! ```text
//!                 [peer claims master]
//!   UNDETERMINED ─────────────────────────────▶ BACKUP
//!        │        [window elapsed, lost tie-break]  ▲  │
//!        │                                          │  │ [no live master,
//!        │ [window elapsed, no master,              │  │  wins tie-break]
//!        │  wins tie-break]                         │  ▼
//!        └────────────────────────────────────▶ MASTER
//!                          [lower-keyed master claim] ─┘
//! ```

use super::context::FsmContext;
use super::{Role, StateDescriptor};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table.  Called once per component.
pub fn build_state_table() -> [StateDescriptor; Role::COUNT] {
    [
        // Index 0: Undetermined
        StateDescriptor {
            id: Role::Undetermined,
            name: "Undetermined",
            on_enter: Some(undetermined_enter),
            on_exit: None,
            on_update: undetermined_update,
        },
        // Index 1: Backup
        StateDescriptor {
            id: Role::Backup,
            name: "Backup",
            on_enter: Some(backup_enter),
            on_exit: None,
            on_update: backup_update,
        },
        // Index 2: Master
        StateDescriptor {
            id: Role::Master,
            name: "Master",
            on_enter: Some(master_enter),
            on_exit: Some(master_exit),
            on_update: master_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNDETERMINED: listening for an existing master
// ═══════════════════════════════════════════════════════════════════════════

fn undetermined_enter(ctx: &mut FsmContext) {
    info!(
        "UNDETERMINED: discovering peers for {} rounds (key {})",
        ctx.discovery_window_rounds, ctx.local_key
    );
}

fn undetermined_update(ctx: &mut FsmContext) -> Option<Role> {
    if ctx.master_present() {
        return Some(Role::Backup);
    }
    if !ctx.discovery_window_elapsed() {
        return None;
    }
    if ctx.wins_tie_break() {
        Some(Role::Master)
    } else {
        Some(Role::Backup)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  BACKUP: following a master, ready to take over
// ═══════════════════════════════════════════════════════════════════════════

fn backup_enter(ctx: &mut FsmContext) {
    match ctx.view.best_master_claim {
        Some(master) => info!("BACKUP: following master {}", master),
        None => info!("BACKUP: waiting for the elected peer to claim master"),
    }
}

fn backup_update(ctx: &mut FsmContext) -> Option<Role> {
    if ctx.master_present() {
        return None;
    }
    if ctx.wins_tie_break() {
        warn!(
            "BACKUP: no live master among {} peers, taking over",
            ctx.view.live_peers
        );
        return Some(Role::Master);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  MASTER: active device
// ═══════════════════════════════════════════════════════════════════════════

fn master_enter(ctx: &mut FsmContext) {
    info!(
        "MASTER: acting master with key {} ({} live peers)",
        ctx.local_key, ctx.view.live_peers
    );
}

fn master_exit(ctx: &mut FsmContext) {
    if let Some(winner) = ctx.view.best_master_claim {
        info!("MASTER: yielding to {}", winner);
    }
}

fn master_update(ctx: &mut FsmContext) -> Option<Role> {
    if ctx.outranked_by_master() {
        warn!("MASTER: split-brain detected, lower key claims master");
        return Some(Role::Backup);
    }
    None
}
