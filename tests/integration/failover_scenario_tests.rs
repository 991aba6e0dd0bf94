//! Multi-device failover scenarios over the simulated broadcast bus.
//!
//! Timings come from `mock_radio::fast_config`: heartbeats every 1 s,
//! peers expire after 3 s of silence, discovery window of 3 rounds.

use crate::mock_radio::{fast_config, mac, Bus};

use espnow_failover::app::events::FailoverEvent;
use espnow_failover::Role;

fn three_device_group() -> Bus {
    let mut bus = Bus::new();
    for last in 1..=3 {
        bus.add(fast_config("abc"), mac(last));
    }
    bus
}

// ── Election ──────────────────────────────────────────────────

#[test]
fn simultaneous_boot_elects_lowest_key() {
    let mut bus = three_device_group();
    bus.run_until(10_000);

    assert_eq!(bus.masters(), vec![0]);
    assert_eq!(bus.role(1), Role::Backup);
    assert_eq!(bus.role(2), Role::Backup);
    for i in 0..3 {
        assert_eq!(bus.peer_count(i), 2, "node {} peer count", i);
    }
}

#[test]
fn no_master_before_discovery_window() {
    let mut bus = three_device_group();
    bus.run_until(2_000);
    assert!(bus.masters().is_empty());
    bus.run_until(2_100);
    assert_eq!(bus.masters(), vec![0]);
}

#[test]
fn priority_outranks_address() {
    let mut bus = Bus::new();
    let mut low_mac = fast_config("abc");
    low_mac.priority = 200;
    let mut high_mac = fast_config("abc");
    high_mac.priority = 10;
    bus.add(low_mac, mac(1));
    bus.add(high_mac, mac(9));

    bus.run_until(10_000);
    assert_eq!(bus.masters(), vec![1]);
}

#[test]
fn ineligible_device_never_becomes_master() {
    let mut bus = Bus::new();
    let mut observer = fast_config("abc");
    observer.master_eligible = false;
    bus.add(observer, mac(1));
    bus.add(fast_config("abc"), mac(2));

    bus.run_until(10_000);
    assert_eq!(bus.masters(), vec![1]);
    assert_eq!(bus.role(0), Role::Backup);

    bus.power_off(1);
    bus.run_until(20_000);
    assert!(bus.masters().is_empty());
    assert_eq!(bus.role(0), Role::Backup);
    assert_eq!(bus.peer_count(0), 0);
}

// ── Failover ──────────────────────────────────────────────────

#[test]
fn master_loss_promotes_best_backup_after_timeout() {
    let mut bus = three_device_group();
    bus.run_until(10_000);
    bus.power_off(0);

    // Last master heartbeat was heard at 9.0 s; 3.0 s of silence is still
    // within the timeout.
    bus.run_until(12_100);
    assert_eq!(bus.role(1), Role::Backup);
    assert!(bus.masters().is_empty());

    bus.run_until(13_100);
    assert_eq!(bus.masters(), vec![1]);
    assert_eq!(bus.role(2), Role::Backup);
    assert_eq!(bus.peer_count(1), 1);
    assert_eq!(bus.peer_count(2), 1);
    assert!(
        bus.nodes[1]
            .sink
            .events
            .contains(&FailoverEvent::PeerLost(mac(1)))
    );
}

#[test]
fn recovered_device_rejoins_as_backup() {
    let mut bus = three_device_group();
    bus.run_until(10_000);
    bus.power_off(0);
    bus.run_until(15_000);
    assert_eq!(bus.masters(), vec![1]);

    bus.reboot(0);
    bus.nodes[1].sink.clear();
    bus.run_until(20_000);

    assert_eq!(bus.masters(), vec![1], "recovery must not preempt");
    assert_eq!(bus.role(0), Role::Backup);
    assert_eq!(bus.nodes[1].sink.role_changes(), 0);
    for i in 0..3 {
        assert_eq!(bus.peer_count(i), 2);
    }
}

#[test]
fn partition_heal_resolves_split_brain() {
    let mut bus = three_device_group();
    bus.block(0, 2);
    bus.block(1, 2);
    bus.run_until(10_000);
    assert_eq!(bus.masters(), vec![0, 2]);

    bus.heal();
    bus.run_until(12_000);
    assert_eq!(bus.masters(), vec![0]);
    assert_eq!(bus.role(2), Role::Backup);
    assert!(bus.nodes[2].sink.events.contains(&FailoverEvent::RoleChanged {
        from: Role::Master,
        to: Role::Backup,
    }));
}

// ── Tolerance ─────────────────────────────────────────────────

#[test]
fn outage_shorter_than_timeout_changes_nothing() {
    let mut bus = Bus::new();
    bus.add(fast_config("abc"), mac(1));
    bus.add(fast_config("abc"), mac(2));
    bus.run_until(9_500);
    for node in &mut bus.nodes {
        node.sink.clear();
    }

    bus.block(0, 1);
    bus.run_until(11_500);
    bus.heal();
    bus.run_until(15_000);

    assert_eq!(bus.masters(), vec![0]);
    for node in &bus.nodes {
        assert_eq!(node.sink.role_changes(), 0);
        assert!(
            !node
                .sink
                .events
                .iter()
                .any(|e| matches!(e, FailoverEvent::PeerLost(_)))
        );
    }
}

#[test]
fn missed_sends_within_timeout_do_not_fail_over() {
    let mut bus = three_device_group();
    bus.run_until(9_500);
    for node in &mut bus.nodes {
        node.sink.clear();
    }

    bus.nodes[0].radio.fail_remaining = 2;
    bus.run_until(15_000);

    assert_eq!(bus.masters(), vec![0]);
    assert_eq!(bus.nodes[0].component.stats().send_failures, 2);
    assert_eq!(bus.nodes[1].sink.role_changes(), 0);
    assert_eq!(bus.nodes[2].sink.role_changes(), 0);
}

#[test]
fn foreign_groups_are_isolated() {
    let mut bus = Bus::new();
    bus.add(fast_config("abc"), mac(1));
    bus.add(fast_config("xyz"), mac(2));
    bus.run_until(10_000);

    assert_eq!(bus.masters(), vec![0, 1]);
    for i in 0..2 {
        assert_eq!(bus.peer_count(i), 0);
        assert!(bus.nodes[i].component.stats().frames_rejected > 0);
    }
}
