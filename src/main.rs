//! ESP-NOW failover firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspNowRadio        LogEventSink     MonotonicClock   device_id│
//! │  (RadioPort)        (EventSink)      (now_ms)         (MAC)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           FailoverComponent (pure logic)               │    │
//! │  │  PeerRegistry · Beacon · ReceiveQueue · FSM            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};

use espnow_failover::adapters::device_id;
use espnow_failover::adapters::espnow::EspNowRadio;
use espnow_failover::adapters::log_sink::LogEventSink;
use espnow_failover::adapters::time::MonotonicClock;
use espnow_failover::{FailoverComponent, FailoverConfig, GroupId};

// ── Build-time settings ───────────────────────────────────────

const GROUP_ID: &str = match option_env!("FAILOVER_GROUP_ID") {
    Some(id) => id,
    None => "failover",
};

/// Control loop period.  Heartbeats go out on their own interval.
const LOOP_PERIOD_MS: u64 = 100;

/// Status line every this many loop iterations (~1 min).
const STATUS_EVERY: u32 = 600;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ESP-NOW failover v{}             ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. WiFi in STA mode (ESP-NOW rides on it) ─────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
    wifi.start()?;
    info!("WiFi STA started (not associated)");

    // ── 3. Identity + config ──────────────────────────────────
    let mac = device_id::read_mac()?;
    info!("Device ID: {} (MAC {})", device_id::device_id(&mac), mac);

    let config = FailoverConfig::new(GroupId::new(GROUP_ID)?);

    // ── 4. Component + adapters ───────────────────────────────
    let mut failover = FailoverComponent::new(config, mac)?;
    failover.set_is_master_observer(|is_master: bool| info!("is_master = {}", is_master));
    failover.set_peer_count_observer(|count: u32| info!("peer_count = {}", count));

    let mut radio = EspNowRadio::new(failover.receive_queue())?;
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    failover.start(&mut sink);
    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let mut iteration: u32 = 0;
    loop {
        failover.tick(clock.now_ms(), &mut radio, &mut sink);

        iteration = iteration.wrapping_add(1);
        if iteration % STATUS_EVERY == 0 {
            let status = failover.status();
            info!(
                "STATUS | role={} peers={} sent={} failed={} rejected={}",
                status.role.as_str(),
                status.peer_count,
                status.stats.heartbeats_sent,
                status.stats.send_failures,
                status.stats.frames_rejected,
            );
        }

        std::thread::sleep(std::time::Duration::from_millis(LOOP_PERIOD_MS));
    }
}
