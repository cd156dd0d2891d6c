//! HydroWort Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  HardwareAdapter    WifiLink     MqttBroker    UdpBroadcast  │
//! │  (SensorPort)       (LinkPort)   (BrokerPort)  (Broadcast)   │
//! │  DeviceClock                                                 │
//! │  (ClockPort)                                                 │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ────────────────       │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │            Supervisor (pure logic)                   │    │
//! │  │  Connection FSM · acquire→compute→publish pipeline   │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no exit path: the control loop runs until power-off.

use anyhow::Result;
use log::{info, warn};

use hydrowort::adapters::hardware::HardwareAdapter;
use hydrowort::adapters::mqtt::MqttBroker;
use hydrowort::adapters::time::DeviceClock;
use hydrowort::adapters::udp::UdpBroadcast;
use hydrowort::adapters::wifi::WifiLink;
use hydrowort::app::supervisor::Supervisor;
use hydrowort::config::DeviceConfig;
use hydrowort::drivers::hw_init;
use hydrowort::drivers::sensor_power::SensorPower;
use hydrowort::sensors::motion::MotionSensor;

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("HydroWort v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Not fatal: the acquisition path probes the sensor forever
        // anyway, and that retry loop is the fault's natural home.
        warn!("HAL init failed ({e}) — sensor probe will keep retrying");
    }

    // ── 3. Configuration ──────────────────────────────────────
    // Credentials and calibration are provisioned through the separate
    // configuration editor; the firmware only consumes them.
    let config = DeviceConfig::default();
    info!(
        "device '{}' publishing under '{}'",
        config.client_id, config.topic_root
    );

    // ── 4. Construct adapters ─────────────────────────────────
    let mut clock = DeviceClock::new();
    let mut hardware = HardwareAdapter::new(MotionSensor::new(), SensorPower::new());

    #[cfg(target_os = "espidf")]
    let mut link = {
        let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
        let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
        let nvs = esp_idf_svc::nvs::EspDefaultNvsPartition::take()?;
        WifiLink::new(
            peripherals.modem,
            sysloop,
            Some(nvs),
            &config.wifi_ssid,
            &config.wifi_password,
        )?
    };
    #[cfg(not(target_os = "espidf"))]
    let mut link = {
        // Host simulation: give the motion sensor a plausible attitude
        // so the published readings are non-degenerate.
        hydrowort::sensors::motion::sim_set_sample(hydrowort::sensors::RawSample {
            accel: [0.31, 4.18, 8.82],
            gyro: [0.001, -0.002, 0.0],
            temperature: 19.6,
        });
        WifiLink::new("sim-net", "")?
    };

    let mut broker = MqttBroker::new(format!("mqtt://{}:1883", config.broker_host));
    let mut broadcast = UdpBroadcast::new(config.broadcast_port);

    // ── 5. Supervisor ─────────────────────────────────────────
    let mut supervisor = Supervisor::new(config);
    supervisor.start();

    info!("entering control loop");
    supervisor.run_forever(
        &mut hardware,
        &mut link,
        &mut broker,
        &mut broadcast,
        &mut clock,
    )
}
