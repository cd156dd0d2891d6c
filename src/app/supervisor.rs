//! Connectivity supervisor — the hexagonal core.
//!
//! Owns the connection FSM, its context, and the telemetry publisher,
//! and drives the device's entire lifecycle from `tick()`:
//!
//! ```text
//!  LinkPort ────▶ ┌──────────────────────────┐ ──▶ BrokerPort
//!  SensorPort ──▶ │        Supervisor         │ ──▶ BroadcastPort
//!  ClockPort ───▶ │  FSM · pipeline · cadence │
//!                 └──────────────────────────┘
//! ```
//!
//! Each pass: observe the world (clock, link, session), run one FSM
//! pass over the blackboard, then execute whatever single action the
//! current state requested.  All I/O and all sleeping happens here, on
//! injected ports — never inside the state handlers.

use log::{info, warn};

use crate::config::DeviceConfig;
use crate::events;
use crate::fsm::context::{Action, SupervisorContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{ConnState, Fsm};
use crate::telemetry::{PublishOutcome, TelemetryPublisher, TopicSet};
use crate::tilt;

use super::ports::{BroadcastPort, BrokerPort, ClockPort, LinkPort, SensorPort};

/// Pace of an idle control-loop pass.  Coarse is fine: the publish
/// cadence is checked against the clock, not counted in passes.
const IDLE_PACE_MS: u32 = 50;

pub struct Supervisor {
    fsm: Fsm,
    ctx: SupervisorContext,
    publisher: TelemetryPublisher,
    /// Outcome of the most recent publish cycle (diagnostics).
    last_outcome: Option<PublishOutcome>,
}

impl Supervisor {
    /// Construct the supervisor from configuration.
    ///
    /// Does **not** start the FSM — call [`start`](Self::start) next.
    pub fn new(config: DeviceConfig) -> Self {
        let publisher = TelemetryPublisher::new(TopicSet::new(&config.topic_root));
        let ctx = SupervisorContext::new(config);
        let fsm = Fsm::new(build_state_table(), ConnState::Disconnected);

        Self {
            fsm,
            ctx,
            publisher,
            last_outcome: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the initial `on_enter` for `Disconnected`.
    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
        info!("Supervisor started in {:?}", self.fsm.current_state());
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// One pass of the control loop: observe → FSM → act.
    ///
    /// The pass blocks only at the injected sleep points (link poll
    /// delay, broker retry delay, burst sample spacing), which is the
    /// whole of the device's suspension model — there are no threads
    /// and no other concurrent duties.
    pub fn tick(
        &mut self,
        sensor: &mut impl SensorPort,
        link: &mut impl LinkPort,
        broker: &mut impl BrokerPort,
        broadcast: &mut impl BroadcastPort,
        clock: &mut impl ClockPort,
    ) {
        // 1. Observe the world.
        self.ctx.now_ms = clock.now_ms();
        self.ctx.link_up = link.is_associated();
        // The session flag only *rises* through a completed handshake
        // (connect + announce + resubscribe).  A client that still
        // claims "connected" after a Disconnected excursion must not
        // shortcut the re-announce.
        self.ctx.broker_up = self.ctx.broker_up && broker.is_connected();

        // 2. Service the broker client (non-blocking) while a session
        //    is believed alive.
        if self.fsm.current_state() == ConnState::BrokerConnected {
            broker.poll();
        }

        // 3. FSM pass (pure state logic over the blackboard).
        self.ctx.request = None;
        self.fsm.tick(&mut self.ctx);

        // 4. Execute the requested action through the ports.
        match self.ctx.request.take() {
            Some(Action::AttemptLink) => {
                link.attempt();
                clock.sleep_ms(self.ctx.config.link_poll_ms);
            }
            Some(Action::ConnectBroker) => self.connect_broker(broker, clock),
            Some(Action::RunCycle) => self.run_cycle(sensor, broker, broadcast, clock),
            None => {}
        }
    }

    /// The forever loop: tick, drain inbound control messages, pace.
    ///
    /// This is the device's whole life; the only way out is a power
    /// cycle.
    pub fn run_forever(
        &mut self,
        sensor: &mut impl SensorPort,
        link: &mut impl LinkPort,
        broker: &mut impl BrokerPort,
        broadcast: &mut impl BroadcastPort,
        clock: &mut impl ClockPort,
    ) -> ! {
        loop {
            self.tick(sensor, link, broker, broadcast, clock);

            // Inbound control messages are received but not acted upon:
            // tare handling awaits the zero-offset feature.
            events::drain_control(|payload| {
                info!(
                    "control: {}-byte message on tare topic (recorded, not applied)",
                    payload.len()
                );
            });

            // Short fixed pace so an idle BrokerConnected pass does not
            // spin; the retry states sleep on their own.
            clock.sleep_ms(IDLE_PACE_MS);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> ConnState {
        self.fsm.current_state()
    }

    /// Completed acquire→compute→publish cycles since boot.
    pub fn cycles_completed(&self) -> u64 {
        self.ctx.cycles_completed
    }

    /// Per-sink outcome of the most recent cycle, if any ran.
    pub fn last_outcome(&self) -> Option<&PublishOutcome> {
        self.last_outcome.as_ref()
    }

    // ── Internal ──────────────────────────────────────────────

    /// One broker session attempt: connect, announce baseline values,
    /// resubscribe.  On failure, wait the fixed retry delay — the next
    /// pass tries again, forever.
    fn connect_broker(&mut self, broker: &mut impl BrokerPort, clock: &mut impl ClockPort) {
        match broker.connect(&self.ctx.config.client_id) {
            Ok(()) => {
                // Idempotent announce: subscribers see the device (with
                // zeroed values) immediately after every reconnect.
                if let Err(e) = self.publisher.announce_baseline(broker) {
                    warn!("announce: baseline publish incomplete ({e})");
                }
                if let Err(e) = broker.subscribe(&self.publisher.topics().tare) {
                    warn!("subscribe: tare topic unavailable ({e})");
                }
                self.ctx.broker_up = true;
                info!(
                    "broker session open as '{}' on '{}'",
                    self.ctx.config.client_id, self.ctx.config.broker_host
                );
            }
            Err(e) => {
                warn!(
                    "broker connect failed ({e}), retrying in {} ms",
                    self.ctx.config.broker_retry_ms
                );
                clock.sleep_ms(self.ctx.config.broker_retry_ms);
            }
        }
    }

    /// One full acquire → compute → publish cycle.
    fn run_cycle(
        &mut self,
        sensor: &mut impl SensorPort,
        broker: &mut impl BrokerPort,
        broadcast: &mut impl BroadcastPort,
        clock: &mut impl ClockPort,
    ) {
        let count = self.ctx.config.sample_count;
        let interval_us = self.ctx.config.sample_interval_us;
        let profile = self.ctx.config.calibration;

        let sample = sensor.acquire_burst(count, interval_us, clock);
        let reading = tilt::compute_reading(&sample, &profile);

        info!(
            "reading: tilt={:.1} pitch={:.1} sg={:.3} temp={:.1} batt={} accel=[{:.2} {:.2} {:.2}] gyro=[{:.2} {:.2} {:.2}]",
            reading.roll,
            reading.pitch,
            reading.specific_gravity,
            reading.temperature,
            reading.battery,
            reading.acceleration[0],
            reading.acceleration[1],
            reading.acceleration[2],
            reading.gyro[0],
            reading.gyro[1],
            reading.gyro[2],
        );

        let outcome = self.publisher.publish(&reading, broker, broadcast);
        self.last_outcome = Some(outcome);
        self.ctx.mark_cycle_done();

        // Pick up a drop that happened mid-cycle now rather than a full
        // pass later; the FSM reverts before any further publish.
        self.ctx.broker_up = self.ctx.broker_up && broker.is_connected();
    }
}
