//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor (domain)
//! ```
//!
//! Driven adapters (motion sensor rig, wireless link, broker client,
//! broadcast socket, clock) implement these traits.  The
//! [`Supervisor`](super::supervisor::Supervisor) consumes them via
//! generics, so the domain core never touches hardware directly and
//! every retry loop runs against an injectable clock in tests.

use crate::error::CommsError;
use crate::sensors::AveragedSample;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: time source + sleep)
// ───────────────────────────────────────────────────────────────

/// Monotonic time and cooperative delays.
///
/// Every blocking point in the firmware (link poll, burst spacing,
/// broker retry) sleeps through this port, which is what makes the
/// retry policies deterministic under test.
pub trait ClockPort {
    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;

    /// Block the control loop for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Block the control loop for `us` microseconds (burst spacing).
    fn sleep_us(&mut self, us: u32);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the supervisor calls this once per publish cycle.
pub trait SensorPort {
    /// Power the sensor, drain `count` raw samples spaced `interval_us`
    /// apart, power it down, and return the per-channel mean.
    ///
    /// Never fails: sensor absence is retried indefinitely inside the
    /// burst (a wiring fault has no better recovery on an unattended
    /// device).  `count` is clamped to at least 1.
    fn acquire_burst(
        &mut self,
        count: u16,
        interval_us: u32,
        clock: &mut impl ClockPort,
    ) -> AveragedSample;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: wireless association)
// ───────────────────────────────────────────────────────────────

/// The wireless link.  Association is all the supervisor cares about;
/// addressing and DHCP are the adapter's problem.
pub trait LinkPort {
    /// Kick (or continue) an association attempt.  Never fails — the
    /// supervisor polls `is_associated` and retries forever.
    fn attempt(&mut self);

    /// True when the link reports associated and usable.
    fn is_associated(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: message-broker session)
// ───────────────────────────────────────────────────────────────

/// The device's broker session: connect/track/publish/subscribe.
pub trait BrokerPort {
    /// Open a session under the fixed client identifier.  A previous
    /// session, if any, is discarded.
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError>;

    /// True while the session is believed alive.
    fn is_connected(&self) -> bool;

    /// Publish a text payload to one topic, best-effort.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError>;

    /// Subscribe to an inbound topic; received payloads are handed to
    /// the control queue (`crate::events`).
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    /// Service the client (non-blocking).  Called once per supervisor
    /// pass while connected.
    fn poll(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Broadcast port (driven adapter: connectionless datagram sink)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget local broadcast.  No acknowledgment, no retry.
pub trait BroadcastPort {
    fn send(&mut self, payload: &[u8]) -> Result<(), CommsError>;
}
