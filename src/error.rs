//! Unified error types for the HydroWort firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling
//! uniform.  All variants are `Copy` so they can be cheaply threaded through
//! the supervisor and publish outcome records without allocation.
//!
//! Transient hardware absence and link loss are *not* surfaced as `Error`
//! values at the component boundary — they are absorbed by indefinite retry
//! loops, since the device has no operator console to report to.  The types
//! below cover the faults that callers do observe (broker session, publish
//! sinks).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The motion sensor could not be probed or read.
    Sensor(SensorError),
    /// A connectivity or publish-sink operation failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Faults on the I²C path to the motion sensor.  These never escape the
/// acquisition burst — absence is retried forever with a fixed delay — but
/// the probe/read primitives report them so the retry loop can log what it
/// is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// WHO_AM_I probe found no device (wiring or power fault).
    DeviceNotFound,
    /// A register read failed or returned a short buffer.
    BusReadFailed,
    /// A register write failed.
    BusWriteFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotFound => write!(f, "MPU-6050 not found"),
            Self::BusReadFailed => write!(f, "I2C read failed"),
            Self::BusWriteFailed => write!(f, "I2C write failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The wireless link is not associated.
    LinkDown,
    /// Broker session could not be established.
    BrokerConnectFailed,
    /// Subscribing to the inbound control topic failed.
    SubscribeFailed,
    /// A broker topic publish was rejected or the session was gone.
    BrokerPublishFailed,
    /// The broadcast datagram could not be sent.
    BroadcastSendFailed,
    /// The broadcast socket could not be opened.
    SocketUnavailable,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "link not associated"),
            Self::BrokerConnectFailed => write!(f, "broker connect failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::BrokerPublishFailed => write!(f, "broker publish failed"),
            Self::BroadcastSendFailed => write!(f, "broadcast send failed"),
            Self::SocketUnavailable => write!(f, "broadcast socket unavailable"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
