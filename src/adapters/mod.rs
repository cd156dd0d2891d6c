//! Adapters — concrete implementations of the port traits.
//!
//! Everything that touches a socket, a bus, or a real clock lives
//! here, behind the `#[cfg(target_os = "espidf")]` dual-target split.

pub mod hardware;
pub mod mqtt;
pub mod time;
pub mod udp;
pub mod wifi;
