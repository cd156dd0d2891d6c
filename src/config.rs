//! System configuration parameters
//!
//! All tunable parameters for the HydroWort device: network identity,
//! broker topics, acquisition burst sizing, publish cadence, and the
//! tilt-to-gravity calibration profile.

use serde::{Deserialize, Serialize};

/// Linear mapping from measured tilt (roll) angle to specific gravity.
///
/// Read-only at runtime.  A zero-width angle range marks an unset
/// calibration; the engine then reports `sg_low` for every input rather
/// than dividing by zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Roll angle (degrees) at the low end of the calibration range.
    pub angle_low: f32,
    /// Roll angle (degrees) at the high end of the calibration range.
    pub angle_high: f32,
    /// Specific gravity mapped to `angle_low`.
    pub sg_low: f32,
    /// Specific gravity mapped to `angle_high`.
    pub sg_high: f32,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        // Bench calibration of the shipping vessel: 15°..80° spans
        // water (1.000) to a finished high-gravity wort (1.120).
        Self {
            angle_low: 15.0,
            angle_high: 80.0,
            sg_low: 1.000,
            sg_high: 1.120,
        }
    }
}

/// Core device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Identity ---
    /// Broker client identifier, also the device's colour-coded name.
    pub client_id: String,
    /// Root of the device's broker topic namespace (`<root>/TILT`, ...).
    pub topic_root: String,

    // --- Network ---
    /// Wireless network name.  Externally provisioned.
    pub wifi_ssid: String,
    /// Wireless passphrase.  Externally provisioned.
    pub wifi_password: String,
    /// Message broker host (no scheme, port 1883 implied by the client).
    pub broker_host: String,
    /// UDP port for the local broadcast datagram sink.
    pub broadcast_port: u16,

    // --- Acquisition ---
    /// Raw samples per acquisition burst.
    pub sample_count: u16,
    /// Spacing between raw samples within a burst (microseconds).
    pub sample_interval_us: u32,

    // --- Timing ---
    /// Interval between acquire→compute→publish cycles (milliseconds).
    pub publish_interval_ms: u32,
    /// Internal cadence adjustment added to the publish interval
    /// (milliseconds).  Zero in the shipping configuration.
    pub cycle_offset_ms: u32,
    /// Poll interval while waiting for link association (milliseconds).
    pub link_poll_ms: u32,
    /// Delay between broker session attempts (milliseconds).
    pub broker_retry_ms: u32,

    // --- Calibration ---
    /// Tilt-to-gravity mapping.
    pub calibration: CalibrationProfile,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Identity
            client_id: "HydroWort-Green".into(),
            topic_root: "HydroWort/Green".into(),

            // Network — credentials are provisioned out of band.
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            broker_host: "prod".into(),
            broadcast_port: 13337,

            // Acquisition — 255 reads at 3150 µs ≈ 0.8 s per burst.
            sample_count: 255,
            sample_interval_us: 3150,

            // Timing
            publish_interval_ms: 10_000,
            cycle_offset_ms: 0,
            link_poll_ms: 500,
            broker_retry_ms: 5_000,

            calibration: CalibrationProfile::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = DeviceConfig::default();
        assert!(c.sample_count >= 1);
        assert!(c.sample_interval_us > 0);
        assert!(c.publish_interval_ms > 0);
        assert!(c.link_poll_ms > 0);
        assert!(c.broker_retry_ms > 0);
        assert!(!c.client_id.is_empty());
        assert!(!c.topic_root.is_empty());
    }

    #[test]
    fn default_calibration_has_nonzero_range() {
        let p = CalibrationProfile::default();
        assert!(p.angle_high > p.angle_low);
        assert!(p.sg_high > p.sg_low);
    }

    #[test]
    fn burst_shorter_than_publish_interval() {
        let c = DeviceConfig::default();
        let burst_ms = u64::from(c.sample_count) * u64::from(c.sample_interval_us) / 1000;
        assert!(
            burst_ms < u64::from(c.publish_interval_ms),
            "a full burst must fit inside one publish interval"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = DeviceConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.client_id, c2.client_id);
        assert_eq!(c.sample_count, c2.sample_count);
        assert!((c.calibration.sg_high - c2.calibration.sg_high).abs() < 0.001);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = DeviceConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: DeviceConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.broadcast_port, c2.broadcast_port);
        assert!((c.calibration.angle_low - c2.calibration.angle_low).abs() < 0.001);
    }
}
