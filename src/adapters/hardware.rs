//! Hardware adapter — the acquisition rig behind [`SensorPort`].
//!
//! Owns the motion sensor driver and its switched power rail, and
//! implements the full burst contract: power up, wait for the device,
//! oversample, average, power down.  This is the only module in the
//! system with a hardware side effect besides network I/O.

use log::warn;

use crate::app::ports::{ClockPort, SensorPort};
use crate::drivers::sensor_power::SensorPower;
use crate::sensors::motion::MotionSensor;
use crate::sensors::{AveragedSample, SampleAccumulator};

/// Supply-rail settle time after power-up, before the first bus access.
const POWER_SETTLE_MS: u32 = 100;
/// Settle time after power-down, letting the rail discharge.
const POWER_OFF_SETTLE_MS: u32 = 10;
/// Delay between probe attempts while the device is absent.
const PROBE_RETRY_MS: u32 = 1_000;

pub struct HardwareAdapter {
    motion: MotionSensor,
    power: SensorPower,
}

impl HardwareAdapter {
    pub fn new(motion: MotionSensor, power: SensorPower) -> Self {
        Self { motion, power }
    }

    /// Whether the sensor rail is currently energised (diagnostics).
    pub fn sensor_powered(&self) -> bool {
        self.power.is_on()
    }
}

impl SensorPort for HardwareAdapter {
    fn acquire_burst(
        &mut self,
        count: u16,
        interval_us: u32,
        clock: &mut impl ClockPort,
    ) -> AveragedSample {
        // Division below is only defined for a non-empty burst.
        let count = count.max(1);

        self.power.on();
        clock.sleep_ms(POWER_SETTLE_MS);

        // Wait for the device, forever if need be.  Absence means a
        // wiring or power fault the firmware cannot fix; there is no
        // host to report to, so stay loud in the log and keep trying.
        loop {
            let ready = match self.motion.probe() {
                Ok(()) => self.motion.configure(),
                Err(e) => Err(e),
            };
            match ready {
                Ok(()) => break,
                Err(e) => {
                    warn!("sensor not ready ({e}), retrying in {PROBE_RETRY_MS} ms");
                    clock.sleep_ms(PROBE_RETRY_MS);
                }
            }
        }

        let mut acc = SampleAccumulator::new();
        for _ in 0..count {
            match self.motion.read_raw() {
                Ok(s) => acc.add(&s),
                // A dropped read shrinks the divisor instead of
                // poisoning the mean.
                Err(e) => warn!("sample read failed mid-burst ({e})"),
            }
            clock.sleep_us(interval_us);
        }

        // Power down unconditionally — idle draw matters more than the
        // few microseconds a conditional would save.
        self.motion.invalidate();
        self.power.off();
        clock.sleep_ms(POWER_OFF_SETTLE_MS);

        acc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::FakeClock;
    use crate::sensors::RawSample;
    use crate::sensors::motion::{sim_set_present, sim_set_sample};

    // One combined test: the simulation injection points are
    // process-wide statics, so concurrent test functions would race.
    #[test]
    fn probe_and_burst_against_simulated_sensor() {
        // Probe surfaces absence...
        sim_set_present(false);
        let mut motion = MotionSensor::new();
        assert!(motion.probe().is_err());

        // ...and recovers when the device appears.
        sim_set_present(true);
        assert!(motion.probe().is_ok());

        let injected = RawSample {
            accel: [0.12, 4.05, 8.81],
            gyro: [0.01, -0.02, 0.005],
            temperature: 19.25,
        };
        sim_set_sample(injected);

        let mut hw = HardwareAdapter::new(motion, SensorPower::new());
        let mut clock = FakeClock::new();

        let avg = hw.acquire_burst(8, 3_150, &mut clock);

        // Identical raw samples average to themselves.
        for i in 0..3 {
            assert!((avg.accel[i] - injected.accel[i]).abs() < 1e-5);
            assert!((avg.gyro[i] - injected.gyro[i]).abs() < 1e-5);
        }
        assert!((avg.temperature - injected.temperature).abs() < 1e-5);

        // Exactly count reads spaced by the configured interval.
        assert_eq!(clock.slept_us_total(), 8 * 3_150);
        // Settle delays on both edges of the power toggle.
        assert_eq!(clock.sleeps_ms(), vec![100, 10]);
        // Rail is off again before the burst returns.
        assert!(!hw.sensor_powered());

        // Zero-count bursts are clamped to a single read.
        let avg = hw.acquire_burst(0, 1_000, &mut clock);
        assert!((avg.temperature - injected.temperature).abs() < 1e-5);
    }
}
