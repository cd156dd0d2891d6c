//! MPU-6050 6-axis motion sensor driver.
//!
//! Minimal register-level access: probe (WHO_AM_I), one-shot
//! configuration of ranges and low-pass filter, and a 14-byte burst
//! read of all seven measurement channels.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: talks to the device over I²C via the hw_init helpers.
//! On host/test: reads from static atomics set by [`sim_set_sample`] /
//! [`sim_set_present`] for injection.

use core::sync::atomic::{AtomicBool, AtomicU32};
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

use crate::error::SensorError;
use crate::sensors::RawSample;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Register map (subset) ─────────────────────────────────────

#[cfg(target_os = "espidf")]
mod reg {
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;
}

/// WHO_AM_I value for a genuine MPU-6050.
#[cfg(target_os = "espidf")]
const WHO_AM_I_EXPECTED: u8 = 0x68;

// ── Fixed measurement configuration ───────────────────────────
//
// ±2 g accelerometer range, ±250 °/s gyro range, 21 Hz digital
// low-pass filter.  A floating hydrometer moves slowly; the narrow
// ranges maximise resolution and the filter knocks down wort-surface
// ripple before oversampling does the rest.

/// ACCEL_CONFIG value: AFS_SEL = 0 (±2 g).
#[cfg(target_os = "espidf")]
const ACCEL_RANGE_2G: u8 = 0x00;
/// GYRO_CONFIG value: FS_SEL = 0 (±250 °/s).
#[cfg(target_os = "espidf")]
const GYRO_RANGE_250DPS: u8 = 0x00;
/// CONFIG value: DLPF_CFG = 4 (21 Hz accel bandwidth).
#[cfg(target_os = "espidf")]
const DLPF_BAND_21HZ: u8 = 0x04;

/// LSB per g at ±2 g.
#[cfg(target_os = "espidf")]
const ACCEL_LSB_PER_G: f32 = 16384.0;
/// LSB per °/s at ±250 °/s.
#[cfg(target_os = "espidf")]
const GYRO_LSB_PER_DPS: f32 = 131.0;
#[cfg(target_os = "espidf")]
const STANDARD_GRAVITY: f32 = 9.806_65;

// ── Host-side simulation state ────────────────────────────────
//
// f32 channels are stored as their bit patterns in AtomicU32s so the
// injection points stay lock-free.

static SIM_PRESENT: AtomicBool = AtomicBool::new(true);
static SIM_ACCEL: [AtomicU32; 3] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];
static SIM_GYRO: [AtomicU32; 3] = [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];
static SIM_TEMP: AtomicU32 = AtomicU32::new(0);

/// Inject the sample returned by every simulated read.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_sample(s: RawSample) {
    for i in 0..3 {
        SIM_ACCEL[i].store(s.accel[i].to_bits(), Ordering::Relaxed);
        SIM_GYRO[i].store(s.gyro[i].to_bits(), Ordering::Relaxed);
    }
    SIM_TEMP.store(s.temperature.to_bits(), Ordering::Relaxed);
}

/// Simulate the device being wired up (or not) for probe testing.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_present(present: bool) {
    SIM_PRESENT.store(present, Ordering::Relaxed);
}

// ── Driver ────────────────────────────────────────────────────

pub struct MotionSensor {
    configured: bool,
}

impl Default for MotionSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSensor {
    pub fn new() -> Self {
        Self { configured: false }
    }

    /// Check that the device answers on the bus.
    ///
    /// Absence is a wiring/power fault the device cannot self-correct;
    /// callers retry this indefinitely rather than failing the burst.
    pub fn probe(&mut self) -> Result<(), SensorError> {
        self.platform_probe()
    }

    /// Wake the device and apply the fixed measurement configuration.
    /// Must be re-applied after every power cycle of the sensor rail.
    pub fn configure(&mut self) -> Result<(), SensorError> {
        self.platform_configure()?;
        self.configured = true;
        Ok(())
    }

    /// Read all seven channels once, in sensor units.
    pub fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        debug_assert!(self.configured, "read_raw before configure");
        self.platform_read()
    }

    /// Forget the applied configuration (sensor rail was powered down).
    pub fn invalidate(&mut self) {
        self.configured = false;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_probe(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        hw_init::i2c_read_regs(pins::MPU6050_I2C_ADDR, reg::WHO_AM_I, &mut id)
            .map_err(|_| SensorError::DeviceNotFound)?;
        if id[0] != WHO_AM_I_EXPECTED {
            return Err(SensorError::DeviceNotFound);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_probe(&mut self) -> Result<(), SensorError> {
        if SIM_PRESENT.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(SensorError::DeviceNotFound)
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), SensorError> {
        let addr = pins::MPU6050_I2C_ADDR;
        // Wake from sleep, clock from the X-gyro PLL.
        hw_init::i2c_write_reg(addr, reg::PWR_MGMT_1, 0x01)
            .map_err(|_| SensorError::BusWriteFailed)?;
        hw_init::i2c_write_reg(addr, reg::SMPLRT_DIV, 0x00)
            .map_err(|_| SensorError::BusWriteFailed)?;
        hw_init::i2c_write_reg(addr, reg::CONFIG, DLPF_BAND_21HZ)
            .map_err(|_| SensorError::BusWriteFailed)?;
        hw_init::i2c_write_reg(addr, reg::GYRO_CONFIG, GYRO_RANGE_250DPS)
            .map_err(|_| SensorError::BusWriteFailed)?;
        hw_init::i2c_write_reg(addr, reg::ACCEL_CONFIG, ACCEL_RANGE_2G)
            .map_err(|_| SensorError::BusWriteFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_read(&mut self) -> Result<RawSample, SensorError> {
        // ACCEL_XOUT_H..GYRO_ZOUT_L is one contiguous 14-byte block:
        // accel xyz, temperature, gyro xyz — all big-endian i16.
        let mut buf = [0u8; 14];
        hw_init::i2c_read_regs(pins::MPU6050_I2C_ADDR, reg::ACCEL_XOUT_H, &mut buf)
            .map_err(|_| SensorError::BusReadFailed)?;

        let word = |i: usize| i16::from_be_bytes([buf[i], buf[i + 1]]);

        let accel_scale = STANDARD_GRAVITY / ACCEL_LSB_PER_G;
        let gyro_scale = core::f32::consts::PI / 180.0 / GYRO_LSB_PER_DPS;

        Ok(RawSample {
            accel: [
                f32::from(word(0)) * accel_scale,
                f32::from(word(2)) * accel_scale,
                f32::from(word(4)) * accel_scale,
            ],
            // Die temperature formula from the register map datasheet.
            temperature: f32::from(word(6)) / 340.0 + 36.53,
            gyro: [
                f32::from(word(8)) * gyro_scale,
                f32::from(word(10)) * gyro_scale,
                f32::from(word(12)) * gyro_scale,
            ],
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_read(&mut self) -> Result<RawSample, SensorError> {
        let load3 = |arr: &[AtomicU32; 3]| {
            [
                f32::from_bits(arr[0].load(Ordering::Relaxed)),
                f32::from_bits(arr[1].load(Ordering::Relaxed)),
                f32::from_bits(arr[2].load(Ordering::Relaxed)),
            ]
        };
        Ok(RawSample {
            accel: load3(&SIM_ACCEL),
            gyro: load3(&SIM_GYRO),
            temperature: f32::from_bits(SIM_TEMP.load(Ordering::Relaxed)),
        })
    }
}
