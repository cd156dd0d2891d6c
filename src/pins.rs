//! GPIO / peripheral pin assignments for the HydroWort sensor board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Motion sensor power control
// ---------------------------------------------------------------------------

/// Digital output: switches the MPU-6050 supply rail (active HIGH).
/// The sensor is powered only for the duration of an acquisition burst
/// to minimise idle draw on battery.
pub const SENSOR_POWER_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// I²C bus (MPU-6050)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 4;
pub const I2C_SCL_GPIO: i32 = 5;

/// I²C bus clock.  The MPU-6050 supports up to 400 kHz fast mode.
pub const I2C_FREQ_HZ: u32 = 400_000;

/// MPU-6050 7-bit I²C address (AD0 low).
pub const MPU6050_I2C_ADDR: u8 = 0x68;
