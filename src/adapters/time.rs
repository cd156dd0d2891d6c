//! Clock adapter.
//!
//! [`DeviceClock`] provides monotonic time and cooperative delays:
//!
//! - **`target_os = "espidf"`** — `esp_timer_get_time()` for time,
//!   FreeRTOS task delay for millisecond sleeps, and the ROM busy-wait
//!   for the microsecond burst spacing (a FreeRTOS tick is far too
//!   coarse for 3.15 ms sample gaps).
//! - **all other targets** — `std::time::Instant` + `thread::sleep`.
//!
//! [`FakeClock`] (host only) advances time instantly on every sleep and
//! records what was requested, which is what makes the supervisor's
//! retry policies and the burst timing testable without real delays.

use crate::app::ports::ClockPort;

/// The real clock.
pub struct DeviceClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for DeviceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(target_os = "espidf")]
impl ClockPort for DeviceClock {
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    fn sleep_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    fn sleep_us(&mut self, us: u32) {
        esp_idf_hal::delay::Ets::delay_us(us);
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for DeviceClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }

    fn sleep_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(u64::from(us)));
    }
}

// ───────────────────────────────────────────────────────────────
// Deterministic clock for tests and simulation
// ───────────────────────────────────────────────────────────────

/// A clock whose time only moves when told to: sleeps advance it
/// instantly and are recorded for assertion.
#[cfg(not(target_os = "espidf"))]
pub struct FakeClock {
    now_us: u64,
    sleeps_ms: Vec<u32>,
    slept_us_total: u64,
}

#[cfg(not(target_os = "espidf"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            now_us: 0,
            sleeps_ms: Vec::new(),
            slept_us_total: 0,
        }
    }

    /// Move time forward without a sleep (models the world moving on).
    pub fn advance_ms(&mut self, ms: u64) {
        self.now_us += ms * 1_000;
    }

    /// Every millisecond sleep requested so far, in order.
    pub fn sleeps_ms(&self) -> Vec<u32> {
        self.sleeps_ms.clone()
    }

    /// Total microseconds spent in `sleep_us` (burst spacing).
    pub fn slept_us_total(&self) -> u64 {
        self.slept_us_total
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_us / 1_000
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.sleeps_ms.push(ms);
        self.now_us += u64::from(ms) * 1_000;
    }

    fn sleep_us(&mut self, us: u32) {
        self.slept_us_total += u64::from(us);
        self.now_us += u64::from(us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_on_sleep() {
        let mut c = FakeClock::new();
        assert_eq!(c.now_ms(), 0);
        c.sleep_ms(500);
        assert_eq!(c.now_ms(), 500);
        c.sleep_us(3_150);
        c.sleep_us(3_150);
        assert_eq!(c.slept_us_total(), 6_300);
        c.advance_ms(10_000);
        assert!(c.now_ms() >= 10_500);
        assert_eq!(c.sleeps_ms(), vec![500]);
    }

    #[test]
    fn device_clock_is_monotonic() {
        let mut c = DeviceClock::new();
        let t0 = c.now_ms();
        c.sleep_ms(1);
        assert!(c.now_ms() >= t0);
    }
}
