//! Shared mutable context threaded through every FSM handler.
//!
//! `SupervisorContext` is the blackboard the connectivity state
//! machine reads from and writes to.  The supervisor service fills in
//! the observed world (link/session status, clock) before each pass;
//! handlers examine it and leave behind at most one requested
//! [`Action`], which the service then executes through its ports.
//! Handlers themselves never touch hardware or sleep.

use crate::config::DeviceConfig;

/// I/O the current state wants the supervisor service to perform after
/// this pass.  At most one action is requested per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Kick the wireless link and wait the fixed poll interval.
    AttemptLink,
    /// Open a broker session (announce + resubscribe on success,
    /// fixed delay on failure).
    ConnectBroker,
    /// Run one full acquire → compute → publish cycle.
    RunCycle,
}

/// The shared context passed to every state handler function.
pub struct SupervisorContext {
    // -- Timing --
    /// Passes elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total pass count.
    pub total_ticks: u64,
    /// Clock reading for this pass (milliseconds since boot).
    pub now_ms: u64,

    // -- Observed world (written by the service before each pass) --
    /// Wireless link reports associated.
    pub link_up: bool,
    /// Broker session reports alive.
    pub broker_up: bool,

    // -- Cycle bookkeeping --
    /// Clock reading when the last publish cycle ran.
    pub last_cycle_ms: u64,
    /// Completed acquire→compute→publish cycles since boot.
    pub cycles_completed: u64,

    // -- Output (read by the service after each pass) --
    /// I/O requested by the current state's handler.
    pub request: Option<Action>,

    // -- Configuration --
    /// Device configuration (read-only at runtime).
    pub config: DeviceConfig,
}

impl SupervisorContext {
    /// Create a new context with the given configuration.
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            now_ms: 0,
            link_up: false,
            broker_up: false,
            last_cycle_ms: 0,
            cycles_completed: 0,
            request: None,
            config,
        }
    }

    /// True when the publish cadence (interval plus the internal
    /// offset) has elapsed since the last cycle.
    pub fn cycle_due(&self) -> bool {
        let cadence =
            u64::from(self.config.publish_interval_ms) + u64::from(self.config.cycle_offset_ms);
        self.now_ms.saturating_sub(self.last_cycle_ms) >= cadence
    }

    /// Record a completed cycle at the current clock reading.
    pub fn mark_cycle_done(&mut self) {
        self.last_cycle_ms = self.now_ms;
        self.cycles_completed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_due_honours_interval_and_offset() {
        let mut ctx = SupervisorContext::new(DeviceConfig::default());
        ctx.config.publish_interval_ms = 10_000;
        ctx.config.cycle_offset_ms = 500;

        ctx.last_cycle_ms = 1_000;
        ctx.now_ms = 11_499;
        assert!(!ctx.cycle_due());
        ctx.now_ms = 11_500;
        assert!(ctx.cycle_due());
    }

    #[test]
    fn cycle_due_is_false_right_after_marking() {
        let mut ctx = SupervisorContext::new(DeviceConfig::default());
        ctx.now_ms = 42_000;
        assert!(ctx.cycle_due()); // boot: never published
        ctx.mark_cycle_done();
        assert!(!ctx.cycle_due());
        assert_eq!(ctx.cycles_completed, 1);
    }
}
