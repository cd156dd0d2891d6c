//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern expressed in safe Rust:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌─────────────────┬──────────┬─────────┬──────────────────┐ │
//! │  │ ConnState       │ on_enter │ on_exit │ on_update        │ │
//! │  ├─────────────────┼──────────┼─────────┼──────────────────┤ │
//! │  │ Disconnected    │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<>│ │
//! │  │ LinkUp          │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<>│ │
//! │  │ BrokerConnected │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<>│ │
//! │  └─────────────────┴──────────┴─────────┴──────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each pass the engine calls `on_update` for the **current** state.
//! If it returns `Some(next)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut SupervisorContext`,
//! the blackboard carrying link/session status and the requested
//! action.  Handlers never perform I/O — the supervisor service does,
//! which is what makes every transition testable without hardware or
//! real delays.

pub mod context;
pub mod states;

use context::SupervisorContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The supervisor's session view.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnState {
    /// No wireless link; nothing else can proceed.
    Disconnected = 0,
    /// Link associated, broker session not yet established.
    LinkUp = 1,
    /// Broker session live; periodic publish cycles run.
    BrokerConnected = 2,
}

impl ConnState {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `ConnState`.  Panics on out-of-range
    /// in debug builds; returns `Disconnected` in release (safe fallback —
    /// the reconnect sequence is always a valid place to resume).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::LinkUp,
            2 => Self::BrokerConnected,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disconnected
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut SupervisorContext);

/// Signature for the per-pass update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut SupervisorContext) -> Option<ConnState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: ConnState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and is driven
/// with a mutable [`SupervisorContext`] threaded through every handler.
pub struct Fsm {
    /// Fixed-size table indexed by `ConnState as usize`.
    table: [StateDescriptor; ConnState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing pass counter (wraps at u64::MAX).
    tick_count: u64,
    /// Pass at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; ConnState::COUNT], initial: ConnState) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut SupervisorContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one pass.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut SupervisorContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (test hook and session-teardown path).
    pub fn force_transition(&mut self, next: ConnState, ctx: &mut SupervisorContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> ConnState {
        ConnState::from_index(self.current)
    }

    /// How many passes the FSM has spent in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: ConnState, ctx: &mut SupervisorContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::{Action, SupervisorContext};
    use super::*;
    use crate::config::DeviceConfig;

    fn make_ctx() -> SupervisorContext {
        SupervisorContext::new(DeviceConfig::default())
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), ConnState::Disconnected)
    }

    #[test]
    fn starts_disconnected() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), ConnState::Disconnected);
    }

    #[test]
    fn tick_increments_counter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 1);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 2);
    }

    #[test]
    fn disconnected_requests_link_attempts_until_associated() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        for _ in 0..5 {
            ctx.request = None;
            fsm.tick(&mut ctx);
            assert_eq!(fsm.current_state(), ConnState::Disconnected);
            assert_eq!(ctx.request, Some(Action::AttemptLink));
        }
    }

    #[test]
    fn link_association_advances_to_link_up() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.link_up = true;
        ctx.request = None;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::LinkUp);
        // Association alone requests no action; the broker attempt is
        // requested on the next pass from LinkUp.
        assert_eq!(ctx.request, None);
    }

    #[test]
    fn link_up_requests_broker_session() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);

        ctx.request = None;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::LinkUp);
        assert_eq!(ctx.request, Some(Action::ConnectBroker));
    }

    #[test]
    fn broker_session_advances_to_connected() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);

        ctx.broker_up = true;
        ctx.request = None;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::BrokerConnected);
    }

    #[test]
    fn link_loss_in_link_up_reverts_to_disconnected() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::LinkUp);

        ctx.link_up = false;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::Disconnected);
    }

    #[test]
    fn session_drop_reverts_to_disconnected_and_resets_session_view() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);
        ctx.broker_up = true;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::BrokerConnected);

        ctx.broker_up = false;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), ConnState::Disconnected);
        // on_enter(Disconnected) must have scrubbed the session view so
        // a stale broker flag cannot shortcut the reconnect sequence.
        assert!(!ctx.broker_up);
    }

    #[test]
    fn cycle_requested_only_when_interval_elapsed() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);
        ctx.broker_up = true;
        fsm.tick(&mut ctx);

        let interval = u64::from(ctx.config.publish_interval_ms);

        ctx.now_ms = 1_000;
        ctx.last_cycle_ms = 500;
        ctx.request = None;
        fsm.tick(&mut ctx);
        assert_eq!(ctx.request, None);

        ctx.now_ms = 500 + interval;
        fsm.tick(&mut ctx);
        assert_eq!(ctx.request, Some(Action::RunCycle));
    }

    #[test]
    fn cycle_offset_stretches_the_cadence() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.config.cycle_offset_ms = 2_000;
        fsm.start(&mut ctx);
        ctx.link_up = true;
        fsm.tick(&mut ctx);
        ctx.broker_up = true;
        fsm.tick(&mut ctx);

        let interval = u64::from(ctx.config.publish_interval_ms);
        ctx.last_cycle_ms = 0;
        ctx.now_ms = interval + 1_999;
        ctx.request = None;
        fsm.tick(&mut ctx);
        assert_eq!(ctx.request, None);

        ctx.now_ms = interval + 2_000;
        fsm.tick(&mut ctx);
        assert_eq!(ctx.request, Some(Action::RunCycle));
    }

    #[test]
    fn state_id_from_index_roundtrip() {
        for i in 0..ConnState::COUNT {
            let id = ConnState::from_index(i);
            assert_eq!(id as usize, i);
        }
    }
}
