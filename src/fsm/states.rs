//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.  Handlers only inspect the blackboard and
//! request actions; the supervisor service owns all the sockets.
//!
//! ```text
//!  DISCONNECTED ──[link associated]──▶ LINK UP
//!        ▲                                │
//!        │[link lost]          [session opened]
//!        ├────────────────────────────────┤
//!        │                                ▼
//!        └──[link or session lost]── BROKER CONNECTED ──▶ (cycle every
//!                                                          interval+offset)
//! ```
//!
//! Retry pacing note: both retry loops are *unbounded by design*.  The
//! device's sole purpose is to publish readings, there is no operator
//! console, and a wiring or infrastructure fault is the only thing a
//! stalled retry can mean — so the FSM keeps asking and the log keeps
//! showing it.

use super::context::{Action, SupervisorContext};
use super::{ConnState, StateDescriptor};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; ConnState::COUNT] {
    [
        // Index 0 — Disconnected
        StateDescriptor {
            id: ConnState::Disconnected,
            name: "Disconnected",
            on_enter: Some(disconnected_enter),
            on_exit: None,
            on_update: disconnected_update,
        },
        // Index 1 — LinkUp
        StateDescriptor {
            id: ConnState::LinkUp,
            name: "LinkUp",
            on_enter: Some(link_up_enter),
            on_exit: None,
            on_update: link_up_update,
        },
        // Index 2 — BrokerConnected
        StateDescriptor {
            id: ConnState::BrokerConnected,
            name: "BrokerConnected",
            on_enter: Some(broker_connected_enter),
            on_exit: Some(broker_connected_exit),
            on_update: broker_connected_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED — polling for wireless association
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(ctx: &mut SupervisorContext) {
    // Any broker session that existed is gone with the link; scrub the
    // view so the reconnect sequence starts from scratch, including the
    // baseline announce.
    ctx.broker_up = false;
    info!(
        "DISCONNECTED: waiting for link to '{}' ({} ms poll)",
        ctx.config.wifi_ssid, ctx.config.link_poll_ms
    );
}

fn disconnected_update(ctx: &mut SupervisorContext) -> Option<ConnState> {
    if ctx.link_up {
        return Some(ConnState::LinkUp);
    }
    ctx.request = Some(Action::AttemptLink);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LINK UP — associating the broker session
// ═══════════════════════════════════════════════════════════════════════════

fn link_up_enter(ctx: &mut SupervisorContext) {
    info!(
        "LINK UP: opening broker session as '{}' ({} ms retry)",
        ctx.config.client_id, ctx.config.broker_retry_ms
    );
}

fn link_up_update(ctx: &mut SupervisorContext) -> Option<ConnState> {
    if !ctx.link_up {
        warn!("LINK UP: association lost before broker session opened");
        return Some(ConnState::Disconnected);
    }
    if ctx.broker_up {
        return Some(ConnState::BrokerConnected);
    }
    ctx.request = Some(Action::ConnectBroker);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  BROKER CONNECTED — periodic publish cycles
// ═══════════════════════════════════════════════════════════════════════════

fn broker_connected_enter(ctx: &mut SupervisorContext) {
    info!(
        "BROKER CONNECTED: publishing every {} ms (+{} ms offset)",
        ctx.config.publish_interval_ms, ctx.config.cycle_offset_ms
    );
}

fn broker_connected_exit(_ctx: &mut SupervisorContext) {
    info!("BROKER CONNECTED: session closed");
}

fn broker_connected_update(ctx: &mut SupervisorContext) -> Option<ConnState> {
    // A dropped session (or link) restarts the whole handshake; no
    // publish may ride on a session that is known to be gone.
    if !ctx.link_up || !ctx.broker_up {
        warn!("BROKER CONNECTED: session dropped, restarting reconnect sequence");
        return Some(ConnState::Disconnected);
    }

    if ctx.cycle_due() {
        ctx.request = Some(Action::RunCycle);
    }
    None
}
