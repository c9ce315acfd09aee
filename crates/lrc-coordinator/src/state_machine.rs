//! Command-emission state machine (§4.7): `PLAN -> DISPATCH -> AWAIT_ACK ->
//! COMMIT | ABORT`, shared by every kernel routine.
//!
//! `PLAN` is a pure function living in each routine's own module
//! (`decode`, `upcode`, `downcode`, `upload`); this module only provides
//! the DISPATCH/AWAIT_ACK machinery and the terminal state type, since
//! those are identical across routines.

use std::time::Duration;

use lrc_codec::{AckVerb, Command};
use lrc_common::{NodeId, Result, StripeId};

use crate::dispatch::Dispatcher;

/// Where a stripe operation landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StripeState {
    Committed,
    /// Aborted without touching metadata; the stripe is left exactly as it
    /// was on entry.
    Aborted,
}

/// The terminal outcome of one stripe operation.
#[derive(Clone, Debug)]
pub struct StripeOutcome {
    pub stripe_id: StripeId,
    pub state: StripeState,
    /// Nodes whose ack did not indicate success, if any.
    pub failed_acks: Vec<(NodeId, AckVerb)>,
}

impl StripeOutcome {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.state, StripeState::Committed)
    }
}

/// `DISPATCH`: fire-and-forget send of every planned command. Order does
/// not affect correctness (nodes block on their own `wa` sub-instruction).
pub fn dispatch_all(dispatcher: &dyn Dispatcher, commands: &[(NodeId, Command)]) -> Result<()> {
    for (node, command) in commands {
        dispatcher.send_command(*node, command)?;
    }
    Ok(())
}

/// `AWAIT_ACK`: collect one ack per node in `targets`. A node that never
/// acks (or whose `recv_ack` call errors, e.g. on timeout) is folded into
/// the returned vector as a `ProtocolViolation`-shaped failure by the
/// caller, which treats it the same as an unsuccessful ack verb.
pub fn await_acks(
    dispatcher: &dyn Dispatcher,
    targets: &[NodeId],
    timeout: Duration,
) -> Vec<(NodeId, Result<AckVerb>)> {
    targets
        .iter()
        .map(|node| (*node, dispatcher.recv_ack(*node, timeout)))
        .collect()
}
