//! The seam between the pure command-generation logic in this crate and
//! the raw control/data sockets described in §6, which are out of scope
//! here. A real binary built on this crate implements [`Dispatcher`] over
//! UDP-framed control sockets and a bulk binary data channel; tests use
//! [`RecordingDispatcher`], an in-memory stand-in.

use std::time::Duration;

use bytes::Bytes;
use lrc_codec::{AckVerb, Command};
use lrc_common::{BlockId, NodeId, Result};

/// Everything the kernel routines need to talk to data nodes and the
/// gateway. Dispatch is synchronous per the concurrency model (§5): the
/// Coordinator does not itself spawn worker tasks.
pub trait Dispatcher {
    /// Send a command string to a node's control port.
    fn send_command(&self, node: NodeId, command: &Command) -> Result<()>;

    /// Send raw block bytes to a node's data port.
    fn send_data(&self, node: NodeId, block: &BlockId, data: Bytes) -> Result<()>;

    /// Block until an ack arrives from `node`, or `timeout` expires.
    fn recv_ack(&self, node: NodeId, timeout: Duration) -> Result<AckVerb>;
}

/// In-memory [`Dispatcher`] that records every command and data send, and
/// replays pre-seeded acks. Used by the test suites in this crate; a
/// networked implementation lives outside this workspace's scope.
#[derive(Default)]
pub struct RecordingDispatcher {
    commands: parking_lot::Mutex<Vec<(NodeId, Command)>>,
    data_sends: parking_lot::Mutex<Vec<(NodeId, BlockId, Bytes)>>,
    acks: parking_lot::Mutex<std::collections::VecDeque<AckVerb>>,
}

impl RecordingDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an ack to be returned by the next [`Dispatcher::recv_ack`] call.
    pub fn push_ack(&self, ack: AckVerb) {
        self.acks.lock().push_back(ack);
    }

    #[must_use]
    pub fn commands(&self) -> Vec<(NodeId, Command)> {
        self.commands.lock().clone()
    }

    #[must_use]
    pub fn data_sends(&self) -> Vec<(NodeId, BlockId, Bytes)> {
        self.data_sends.lock().clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn send_command(&self, node: NodeId, command: &Command) -> Result<()> {
        self.commands.lock().push((node, command.clone()));
        Ok(())
    }

    fn send_data(&self, node: NodeId, block: &BlockId, data: Bytes) -> Result<()> {
        self.data_sends.lock().push((node, block.clone(), data));
        Ok(())
    }

    fn recv_ack(&self, _node: NodeId, _timeout: Duration) -> Result<AckVerb> {
        self.acks
            .lock()
            .pop_front()
            .ok_or_else(|| lrc_common::Error::internal("no ack queued for recv_ack"))
    }
}
