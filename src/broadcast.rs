//! Broadcast dispatcher: fans a payload out to every established
//! connection bound to a given protocol.
//!
//! Two execution contexts are disambiguated by whether the caller already
//! runs on the event loop's own task:
//!
//! - **In-loop** ([`ConnectionHandle::broadcast`], called from inside a
//!   [`crate::callback::ProtocolHandler`]): enqueues onto the loop's own
//!   command queue, which is fully drained before the loop's next
//!   readiness wait — so by the time the loop suspends again, every
//!   `Broadcast` callback for this payload has already been dispatched.
//! - **External** ([`BroadcastHandle::send`], called from a task that does
//!   not own the loop): sends the same command across an unbounded MPSC
//!   channel, replacing a loopback-socket ingress with an in-process
//!   queue. The loop wakes on the channel the next time it polls and fans
//!   out identically.

use tokio::sync::mpsc;

use crate::error::BroadcastError;
use crate::padding::PaddedBuffer;
use crate::protocol::ProtocolIndex;
use crate::slot::ConnId;
use wsbroker_proto::Message;

/// A command the event loop applies to the connection table. Both the
/// in-loop and external broadcast paths, and direct per-connection writes
/// issued from a callback, funnel through this type so the loop remains
/// the single mutator of connection state.
pub enum LoopCommand {
    Broadcast {
        protocol: ProtocolIndex,
        payload: PaddedBuffer,
    },
    Write {
        id: ConnId,
        message: Message,
    },
    Close {
        id: ConnId,
    },
}

/// A cloneable handle external tasks use to inject a broadcast for a given
/// protocol without holding a reference to the event loop itself.
#[derive(Clone)]
pub struct BroadcastHandle {
    protocol: ProtocolIndex,
    protocol_name: String,
    tx: mpsc::UnboundedSender<LoopCommand>,
}

impl BroadcastHandle {
    pub(crate) fn new(
        protocol: ProtocolIndex,
        protocol_name: String,
        tx: mpsc::UnboundedSender<LoopCommand>,
    ) -> Self {
        Self {
            protocol,
            protocol_name,
            tx,
        }
    }

    /// Submits `payload` for fan-out to every `ESTABLISHED` connection bound
    /// to this protocol. Returns once the payload is enqueued, not once it
    /// has been delivered — delivery happens on the loop's own schedule.
    pub fn send(&self, payload: &[u8]) -> Result<(), BroadcastError> {
        self.tx
            .send(LoopCommand::Broadcast {
                protocol: self.protocol,
                payload: PaddedBuffer::new(payload),
            })
            .map_err(|_| BroadcastError::IngressClosed {
                protocol: self.protocol_name.clone(),
            })
    }
}
