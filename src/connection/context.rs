//! The handle a [`crate::callback::ProtocolHandler`] is given for the
//! connection an event concerns.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::broadcast::LoopCommand;
use crate::protocol::ProtocolIndex;
use crate::slot::ConnId;
use wsbroker_proto::Message;

/// Per-session opaque user data. Boxed so each protocol can store whatever
/// session type it needs without requiring a generic server type.
pub type UserData = Arc<Mutex<Option<Box<dyn Any + Send>>>>;

/// Handed to [`crate::callback::ProtocolHandler::on_event`]. Cheap to
/// construct and clone; all mutating operations are enqueued as
/// [`LoopCommand`]s so the event loop remains the sole mutator of the
/// connection table.
pub struct ConnectionHandle {
    id: ConnId,
    addr: SocketAddr,
    protocol_index: ProtocolIndex,
    protocol_name: String,
    wire_revision: u32,
    user_data: UserData,
    commands: mpsc::UnboundedSender<LoopCommand>,
}

impl ConnectionHandle {
    pub(crate) fn new(
        id: ConnId,
        addr: SocketAddr,
        protocol_index: ProtocolIndex,
        protocol_name: String,
        wire_revision: u32,
        user_data: UserData,
        commands: mpsc::UnboundedSender<LoopCommand>,
    ) -> Self {
        Self {
            id,
            addr,
            protocol_index,
            protocol_name,
            wire_revision,
            user_data,
            commands,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn protocol_index(&self) -> ProtocolIndex {
        self.protocol_index
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn wire_revision(&self) -> u32 {
        self.wire_revision
    }

    /// Runs `f` against this connection's per-session user data slot,
    /// initializing it with `Default::default()` on first access.
    pub fn with_user_data<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default + Send + 'static,
    {
        let mut guard = self.user_data.lock().expect("user data lock poisoned");
        let slot = guard.get_or_insert_with(|| Box::new(T::default()));
        let typed = slot
            .downcast_mut::<T>()
            .expect("user data type changed across accesses for the same connection");
        f(typed)
    }

    /// Enqueues a WebSocket message to be written to this connection. The
    /// write is applied by the event loop the next time it drains its
    /// command queue.
    pub fn write(&self, message: Message) {
        let _ = self.commands.send(LoopCommand::Write {
            id: self.id,
            message,
        });
    }

    /// Requests that this connection be closed after the current event
    /// finishes processing.
    pub fn close(&self) {
        let _ = self.commands.send(LoopCommand::Close { id: self.id });
    }

    /// Broadcasts a payload to every established connection on `protocol`.
    /// Enqueues onto the loop's own command queue, which is fully drained
    /// before the loop suspends again.
    pub fn broadcast(&self, protocol: ProtocolIndex, payload: &[u8]) {
        let _ = self.commands.send(LoopCommand::Broadcast {
            protocol,
            payload: crate::padding::PaddedBuffer::new(payload),
        });
    }
}
