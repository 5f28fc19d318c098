//! Protocol registry.

use std::sync::Arc;

use crate::callback::ProtocolHandler;

/// Stable index of a protocol within its owning [`Registry`]. The registry
/// is immutable after construction, so this index never changes for the
/// lifetime of a [`crate::server::ServerContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolIndex(pub usize);

/// One registered protocol: a stable name, its callback, and the index the
/// core assigns during registry construction.
pub struct ProtocolEntry {
    pub name: String,
    pub handler: Arc<dyn ProtocolHandler>,
    pub index: ProtocolIndex,
}

/// The ordered list of named protocols a [`crate::server::ServerContext`]
/// was constructed with. Order matters: the first entry is the one the
/// `Http` reason is delivered to, and it is also the tentative protocol a
/// fresh connection is bound to before handshake completes.
pub struct Registry {
    entries: Vec<ProtocolEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ProtocolEntry] {
        &self.entries
    }

    pub fn get(&self, index: ProtocolIndex) -> Option<&ProtocolEntry> {
        self.entries.get(index.0)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ProtocolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// The head of the registry: the tentative protocol for a freshly
    /// accepted connection and the sole recipient of `HTTP` callbacks.
    pub fn first(&self) -> Option<&ProtocolEntry> {
        self.entries.first()
    }

    /// Names in registration order, the order subprotocol negotiation
    /// offers them in.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(String, Arc<dyn ProtocolHandler>)>,
}

impl RegistryBuilder {
    pub fn register(mut self, name: impl Into<String>, handler: impl ProtocolHandler + 'static) -> Self {
        self.entries.push((name.into(), Arc::new(handler)));
        self
    }

    pub fn register_arc(mut self, name: impl Into<String>, handler: Arc<dyn ProtocolHandler>) -> Self {
        self.entries.push((name.into(), handler));
        self
    }

    pub fn build(self) -> Registry {
        let entries = self
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, (name, handler))| ProtocolEntry {
                name,
                handler,
                index: ProtocolIndex(index),
            })
            .collect();
        Registry { entries }
    }
}
