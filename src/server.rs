//! Server context (spec §2 item 7, §4.1 construction).

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_rustls::TlsAcceptor;
use tracing::instrument;

use crate::broadcast::{BroadcastHandle, LoopCommand};
use crate::config::ServerConfig;
use crate::error::InitError;
use crate::privilege::{NoopPrivilegeDrop, PrivilegeDrop};
use crate::protocol::Registry;

/// The process-wide handle owning the listener, the connection table (via
/// the event loop it is handed to), the protocol registry, and the
/// transport configuration (spec §3 "ServerContext").
pub struct ServerContext {
    listener: TcpListener,
    tls_acceptor: Option<TlsAcceptor>,
    registry: Arc<Registry>,
    config: ServerConfig,
    commands_tx: mpsc::UnboundedSender<LoopCommand>,
    commands_rx: mpsc::UnboundedReceiver<LoopCommand>,
    ready_tx: Option<oneshot::Sender<()>>,
}

/// A cloneable companion to [`ServerContext`] that survives after the
/// context itself has been consumed by [`ServerContext::run`] — used to
/// submit external broadcasts and to learn when the loop has actually
/// started accepting (Design Note 9(d): an explicit readiness handoff in
/// place of a "give the loop a chance to start" sleep).
pub struct ServerHandle {
    registry: Arc<Registry>,
    commands: mpsc::UnboundedSender<LoopCommand>,
    ready_rx: Option<oneshot::Receiver<()>>,
}

impl ServerContext {
    /// Binds the listener, optionally sets up TLS, and drops privileges, in
    /// that order (spec §4.1: "After privilege-sensitive resources are
    /// acquired, drop to the requested identity if specified").
    #[instrument(skip(registry, privilege), fields(addr = %config.bind_addr))]
    pub async fn bind(
        config: ServerConfig,
        registry: Registry,
        privilege: Arc<dyn PrivilegeDrop>,
    ) -> Result<(Self, ServerHandle), InitError> {
        let tls_acceptor = match &config.tls {
            Some(tls_cfg) => Some(crate::tls::load_acceptor(&tls_cfg.cert_path, &tls_cfg.key_path).await?),
            None => None,
        };
        Self::bind_with_tls_acceptor(config, registry, privilege, tls_acceptor).await
    }

    /// Convenience over [`Self::bind`] using [`NoopPrivilegeDrop`].
    pub async fn bind_plain(
        config: ServerConfig,
        registry: Registry,
    ) -> Result<(Self, ServerHandle), InitError> {
        Self::bind(config, registry, Arc::new(NoopPrivilegeDrop)).await
    }

    /// Binds with a caller-supplied `TlsAcceptor`, bypassing
    /// [`crate::tls::load_acceptor`]'s PEM-file loading entirely. For
    /// embedders who need client-cert auth, custom cipher suites, or any
    /// other `rustls::ServerConfig` this crate's ambient TLS loader doesn't
    /// expose. `config.tls` is ignored here; pass `None` to run without TLS
    /// even if `config.tls` is set.
    pub async fn bind_with_tls_acceptor(
        config: ServerConfig,
        registry: Registry,
        privilege: Arc<dyn PrivilegeDrop>,
        tls_acceptor: Option<TlsAcceptor>,
    ) -> Result<(Self, ServerHandle), InitError> {
        if registry.is_empty() {
            return Err(InitError::EmptyRegistry);
        }

        let listener =
            TcpListener::bind(config.bind_addr)
                .await
                .map_err(|source| InitError::Bind {
                    addr: config.bind_addr,
                    source,
                })?;

        privilege
            .drop_privileges(config.privilege.unwrap_or_default())
            .map_err(InitError::Privilege)?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let registry = Arc::new(registry);

        let handle = ServerHandle {
            registry: registry.clone(),
            commands: commands_tx.clone(),
            ready_rx: Some(ready_rx),
        };
        let ctx = ServerContext {
            listener,
            tls_acceptor,
            registry,
            config,
            commands_tx,
            commands_rx,
            ready_tx: Some(ready_tx),
        };

        Ok((ctx, handle))
    }

    /// Runs the event loop until the listener dies (spec §7 "Listener
    /// death... fatal; the loop tears everything down and exits").
    pub async fn run(self) -> std::io::Result<()> {
        crate::event_loop::run(self).await
    }

    /// The address the listener actually bound to — useful when
    /// [`ServerConfig::bind_addr`] used an OS-chosen port (`:0`).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub(crate) fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub(crate) fn commands_tx(&self) -> mpsc::UnboundedSender<LoopCommand> {
        self.commands_tx.clone()
    }

    pub(crate) fn commands_rx_mut(&mut self) -> &mut mpsc::UnboundedReceiver<LoopCommand> {
        &mut self.commands_rx
    }

    pub(crate) fn listener_mut(&mut self) -> &mut TcpListener {
        &mut self.listener
    }

    pub(crate) fn tls_acceptor(&self) -> Option<&TlsAcceptor> {
        self.tls_acceptor.as_ref()
    }

    /// Fires the readiness handoff exactly once, at the top of the first
    /// loop iteration.
    pub(crate) fn signal_ready(&mut self) {
        if let Some(tx) = self.ready_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl ServerHandle {
    /// Looks up a registered protocol by name and returns a handle external
    /// tasks can use to submit broadcasts for it (spec §4.5 "External").
    pub fn broadcast_handle(&self, protocol_name: &str) -> Option<BroadcastHandle> {
        let entry = self.registry.find_by_name(protocol_name)?;
        Some(BroadcastHandle::new(
            entry.index,
            entry.name.clone(),
            self.commands.clone(),
        ))
    }

    /// Resolves once the event loop has started accepting connections.
    /// Replaces the original design's "give server fork a chance" sleep
    /// (Design Note 9(d)) with an explicit handoff.
    pub async fn wait_ready(&mut self) {
        if let Some(rx) = self.ready_rx.take() {
            let _ = rx.await;
        }
    }
}
