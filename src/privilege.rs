//! Pluggable privilege-drop seam.
//!
//! The core never calls `setuid(2)`/`setgid(2)` itself; the embedder
//! supplies a real implementation (e.g. via the `nix` crate) if they need
//! one. [`ServerContext::bind`](crate::server::ServerContext::bind) invokes
//! this immediately after the listener and any TLS acceptor have been set
//! up, so privileged resources are acquired before the process steps down.

use crate::config::PrivilegeRequest;

pub trait PrivilegeDrop: Send + Sync {
    fn drop_privileges(&self, request: PrivilegeRequest) -> std::io::Result<()>;
}

/// Default implementation: does nothing. Used whenever a config has no
/// [`PrivilegeRequest`] and whenever the embedder doesn't supply their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrivilegeDrop;

impl PrivilegeDrop for NoopPrivilegeDrop {
    fn drop_privileges(&self, _request: PrivilegeRequest) -> std::io::Result<()> {
        Ok(())
    }
}
