//! Ambient TLS convenience loader (spec §4.1 "optional transport-security
//! parameters"). Certificate/key *loading mechanics* are explicitly out of
//! scope for the core per spec §1; this module exists purely so the demo
//! binary and simple embedders don't each hand-roll the same
//! `rustls-pemfile` boilerplate. Embedders who need more control (client
//! auth, custom cipher suites) should build their own `TlsAcceptor` and
//! hand it to [`crate::server::ServerContext::bind_with_tls_acceptor`]
//! directly.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rustls_pemfile::{certs, pkcs8_private_keys};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read TLS material from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no certificates found in PEM file")]
    NoCertificates,
    #[error("no private key found in PEM file")]
    NoPrivateKey,
    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] tokio_rustls::rustls::Error),
}

/// Loads a certificate chain and private key from PEM files on disk and
/// builds a `TlsAcceptor` for no-client-auth server TLS.
pub async fn load_acceptor(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<TlsAcceptor, TlsError> {
    let cert_path = cert_path.as_ref();
    let key_path = key_path.as_ref();

    let cert_data = tokio::fs::read(cert_path)
        .await
        .map_err(|source| TlsError::Io {
            path: cert_path.display().to_string(),
            source,
        })?;
    let key_data = tokio::fs::read(key_path)
        .await
        .map_err(|source| TlsError::Io {
            path: key_path.display().to_string(),
            source,
        })?;

    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut Cursor::new(&cert_data))
        .filter_map(|r| r.ok())
        .collect();
    if cert_chain.is_empty() {
        return Err(TlsError::NoCertificates);
    }

    let key: PrivateKeyDer<'static> = pkcs8_private_keys(&mut Cursor::new(&key_data))
        .filter_map(|r| r.ok())
        .next()
        .map(PrivateKeyDer::Pkcs8)
        .ok_or(TlsError::NoPrivateKey)?;

    let config = RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_cert_file_surfaces_io_error() {
        let err = load_acceptor("/nonexistent/cert.pem", "/nonexistent/key.pem")
            .await
            .unwrap_err();
        assert!(matches!(err, TlsError::Io { .. }));
    }
}
