//! wsbroker-echo — a minimal standalone server demonstrating `wsbroker`:
//! an `echo` protocol that reflects every received message back to the
//! sender, and a `chat` protocol that rebroadcasts to every other `chat`
//! client.

use async_trait::async_trait;
use wsbroker::{ConnectionHandle, ProtocolHandler, Reason, Registry, ServerConfig, ServerContext};
use wsbroker_proto::Message;

struct Echo;

#[async_trait]
impl ProtocolHandler for Echo {
    async fn on_event(&self, conn: &ConnectionHandle, reason: Reason<'_>) {
        match reason {
            Reason::Established => {
                tracing::info!(conn = conn.id(), addr = %conn.addr(), "echo client connected");
            }
            Reason::Receive(payload) => {
                conn.write(Message::Binary(payload.to_vec().into()));
            }
            Reason::Closed => {
                tracing::info!(conn = conn.id(), "echo client disconnected");
            }
            Reason::Broadcast(_) | Reason::Http { .. } => {}
        }
    }
}

struct Chat;

#[async_trait]
impl ProtocolHandler for Chat {
    async fn on_event(&self, conn: &ConnectionHandle, reason: Reason<'_>) {
        match reason {
            Reason::Receive(payload) => {
                conn.broadcast(conn.protocol_index(), payload);
            }
            Reason::Http { path } => {
                tracing::info!(%path, "non-upgrade HTTP request");
            }
            Reason::Broadcast(payload) => {
                conn.write(Message::Binary(payload.to_vec().into()));
            }
            Reason::Established | Reason::Closed => {}
        }
    }
}

fn resolve_config_path() -> String {
    std::env::args().nth(1).unwrap_or_else(|| "wsbroker.toml".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = resolve_config_path();
    let config = ServerConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!(path = %config_path, error = %e, "no usable config file, using defaults");
        ServerConfig::default()
    });

    let registry = Registry::builder()
        .register("echo", Echo)
        .register("chat", Chat)
        .build();

    let (ctx, mut handle) = ServerContext::bind_plain(config, registry).await?;

    tokio::spawn(async move {
        handle.wait_ready().await;
        tracing::info!("wsbroker-echo ready to accept connections");
    });

    ctx.run().await?;
    Ok(())
}
