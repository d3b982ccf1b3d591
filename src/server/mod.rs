//! Server wiring.
//!
//! # Data Flow
//! ```text
//! ServerConfig
//!     → build_context (token, content resolver, upload store, limits)
//!     → SkyServer::bind (listener, TLS acceptor)
//!     → SkyServer::run (accept loop, one task per connection)
//!         → TLS handshake (deadline)
//!         → session::serve
//! ```
//!
//! # Design Decisions
//! - Startup fails fast: a bad certificate or unreadable token file is fatal
//! - Accept errors are logged and retried; they never stop the server
//! - Shutdown stops accepting first, then drains open connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;

use crate::auth::{TokenError, TokenStore};
use crate::config::ServerConfig;
use crate::content::FsResolver;
use crate::net::{load_tls_acceptor, ConnectionGuard, ConnectionTracker, Listener, ListenerError, TlsError};
use crate::resilience::with_timeout;
use crate::session::{serve, ServerContext, SessionError, SessionLimits};
use crate::storage::FsUploadStore;

/// Pause after a failed accept, so a full descriptor table does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Build the shared per-connection context from configuration.
pub fn build_context(config: &ServerConfig) -> Result<ServerContext, ServerError> {
    let token = TokenStore::new(&config.drift.token_path).load_or_create()?;

    let resolver = FsResolver::new(&config.content.root)
        .with_default_document(&config.content.default_document);
    let uploads = FsUploadStore::new(&config.content.uploads_dir);

    let limits = SessionLimits {
        max_line_bytes: config.limits.max_line_bytes,
        max_upload_bytes: config.drift.max_upload_bytes,
        read_timeout: config.limits.read_timeout(),
        default_document: config.content.default_document.clone(),
    };

    tracing::info!(
        root = %config.content.root.display(),
        uploads = %config.content.uploads_dir.display(),
        "Content configured"
    );

    Ok(ServerContext::new(token, Arc::new(resolver), Arc::new(uploads)).with_limits(limits))
}

#[derive(Clone)]
struct TlsSettings {
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

/// A bound Sky server, ready to accept connections.
pub struct SkyServer {
    listener: Listener,
    tls: Option<TlsSettings>,
    ctx: Arc<ServerContext>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl SkyServer {
    /// Load TLS material and bind the listener.
    pub async fn bind(config: &ServerConfig, ctx: ServerContext) -> Result<Self, ServerError> {
        let tls = match &config.listener.tls {
            Some(tls) => Some(TlsSettings {
                acceptor: load_tls_acceptor(&tls.cert_path, &tls.key_path)?,
                handshake_timeout: tls.handshake_timeout(),
            }),
            None => {
                tracing::warn!("TLS not configured, serving plaintext");
                None
            }
        };

        let listener = Listener::bind(&config.listener).await?;

        Ok(Self {
            listener,
            tls,
            ctx: Arc::new(ctx),
            tracker: ConnectionTracker::new(),
            shutdown_grace: config.limits.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        tracing::info!(
            address = %self.listener.local_addr().map_err(ListenerError::Bind)?,
            tls = self.tls.is_some(),
            "Sky server started"
        );

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Accept(err)) => {
                    tracing::warn!(error = %err, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let guard = self.tracker.track();
            let ctx = Arc::clone(&self.ctx);
            let tls = self.tls.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer_addr, tls, ctx, guard).await;
                drop(permit);
            });
        }

        tracing::info!(
            active = self.tracker.active_count(),
            "Stopped accepting, draining connections"
        );
        drop(self.listener);

        let abandoned = self.tracker.drain(self.shutdown_grace).await;
        if abandoned > 0 {
            tracing::warn!(abandoned, "Grace period expired with connections still open");
        }
        tracing::info!("Sky server stopped");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    tls: Option<TlsSettings>,
    ctx: Arc<ServerContext>,
    guard: ConnectionGuard,
) {
    let id = guard.id();
    tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection opened");

    if let Err(err) = stream.set_nodelay(true) {
        tracing::trace!(connection_id = %id, error = %err, "Could not set TCP_NODELAY");
    }

    let result = match tls {
        Some(tls) => match with_timeout(tls.handshake_timeout, tls.acceptor.accept(stream)).await {
            Ok(Ok(stream)) => serve(stream, ctx, id).await,
            Ok(Err(err)) => {
                tracing::debug!(connection_id = %id, peer_addr = %peer_addr, error = %err, "TLS handshake failed");
                return;
            }
            Err(elapsed) => {
                tracing::debug!(connection_id = %id, peer_addr = %peer_addr, error = %elapsed, "TLS handshake timed out");
                return;
            }
        },
        None => serve(stream, ctx, id).await,
    };

    match result {
        Ok(Some(status)) => {
            tracing::debug!(connection_id = %id, peer_addr = %peer_addr, status = %status, "Connection finished");
        }
        Ok(None) => {
            tracing::debug!(connection_id = %id, peer_addr = %peer_addr, "Connection closed without request");
        }
        Err(SessionError::Timeout(elapsed)) => {
            tracing::warn!(connection_id = %id, peer_addr = %peer_addr, error = %elapsed, "Connection timed out");
        }
        Err(err) => {
            tracing::warn!(connection_id = %id, peer_addr = %peer_addr, error = %err, "Connection failed");
        }
    }
}
