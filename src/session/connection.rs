//! Per-connection protocol driver.
//!
//! # Responsibilities
//! - Feed transport chunks to the line reader while awaiting the request
//! - Dispatch Standard requests to the content resolver
//! - Gate Drift uploads on the authorization token, then route raw bytes
//!   straight to the upload controller
//! - Produce exactly one response, then stop reading
//!
//! Each chunk is processed to exhaustion before the next read is issued, so
//! a slow upload sink stalls the socket read instead of queueing chunks.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::content::ResolveError;
use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::protocol::{is_header_line, parse, resource_path, LineReader, Request, Response, Status};
use crate::resilience::timeouts::{with_timeout, TimedOut};
use crate::session::context::ServerContext;
use crate::session::drift::DriftUpload;
use crate::session::state::ConnectionState;

/// Bytes requested from the transport per read.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

const INVALID_TOKEN_BODY: &str = "Invalid Drift Token";
const UPLOAD_TOO_LARGE_BODY: &str = "Upload too large";
const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Transport failures ending a connection before a response was written.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Timeout(#[from] TimedOut),
}

/// Protocol state for one connection.
pub struct Session {
    ctx: Arc<ServerContext>,
    state: ConnectionState,
    reader: LineReader,
    drift: Option<DriftUpload>,
}

impl Session {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        let reader = LineReader::new(ctx.limits.max_line_bytes);
        Self {
            ctx,
            state: ConnectionState::AwaitingLine,
            reader,
            drift: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Process one inbound chunk.
    ///
    /// Returns the response once the request is settled; the caller writes
    /// it and closes the transport. Input arriving after that is ignored.
    pub async fn on_data(&mut self, chunk: &[u8]) -> Option<Response> {
        if !self.state.accepts_input() {
            tracing::trace!(bytes = chunk.len(), state = ?self.state, "Ignoring input");
            return None;
        }

        if self.state == ConnectionState::ReceivingBody {
            self.feed_upload(chunk).await
        } else {
            self.reader.append(chunk);
            self.read_request().await
        }
    }

    /// The transport ended early: drop any partial upload and close.
    pub async fn cancel(&mut self) {
        if let Some(drift) = self.drift.take() {
            tracing::debug!(
                declared = drift.declared(),
                remaining = drift.remaining(),
                "Cancelling Drift upload"
            );
            metrics::record_drift_outcome("incomplete");
            drift.abort().await;
        }
        if self.state != ConnectionState::Closed {
            self.close();
        }
    }

    async fn read_request(&mut self) -> Option<Response> {
        loop {
            let line = match self.reader.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(err) => {
                    tracing::debug!(error = %err, "Rejecting oversized request line");
                    return Some(self.respond(Response::bad_request(err.to_string())));
                }
            };

            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text.is_empty() || is_header_line(text) {
                continue;
            }

            return match parse(text) {
                Ok(Request::Standard { locator }) => Some(self.dispatch_standard(&locator).await),
                Ok(Request::Drift { size, token }) => self.begin_drift(size, &token).await,
                Err(err) => {
                    tracing::debug!(error = %err, "Malformed request");
                    Some(self.respond(Response::bad_request(err.to_string())))
                }
            };
        }
    }

    async fn dispatch_standard(&mut self, locator: &str) -> Response {
        if !self.enter(ConnectionState::DispatchingStandard) {
            return self.respond(Response::permanent_failure(INTERNAL_ERROR_BODY));
        }

        tracing::debug!(locator = %locator, "Dispatching standard request");
        let path = match resource_path(locator, &self.ctx.limits.default_document) {
            Ok(path) => path,
            Err(err) => return self.respond(Response::bad_request(err.to_string())),
        };

        let response = match self.ctx.resolver.resolve(&path).await {
            Ok(resolved) => Response::success(resolved.mime, resolved.header_lines, resolved.body),
            Err(ResolveError::NotFound) => {
                tracing::info!(path = %path, "Resource not found");
                Response::not_found(&path)
            }
            Err(err) => {
                tracing::error!(path = %path, error = %err, "Resolution failed");
                Response::permanent_failure(INTERNAL_ERROR_BODY)
            }
        };
        self.respond(response)
    }

    async fn begin_drift(&mut self, size: u64, token: &str) -> Option<Response> {
        if !self.ctx.token.verify(token) {
            tracing::warn!(declared = size, "Invalid Drift token attempt");
            metrics::record_drift_outcome("unauthorized");
            return Some(self.respond(Response::permanent_failure(INVALID_TOKEN_BODY)));
        }

        if let Some(max) = self.ctx.limits.max_upload_bytes {
            if size > max {
                tracing::warn!(declared = size, max, "Drift upload exceeds limit");
                metrics::record_drift_outcome("too_large");
                return Some(self.respond(Response::permanent_failure(UPLOAD_TOO_LARGE_BODY)));
            }
        }

        if !self.enter(ConnectionState::ReceivingBody) {
            return Some(self.respond(Response::permanent_failure(INTERNAL_ERROR_BODY)));
        }
        self.drift = Some(DriftUpload::new(size, Arc::clone(&self.ctx.uploads)));

        // Payload bytes that arrived in the same chunk as the request line.
        let pending = self.reader.take_remaining();
        self.feed_upload(&pending).await
    }

    async fn feed_upload(&mut self, chunk: &[u8]) -> Option<Response> {
        let Some(drift) = self.drift.as_mut() else {
            tracing::error!("Receiving body without an active upload");
            return Some(self.respond(Response::permanent_failure(INTERNAL_ERROR_BODY)));
        };

        let progress = match drift.consume(chunk).await {
            Ok(progress) => progress,
            Err(err) => {
                tracing::error!(error = %err, "Drift upload failed");
                if let Some(drift) = self.drift.take() {
                    drift.abort().await;
                }
                metrics::record_drift_outcome("failed");
                return Some(self.respond(Response::permanent_failure(INTERNAL_ERROR_BODY)));
            }
        };
        metrics::record_drift_bytes(progress.consumed);

        if !progress.complete {
            return None;
        }

        let drift = self.drift.take()?;
        let declared = drift.declared();
        let response = match drift.finish().await {
            Ok(name) => {
                tracing::info!(upload = %name, bytes = declared, "Drift upload stored");
                metrics::record_drift_outcome("stored");
                Response::drift_accepted()
            }
            Err(err) => {
                tracing::error!(error = %err, "Drift upload could not be finalized");
                metrics::record_drift_outcome("failed");
                Response::permanent_failure(INTERNAL_ERROR_BODY)
            }
        };
        Some(self.respond(response))
    }

    /// Move to `to`; an illegal move closes the connection instead.
    fn enter(&mut self, to: ConnectionState) -> bool {
        match self.state.transition(to) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "Connection state machine fault");
                self.state = ConnectionState::Closed;
                false
            }
        }
    }

    fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            self.enter(ConnectionState::Closed);
        }
    }

    fn respond(&mut self, response: Response) -> Response {
        self.close();
        response
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("buffered", &self.reader.buffered())
            .field("drift", &self.drift)
            .finish()
    }
}

/// Run the protocol over an established stream until one response is sent.
///
/// Returns the status written, or `None` when the peer closed first.
pub async fn serve<S>(
    mut stream: S,
    ctx: Arc<ServerContext>,
    id: ConnectionId,
) -> Result<Option<Status>, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read_timeout = ctx.limits.read_timeout;
    let mut session = Session::new(ctx);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = match with_timeout(read_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(read)) => read,
            Ok(Err(err)) => {
                session.cancel().await;
                return Err(err.into());
            }
            Err(elapsed) => {
                tracing::debug!(connection_id = %id, state = ?session.state(), "Read timed out");
                session.cancel().await;
                return Err(elapsed.into());
            }
        };

        if read == 0 {
            tracing::debug!(connection_id = %id, state = ?session.state(), "Peer closed before response");
            session.cancel().await;
            return Ok(None);
        }

        if let Some(response) = session.on_data(&chunk[..read]).await {
            let status = response.status;
            tracing::info!(connection_id = %id, status = %status, meta = %response.meta, "Sending response");
            metrics::record_response(status);

            stream.write_all(&response.render()).await?;
            stream.flush().await?;
            if let Err(err) = stream.shutdown().await {
                tracing::debug!(connection_id = %id, error = %err, "Shutdown after response failed");
            }
            return Ok(Some(status));
        }
    }
}
