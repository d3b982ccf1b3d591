use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthorizationToken;
use crate::content::ContentResolver;
use crate::protocol::{DEFAULT_DOCUMENT, DEFAULT_MAX_LINE};
use crate::storage::UploadStore;

/// Per-connection limits, fixed at startup.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Longest accepted request line.
    pub max_line_bytes: usize,
    /// Largest accepted Drift declaration; `None` for no limit.
    pub max_upload_bytes: Option<u64>,
    /// Longest wait for the next inbound chunk.
    pub read_timeout: Duration,
    /// Document served for the root path.
    pub default_document: String,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE,
            max_upload_bytes: None,
            read_timeout: Duration::from_secs(30),
            default_document: DEFAULT_DOCUMENT.to_string(),
        }
    }
}

/// Everything a connection needs from the process, shared read-only.
#[derive(Clone)]
pub struct ServerContext {
    pub token: AuthorizationToken,
    pub resolver: Arc<dyn ContentResolver>,
    pub uploads: Arc<dyn UploadStore>,
    pub limits: SessionLimits,
}

impl ServerContext {
    pub fn new(
        token: AuthorizationToken,
        resolver: Arc<dyn ContentResolver>,
        uploads: Arc<dyn UploadStore>,
    ) -> Self {
        Self {
            token,
            resolver,
            uploads,
            limits: SessionLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("token", &self.token)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
