//! Resource resolution.
//!
//! # Responsibilities
//! - Map a sanitized relative path to stored content
//! - Infer the MIME type reported in the response meta
//! - Supply extra header lines from sidecar metadata
//!
//! Paths reaching a resolver have already passed
//! [`resource_path`](crate::protocol::resource_path); resolvers never see
//! scheme, host or traversal segments.

pub mod fs;
pub mod mime;

use async_trait::async_trait;
use bytes::Bytes;

pub use fs::FsResolver;

/// Content found for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub mime: String,
    pub header_lines: Vec<String>,
    pub body: Bytes,
}

/// Why a path could not be served.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("resource not found")]
    NotFound,

    #[error("resolution failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of resources for Standard requests.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<Resolved, ResolveError>;
}
