//! Destination for Drift upload bytes.
//!
//! # Data Flow
//! ```text
//! DriftUpload::consume (first chunk)
//!     → UploadStore::create (unique name, incomplete artifact)
//!     → UploadSink::write (one chunk at a time, awaited)
//!     → UploadSink::finalize (artifact becomes visible)
//!       or UploadSink::discard (partial artifact removed)
//! ```

pub mod fs;

use async_trait::async_trait;

pub use fs::FsUploadStore;

/// Creates a fresh sink per upload.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Open a new sink under a name unique across concurrent uploads.
    async fn create(&self) -> std::io::Result<Box<dyn UploadSink>>;
}

/// An open, not yet finalized upload artifact.
#[async_trait]
pub trait UploadSink: Send {
    /// Name the artifact will carry once finalized.
    fn name(&self) -> &str;

    /// Write the whole slice, waiting for the sink to accept it.
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Complete the artifact and return its name.
    async fn finalize(self: Box<Self>) -> std::io::Result<String>;

    /// Drop the partial artifact.
    async fn discard(self: Box<Self>) -> std::io::Result<()>;
}
