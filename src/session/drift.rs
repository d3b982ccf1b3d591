//! Drift upload controller.
//!
//! Streams exactly the declared number of payload bytes into a fresh sink,
//! whatever the transport chunking. Only the chunk currently being written
//! is held in memory.

use std::sync::Arc;

use crate::storage::{UploadSink, UploadStore};

/// Errors while storing an upload.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("failed to open upload sink: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to write upload: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to finalize upload: {0}")]
    Finalize(#[source] std::io::Error),

    #[error("upload incomplete: {remaining} of {declared} bytes missing")]
    Incomplete { declared: u64, remaining: u64 },
}

/// Result of feeding one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes written to the sink from this chunk.
    pub consumed: usize,
    /// Bytes past the declared size, dropped.
    pub discarded: usize,
    /// The declared size has been reached.
    pub complete: bool,
}

/// State of one authorized upload.
pub struct DriftUpload {
    declared: u64,
    remaining: u64,
    store: Arc<dyn UploadStore>,
    sink: Option<Box<dyn UploadSink>>,
}

impl DriftUpload {
    /// Start an upload of exactly `declared` bytes. No sink is opened yet.
    pub fn new(declared: u64, store: Arc<dyn UploadStore>) -> Self {
        Self {
            declared,
            remaining: declared,
            store,
            sink: None,
        }
    }

    pub fn declared(&self) -> u64 {
        self.declared
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    async fn sink(&mut self) -> Result<&mut Box<dyn UploadSink>, DriftError> {
        if self.sink.is_none() {
            let sink = self.store.create().await.map_err(DriftError::Open)?;
            tracing::info!(
                upload = %sink.name(),
                declared = self.declared,
                "Receiving Drift upload"
            );
            self.sink = Some(sink);
        }
        // Populated above.
        self.sink.as_mut().ok_or_else(|| {
            DriftError::Open(std::io::Error::other("upload sink unavailable"))
        })
    }

    /// Write the front of `bytes`, up to the remaining declared size.
    ///
    /// Anything beyond the declared size is reported in
    /// [`Progress::discarded`] and never reaches the sink.
    pub async fn consume(&mut self, bytes: &[u8]) -> Result<Progress, DriftError> {
        let take = usize::try_from(self.remaining)
            .map(|remaining| remaining.min(bytes.len()))
            .unwrap_or(bytes.len());

        if take > 0 {
            let sink = self.sink().await?;
            sink.write(&bytes[..take]).await.map_err(DriftError::Write)?;
            self.remaining -= take as u64;
        }

        let discarded = bytes.len() - take;
        if discarded > 0 {
            tracing::debug!(discarded, "Dropping bytes past declared Drift size");
        }

        Ok(Progress {
            consumed: take,
            discarded,
            complete: self.is_complete(),
        })
    }

    /// Finalize the sink once every declared byte has arrived.
    ///
    /// A zero-length upload still produces an (empty) artifact.
    pub async fn finish(mut self) -> Result<String, DriftError> {
        if !self.is_complete() {
            let err = DriftError::Incomplete {
                declared: self.declared,
                remaining: self.remaining(),
            };
            self.abort().await;
            return Err(err);
        }

        self.sink().await?;
        let sink = self.sink.take().ok_or_else(|| {
            DriftError::Finalize(std::io::Error::other("upload sink unavailable"))
        })?;
        sink.finalize().await.map_err(DriftError::Finalize)
    }

    /// Discard whatever has been written so far.
    pub async fn abort(mut self) {
        let Some(sink) = self.sink.take() else {
            return;
        };
        let name = sink.name().to_string();
        tracing::warn!(
            upload = %name,
            declared = self.declared,
            remaining = self.remaining,
            "Discarding incomplete Drift upload"
        );
        if let Err(err) = sink.discard().await {
            tracing::error!(upload = %name, error = %err, "Failed to discard partial upload");
        }
    }
}

impl std::fmt::Debug for DriftUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftUpload")
            .field("declared", &self.declared)
            .field("remaining", &self.remaining)
            .field("sink", &self.sink.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}
