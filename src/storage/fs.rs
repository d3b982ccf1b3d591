//! Filesystem upload store.
//!
//! Bytes land in `<name>.part` and only become `<name>` on finalize, so an
//! interrupted upload can never be mistaken for a complete one.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::storage::{UploadSink, UploadStore};

const SUFFIX_LEN: usize = 5;
const PART_EXTENSION: &str = "part";

/// Writes uploads into a single directory.
#[derive(Debug, Clone)]
pub struct FsUploadStore {
    dir: PathBuf,
}

impl FsUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `drift_<unix-millis>_<random>.sky`
fn unique_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("drift_{millis}_{suffix}.sky")
}

#[async_trait]
impl UploadStore for FsUploadStore {
    async fn create(&self) -> std::io::Result<Box<dyn UploadSink>> {
        fs::create_dir_all(&self.dir).await?;

        loop {
            let name = unique_name();
            let final_path = self.dir.join(&name);
            let part_path = final_path.with_extension(format!("sky.{PART_EXTENSION}"));

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&part_path)
                .await
            {
                Ok(file) => {
                    tracing::debug!(path = %part_path.display(), "Opened upload sink");
                    return Ok(Box::new(FsUploadSink {
                        name,
                        file,
                        part_path,
                        final_path,
                    }));
                }
                // Same millisecond and suffix as a concurrent upload; draw again.
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

struct FsUploadSink {
    name: String,
    file: File,
    part_path: PathBuf,
    final_path: PathBuf,
}

#[async_trait]
impl UploadSink for FsUploadSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes).await
    }

    async fn finalize(self: Box<Self>) -> std::io::Result<String> {
        let Self {
            name,
            mut file,
            part_path,
            final_path,
        } = *self;

        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part_path, &final_path).await?;
        tracing::debug!(path = %final_path.display(), "Finalized upload sink");
        Ok(name)
    }

    async fn discard(self: Box<Self>) -> std::io::Result<()> {
        let Self { file, part_path, .. } = *self;
        drop(file);
        match fs::remove_file(&part_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}
