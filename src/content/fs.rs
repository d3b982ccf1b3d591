//! Serve resources from a directory tree.
//!
//! Lookup order for a path `p` under the root:
//! 1. `p` itself; if it opens as a directory, `p/<default document>`
//! 2. `p.sky` when `p` does not exist
//!
//! Files are opened directly and the open handle is inspected; existence is
//! never checked separately, so there is no window between check and read.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use crate::content::{mime, ContentResolver, ResolveError, Resolved};
use crate::protocol::DEFAULT_DOCUMENT;

const SKY_EXTENSION: &str = "sky";
const META_EXTENSION: &str = "meta";

/// Filesystem-backed [`ContentResolver`].
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
    default_document: String,
}

enum Opened {
    File(File, PathBuf),
    Directory,
    Missing,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_document: DEFAULT_DOCUMENT.to_string(),
        }
    }

    /// Document served for directory paths.
    pub fn with_default_document(mut self, name: impl Into<String>) -> Self {
        self.default_document = name.into();
        self
    }

    async fn locate(&self, path: &str) -> Result<(File, PathBuf), ResolveError> {
        let target = self.root.join(path);

        match open(target.clone()).await? {
            Opened::File(file, found) => Ok((file, found)),
            Opened::Directory => match open(target.join(&self.default_document)).await? {
                Opened::File(file, found) => Ok((file, found)),
                Opened::Directory | Opened::Missing => Err(ResolveError::NotFound),
            },
            Opened::Missing => {
                let mut with_ext = target.into_os_string();
                with_ext.push(".");
                with_ext.push(SKY_EXTENSION);
                match open(PathBuf::from(with_ext)).await? {
                    Opened::File(file, found) => Ok((file, found)),
                    Opened::Directory | Opened::Missing => Err(ResolveError::NotFound),
                }
            }
        }
    }
}

async fn open(path: PathBuf) -> Result<Opened, ResolveError> {
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(err) if is_missing(&err) => return Ok(Opened::Missing),
        Err(err) => return Err(err.into()),
    };

    if file.metadata().await?.is_dir() {
        Ok(Opened::Directory)
    } else {
        Ok(Opened::File(file, path))
    }
}

fn is_missing(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Header lines from `<file>.meta`, one per non-empty line.
async fn sidecar_headers(file_path: &Path) -> Result<Vec<String>, ResolveError> {
    let mut meta_path = file_path.as_os_str().to_owned();
    meta_path.push(".");
    meta_path.push(META_EXTENSION);

    match fs::read_to_string(PathBuf::from(meta_path)).await {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()),
        Err(err) if is_missing(&err) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl ContentResolver for FsResolver {
    async fn resolve(&self, path: &str) -> Result<Resolved, ResolveError> {
        let (mut file, found) = self.locate(path).await?;

        let mut body = Vec::new();
        file.read_to_end(&mut body).await?;
        let header_lines = sidecar_headers(&found).await?;

        tracing::debug!(
            path = %path,
            file = %found.display(),
            bytes = body.len(),
            "Resolved resource"
        );

        Ok(Resolved {
            mime: mime::for_path(&found).to_string(),
            header_lines,
            body: Bytes::from(body),
        })
    }
}
