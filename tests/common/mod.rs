//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sky_server::config::ServerConfig;
use sky_server::{build_context, Shutdown, SkyServer};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const TOKEN: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

/// A plaintext server over a temporary content tree.
pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: TempDir,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), sky_server::ServerError>>,
}

impl TestServer {
    pub fn content_root(&self) -> PathBuf {
        self.dir.path().join("content")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Completed uploads, sorted by name, with their bytes.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        let Ok(entries) = std::fs::read_dir(self.uploads_dir()) else {
            return Vec::new();
        };
        let mut uploads: Vec<_> = entries
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "sky"))
            .map(|path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                (name, std::fs::read(&path).unwrap())
            })
            .collect();
        uploads.sort();
        uploads
    }

    /// Every file in the uploads directory, finished or not.
    pub fn upload_dir_entries(&self) -> usize {
        std::fs::read_dir(self.uploads_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Start a server with `configure` applied over test defaults.
pub async fn start_server_with(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("content");
    write(&root, "index.sky", "HELLO WORLD");
    write(&root, "docs/index.sky", "docs home");
    write(&root, "docs/guide.sky", "guide");
    write(&root, "notes.txt", "plain notes");
    write(&root, "notes.txt.meta", "Author: ada\n");
    std::fs::write(dir.path().join("token.txt"), TOKEN).unwrap();

    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.content.root = root;
    config.content.uploads_dir = dir.path().join("uploads");
    config.drift.token_path = dir.path().join("token.txt");
    config.limits.read_timeout_secs = 5;
    config.limits.shutdown_grace_secs = 1;
    configure(&mut config);

    let ctx = build_context(&config).unwrap();
    let server = SkyServer::bind(&config, ctx).await.unwrap();
    let addr = server.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    let handle = tokio::spawn(server.run(stop));

    TestServer {
        addr,
        dir,
        shutdown,
        handle,
    }
}

pub async fn start_server() -> TestServer {
    start_server_with(|_| {}).await
}

/// Send `request` in one write and read until the server closes.
pub async fn request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    request_chunked(addr, &[request], Duration::ZERO).await
}

/// Send each chunk as a separate write, pausing between them.
pub async fn request_chunked(addr: SocketAddr, chunks: &[&[u8]], pause: Duration) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    for chunk in chunks {
        stream.write_all(chunk).await.unwrap();
        stream.flush().await.unwrap();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}
