//! End-to-end protocol tests over real sockets.

use std::time::Duration;

mod common;

use common::{request, request_chunked, start_server, start_server_with, TOKEN};

#[tokio::test]
async fn root_locator_serves_index() {
    let server = start_server().await;
    let response = request(server.addr, b"sky://localhost/\r\n").await;
    assert_eq!(response, b"20 text/sky\r\n\r\nHELLO WORLD");
}

#[tokio::test]
async fn accept_header_is_skipped() {
    let server = start_server().await;
    let response = request(
        server.addr,
        b"Accept: text/sky\r\nsky://localhost/index.sky\r\n",
    )
    .await;
    assert_eq!(response, b"20 text/sky\r\n\r\nHELLO WORLD");
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let server = start_server().await;
    let response = request(server.addr, b"sky://localhost/missing\r\n").await;
    assert_eq!(
        response,
        b"40 Not Found\r\n\r\nResource not found: missing"
    );
}

#[tokio::test]
async fn directory_and_extension_fallbacks() {
    let server = start_server().await;
    assert_eq!(
        request(server.addr, b"sky://localhost/docs\r\n").await,
        b"20 text/sky\r\n\r\ndocs home"
    );
    assert_eq!(
        request(server.addr, b"docs/guide\n").await,
        b"20 text/sky\r\n\r\nguide"
    );
}

#[tokio::test]
async fn sidecar_headers_and_mime() {
    let server = start_server().await;
    let response = request(server.addr, b"sky://localhost/notes.txt\r\n").await;
    assert_eq!(
        response,
        b"20 text/plain\r\nAuthor: ada\r\n\r\nplain notes"
    );
}

#[tokio::test]
async fn traversal_stays_inside_root() {
    let server = start_server().await;
    std::fs::write(server.dir.path().join("secret.sky"), "secret").unwrap();

    let response = request(server.addr, b"sky://localhost/../secret.sky\r\n").await;
    assert!(response.starts_with(b"40 "), "{:?}", String::from_utf8_lossy(&response));

    let response = request(server.addr, b"../../index.sky\r\n").await;
    assert_eq!(response, b"20 text/sky\r\n\r\nHELLO WORLD");
}

#[tokio::test]
async fn malformed_url_is_bad_request() {
    let server = start_server().await;
    let response = request(server.addr, b"sky://[::1\r\n").await;
    assert_eq!(response, b"59 Bad Request\r\n\r\nInvalid URL format");
}

#[tokio::test]
async fn request_line_split_across_writes() {
    let server = start_server().await;
    let response = request_chunked(
        server.addr,
        &[b"sky://loc", b"alhost/docs/gu", b"ide\r", b"\n"],
        Duration::from_millis(20),
    )
    .await;
    assert_eq!(response, b"20 text/sky\r\n\r\nguide");
}

#[tokio::test]
async fn drift_upload_is_stored() {
    let server = start_server().await;
    let line = format!("DRIFT size=5;token={TOKEN}\r\nHELLO");
    let response = request(server.addr, line.as_bytes()).await;

    assert_eq!(response, b"20 text/sky\r\n\r\nDrift Upload Successful");
    let uploads = server.uploads();
    assert_eq!(uploads.len(), 1);
    let (name, bytes) = &uploads[0];
    assert!(name.starts_with("drift_"), "{name}");
    assert_eq!(bytes, b"HELLO");
}

#[tokio::test]
async fn drift_payload_across_many_writes() {
    let server = start_server().await;
    let line = format!("DRIFT size=10;token={TOKEN}\r\n");
    let response = request_chunked(
        server.addr,
        &[line.as_bytes(), b"HE", b"LLO", b"WORLD"],
        Duration::from_millis(20),
    )
    .await;

    assert_eq!(response, b"20 text/sky\r\n\r\nDrift Upload Successful");
    assert_eq!(server.uploads()[0].1, b"HELLOWORLD");
}

#[tokio::test]
async fn drift_payload_is_never_parsed_as_text() {
    let server = start_server().await;
    let payload = b"sky://localhost/\r\nDRIFT size=1;token=x\r\n\x00\xff";
    let mut wire = format!("DRIFT size={};token={TOKEN}\r\n", payload.len()).into_bytes();
    wire.extend_from_slice(payload);

    let response = request(server.addr, &wire).await;
    assert_eq!(response, b"20 text/sky\r\n\r\nDrift Upload Successful");
    assert_eq!(server.uploads()[0].1, payload);
}

#[tokio::test]
async fn invalid_token_writes_nothing() {
    let server = start_server().await;
    let response = request(server.addr, b"DRIFT size=5;token=WRONG\r\nHELLO").await;

    assert_eq!(response, b"50 Permanent failure\r\n\r\nInvalid Drift Token");
    assert_eq!(server.upload_dir_entries(), 0);
}

#[tokio::test]
async fn malformed_drift_is_bad_request() {
    let server = start_server().await;
    let response = request(server.addr, b"DRIFT\r\n").await;
    assert_eq!(response, b"59 Bad Request\r\n\r\nMalformed DRIFT request");

    let response = request(server.addr, b"DRIFT token=x\r\n").await;
    assert_eq!(response, b"59 Bad Request\r\n\r\nMissing size or token in DRIFT");

    let response = request(server.addr, b"DRIFT size=abc;token=x\r\n").await;
    assert_eq!(response, b"59 Bad Request\r\n\r\nMissing size or token in DRIFT");
}

#[tokio::test]
async fn upload_limit_enforced() {
    let server = start_server_with(|config| config.drift.max_upload_bytes = Some(4)).await;
    let line = format!("DRIFT size=5;token={TOKEN}\r\nHELLO");
    let response = request(server.addr, line.as_bytes()).await;

    assert_eq!(response, b"50 Permanent failure\r\n\r\nUpload too large");
    assert_eq!(server.upload_dir_entries(), 0);
}

#[tokio::test]
async fn oversized_request_line_is_rejected() {
    let server = start_server_with(|config| config.limits.max_line_bytes = 64).await;
    let line = format!("sky://localhost/{}\r\n", "a".repeat(200));
    let response = request(server.addr, line.as_bytes()).await;
    assert!(response.starts_with(b"59 Bad Request\r\n\r\n"));
}

#[tokio::test]
async fn single_response_per_connection() {
    let server = start_server().await;
    let response = request(
        server.addr,
        b"sky://localhost/\r\nsky://localhost/docs\r\n",
    )
    .await;
    assert_eq!(response, b"20 text/sky\r\n\r\nHELLO WORLD");
}

#[tokio::test]
async fn abandoned_upload_leaves_no_artifact() {
    let server = start_server().await;
    let line = format!("DRIFT size=100;token={TOKEN}\r\npartial");
    {
        use tokio::io::AsyncWriteExt;
        let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut rest = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut stream, &mut rest)
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    // The connection closes only after the partial upload was discarded.
    assert!(server.uploads().is_empty());
    assert_eq!(server.upload_dir_entries(), 0);
}
