//! Tests for the artifact store client against a fake server

#![allow(clippy::unwrap_used)]

use artcache_remote::{ArtifactoryClient, RemoteConfig, RemoteError, RetryConfig};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ArtifactoryClient {
    let config = RemoteConfig::new(server.uri()).with_token(Some("my-access-token".into()));
    ArtifactoryClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_exists_returns_true_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/my-file"))
        .and(header("Authorization", "Bearer my-access-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.exists("my-file").await.unwrap());
}

#[tokio::test]
async fn test_exists_returns_false_on_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/my-file"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(!client.exists("my-file").await.unwrap());
}

#[tokio::test]
async fn test_exists_fails_on_other_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/my-file"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let err = client.exists("my-file").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    let err = client.exists("forbidden").await.unwrap_err();
    assert_eq!(err.status_code(), Some(403));
}

#[tokio::test]
async fn test_exists_fails_when_server_unreachable() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let client =
        ArtifactoryClient::new(&RemoteConfig::new(format!("http://127.0.0.1:{port}"))).unwrap();
    let err = client.exists("my-file").await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport { .. }));
}

#[tokio::test]
async fn test_upload_streams_file_contents() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/repo/my-file.tar.gz"))
        .and(header("Authorization", "Bearer my-access-token"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let local = temp.path().join("my-file.tar.gz");
    std::fs::write(&local, b"archive bytes").unwrap();

    let client = client_for(&server).await;
    client.upload(&local, "repo/my-file.tar.gz").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, b"archive bytes");
}

#[tokio::test]
async fn test_upload_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/my-file"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let local = temp.path().join("my-file");
    std::fs::write(&local, b"x").unwrap();

    let client = client_for(&server).await;
    let err = client.upload(&local, "my-file").await.unwrap_err();
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_upload_of_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();

    let client = client_for(&server).await;
    let err = client
        .upload(&temp.path().join("nope"), "my-file")
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Io { operation: "open", .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_writes_body_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repo/abc123.tar.gz"))
        .and(query_param("skipUpdateStats", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let local = temp.path().join("abc123.tar.gz");

    let client = client_for(&server).await;
    client.download("repo/abc123.tar.gz", &local).await.unwrap();

    assert_eq!(std::fs::read(&local).unwrap(), b"payload");
    assert!(!temp.path().join("abc123.tar.gz.part").exists());
}

#[tokio::test]
async fn test_download_failure_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/my-file"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let local = temp.path().join("my-file");

    let client = client_for(&server).await;
    assert!(client.download("my-file", &local).await.is_err());
    assert!(!local.exists());
    assert!(!temp.path().join("my-file.part").exists());
}

/// Serve one response whose body stops well short of its Content-Length
async fn truncated_body_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nhello")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_download_cut_short_leaves_no_file() {
    let base = truncated_body_server().await;
    let client = ArtifactoryClient::new(&RemoteConfig::new(base)).unwrap();

    let temp = TempDir::new().unwrap();
    let local = temp.path().join("abc123.tar.gz");

    let err = client.download("nx/abc123.tar.gz", &local).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport { .. }));
    assert!(!local.exists());
    assert!(!temp.path().join("abc123.tar.gz.part").exists());
}

#[tokio::test]
async fn test_download_of_missing_object_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = client_for(&server).await;
    let err = client
        .download("repo/gone.tar.gz", &temp.path().join("gone.tar.gz"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_transient_failures_are_retried_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = RemoteConfig::new(server.uri()).with_retry(RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 5,
        max_backoff_ms: 20,
        backoff_multiplier: 2.0,
    });
    let client = ArtifactoryClient::new(&config).unwrap();

    assert!(client.exists("flaky").await.unwrap());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.exists("flaky").await.is_err());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
