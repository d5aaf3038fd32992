//! The hosting client against loopback HTTP servers.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use release_relay::config::{Provider, Secret};
use release_relay::hosting::HostingClient;
use release_relay::release::locator::{LocateError, ReleaseSource};
use release_relay::transfer::download::{AssetDownloader, DownloadError, DownloadRequest};
use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex, PoisonError};

const RELEASE_ROUTE: &str = "/api/v1/repos/octo-org/site/releases/latest";
const RELEASE_JSON: &str = r#"{
    "tag_name": "v3.1.0",
    "name": "Site 3.1",
    "assets": [{
        "name": "release-3.1.0.tar.gz",
        "size": 2048,
        "browser_download_url": "https://git.example.com/octo-org/site/releases/download/v3.1.0/release-3.1.0.tar.gz",
        "created_at": "2025-01-02T03:04:05Z"
    }]
}"#;
const LARGE_BODY_LEN: usize = 1024 * 1024 + 17;

type Seen = Arc<Mutex<Vec<(&'static str, HeaderMap)>>>;

fn large_body() -> Vec<u8> {
    (0..=250_u8).cycle().take(LARGE_BODY_LEN).collect()
}

fn record(seen: &Seen, route: &'static str, headers: HeaderMap) {
    seen.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((route, headers));
}

async fn release_document(State(seen): State<Seen>, headers: HeaderMap) -> impl IntoResponse {
    record(&seen, "release", headers);
    ([(header::CONTENT_TYPE, "application/json")], RELEASE_JSON)
}

async fn large_asset(State(seen): State<Seen>, headers: HeaderMap) -> Vec<u8> {
    record(&seen, "asset", headers);
    large_body()
}

async fn broken_asset() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

struct Host {
    _runtime: tokio::runtime::Runtime,
    base_url: String,
    seen: Seen,
}

impl Host {
    fn start() -> Self {
        let seen = Seen::default();
        let app = Router::new()
            .route(RELEASE_ROUTE, get(release_document))
            .route("/assets/large", get(large_asset))
            .route("/assets/broken", get(broken_asset))
            .with_state(Arc::clone(&seen));

        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind");
        let address = listener.local_addr().expect("local address");
        drop(runtime.spawn(async move { axum::serve(listener, app).await }));

        Self {
            _runtime: runtime,
            base_url: format!("http://{address}"),
            seen,
        }
    }

    fn gitea(&self) -> Provider {
        Provider::Gitea {
            base_url: self.base_url.clone(),
        }
    }

    fn only_request(&self, route: &str) -> HeaderMap {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<&HeaderMap> = seen
            .iter()
            .filter(|(name, _)| *name == route)
            .map(|(_, headers)| headers)
            .collect();
        let [headers] = matching.as_slice() else {
            panic!("expected one {route} request, got {}", matching.len());
        };
        (*headers).clone()
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Answer one request with a declared length longer than the body sent,
/// then close the connection.
fn truncating_server(declared: usize, sent: &'static [u8]) -> (String, std::thread::JoinHandle<()>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("local address");
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line).expect("read request");
            if read == 0 || line == "\r\n" {
                break;
            }
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared}\r\n\r\n"
        )
        .expect("write head");
        stream.write_all(sent).expect("write partial body");
        stream.flush().expect("flush");
    });
    (format!("http://{address}/assets/cut"), handle)
}

#[test]
fn gitea_latest_release_is_fetched_with_token_scheme() {
    let host = Host::start();
    let client = HostingClient::new(host.gitea(), Some(Secret::new("t0k")));

    let release = client
        .latest_release(&"octo-org/site".parse().expect("repo"))
        .expect("release");

    assert_eq!(release.tag_name, "v3.1.0");
    assert_eq!(release.display_name(), "Site 3.1");
    assert_eq!(release.assets.len(), 1);
    let headers = host.only_request("release");
    assert_eq!(header_value(&headers, "authorization"), Some("token t0k"));
    assert_eq!(header_value(&headers, "accept"), Some("application/json"));
    assert!(
        header_value(&headers, "user-agent").is_some_and(|agent| agent.starts_with("release-relay/"))
    );
}

#[test]
fn missing_release_maps_to_api_status() {
    let host = Host::start();
    let client = HostingClient::new(host.gitea(), None);

    let err = client
        .latest_release(&"octo-org/unknown".parse().expect("repo"))
        .expect_err("no such release");

    match err {
        LocateError::Api { url, status } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/api/v1/repos/octo-org/unknown/releases/latest"));
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[test]
fn binary_download_streams_whole_body_with_bearer_token() {
    let host = Host::start();
    let client = HostingClient::new(Provider::GitHub, Some(Secret::new("ghp_abc")));
    let dir = tempfile::tempdir().expect("temp dir");
    let dest = dir.path().join("release-3.1.0.tar.gz");

    let written = client
        .download(
            &DownloadRequest {
                url: format!("{}/assets/large", host.base_url),
                binary: true,
            },
            &dest,
        )
        .expect("download");

    assert_eq!(written, LARGE_BODY_LEN as u64);
    assert_eq!(std::fs::read(&dest).expect("read download"), large_body());
    let headers = host.only_request("asset");
    assert_eq!(
        header_value(&headers, "accept"),
        Some("application/octet-stream")
    );
    assert_eq!(
        header_value(&headers, "authorization"),
        Some("Bearer ghp_abc")
    );
    assert_eq!(
        header_value(&headers, "x-github-api-version"),
        Some("2022-11-28")
    );
}

#[test]
fn server_error_maps_to_download_status() {
    let host = Host::start();
    let client = HostingClient::new(host.gitea(), None);
    let dir = tempfile::tempdir().expect("temp dir");

    let err = client
        .download(
            &DownloadRequest {
                url: format!("{}/assets/broken", host.base_url),
                binary: false,
            },
            &dir.path().join("release-3.1.0.tar.gz"),
        )
        .expect_err("server error");

    assert!(
        matches!(err, DownloadError::Status { status: 500, .. }),
        "expected Status 500, got {err:?}"
    );
}

#[test]
fn truncated_body_is_an_interrupted_download() {
    let (url, server) = truncating_server(4096, &[7_u8; 100]);
    let client = HostingClient::new(Provider::GitHub, None);
    let dir = tempfile::tempdir().expect("temp dir");
    let dest = dir.path().join("release-3.1.0.tar.gz");

    let err = client
        .download(&DownloadRequest { url, binary: true }, &dest)
        .expect_err("body cut short");
    server.join().expect("server thread");

    match err {
        DownloadError::Interrupted { written, .. } => assert!(written <= 100),
        other => panic!("expected Interrupted, got {other:?}"),
    }
    assert!(dest.is_file(), "partial download should stay on disk");
}
