//! Canned single-response HTTP fixture for wire-level tests
//!
//! Serves fixed JSON bodies for configured paths over real sockets, and
//! records every request so tests can assert on call counts, paths, and
//! headers. One connection per request (`Connection: close`).

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One configured endpoint
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub status: u16,
    pub body: serde_json::Value,
}

impl Route {
    pub fn ok(path: &str, body: serde_json::Value) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            body,
        }
    }

    pub fn status(path: &str, status: u16, body: serde_json::Value) -> Self {
        Self {
            path: path.to_string(),
            status,
            body,
        }
    }
}

/// A request the fixture saw
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<String>,
    pub body: String,
}

pub struct TestServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    /// All recorded requests, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests that hit the given path.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

/// Spawn a fixture serving the given routes on an ephemeral port.
pub async fn spawn(routes: Vec<Route>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                handle_connection(stream, routes, recorded).await;
            });
        }
    });

    TestServer { url, requests }
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: Vec<Route>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };

    let (status, body) = match routes.iter().find(|r| r.path == request.path) {
        Some(route) => (route.status, route.body.to_string()),
        None => (404, "{}".to_string()),
    };
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;

    recorded.lock().unwrap().push(request);
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];

    // Read until the end of the header block
    let header_end = loop {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_header_end(&raw) {
            break pos;
        }
        if raw.len() > 1 << 20 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.split('?').next()?.to_string();
    let headers: Vec<String> = lines.map(|l| l.to_ascii_lowercase()).collect();

    let content_length = headers
        .iter()
        .find_map(|h| h.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = raw[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}
