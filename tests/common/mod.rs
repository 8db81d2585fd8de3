//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use dashboard_proxy::{DashboardConfig, HttpServer, Shutdown};

/// A request as seen by the mock upstream.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// What the mock upstream sends back.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    /// Sent with Content-Length when one part, chunked otherwise.
    pub parts: Vec<String>,
    /// Wait before writing the status line.
    pub delay: Duration,
    /// Wait between chunked parts.
    pub chunk_delay: Duration,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            parts: vec![body.into()],
            delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn chunked(mut self, parts: &[&str], chunk_delay: Duration) -> Self {
        self.parts = parts.iter().map(|p| p.to_string()).collect();
        self.chunk_delay = chunk_delay;
        self
    }
}

/// Handle on a running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    connections: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Start a programmable upstream on an ephemeral port.
pub async fn start_mock_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let (reqs, conns) = (requests.clone(), connections.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    conns.fetch_add(1, Ordering::SeqCst);
                    let respond = respond.clone();
                    let reqs = reqs.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, respond.as_ref(), reqs).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockUpstream {
        addr,
        requests,
        connections,
    }
}

async fn serve_one<F>(
    socket: TcpStream,
    respond: &F,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
) -> std::io::Result<()>
where
    F: Fn(&CapturedRequest) -> MockResponse,
{
    let mut reader = BufReader::new(socket);
    let mut captured = CapturedRequest::default();

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let mut request_line = line.split_whitespace();
    captured.method = request_line.next().unwrap_or_default().to_string();
    captured.target = request_line.next().unwrap_or_default().to_string();

    loop {
        line.clear();
        reader.read_line(&mut line).await?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            captured.headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let length: usize = captured
        .header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    captured.body = body;

    let response = respond(&captured);
    requests.lock().unwrap().push(captured);

    tokio::time::sleep(response.delay).await;

    let mut socket = reader.into_inner();
    let mut head = format!("HTTP/1.1 {} Mock\r\nConnection: close\r\n", response.status);
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }

    if response.parts.len() == 1 {
        head.push_str(&format!("Content-Length: {}\r\n\r\n", response.parts[0].len()));
        socket.write_all(head.as_bytes()).await?;
        socket.write_all(response.parts[0].as_bytes()).await?;
    } else {
        head.push_str("Transfer-Encoding: chunked\r\n\r\n");
        socket.write_all(head.as_bytes()).await?;
        for part in &response.parts {
            socket
                .write_all(format!("{:x}\r\n{}\r\n", part.len(), part).as_bytes())
                .await?;
            socket.flush().await?;
            tokio::time::sleep(response.chunk_delay).await;
        }
        socket.write_all(b"0\r\n\r\n").await?;
    }
    socket.shutdown().await
}

/// Upstream that streams chunks until a write fails.
pub struct EndlessUpstream {
    pub addr: SocketAddr,
    /// Resolves with the instant the first failed write was observed.
    pub released: oneshot::Receiver<Instant>,
}

#[allow(dead_code)]
impl EndlessUpstream {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start an upstream serving one endless chunked response.
#[allow(dead_code)]
pub async fn start_endless_upstream() -> EndlessUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, released) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };
        let mut reader = BufReader::new(socket);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return,
                Ok(_) if line.trim_end().is_empty() => break,
                Ok(_) => {}
            }
        }

        let mut socket = reader.into_inner();
        let head = "HTTP/1.1 200 Mock\r\nTransfer-Encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let chunk = format!("{:x}\r\n{}\r\n", 1024, "x".repeat(1024));
        loop {
            if socket.write_all(chunk.as_bytes()).await.is_err() || socket.flush().await.is_err() {
                let _ = tx.send(Instant::now());
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    EndlessUpstream { addr, released }
}

/// Send a request verbatim and return the full raw response.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// A proxy server running in the background. Shuts down on drop.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with built-in templates and a short upstream timeout.
pub fn test_config() -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.pages.template_dir = "/nonexistent/templates".into();
    config.proxy.upstream_timeout_secs = 5;
    config.proxy.connect_timeout_secs = 2;
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: DashboardConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let signal = shutdown.signal();

    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    TestProxy { addr, shutdown }
}

/// An address that refuses connections.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Run `f` and report how long it took.
#[allow(dead_code)]
pub async fn timed<Fut: Future>(f: Fut) -> (Fut::Output, Duration) {
    let start = std::time::Instant::now();
    let out = f.await;
    (out, start.elapsed())
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
