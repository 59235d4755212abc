//! Scripted in-process receiver for tests.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};

use crate::protocol::plist::{self, Value};

/// A request the mock receiver accepted.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// HTTP method
    pub method: String,
    /// Path without the leading slash
    pub path: String,
    /// Parsed query parameters in request order
    pub query: Vec<(String, String)>,
    /// Content-Type header, if sent
    pub content_type: Option<String>,
    /// Raw request body
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// Decode the body as a binary plist; `None` when empty or not a
    /// plist.
    #[must_use]
    pub fn plist_body(&self) -> Option<Value> {
        plist::decode(&self.body).ok()
    }

    /// Look up a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted response returned by a route handler.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
    /// Content-Type header, when set
    pub content_type: Option<&'static str>,
    /// Close the connection after responding
    pub close: bool,
}

impl MockResponse {
    /// 200 with an empty body.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
            content_type: None,
            close: false,
        }
    }

    /// 200 with a binary plist body.
    ///
    /// # Panics
    ///
    /// Panics if the value fails to encode (test fixture bug).
    #[must_use]
    pub fn ok_plist(value: &Value) -> Self {
        Self {
            status: 200,
            body: plist::encode(value).expect("encode fixture plist"),
            content_type: Some("application/x-apple-binary-plist"),
            close: false,
        }
    }

    /// 200 with a raw octet-stream body.
    #[must_use]
    pub fn ok_bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            content_type: Some("application/octet-stream"),
            close: false,
        }
    }

    /// Error status with an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_type: None,
            close: false,
        }
    }

    /// Ask the client to drop the connection after this response.
    #[must_use]
    pub fn with_close(mut self) -> Self {
        self.close = true;
        self
    }
}

type Handler = Arc<dyn Fn(&ReceivedRequest) -> MockResponse + Send + Sync>;

/// A mock `AirPlay` receiver.
///
/// Routes are registered per path before [`start`](Self::start); unmatched
/// paths answer 404. Every accepted request is recorded for assertions.
pub struct MockReceiver {
    routes: HashMap<String, Handler>,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    connections: Arc<AtomicUsize>,
    shutdown: Option<mpsc::Sender<()>>,
    address: Option<SocketAddr>,
}

impl MockReceiver {
    /// Create a receiver with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown: None,
            address: None,
        }
    }

    /// Script a response for a path (no leading slash).
    #[must_use]
    pub fn route(
        mut self,
        path: &str,
        handler: impl Fn(&ReceivedRequest) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        self.routes.insert(path.to_string(), Arc::new(handler));
        self
    }

    /// Bind to an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns the bind error if the listener cannot be created.
    pub async fn start(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown = Some(shutdown_tx);

        let routes = Arc::new(self.routes.clone());
        let requests = Arc::clone(&self.requests);
        let connections = Arc::clone(&self.connections);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { break };
                        connections.fetch_add(1, Ordering::SeqCst);
                        let routes = Arc::clone(&routes);
                        let requests = Arc::clone(&requests);
                        tokio::spawn(async move {
                            let _ = serve_connection(stream, routes, requests).await;
                        });
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Address the receiver is listening on.
    ///
    /// # Panics
    ///
    /// Panics if called before [`start`](Self::start).
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address.expect("mock receiver not started")
    }

    /// All requests accepted so far.
    pub async fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests for one path.
    pub async fn requests_for(&self, path: &str) -> Vec<ReceivedRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Number of TCP connections accepted.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Stop accepting connections.
    pub fn stop(&mut self) {
        self.shutdown.take();
    }
}

impl Default for MockReceiver {
    fn default() -> Self {
        Self::new()
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, Handler>>,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
) -> io::Result<()> {
    let mut buffer = Vec::with_capacity(4096);

    loop {
        let Some(request) = read_request(&mut stream, &mut buffer).await? else {
            return Ok(()); // clean close between requests
        };

        let response = routes
            .get(&request.path)
            .map_or_else(|| MockResponse::status(404), |handler| handler(&request));

        requests.lock().await.push(request);

        write_response(&mut stream, &response).await?;
        if response.close {
            return Ok(());
        }
    }
}

/// Read one HTTP request, or `None` on a clean close.
async fn read_request(
    stream: &mut TcpStream,
    buffer: &mut Vec<u8>,
) -> io::Result<Option<ReceivedRequest>> {
    loop {
        if let Some(head_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
            let mut lines = head.split("\r\n");
            let request_line = lines.next().unwrap_or_default().to_string();

            let mut content_length = 0usize;
            let mut content_type = None;
            for line in lines {
                if let Some((name, value)) = line.split_once(':') {
                    let name = name.trim().to_ascii_lowercase();
                    let value = value.trim();
                    if name == "content-length" {
                        content_length = value.parse().unwrap_or(0);
                    } else if name == "content-type" {
                        content_type = Some(value.to_string());
                    }
                }
            }

            let body_start = head_end + 4;
            while buffer.len() < body_start + content_length {
                if stream.read_buf(buffer).await? == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "body truncated",
                    ));
                }
            }

            let body = buffer[body_start..body_start + content_length].to_vec();
            buffer.drain(..body_start + content_length);

            let mut parts = request_line.split(' ');
            let method = parts.next().unwrap_or_default().to_string();
            let target = parts.next().unwrap_or_default();
            let (path, query) = parse_target(target);

            return Ok(Some(ReceivedRequest {
                method,
                path,
                query,
                content_type,
                body,
            }));
        }

        if stream.read_buf(buffer).await? == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "request truncated",
            ));
        }
    }
}

fn parse_target(target: &str) -> (String, Vec<(String, String)>) {
    let target = target.strip_prefix('/').unwrap_or(target);
    let Some((path, query)) = target.split_once('?') else {
        return (target.to_string(), Vec::new());
    };

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    (path.to_string(), params)
}

async fn write_response(stream: &mut TcpStream, response: &MockResponse) -> io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        470 => "Login Required",
        _ => "Error",
    };

    let mut head = format!("HTTP/1.1 {} {reason}\r\n", response.status);
    head.push_str("Server: AirTunes/320.20\r\n");
    if let Some(content_type) = response.content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    if response.close {
        head.push_str("Connection: close\r\n");
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await
}
