//! Binary-plist-over-HTTP transport.
//!
//! The receiver binds its verification state to the TCP connection, not to
//! any token, so every request to one receiver goes over a single
//! persistent connection and requests are strictly serialized. The mutex
//! wakes waiters in FIFO order, which gives the required per-client
//! ordering even when callers race.

pub mod codec;

#[cfg(test)]
mod tests;

use std::fmt;
use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::AirPlayError;
use crate::protocol::plist::{self, Value};
use crate::types::ReceiverAddress;

pub use codec::{Headers, HttpCodec, HttpCodecError, HttpResponse};

/// User agent presented to the receiver on every request.
pub const USER_AGENT: &str = "AirPlay/320.20";

/// Content type for binary plist bodies.
pub const CONTENT_TYPE_BINARY_PLIST: &str = "application/x-apple-binary-plist";

/// Content type for the raw verification handshake bodies.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Wire form of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The receiver answered with a non-success status
    #[error("receiver answered status {status}")]
    Status {
        /// Numeric HTTP status code
        status: u16,
    },

    /// Network I/O failed
    #[error("network error: {0}")]
    Io(#[from] io::Error),

    /// The receiver closed the connection mid-response
    #[error("connection closed by receiver")]
    ConnectionClosed,

    /// The response could not be parsed as HTTP
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] HttpCodecError),
}

/// Options for a raw transport request.
#[derive(Debug, Default)]
pub struct RequestOptions<'a> {
    /// Query string parameters, appended in order
    pub query: &'a [(&'a str, String)],
    /// Request body
    pub body: Option<&'a [u8]>,
    /// Content type, sent only when set
    pub content_type: Option<&'a str>,
}

/// A successful transport response.
#[derive(Debug)]
pub struct TransportResponse {
    /// Response body bytes
    pub body: Bytes,
    /// Generation of the connection that served this response
    pub generation: u64,
}

struct ConnState {
    stream: Option<TcpStream>,
    /// Bumped every time a fresh TCP connection is established. Verified
    /// sessions record the generation they were proven on; a mismatch (or
    /// a dropped stream) means trust is gone.
    generation: u64,
}

/// One persistent, serialized HTTP connection to a receiver.
pub struct HttpConnection {
    address: ReceiverAddress,
    state: Mutex<ConnState>,
}

impl HttpConnection {
    /// Create a connection handle. No I/O happens until the first request.
    #[must_use]
    pub fn new(address: ReceiverAddress) -> Self {
        Self {
            address,
            state: Mutex::new(ConnState {
                stream: None,
                generation: 0,
            }),
        }
    }

    /// The receiver this connection talks to.
    #[must_use]
    pub fn address(&self) -> &ReceiverAddress {
        &self.address
    }

    /// Current connection generation (0 before the first connect).
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Whether the connection from `generation` is still the live one.
    pub async fn is_live(&self, generation: u64) -> bool {
        let state = self.state.lock().await;
        state.stream.is_some() && state.generation == generation
    }

    /// Issue a request and read the full response.
    ///
    /// Reuses the persistent connection, reconnecting lazily if none is
    /// open. Requests from concurrent callers are serialized FIFO. No
    /// automatic retries: handshake steps are not idempotent once the
    /// receiver has advanced its state.
    ///
    /// # Errors
    ///
    /// [`TransportError::Status`] for non-2xx answers, [`TransportError::Io`]
    /// / [`TransportError::ConnectionClosed`] for connection failures (the
    /// stream is dropped so the next request reconnects), and
    /// [`TransportError::InvalidResponse`] for unparseable responses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions<'_>,
    ) -> Result<TransportResponse, TransportError> {
        let mut state = self.state.lock().await;

        if state.stream.is_none() {
            let stream = TcpStream::connect(self.address.authority()).await?;
            stream.set_nodelay(true)?;
            state.generation += 1;
            state.stream = Some(stream);
            tracing::debug!(
                generation = state.generation,
                "connected to {}", self.address
            );
        }
        let generation = state.generation;

        let request_bytes = codec::encode_request(
            method,
            &self.address.authority(),
            path,
            options.query,
            options.content_type,
            options.body,
        );

        tracing::debug!(
            body_len = options.body.map_or(0, <[u8]>::len),
            "{method} /{path}"
        );

        let stream = state
            .stream
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;
        let response = match Self::exchange(stream, &request_bytes).await {
            Ok(response) => response,
            Err(err) => {
                // Connection state is indeterminate; force a reconnect.
                state.stream = None;
                return Err(err);
            }
        };

        tracing::debug!(
            status = response.status,
            body_len = response.body.len(),
            "response for /{path}"
        );

        if response.headers.connection_close() {
            state.stream = None;
        }

        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
            });
        }

        Ok(TransportResponse {
            body: Bytes::from(response.body),
            generation,
        })
    }

    async fn exchange(
        stream: &mut TcpStream,
        request: &[u8],
    ) -> Result<HttpResponse, TransportError> {
        stream.write_all(request).await?;
        stream.flush().await?;

        let mut parser = HttpCodec::new();
        let mut buf = [0u8; 4096];
        loop {
            if let Some(response) = parser.decode()? {
                return Ok(response);
            }
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(TransportError::ConnectionClosed);
            }
            parser.feed(&buf[..n])?;
        }
    }

    /// Issue a binary-plist request: encode `params` (when present) as the
    /// body and decode the response body, with an empty body decoding to an
    /// empty dictionary.
    ///
    /// # Errors
    ///
    /// Transport failures as in [`request`](Self::request); plist
    /// encode/decode failures as [`AirPlayError::Codec`].
    pub async fn plist_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        params: Option<&Value>,
    ) -> Result<Value, AirPlayError> {
        let body = params.map(plist::encode).transpose()?;

        let response = self
            .request(
                method,
                path,
                RequestOptions {
                    query,
                    body: body.as_deref(),
                    content_type: Some(CONTENT_TYPE_BINARY_PLIST),
                },
            )
            .await?;

        if response.body.is_empty() {
            return Ok(Value::empty_dictionary());
        }
        Ok(plist::decode(&response.body)?)
    }
}
