//! Sans-IO HTTP/1.1 codec: request serialization and incremental response
//! parsing.
//!
//! Receivers speak plain HTTP/1.1 with `Content-Length` bodies on a
//! keep-alive connection; chunked transfer coding never appears and is
//! rejected.

use thiserror::Error;

use super::{Method, USER_AGENT};

/// Errors during HTTP response parsing
#[derive(Debug, Error)]
pub enum HttpCodecError {
    /// Malformed status line
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    /// Malformed header line
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Content-Length is not a number
    #[error("invalid content length")]
    InvalidContentLength,

    /// Response exceeded the configured size limit
    #[error("response too large: {size} bytes")]
    ResponseTooLarge {
        /// Buffered size in bytes
        size: usize,
    },
}

/// Serialize a request onto the wire.
///
/// Sets the fixed `User-Agent` and `Connection: keep-alive` headers every
/// request; `Content-Type`/`Content-Length` only when a body is present.
pub(crate) fn encode_request(
    method: Method,
    host: &str,
    path: &str,
    query: &[(&str, String)],
    content_type: Option<&str>,
    body: Option<&[u8]>,
) -> Vec<u8> {
    let mut target = String::with_capacity(1 + path.len());
    target.push('/');
    target.push_str(path);
    for (i, (key, value)) in query.iter().enumerate() {
        target.push(if i == 0 { '?' } else { '&' });
        target.push_str(key);
        target.push('=');
        target.push_str(value);
    }

    let mut head = format!("{method} {target} HTTP/1.1\r\n");
    head.push_str(&format!("Host: {host}\r\n"));
    head.push_str(&format!("User-Agent: {USER_AGENT}\r\n"));
    head.push_str("Connection: keep-alive\r\n");
    if let Some(content_type) = content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    if let Some(body) = body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    if let Some(body) = body {
        bytes.extend_from_slice(body);
    }
    bytes
}

/// Response headers with case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    fn insert(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    /// Look up a header value by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn content_length(&self) -> Result<usize, HttpCodecError> {
        match self.get("content-length") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| HttpCodecError::InvalidContentLength),
            None => Ok(0),
        }
    }

    /// Whether the receiver asked to drop the connection after this
    /// response.
    #[must_use]
    pub fn connection_close(&self) -> bool {
        self.get("connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }
}

/// A parsed HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    /// Numeric status code
    pub status: u16,
    /// Reason phrase (may be empty)
    pub reason: String,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Incremental response parser. Feed bytes with [`feed`](Self::feed), pull
/// complete responses with [`decode`](Self::decode); leftover bytes stay
/// buffered for the next keep-alive response.
pub struct HttpCodec {
    buffer: Vec<u8>,
    max_size: usize,
    state: ParseState,
}

enum ParseState {
    StatusLine,
    Headers { status: u16, reason: String },
    Body {
        status: u16,
        reason: String,
        headers: Headers,
        content_length: usize,
    },
}

impl HttpCodec {
    /// Create a codec with a 4 MiB response limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_size: 4 * 1024 * 1024,
            state: ParseState::StatusLine,
        }
    }

    /// Feed received bytes into the codec.
    ///
    /// # Errors
    ///
    /// Returns [`HttpCodecError::ResponseTooLarge`] past the size limit.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), HttpCodecError> {
        if self.buffer.len() + bytes.len() > self.max_size {
            return Err(HttpCodecError::ResponseTooLarge {
                size: self.buffer.len() + bytes.len(),
            });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Try to decode a complete response; `None` means more bytes are
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`HttpCodecError`] for malformed response data.
    pub fn decode(&mut self) -> Result<Option<HttpResponse>, HttpCodecError> {
        loop {
            match &self.state {
                ParseState::StatusLine => {
                    let Some(line_end) = find_crlf(&self.buffer) else {
                        return Ok(None);
                    };
                    let line = String::from_utf8_lossy(&self.buffer[..line_end]).into_owned();
                    let (status, reason) = parse_status_line(&line)?;
                    self.buffer.drain(..line_end + 2);
                    self.state = ParseState::Headers { status, reason };
                }

                ParseState::Headers { status, reason } => {
                    let Some((headers, consumed)) = self.parse_headers()? else {
                        return Ok(None);
                    };
                    if headers.get("transfer-encoding").is_some() {
                        return Err(HttpCodecError::InvalidHeader(
                            "transfer codings are not supported".to_string(),
                        ));
                    }
                    let content_length = headers.content_length()?;
                    let status = *status;
                    let reason = reason.clone();
                    self.buffer.drain(..consumed);

                    self.state = ParseState::Body {
                        status,
                        reason,
                        headers,
                        content_length,
                    };
                }

                ParseState::Body {
                    status,
                    reason,
                    headers,
                    content_length,
                } => {
                    if self.buffer.len() < *content_length {
                        return Ok(None);
                    }
                    let body: Vec<u8> = self.buffer.drain(..*content_length).collect();
                    let response = HttpResponse {
                        status: *status,
                        reason: reason.clone(),
                        headers: headers.clone(),
                        body,
                    };
                    self.state = ParseState::StatusLine;
                    return Ok(Some(response));
                }
            }
        }
    }

    /// Parse the header block if it is complete, returning the headers and
    /// the byte count to drain (including the blank line).
    fn parse_headers(&self) -> Result<Option<(Headers, usize)>, HttpCodecError> {
        // Zero headers: the status line is directly followed by the blank
        // line.
        if self.buffer.starts_with(b"\r\n") {
            return Ok(Some((Headers::default(), 2)));
        }
        let Some(block_end) = find_double_crlf(&self.buffer) else {
            return Ok(None);
        };

        let mut headers = Headers::default();
        let text = String::from_utf8_lossy(&self.buffer[..block_end]);
        for line in text.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                return Err(HttpCodecError::InvalidHeader(line.to_string()));
            };
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }

        Ok(Some((headers, block_end + 4)))
    }
}

impl Default for HttpCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_status_line(line: &str) -> Result<(u16, String), HttpCodecError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| HttpCodecError::InvalidStatusLine(line.to_string()))?;
    if !version.starts_with("HTTP/") {
        return Err(HttpCodecError::InvalidStatusLine(line.to_string()));
    }
    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| HttpCodecError::InvalidStatusLine(line.to_string()))?;
    let reason = parts.next().unwrap_or("").to_string();
    Ok((status, reason))
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

/// Position of the blank line separating the header block from the body.
fn find_double_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}
