use super::codec::{HttpCodec, encode_request};
use super::*;
use crate::protocol::plist::DictBuilder;
use crate::testing::{MockReceiver, MockResponse};

// --- request serialization ---

#[test]
fn test_encode_request_with_body() {
    let bytes = encode_request(
        Method::Post,
        "10.0.0.5:7000",
        "pair-setup-pin",
        &[],
        Some(CONTENT_TYPE_BINARY_PLIST),
        Some(b"abc"),
    );
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("POST /pair-setup-pin HTTP/1.1\r\n"));
    assert!(text.contains("Host: 10.0.0.5:7000\r\n"));
    assert!(text.contains("User-Agent: AirPlay/320.20\r\n"));
    assert!(text.contains("Connection: keep-alive\r\n"));
    assert!(text.contains("Content-Type: application/x-apple-binary-plist\r\n"));
    assert!(text.contains("Content-Length: 3\r\n"));
    assert!(text.ends_with("\r\n\r\nabc"));
}

#[test]
fn test_encode_request_query_and_no_body() {
    let bytes = encode_request(
        Method::Post,
        "10.0.0.5:7000",
        "scrub",
        &[("position", "42".to_string())],
        None,
        None,
    );
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.starts_with("POST /scrub?position=42 HTTP/1.1\r\n"));
    assert!(!text.contains("Content-Type"));
    assert!(!text.contains("Content-Length"));
    assert!(text.ends_with("\r\n\r\n"));
}

#[test]
fn test_encode_request_multiple_query_params() {
    let bytes = encode_request(
        Method::Get,
        "h:1",
        "path",
        &[("a", "1".to_string()), ("b", "2".to_string())],
        None,
        None,
    );
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("GET /path?a=1&b=2 HTTP/1.1\r\n"));
}

// --- response parsing ---

#[test]
fn test_codec_parses_complete_response() {
    let mut codec = HttpCodec::new();
    codec
        .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nServer: AirTunes/320.20\r\n\r\nhello")
        .unwrap();

    let response = codec.decode().unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.reason, "OK");
    assert_eq!(response.body, b"hello");
    assert_eq!(response.headers.get("server"), Some("AirTunes/320.20"));
    assert!(response.is_success());
}

#[test]
fn test_codec_handles_split_feeds() {
    let mut codec = HttpCodec::new();
    let raw = b"HTTP/1.1 470 Login Required\r\nContent-Length: 4\r\n\r\nbody";

    for chunk in raw.chunks(7) {
        // Interleave decode attempts the way the read loop does.
        assert!(codec.decode().unwrap().is_none());
        codec.feed(chunk).unwrap();
    }
    let response = codec.decode().unwrap().unwrap();
    assert_eq!(response.status, 470);
    assert!(!response.is_success());
    assert_eq!(response.body, b"body");
}

#[test]
fn test_codec_incomplete_returns_none() {
    let mut codec = HttpCodec::new();
    codec.feed(b"HTTP/1.1 200 OK\r\nContent-Le").unwrap();
    assert!(codec.decode().unwrap().is_none());
}

#[test]
fn test_codec_empty_body_and_no_headers() {
    let mut codec = HttpCodec::new();
    codec.feed(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
    let response = codec.decode().unwrap().unwrap();
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
}

#[test]
fn test_codec_back_to_back_responses() {
    let mut codec = HttpCodec::new();
    codec
        .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\naHTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb")
        .unwrap();

    assert_eq!(codec.decode().unwrap().unwrap().body, b"a");
    assert_eq!(codec.decode().unwrap().unwrap().body, b"b");
    assert!(codec.decode().unwrap().is_none());
}

#[test]
fn test_codec_detects_connection_close() {
    let mut codec = HttpCodec::new();
    codec
        .feed(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n")
        .unwrap();
    let response = codec.decode().unwrap().unwrap();
    assert!(response.headers.connection_close());
}

#[test]
fn test_codec_rejects_garbage_status_line() {
    let mut codec = HttpCodec::new();
    codec.feed(b"RTSP/1.0 200 OK\r\n\r\n").unwrap();
    assert!(matches!(
        codec.decode(),
        Err(HttpCodecError::InvalidStatusLine(_))
    ));
}

#[test]
fn test_codec_rejects_chunked() {
    let mut codec = HttpCodec::new();
    codec
        .feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
        .unwrap();
    assert!(matches!(
        codec.decode(),
        Err(HttpCodecError::InvalidHeader(_))
    ));
}

#[test]
fn test_codec_rejects_bad_content_length() {
    let mut codec = HttpCodec::new();
    codec
        .feed(b"HTTP/1.1 200 OK\r\nContent-Length: many\r\n\r\n")
        .unwrap();
    assert!(matches!(
        codec.decode(),
        Err(HttpCodecError::InvalidContentLength)
    ));
}

// --- the live connection ---

#[tokio::test]
async fn test_plist_request_round_trips() {
    let mut receiver = MockReceiver::new().route("info", |_| {
        MockResponse::ok_plist(
            &DictBuilder::new()
                .insert("model", "AppleTV3,2")
                .insert("features", 0x29FFi64)
                .build(),
        )
    });
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    let value = connection
        .plist_request(Method::Get, "info", &[], None)
        .await
        .unwrap();

    assert_eq!(value.get("model").and_then(Value::as_str), Some("AppleTV3,2"));
    assert_eq!(value.get("features").and_then(Value::as_i64), Some(0x29FF));
}

#[tokio::test]
async fn test_plist_request_empty_body_is_empty_dictionary() {
    let mut receiver = MockReceiver::new().route("stop", |_| MockResponse::ok());
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    let value = connection
        .plist_request(Method::Post, "stop", &[], None)
        .await
        .unwrap();
    assert_eq!(value, Value::empty_dictionary());
}

#[tokio::test]
async fn test_error_status_maps_to_transport_error() {
    let mut receiver = MockReceiver::new();
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    let err = connection
        .request(Method::Get, "missing", RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 404 }));
}

#[tokio::test]
async fn test_sequential_requests_reuse_one_connection() {
    let mut receiver = MockReceiver::new().route("stop", |_| MockResponse::ok());
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    for _ in 0..3 {
        connection
            .plist_request(Method::Post, "stop", &[], None)
            .await
            .unwrap();
    }

    assert_eq!(receiver.connections(), 1);
    assert_eq!(connection.generation().await, 1);
}

#[tokio::test]
async fn test_connection_close_forces_new_generation() {
    let mut receiver = MockReceiver::new()
        .route("stop", |_| MockResponse::ok().with_close())
        .route("info", |_| MockResponse::ok());
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    connection
        .plist_request(Method::Post, "stop", &[], None)
        .await
        .unwrap();
    let first = connection.generation().await;
    assert!(!connection.is_live(first).await);

    connection
        .plist_request(Method::Get, "info", &[], None)
        .await
        .unwrap();
    let second = connection.generation().await;

    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert!(connection.is_live(second).await);
    assert_eq!(receiver.connections(), 2);
}

#[tokio::test]
async fn test_decode_failure_maps_to_codec_error() {
    let mut receiver = MockReceiver::new()
        .route("info", |_| MockResponse::ok_bytes(b"not a plist".to_vec()));
    let addr = receiver.start().await.unwrap();

    let connection = HttpConnection::new(addr.into());
    let err = connection
        .plist_request(Method::Get, "info", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AirPlayError::Codec { .. }));
}
