//! Playback command encoding and session handling against the mock
//! receiver.

use airplay_remote::protocol::plist::{DictBuilder, Value};
use airplay_remote::testing::{MockReceiver, MockResponse};
use airplay_remote::{AirPlayClient, AirPlayError, ClientIdentity};

/// Receiver that verifies any paired client and accepts playback
/// commands.
fn playback_receiver() -> MockReceiver {
    MockReceiver::new()
        .route("pair-verify", |request| {
            if request.body.first() == Some(&0x01) {
                let mut body = vec![0x5Au8; 32];
                body.extend_from_slice(&[0x33u8; 16]);
                MockResponse::ok_bytes(body)
            } else {
                MockResponse::ok()
            }
        })
        .route("play", |_| MockResponse::ok())
        .route("scrub", |_| MockResponse::ok())
        .route("rate", |_| MockResponse::ok())
        .route("stop", |_| MockResponse::ok())
        .route("info", |_| {
            MockResponse::ok_plist(&DictBuilder::new().insert("model", "AppleTV3,2").build())
        })
}

async fn verified_client(receiver: &mut MockReceiver) -> AirPlayClient {
    let addr = receiver.start().await.unwrap();
    let identity = ClientIdentity::generate("playback-remote").unwrap();
    let mut client = AirPlayClient::new(identity, addr.into());
    client.verify().await.unwrap();
    client
}

#[tokio::test]
async fn seek_sends_scrub_with_position_query_and_no_body() {
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    client.seek(42.0).await.unwrap();

    let requests = receiver.requests_for("scrub").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].query_param("position"), Some("42"));
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn seek_keeps_fractional_positions() {
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    client.seek(12.5).await.unwrap();
    let requests = receiver.requests_for("scrub").await;
    assert_eq!(requests[0].query_param("position"), Some("12.5"));
}

#[tokio::test]
async fn play_posts_content_location_and_start_position() {
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    client
        .play("https://media.example.com/sintel.mp4")
        .await
        .unwrap();

    let requests = receiver.requests_for("play").await;
    let body = requests[0].plist_body().unwrap();
    assert_eq!(
        body.get("Content-Location").and_then(Value::as_str),
        Some("https://media.example.com/sintel.mp4")
    );
    assert_eq!(body.get("Start-Position").and_then(Value::as_i64), Some(0));
    assert_eq!(
        requests[0].content_type.as_deref(),
        Some("application/x-apple-binary-plist")
    );
}

#[tokio::test]
async fn pause_and_resume_set_rate_zero_and_one() {
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    client.pause().await.unwrap();
    client.resume().await.unwrap();

    let requests = receiver.requests_for("rate").await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query_param("value"), Some("0"));
    assert_eq!(requests[1].query_param("value"), Some("1"));
}

#[tokio::test]
async fn stop_posts_to_stop() {
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    client.stop().await.unwrap();
    assert_eq!(receiver.requests_for("stop").await.len(), 1);
}

#[tokio::test]
async fn playback_info_reports_receiver_state() {
    let mut receiver = playback_receiver().route("playback-info", |_| {
        MockResponse::ok_plist(
            &DictBuilder::new()
                .insert("duration", 652.0f64)
                .insert("position", 123.5f64)
                .insert("rate", 1.0f64)
                .build(),
        )
    });
    let client = verified_client(&mut receiver).await;

    let info = client.playback_info().await;
    assert!((info.duration - 652.0).abs() < f64::EPSILON);
    assert!((info.position - 123.5).abs() < f64::EPSILON);
    assert!(info.is_playing);
}

#[tokio::test]
async fn playback_info_integer_rate_counts_as_playing() {
    let mut receiver = playback_receiver().route("playback-info", |_| {
        MockResponse::ok_plist(
            &DictBuilder::new()
                .insert("duration", 10.0f64)
                .insert("position", 1.0f64)
                .insert("rate", 1i64)
                .build(),
        )
    });
    let client = verified_client(&mut receiver).await;
    assert!(client.playback_info().await.is_playing);
}

#[tokio::test]
async fn playback_info_degrades_to_default_on_error_status() {
    // No playback-info route: the receiver answers 404, as real devices
    // do when nothing is playing.
    let mut receiver = playback_receiver();
    let client = verified_client(&mut receiver).await;

    let info = client.playback_info().await;
    assert!((info.duration - 1.0).abs() < f64::EPSILON);
    assert!((info.position - 0.0).abs() < f64::EPSILON);
    assert!(!info.is_playing);
}

#[tokio::test]
async fn playback_commands_require_verification() {
    let mut receiver = playback_receiver();
    let addr = receiver.start().await.unwrap();
    let identity = ClientIdentity::generate("playback-remote").unwrap();
    let client = AirPlayClient::new(identity, addr.into());

    for err in [
        client.play("https://media.example.com/x.mp4").await,
        client.seek(1.0).await,
        client.pause().await,
        client.resume().await,
        client.stop().await,
    ] {
        assert!(matches!(err.unwrap_err(), AirPlayError::SessionNotVerified));
    }

    // But the best-effort status probe still answers.
    let info = client.playback_info().await;
    assert!(!info.is_playing);
}

#[tokio::test]
async fn dropped_connection_invalidates_session_until_reverified() {
    // The receiver hangs up after `stop`; trust is bound to the dead
    // connection, so the next command must fail until verify runs again.
    let mut receiver = playback_receiver()
        .route("stop", |_| MockResponse::ok().with_close());
    let addr = receiver.start().await.unwrap();

    let identity = ClientIdentity::generate("playback-remote").unwrap();
    let mut client = AirPlayClient::new(identity, addr.into());
    client.verify().await.unwrap();

    client.stop().await.unwrap();
    assert!(!client.is_verified().await);
    assert!(matches!(
        client.pause().await.unwrap_err(),
        AirPlayError::SessionNotVerified
    ));

    client.verify().await.unwrap();
    client.pause().await.unwrap();
    assert_eq!(receiver.connections(), 2);
}

#[tokio::test]
async fn receiver_info_works_before_pairing() {
    let mut receiver = playback_receiver();
    let addr = receiver.start().await.unwrap();
    let identity = ClientIdentity::generate("playback-remote").unwrap();
    let client = AirPlayClient::new(identity, addr.into());

    let info = client.receiver_info().await.unwrap();
    assert_eq!(info.get("model").and_then(Value::as_str), Some("AppleTV3,2"));
}
