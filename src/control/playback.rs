//! Playback command encoding.
//!
//! Commands are plain plist requests; trust comes from the verified
//! connection they travel on, so the controller itself is stateless.

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::plist::{DictBuilder, Value};
use crate::transport::{HttpConnection, Method};
use crate::types::PlaybackInfo;

/// Encodes playback commands onto a connection.
pub struct PlaybackController {
    connection: Arc<HttpConnection>,
}

impl PlaybackController {
    /// Create a controller on `connection`.
    #[must_use]
    pub fn new(connection: Arc<HttpConnection>) -> Self {
        Self { connection }
    }

    /// Start playing a video URL from the beginning.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn play(&self, video_url: &str) -> Result<()> {
        tracing::info!("play {video_url}");
        let params = DictBuilder::new()
            .insert("Content-Location", video_url)
            .insert("Start-Position", 0i64)
            .build();
        self.connection
            .plist_request(Method::Post, "play", &[], Some(&params))
            .await?;
        Ok(())
    }

    /// Jump to an absolute position in seconds.
    ///
    /// Sent as `scrub?position=<seconds>` with no body.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn seek(&self, position: f64) -> Result<()> {
        tracing::info!("seek to {position}");
        let query = [("position", format_decimal(position))];
        self.connection
            .plist_request(Method::Post, "scrub", &query, None)
            .await?;
        Ok(())
    }

    /// Set the playback rate: 0 pauses, 1 resumes.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn set_rate(&self, value: u8) -> Result<()> {
        tracing::info!("set rate {value}");
        let query = [("value", value.to_string())];
        self.connection
            .plist_request(Method::Post, "rate", &query, None)
            .await?;
        Ok(())
    }

    /// Stop playback entirely.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("stop");
        self.connection
            .plist_request(Method::Post, "stop", &[], None)
            .await?;
        Ok(())
    }

    /// Current playback state, degrading to the "nothing playing" default
    /// instead of failing.
    ///
    /// Receivers answer `playback-info` with an error status whenever no
    /// item is loaded, so errors here are part of normal operation.
    pub async fn playback_info(&self) -> PlaybackInfo {
        let value = match self
            .connection
            .plist_request(Method::Get, "playback-info", &[], None)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("playback-info unavailable: {err}");
                return PlaybackInfo::default();
            }
        };

        PlaybackInfo {
            duration: value
                .get("duration")
                .and_then(Value::as_f64)
                .unwrap_or(1.0),
            position: value
                .get("position")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            is_playing: value
                .get("rate")
                .and_then(Value::as_f64)
                .is_some_and(|rate| (rate - 1.0).abs() < f64::EPSILON),
        }
    }

    /// The receiver's device information dictionary (`GET /info`).
    ///
    /// Also serves as a cheap reachability probe before pairing.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn receiver_info(&self) -> Result<Value> {
        self.connection
            .plist_request(Method::Get, "info", &[], None)
            .await
    }
}

/// Plain decimal formatting: `42` for whole seconds, `42.5` otherwise.
fn format_decimal(value: f64) -> String {
    format!("{value}")
}
