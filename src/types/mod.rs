//! Core types: client identity, receiver address, playback state.

mod address;
mod identity;

pub use address::{DEFAULT_PORT, ReceiverAddress};
pub use identity::{ClientIdentity, StoredIdentity};

/// Snapshot of the receiver's playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfo {
    /// Total duration of the current item in seconds
    pub duration: f64,
    /// Current playhead position in seconds
    pub position: f64,
    /// Whether the receiver is currently playing (rate == 1)
    pub is_playing: bool,
}

impl Default for PlaybackInfo {
    /// The "nothing playing" fallback. Receivers answer `playback-info`
    /// with an error status while idle, so callers get this instead of an
    /// error.
    fn default() -> Self {
        Self {
            duration: 1.0,
            position: 0.0,
            is_playing: false,
        }
    }
}
