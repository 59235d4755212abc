//! Playback control for `AirPlay` receivers.

pub mod playback;

pub use playback::PlaybackController;
