//! # airplay-remote
//!
//! A pure Rust client for Apple's `AirPlay` trust-establishment and
//! remote-control protocol.
//!
//! The crate pairs with a receiver once using an on-screen PIN (an SRP-6a
//! exchange that registers the client's long-term Ed25519 key), re-proves
//! that trust on every connection without a PIN (Curve25519 key agreement
//! plus an Ed25519 signature), and then drives playback with
//! binary-plist-over-HTTP commands.
//!
//! ## Example
//!
//! ```rust,no_run
//! use airplay_remote::{AirPlayClient, ClientIdentity, ReceiverAddress};
//!
//! # async fn example() -> Result<(), airplay_remote::AirPlayError> {
//! let identity = ClientIdentity::generate("living-room-remote")?;
//! let mut client = AirPlayClient::new(identity, ReceiverAddress::new("192.168.1.40"));
//!
//! // One-time: the receiver displays a PIN.
//! client.start_pairing().await?;
//! client.enter_pin("1234").await?;
//!
//! // Every connection: authenticate, then control playback.
//! client.verify().await?;
//! client.play("https://media.w3.org/2010/05/sintel/trailer.mp4").await?;
//! client.seek(42.0).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **High-level**: [`AirPlayClient`] - identity, handshakes and commands
//! - **Mid-level**: [`protocol::pairing`] - the two handshake state machines
//! - **Low-level**: [`transport`] and [`protocol::plist`] - wire format

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Client façade
pub mod client;
/// Playback command encoding
pub mod control;
/// Error types
pub mod error;
/// Wire protocol: plist codec, crypto primitives, handshakes
pub mod protocol;
/// Testing utilities
pub mod testing;
/// HTTP transport over one persistent connection
pub mod transport;
/// Core types
pub mod types;
/// Input validation helpers
pub mod validate;

// Re-exports
pub use client::AirPlayClient;
pub use error::{AirPlayError, Result};
pub use types::{ClientIdentity, PlaybackInfo, ReceiverAddress, StoredIdentity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AirPlayClient, AirPlayError, ClientIdentity, PlaybackInfo, ReceiverAddress, StoredIdentity,
    };
}
