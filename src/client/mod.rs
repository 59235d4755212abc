//! High-level client façade.

use std::sync::Arc;

use crate::control::PlaybackController;
use crate::error::{AirPlayError, Result};
use crate::protocol::pairing::{ConnectionVerifier, PinPairing, SetupStage};
use crate::protocol::plist::Value;
use crate::transport::HttpConnection;
use crate::types::{ClientIdentity, PlaybackInfo, ReceiverAddress};

/// A verified session, valid only for the connection generation it was
/// proven on.
#[derive(Debug, Clone, Copy)]
struct VerifiedSession {
    generation: u64,
}

/// Client for one `AirPlay` receiver.
///
/// Owns one identity, one persistent connection, at most one pairing
/// attempt and at most one verified session. Pairing runs once per
/// receiver; verification runs once per connection and again after any
/// reconnect; playback commands require a live verified session.
///
/// All requests are serialized onto the single connection in call order,
/// which the receiver requires for its connection-bound trust state.
pub struct AirPlayClient {
    identity: ClientIdentity,
    connection: Arc<HttpConnection>,
    playback: PlaybackController,
    pairing: Option<PinPairing>,
    session: Option<VerifiedSession>,
}

impl AirPlayClient {
    /// Create a client for `identity` talking to `address`.
    #[must_use]
    pub fn new(identity: ClientIdentity, address: ReceiverAddress) -> Self {
        let connection = Arc::new(HttpConnection::new(address));
        Self {
            identity,
            playback: PlaybackController::new(Arc::clone(&connection)),
            connection,
            pairing: None,
            session: None,
        }
    }

    /// The identity this client authenticates as.
    #[must_use]
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// The receiver this client talks to.
    #[must_use]
    pub fn address(&self) -> &ReceiverAddress {
        self.connection.address()
    }

    /// Begin pairing: the receiver displays a PIN for the user to read.
    ///
    /// Any pairing already in progress is discarded.
    ///
    /// # Errors
    ///
    /// Validation or transport failures.
    pub async fn start_pairing(&mut self) -> Result<()> {
        let mut pairing = PinPairing::new(Arc::clone(&self.connection), &self.identity)?;
        pairing.start().await?;
        self.pairing = Some(pairing);
        Ok(())
    }

    /// Complete pairing with the PIN the receiver is displaying.
    ///
    /// Runs pairing steps 1-3. After [`AirPlayError::InvalidPin`] this can
    /// be called again with a corrected PIN; it resumes at the SRP proof
    /// without repeating the key exchange, which is the one retry the
    /// protocol supports.
    ///
    /// # Errors
    ///
    /// [`AirPlayError::InvalidPin`] for a wrong PIN (retryable);
    /// [`AirPlayError::InvalidState`] when pairing was never started;
    /// validation, protocol or transport failures otherwise.
    pub async fn enter_pin(&mut self, pin: &str) -> Result<()> {
        let pairing = self.pairing.as_mut().ok_or(AirPlayError::InvalidState {
            expected: "pairing in progress",
            actual: "no pairing started",
        })?;

        if pairing.stage() == SetupStage::Started {
            pairing.step1().await?;
        }
        pairing.step2(pin).await?;
        pairing.step3().await?;

        self.pairing = None;
        Ok(())
    }

    /// Authenticate the current connection with the paired key.
    ///
    /// Must run before playback commands, and again whenever the
    /// connection is re-established — the receiver's verification state
    /// lives on the TCP connection itself.
    ///
    /// # Errors
    ///
    /// Protocol or transport failures; a rejection here usually means the
    /// receiver no longer trusts this identity and needs re-pairing.
    pub async fn verify(&mut self) -> Result<()> {
        let mut verifier = ConnectionVerifier::new(Arc::clone(&self.connection), &self.identity);
        verifier.step1().await?;
        let generation = verifier.step2().await?;

        self.session = Some(VerifiedSession { generation });
        Ok(())
    }

    /// Whether the current connection has a live verified session.
    pub async fn is_verified(&self) -> bool {
        match self.session {
            Some(session) => self.connection.is_live(session.generation).await,
            None => false,
        }
    }

    async fn require_session(&self) -> Result<()> {
        if self.is_verified().await {
            Ok(())
        } else {
            Err(AirPlayError::SessionNotVerified)
        }
    }

    /// Start playing a video URL.
    ///
    /// # Errors
    ///
    /// [`AirPlayError::SessionNotVerified`] without a live session;
    /// transport failures otherwise.
    pub async fn play(&self, video_url: &str) -> Result<()> {
        self.require_session().await?;
        self.playback.play(video_url).await
    }

    /// Jump to an absolute position in seconds.
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn seek(&self, position: f64) -> Result<()> {
        self.require_session().await?;
        self.playback.seek(position).await
    }

    /// Pause playback (rate 0).
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn pause(&self) -> Result<()> {
        self.require_session().await?;
        self.playback.set_rate(0).await
    }

    /// Resume playback (rate 1).
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn resume(&self) -> Result<()> {
        self.require_session().await?;
        self.playback.set_rate(1).await
    }

    /// Stop playback entirely.
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn stop(&self) -> Result<()> {
        self.require_session().await?;
        self.playback.stop().await
    }

    /// Current playback state. Never fails: receivers report errors while
    /// idle, so failures degrade to [`PlaybackInfo::default`].
    pub async fn playback_info(&self) -> PlaybackInfo {
        self.playback.playback_info().await
    }

    /// The receiver's device information dictionary; usable as a
    /// reachability probe before pairing.
    ///
    /// # Errors
    ///
    /// Transport or codec failures.
    pub async fn receiver_info(&self) -> Result<Value> {
        self.playback.receiver_info().await
    }
}
