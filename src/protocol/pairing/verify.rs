//! Per-connection verification (pair-verify) state machine.

use std::sync::Arc;

use crate::error::{AirPlayError, Result};
use crate::protocol::crypto::{
    Aes128Ctr, Ed25519KeyPair, X25519KeyPair, derive_half_key, lengths,
};
use crate::transport::{
    CONTENT_TYPE_OCTET_STREAM, HttpConnection, Method, RequestOptions, TransportError,
};
use crate::types::ClientIdentity;

/// Path carrying both verification rounds.
const PAIR_VERIFY: &str = "pair-verify";

/// Key derivation info strings. Unlike pairing, the derived IV is used
/// as-is.
const VERIFY_KEY_INFO: &str = "Pair-Verify-AES-Key";
const VERIFY_IV_INFO: &str = "Pair-Verify-AES-IV";

enum VerifyState {
    Idle,
    KeysExchanged {
        ephemeral: X25519KeyPair,
        receiver_key: [u8; 32],
        tail: Vec<u8>,
        generation: u64,
    },
    Signed {
        generation: u64,
    },
}

impl VerifyState {
    fn name(&self) -> &'static str {
        match self {
            VerifyState::Idle => "Idle",
            VerifyState::KeysExchanged { .. } => "KeysExchanged",
            VerifyState::Signed { .. } => "Signed",
        }
    }
}

/// One verification attempt, bound to the connection it runs on.
///
/// The receiver keeps its half of the exchange on the TCP connection
/// itself, so the attempt records the transport generation at step 1 and
/// refuses to finish if the connection was re-established in between. A
/// failed attempt resets to `Idle`; restart from [`step1`](Self::step1).
pub struct ConnectionVerifier {
    connection: Arc<HttpConnection>,
    private_key: [u8; 32],
    public_key: [u8; 32],
    state: VerifyState,
}

impl ConnectionVerifier {
    /// Create a verification attempt for `identity`.
    #[must_use]
    pub fn new(connection: Arc<HttpConnection>, identity: &ClientIdentity) -> Self {
        Self {
            connection,
            private_key: *identity.private_key(),
            public_key: *identity.public_key(),
            state: VerifyState::Idle,
        }
    }

    /// Exchange ephemeral keys with the receiver.
    ///
    /// Sends `[0x01, 0, 0, 0] ++ ephemeral_public ++ static_public` as a
    /// raw octet stream. The ephemeral Curve25519 pair is derived from the
    /// static private key, so it is the same every session; "ephemeral"
    /// here refers to the receiver's side.
    ///
    /// # Errors
    ///
    /// [`AirPlayError::Protocol`] when the response is shorter than the 32
    /// byte receiver key plus the 8 byte minimum tail.
    pub async fn step1(&mut self) -> Result<()> {
        let VerifyState::Idle = &self.state else {
            return Err(AirPlayError::InvalidState {
                expected: "Idle",
                actual: self.state.name(),
            });
        };

        let ephemeral = X25519KeyPair::from_seed(&self.private_key);

        let mut body = Vec::with_capacity(4 + 32 + 32);
        body.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        body.extend_from_slice(&ephemeral.public_bytes());
        body.extend_from_slice(&self.public_key);

        let response = self
            .connection
            .request(
                Method::Post,
                PAIR_VERIFY,
                RequestOptions {
                    body: Some(&body),
                    content_type: Some(CONTENT_TYPE_OCTET_STREAM),
                    ..RequestOptions::default()
                },
            )
            .await?;

        if response.body.len() < lengths::X25519_PUBLIC_KEY + 8 {
            return Err(AirPlayError::Protocol {
                message: format!(
                    "verification response has length {} (expected at least {})",
                    response.body.len(),
                    lengths::X25519_PUBLIC_KEY + 8
                ),
            });
        }

        let mut receiver_key = [0u8; 32];
        receiver_key.copy_from_slice(&response.body[..32]);
        let tail = response.body[32..].to_vec();

        tracing::debug!(
            tail_len = tail.len(),
            "verification step 1 complete, received receiver ephemeral key"
        );
        self.state = VerifyState::KeysExchanged {
            ephemeral,
            receiver_key,
            tail,
            generation: response.generation,
        };
        Ok(())
    }

    /// Prove possession of the paired key and authenticate the connection.
    ///
    /// Computes the Curve25519 shared secret, signs
    /// `ephemeral_public ++ receiver_public` with the static Ed25519 key,
    /// then encrypts the 64-byte signature with AES-128-CTR after running
    /// the receiver's tail through the cipher and discarding that output.
    /// The discard advances the keystream to the position the receiver
    /// expects; sending without it produces garbage on the receiver's end.
    ///
    /// # Errors
    ///
    /// Any non-success answer is a fatal [`AirPlayError::Protocol`] (there
    /// is no PIN-style recoverable case here), as is a connection change
    /// between the two steps.
    ///
    /// On success returns the connection generation this session is bound
    /// to.
    pub async fn step2(&mut self) -> Result<u64> {
        let VerifyState::KeysExchanged { .. } = &self.state else {
            return Err(AirPlayError::InvalidState {
                expected: "KeysExchanged",
                actual: self.state.name(),
            });
        };
        let VerifyState::KeysExchanged {
            ephemeral,
            receiver_key,
            tail,
            generation,
        } = std::mem::replace(&mut self.state, VerifyState::Idle)
        else {
            unreachable!()
        };

        if self.connection.generation().await != generation {
            return Err(AirPlayError::Protocol {
                message: "connection was re-established during verification".to_string(),
            });
        }

        let shared = ephemeral.shared_secret(&receiver_key);
        let aes_key = derive_half_key(VERIFY_KEY_INFO, &shared);
        let aes_iv = derive_half_key(VERIFY_IV_INFO, &shared);

        let mut message = Vec::with_capacity(64);
        message.extend_from_slice(&ephemeral.public_bytes());
        message.extend_from_slice(&receiver_key);
        let signature = Ed25519KeyPair::from_seed(&self.private_key).sign(&message);

        let mut cipher = Aes128Ctr::new(&aes_key, &aes_iv)?;
        cipher.skip(tail.len());
        let signature_ciphertext = cipher.encrypt(&signature);

        let mut body = Vec::with_capacity(4 + signature_ciphertext.len());
        body.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        body.extend_from_slice(&signature_ciphertext);

        let response = self
            .connection
            .request(
                Method::Post,
                PAIR_VERIFY,
                RequestOptions {
                    body: Some(&body),
                    content_type: Some(CONTENT_TYPE_OCTET_STREAM),
                    ..RequestOptions::default()
                },
            )
            .await
            .map_err(|err| match err {
                TransportError::Status { status } => AirPlayError::Protocol {
                    message: format!("receiver rejected verification (status {status})"),
                },
                other => AirPlayError::Transport(other),
            })?;

        if response.generation != generation {
            return Err(AirPlayError::Protocol {
                message: "connection was re-established during verification".to_string(),
            });
        }

        tracing::info!("connection verified, command traffic is authenticated");
        self.state = VerifyState::Signed { generation };
        Ok(generation)
    }

    /// Generation of the connection this attempt authenticated, once
    /// signed.
    #[must_use]
    pub fn session_generation(&self) -> Option<u64> {
        match &self.state {
            VerifyState::Signed { generation } => Some(*generation),
            _ => None,
        }
    }
}
