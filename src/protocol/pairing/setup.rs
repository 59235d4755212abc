//! PIN pairing (pair-setup) state machine.

use std::sync::Arc;

use crate::error::{AirPlayError, Result};
use crate::protocol::crypto::{Aes128Gcm, SrpClient, SrpSession, derive_half_key, lengths};
use crate::protocol::plist::{DictBuilder, Value};
use crate::transport::{HttpConnection, Method, TransportError};
use crate::types::ClientIdentity;
use crate::validate::{self, Length};

/// Path that makes the receiver show its PIN.
const PAIR_PIN_START: &str = "pair-pin-start";
/// Path carrying all three pair-setup rounds.
const PAIR_SETUP_PIN: &str = "pair-setup-pin";

/// Key derivation info strings for the final confirmation round.
const SETUP_KEY_INFO: &str = "Pair-Setup-AES-Key";
const SETUP_IV_INFO: &str = "Pair-Setup-AES-IV";

/// Where a pairing attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// Nothing sent yet
    Idle,
    /// Receiver is showing its PIN
    Started,
    /// Receiver's SRP public key and salt are stored
    KeysReceived,
    /// SRP proof accepted, session key established
    ProofSent,
    /// Static public key delivered, trust is permanent
    Confirmed,
}

enum SetupState {
    Idle,
    Started,
    KeysReceived {
        receiver_key: Box<[u8; 256]>,
        salt: [u8; 16],
    },
    ProofSent {
        session: SrpSession,
    },
    Confirmed,
}

impl SetupState {
    fn stage(&self) -> SetupStage {
        match self {
            SetupState::Idle => SetupStage::Idle,
            SetupState::Started => SetupStage::Started,
            SetupState::KeysReceived { .. } => SetupStage::KeysReceived,
            SetupState::ProofSent { .. } => SetupStage::ProofSent,
            SetupState::Confirmed => SetupStage::Confirmed,
        }
    }

    fn name(&self) -> &'static str {
        match self.stage() {
            SetupStage::Idle => "Idle",
            SetupStage::Started => "Started",
            SetupStage::KeysReceived => "KeysReceived",
            SetupStage::ProofSent => "ProofSent",
            SetupStage::Confirmed => "Confirmed",
        }
    }
}

/// One PIN pairing attempt against one receiver.
///
/// Steps must run in order: [`start`](Self::start),
/// [`step1`](Self::step1), [`step2`](Self::step2), [`step3`](Self::step3).
/// The only supported re-entry is `step2` with a fresh PIN after the
/// receiver rejected the previous one; everything else requires a new
/// attempt from `start`.
pub struct PinPairing {
    connection: Arc<HttpConnection>,
    user: String,
    private_key: [u8; 32],
    public_key: [u8; 32],
    state: SetupState,
}

impl PinPairing {
    /// Create a pairing attempt for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Validation`] if the identity's user name is
    /// shorter than 4 characters.
    pub fn new(connection: Arc<HttpConnection>, identity: &ClientIdentity) -> Result<Self> {
        validate::assert_string(identity.user(), "user", Length::AtLeast(4))?;

        Ok(Self {
            connection,
            user: identity.user().to_string(),
            private_key: *identity.private_key(),
            public_key: *identity.public_key(),
            state: SetupState::Idle,
        })
    }

    /// Current stage of the attempt.
    #[must_use]
    pub fn stage(&self) -> SetupStage {
        self.state.stage()
    }

    fn expect_stage(&self, expected: SetupStage, name: &'static str) -> Result<()> {
        if self.state.stage() == expected {
            Ok(())
        } else {
            Err(AirPlayError::InvalidState {
                expected: name,
                actual: self.state.name(),
            })
        }
    }

    /// Ask the receiver to display its PIN.
    ///
    /// Sends an empty dictionary to `pair-pin-start`; the response carries
    /// no payload.
    ///
    /// # Errors
    ///
    /// Transport failures, or [`AirPlayError::InvalidState`] when not
    /// `Idle`.
    pub async fn start(&mut self) -> Result<()> {
        self.expect_stage(SetupStage::Idle, "Idle")?;

        self.connection
            .plist_request(
                Method::Post,
                PAIR_PIN_START,
                &[],
                Some(&Value::empty_dictionary()),
            )
            .await?;

        tracing::info!("pairing started, receiver is showing its PIN");
        self.state = SetupState::Started;
        Ok(())
    }

    /// Announce the user and fetch the receiver's SRP public key and salt.
    ///
    /// # Errors
    ///
    /// [`AirPlayError::Protocol`] when the response is missing the key or
    /// salt or their lengths are off (256 and 16 bytes; anything else is
    /// rejected rather than truncated or padded).
    pub async fn step1(&mut self) -> Result<()> {
        self.expect_stage(SetupStage::Started, "Started")?;

        let params = DictBuilder::new()
            .insert("user", self.user.as_str())
            .insert("method", "pin")
            .build();
        let response = self
            .connection
            .plist_request(Method::Post, PAIR_SETUP_PIN, &[], Some(&params))
            .await?;

        let pk = response
            .get("pk")
            .and_then(Value::as_bytes)
            .ok_or_else(|| AirPlayError::Protocol {
                message: "pairing response is missing pk".to_string(),
            })?;
        if pk.len() != lengths::SRP_PUBLIC_KEY {
            return Err(AirPlayError::Protocol {
                message: format!(
                    "receiver public key has length {} (expected {})",
                    pk.len(),
                    lengths::SRP_PUBLIC_KEY
                ),
            });
        }

        let salt = response
            .get("salt")
            .and_then(Value::as_bytes)
            .ok_or_else(|| AirPlayError::Protocol {
                message: "pairing response is missing salt".to_string(),
            })?;
        if salt.len() != lengths::SRP_SALT {
            return Err(AirPlayError::Protocol {
                message: format!(
                    "salt has length {} (expected {})",
                    salt.len(),
                    lengths::SRP_SALT
                ),
            });
        }

        let mut receiver_key = Box::new([0u8; 256]);
        receiver_key.copy_from_slice(pk);
        let mut salt_bytes = [0u8; 16];
        salt_bytes.copy_from_slice(salt);

        tracing::debug!("pairing step 1 complete, received receiver key and salt");
        self.state = SetupState::KeysReceived {
            receiver_key,
            salt: salt_bytes,
        };
        Ok(())
    }

    /// Prove knowledge of the on-screen PIN via SRP.
    ///
    /// The SRP client reuses the 32-byte static private key as its
    /// ephemeral secret; the receiver depends on that exact construction.
    ///
    /// # Errors
    ///
    /// An HTTP error status from the receiver here specifically means the
    /// PIN was wrong and maps to [`AirPlayError::InvalidPin`]; the stored
    /// step-1 state stays valid so this step can be retried with a new
    /// PIN. Any other transport failure propagates unchanged.
    pub async fn step2(&mut self, pin: &str) -> Result<()> {
        validate::assert_string(pin, "pin", Length::Exactly(4))?;

        let SetupState::KeysReceived { receiver_key, salt } = &self.state else {
            return Err(AirPlayError::InvalidState {
                expected: "KeysReceived",
                actual: self.state.name(),
            });
        };

        let srp = SrpClient::new(&self.private_key)?;
        let session = srp.process_challenge(
            self.user.as_bytes(),
            pin.as_bytes(),
            salt,
            receiver_key.as_slice(),
        )?;

        let params = DictBuilder::new()
            .insert("pk", srp.public_key())
            .insert("proof", session.proof())
            .build();

        match self
            .connection
            .plist_request(Method::Post, PAIR_SETUP_PIN, &[], Some(&params))
            .await
        {
            Ok(_) => {}
            Err(AirPlayError::Transport(TransportError::Status { status })) => {
                tracing::info!(status, "receiver rejected SRP proof, PIN was wrong");
                return Err(AirPlayError::InvalidPin { status });
            }
            Err(err) => return Err(err),
        }

        tracing::debug!("pairing step 2 complete, SRP proof accepted");
        self.state = SetupState::ProofSent { session };
        Ok(())
    }

    /// Deliver the static public key encrypted under the SRP session key.
    ///
    /// The AES key and IV are SHA-512 derivations truncated to 16 bytes,
    /// and the IV's last byte is incremented once before use; the receiver
    /// performs the same adjustment.
    ///
    /// # Errors
    ///
    /// Transport failures, or [`AirPlayError::InvalidState`] when the SRP
    /// exchange has not completed.
    pub async fn step3(&mut self) -> Result<()> {
        let SetupState::ProofSent { session } = &self.state else {
            return Err(AirPlayError::InvalidState {
                expected: "ProofSent",
                actual: self.state.name(),
            });
        };

        let aes_key = derive_half_key(SETUP_KEY_INFO, session.session_key());
        let mut aes_iv = derive_half_key(SETUP_IV_INFO, session.session_key());
        aes_iv[15] = aes_iv[15].wrapping_add(1);

        let cipher = Aes128Gcm::new(&aes_key)?;
        let (epk, tag) = cipher.seal(&aes_iv, &self.public_key)?;

        let params = DictBuilder::new()
            .insert("epk", epk)
            .insert("authTag", tag.to_vec())
            .build();
        self.connection
            .plist_request(Method::Post, PAIR_SETUP_PIN, &[], Some(&params))
            .await?;

        tracing::info!("pairing confirmed, receiver stored our public key");
        self.state = SetupState::Confirmed;
        Ok(())
    }
}
