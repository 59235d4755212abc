use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::protocol::crypto::Ed25519KeyPair;
use crate::validate::{self, Length, ValidationError};

/// Long-lived client identity: a user name and a static Ed25519 key pair.
///
/// Pairing registers the public key with the receiver; verification proves
/// possession of the private key on every subsequent connection. Lose the
/// key pair and the receiver must be re-paired, so persist it across runs
/// via [`StoredIdentity`].
///
/// The same 32-byte private key doubles as the Curve25519 seed and the SRP
/// ephemeral secret during the handshakes; that reuse is part of the wire
/// protocol.
#[derive(Clone)]
pub struct ClientIdentity {
    user: String,
    private_key: [u8; 32],
    public_key: [u8; 32],
}

impl ClientIdentity {
    /// Generate a fresh identity with a random Ed25519 key pair.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `user` is shorter than 4 characters.
    pub fn generate(user: impl Into<String>) -> Result<Self, ValidationError> {
        let keypair = Ed25519KeyPair::generate();
        Self::from_keys(user, &keypair.seed_bytes(), &keypair.public_bytes())
    }

    /// Build an identity from stored key material.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `user` is shorter than 4 characters or
    /// either key is not exactly 32 bytes.
    pub fn from_keys(
        user: impl Into<String>,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<Self, ValidationError> {
        let user = user.into();
        validate::assert_string(&user, "user", Length::AtLeast(4))?;
        validate::assert_buffer(private_key, "private_key", Length::Exactly(32))?;
        validate::assert_buffer(public_key, "public_key", Length::Exactly(32))?;

        let mut identity = Self {
            user,
            private_key: [0u8; 32],
            public_key: [0u8; 32],
        };
        identity.private_key.copy_from_slice(private_key);
        identity.public_key.copy_from_slice(public_key);
        Ok(identity)
    }

    /// User name presented to the receiver during pairing.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The 32-byte Ed25519 seed.
    #[must_use]
    pub fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// The 32-byte Ed25519 public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Serializable form for the caller's credential store.
    #[must_use]
    pub fn to_stored(&self) -> StoredIdentity {
        StoredIdentity {
            user: self.user.clone(),
            private_key: BASE64.encode(self.private_key),
            public_key: BASE64.encode(self.public_key),
        }
    }

    /// Rebuild an identity from its stored form, re-validating lengths.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] on corrupt base64 or wrong-length keys.
    pub fn from_stored(stored: &StoredIdentity) -> Result<Self, ValidationError> {
        let mut private_key = BASE64
            .decode(&stored.private_key)
            .map_err(|_| ValidationError::Encoding { name: "private_key" })?;
        let public_key = BASE64
            .decode(&stored.public_key)
            .map_err(|_| ValidationError::Encoding { name: "public_key" })?;

        let identity = Self::from_keys(stored.user.clone(), &private_key, &public_key);
        private_key.zeroize();
        identity
    }
}

impl Drop for ClientIdentity {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Private key stays out of logs.
        f.debug_struct("ClientIdentity")
            .field("user", &self.user)
            .field("public_key", &BASE64.encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Identity fields encoded as base64 strings, ready for whatever store the
/// caller uses. The core only ever sees the decoded byte buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// User name
    pub user: String,
    /// Base64 of the 32-byte private key
    pub private_key: String,
    /// Base64 of the 32-byte public key
    pub public_key: String,
}
