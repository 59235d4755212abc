use x25519_dalek::{PublicKey, StaticSecret};

/// Curve25519 key pair for the verification key exchange.
///
/// Derived deterministically from the client's 32-byte static private key;
/// the receiver expects the same public value every session.
pub struct X25519KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl X25519KeyPair {
    /// Derive a key pair from a 32-byte seed (RFC 7748 clamping applies
    /// during multiplication, matching NaCl's `scalarMult`).
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*seed);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public key bytes sent in verification step 1.
    #[must_use]
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// X25519 shared secret with the receiver's ephemeral public key.
    #[must_use]
    pub fn shared_secret(&self, peer_public: &[u8; 32]) -> [u8; 32] {
        let peer = PublicKey::from(*peer_public);
        *self.secret.diffie_hellman(&peer).as_bytes()
    }
}
