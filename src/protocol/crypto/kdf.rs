use sha2::{Digest, Sha512};

/// Derive a 16-byte key or IV: SHA-512 over a fixed info string followed by
/// the shared secret, truncated to the first 16 bytes.
///
/// Both handshakes derive their AES key and IV this way, only the info
/// strings differ. Pairing additionally increments the final IV byte; that
/// adjustment belongs to the pairing step, not the derivation.
#[must_use]
pub fn derive_half_key(info: &str, secret: &[u8]) -> [u8; 16] {
    let mut hasher = Sha512::new();
    hasher.update(info.as_bytes());
    hasher.update(secret);
    let digest = hasher.finalize();

    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}
