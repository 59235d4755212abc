//! Cryptographic primitives for `AirPlay` pairing and verification.
//!
//! Thin wrappers over vetted crates; nothing here reimplements a
//! primitive. The SRP arithmetic is spelled out because the handshake
//! deviates from stock SRP libraries (SHA-1 with the 2048-bit group and a
//! caller-supplied ephemeral secret).

mod aes;
mod ed25519;
mod error;
mod kdf;
mod srp;
#[cfg(test)]
mod tests;
mod x25519;

pub use self::aes::{Aes128Ctr, Aes128Gcm};
pub use self::ed25519::Ed25519KeyPair;
pub use self::error::CryptoError;
pub use self::kdf::derive_half_key;
pub use self::srp::{SrpClient, SrpSession};
pub use self::x25519::X25519KeyPair;

/// Length of various protocol values
pub mod lengths {
    /// Ed25519 public key length
    pub const ED25519_PUBLIC_KEY: usize = 32;
    /// Ed25519 seed / private key length
    pub const ED25519_SEED: usize = 32;
    /// Detached Ed25519 signature length
    pub const ED25519_SIGNATURE: usize = 64;
    /// X25519 public key length
    pub const X25519_PUBLIC_KEY: usize = 32;
    /// SRP public value length for the 2048-bit group
    pub const SRP_PUBLIC_KEY: usize = 256;
    /// SRP salt length the receiver sends
    pub const SRP_SALT: usize = 16;
    /// AES-128 key length
    pub const AES_128_KEY: usize = 16;
    /// AES IV length used by both handshakes
    pub const AES_IV: usize = 16;
    /// GCM authentication tag length
    pub const GCM_TAG: usize = 16;
}
