use aes::Aes128;
use aes_gcm::aead::Aead;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::{AesGcm, KeyInit};
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

use super::{CryptoError, lengths};

type Aes128CtrImpl = ctr::Ctr128BE<Aes128>;

/// AES-128-CTR treating the whole 16-byte IV as one big-endian counter,
/// the construction the receiver runs for the verification payload.
pub struct Aes128Ctr {
    cipher: Aes128CtrImpl,
}

impl Aes128Ctr {
    /// Create a cipher with a 16-byte key and 16-byte IV.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for wrong-sized inputs.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes128CtrImpl::new_from_slices(key, iv).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: lengths::AES_128_KEY,
                actual: key.len(),
            }
        })?;
        Ok(Self { cipher })
    }

    /// Advance the keystream as if `len` bytes had been encrypted,
    /// discarding the output.
    ///
    /// The verification handshake feeds the receiver's opaque tail through
    /// the cipher purely to move the counter to where the receiver expects
    /// the signature ciphertext to start.
    pub fn skip(&mut self, len: usize) {
        let pos: u64 = self.cipher.current_pos();
        self.cipher.seek(pos + len as u64);
    }

    /// Encrypt, returning a new buffer.
    pub fn encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut output = data.to_vec();
        self.cipher.apply_keystream(&mut output);
        output
    }
}

type Aes128GcmImpl = AesGcm<Aes128, U16>;

/// AES-128-GCM with a 16-byte IV.
///
/// GCM derives the initial counter by ghashing IVs that are not 96 bits;
/// the pairing handshake depends on that derivation, so the nonce size is
/// fixed at 16 bytes here.
pub struct Aes128Gcm {
    cipher: Aes128GcmImpl,
}

impl Aes128Gcm {
    /// Create a cipher with a 16-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for wrong-sized keys.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher =
            Aes128GcmImpl::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
                expected: lengths::AES_128_KEY,
                actual: key.len(),
            })?;
        Ok(Self { cipher })
    }

    /// Encrypt with no associated data, returning the ciphertext and the
    /// 16-byte authentication tag separately (the wire format sends them
    /// as two plist fields).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if the AEAD rejects the
    /// input.
    pub fn seal(&self, iv: &[u8; 16], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 16]), CryptoError> {
        let nonce = GenericArray::from_slice(iv);
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let tag_bytes = sealed.split_off(sealed.len() - lengths::GCM_TAG);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&tag_bytes);
        Ok((sealed, tag))
    }
}
