use num_bigint::BigUint;
use num_traits::Zero;
use sha1::{Digest, Sha1};
use zeroize::Zeroize;

use super::CryptoError;

/// SRP-6a client matching the receiver's legacy pairing parameters:
/// RFC 5054 2048-bit group, generator 2, SHA-1 throughout.
///
/// Stock SRP crates draw a fresh random ephemeral; this handshake instead
/// feeds the client's 32-byte static private key in as the ephemeral
/// secret, so the secret is a constructor argument. A/B/S are padded to
/// the 256-byte group size wherever they are hashed.
pub struct SrpClient {
    n: BigUint,
    g: BigUint,
    k: BigUint,
    a: BigUint,
    public_key: Vec<u8>,
}

/// Group size in bytes (2048 bits).
const N_BYTES: usize = 256;

/// RFC 5054, Appendix A, 2048-bit group prime.
const N_HEX: &[u8] = b"AC6BDB41324A9A9BF166DE5E1389582FAF72B665\
                       1987EE07FC3192943DB56050A37329CBB4A099ED\
                       8193E0757767A13DD52312AB4B03310DCD7F48A9\
                       DA04FD50E8083969EDB767B0CF6095179A163AB3\
                       661A05FBD5FAAAE82918A9962F0B93B855F97993\
                       EC975EEAA80D740ADBF4FF747359D041D5C33EA7\
                       1D281E446B14773BCA97B43A23FB801676BD207A\
                       436C6481F1D2B9078717461A5B9D32E688F87748\
                       544523B524B0D57D5EA77A2775D2ECFA032CFBDB\
                       F52FB3786160279004E57AE6AF874E7303CE5329\
                       9CCC041C7BC308D82A5698F3A8D0C38271AE35F8\
                       E9DBFBB694B5C803D89F7AE435DE236D525F5475\
                       9B65E372FCD68EF20FA7111F9E4AFF73";

impl SrpClient {
    /// Build a client around the caller-supplied ephemeral secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] if the group constant fails to
    /// parse or the secret is empty.
    pub fn new(ephemeral_secret: &[u8]) -> Result<Self, CryptoError> {
        if ephemeral_secret.is_empty() {
            return Err(CryptoError::SrpError("empty ephemeral secret".to_string()));
        }

        let n = BigUint::parse_bytes(N_HEX, 16)
            .ok_or_else(|| CryptoError::SrpError("failed to parse N".to_string()))?;
        let g = BigUint::from(2u32);

        // k = H(N | PAD(g))
        let k = {
            let mut hasher = Sha1::new();
            hasher.update(n.to_bytes_be());
            hasher.update(pad_to_group(&g));
            BigUint::from_bytes_be(&hasher.finalize())
        };

        let a = BigUint::from_bytes_be(ephemeral_secret);
        let a_pub = g.modpow(&a, &n);
        let public_key = pad_to_group(&a_pub);

        Ok(Self {
            n,
            g,
            k,
            a,
            public_key,
        })
    }

    /// Client public value A, padded to the group size (256 bytes).
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Run the password side of the exchange against the receiver's salt
    /// and public value B, producing the proof M1 and the session key K.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SrpError`] when B is a multiple of N (a
    /// degenerate value that would leak the verifier).
    pub fn process_challenge(
        &self,
        username: &[u8],
        password: &[u8],
        salt: &[u8],
        server_public: &[u8],
    ) -> Result<SrpSession, CryptoError> {
        if server_public.len() != N_BYTES {
            return Err(CryptoError::SrpError(format!(
                "server public key must be {N_BYTES} bytes, got {}",
                server_public.len()
            )));
        }

        let b_pub = BigUint::from_bytes_be(server_public);
        if (&b_pub % &self.n).is_zero() {
            return Err(CryptoError::SrpError(
                "invalid server public key".to_string(),
            ));
        }

        // u = H(PAD(A) | PAD(B))
        let u = {
            let mut hasher = Sha1::new();
            hasher.update(&self.public_key);
            hasher.update(pad_to_group(&b_pub));
            BigUint::from_bytes_be(&hasher.finalize())
        };

        // x = H(salt | H(username ":" password))
        let x = {
            let mut inner = Sha1::new();
            inner.update(username);
            inner.update(b":");
            inner.update(password);
            let identity_hash = inner.finalize();

            let mut outer = Sha1::new();
            outer.update(salt);
            outer.update(identity_hash);
            BigUint::from_bytes_be(&outer.finalize())
        };

        // S = (B - k * g^x) ^ (a + u * x) mod N
        // BigUint has no negative values, so lift B into range first.
        let g_x = self.g.modpow(&x, &self.n);
        let k_g_x = (&self.k * &g_x) % &self.n;
        let base = if b_pub >= k_g_x {
            (&b_pub - &k_g_x) % &self.n
        } else {
            (&self.n - (&k_g_x - &b_pub) % &self.n) % &self.n
        };
        let exponent = &self.a + &u * &x;
        let s_shared = base.modpow(&exponent, &self.n);
        let s_padded = pad_to_group(&s_shared);

        // K = H(PAD(S))
        let key = Sha1::digest(&s_padded).to_vec();

        // M1 = H((H(N) xor H(g)) | H(username) | salt | PAD(A) | B | K)
        let proof = {
            let h_n = Sha1::digest(self.n.to_bytes_be());
            let h_g = Sha1::digest(self.g.to_bytes_be());
            let mut n_xor_g = [0u8; 20];
            for (out, (a, b)) in n_xor_g.iter_mut().zip(h_n.iter().zip(h_g.iter())) {
                *out = a ^ b;
            }

            let mut hasher = Sha1::new();
            hasher.update(n_xor_g);
            hasher.update(Sha1::digest(username));
            hasher.update(salt);
            hasher.update(&self.public_key);
            hasher.update(server_public);
            hasher.update(&key);
            hasher.finalize().to_vec()
        };

        Ok(SrpSession { proof, key })
    }
}

/// Completed SRP exchange: the proof to send and the shared session key.
pub struct SrpSession {
    proof: Vec<u8>,
    key: Vec<u8>,
}

impl SrpSession {
    /// Proof M1 sent to the receiver as `proof`.
    #[must_use]
    pub fn proof(&self) -> &[u8] {
        &self.proof
    }

    /// Session key K, input to the pairing key derivation.
    #[must_use]
    pub fn session_key(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for SrpSession {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Big-endian bytes left-padded with zeros to the 256-byte group size.
fn pad_to_group(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut padded = vec![0u8; N_BYTES];
    padded[N_BYTES - bytes.len()..].copy_from_slice(&bytes);
    padded
}
