//! HMAC-SHA1 keys.
//!
//! An [`HmacKey`] signs and verifies with HMAC-SHA1, producing a 20-byte trailer. The same key
//! type is embedded in every [`AesKey`](crate::aes_key::AesKey) as its integrity key.

use crate::{
    error::CryptoError,
    hash::{KeyHash, KeyHasher},
};

use hmac::{Hmac, Mac};
use rand_core::{CryptoRng, RngCore};
use sha1::Sha1;
use zeroize::Zeroize;

use std::fmt;

/// Length of an HMAC-SHA1 trailer.
pub const HMAC_DIGEST_SIZE: usize = 20;

/// Default HMAC key size, in bits.
pub const DEFAULT_HMAC_KEY_BITS: usize = 256;

/// Smallest key we'll accept when decoding, in bytes. Anything shorter than the digest is weak.
const MIN_HMAC_KEY_SIZE: usize = HMAC_DIGEST_SIZE;

type HmacSha1 = Hmac<Sha1>;

/// A symmetric signing key.
#[derive(Clone)]
pub struct HmacKey {
    key: Vec<u8>,
    hash: KeyHash,
}

impl HmacKey {
    /// Generate a new key of `bits` length.
    pub fn generate<R>(csprng: &mut R, bits: usize) -> Result<Self, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        if bits % 8 != 0 || bits / 8 < MIN_HMAC_KEY_SIZE {
            return Err(CryptoError::UnsupportedKeySize {
                key_type: "HMAC-SHA1",
                size: bits,
            });
        }
        let mut key = vec![0u8; bits / 8];
        csprng.fill_bytes(&mut key);
        Ok(Self::from_vec(key))
    }

    /// Load a key from its raw bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        if raw.len() < MIN_HMAC_KEY_SIZE {
            return Err(CryptoError::BadLength {
                step: "get HMAC key",
                expected: MIN_HMAC_KEY_SIZE,
                actual: raw.len(),
            });
        }
        Ok(Self::from_vec(raw.to_vec()))
    }

    fn from_vec(key: Vec<u8>) -> Self {
        let mut hasher = KeyHasher::new();
        hasher.update_field(&key);
        Self {
            hash: hasher.finalize(),
            key,
        }
    }

    pub fn hash(&self) -> KeyHash {
        self.hash
    }

    /// Key size, in bits.
    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }

    pub(crate) fn raw(&self) -> &[u8] {
        &self.key
    }

    /// Start a new signing or verifying stream. HMAC uses the same state for both.
    pub fn stream(&self) -> Result<HmacStream, CryptoError> {
        let mac = HmacSha1::new_from_slice(&self.key)
            .or(Err(CryptoError::AlgorithmUnavailable("HMAC-SHA1")))?;
        Ok(HmacStream { mac })
    }
}

impl Drop for HmacKey {
    fn drop(&mut self) {
        self.key.zeroize();
        debug_assert!(self.key.iter().all(|b| *b == 0));
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("bits", &self.bits())
            .field("hash", &self.hash)
            .finish()
    }
}

/// A single-use HMAC computation.
pub struct HmacStream {
    mac: HmacSha1,
}

impl HmacStream {
    pub fn update(&mut self, data: &[u8]) {
        self.mac.update(data);
    }

    /// Produce the 20-byte trailer.
    pub fn sign(self) -> Vec<u8> {
        self.mac.finalize().into_bytes().to_vec()
    }

    /// Check a trailer in constant time.
    pub fn verify(self, trailer: &[u8]) -> bool {
        self.mac.verify_slice(trailer).is_ok()
    }
}

impl fmt::Debug for HmacStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HmacStream").finish_non_exhaustive()
    }
}
