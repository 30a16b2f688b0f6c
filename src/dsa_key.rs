//! DSA keys.
//!
//! [`DsaPrivKey`] signs SHA-1 message digests with deterministic (RFC 6979) nonces, and
//! [`DsaPubKey`] verifies them. The key hash is computed over the domain parameters and the public
//! value `y`, so both halves share it.
//!
//! # Format
//!
//! A DSA signature is the pair `(r, s)`, both smaller than the subgroup order `q`. Each is written
//! big-endian and left-padded with zeros to the byte length of `q`, then concatenated. This keeps
//! the trailer a fixed width: 64 bytes for 256-bit `q`, 40 bytes for 160-bit `q`.

use crate::{
    error::CryptoError,
    hash::{pad_integer, KeyHash, KeyHasher},
};

use dsa::{BigUint, Components, KeySize, Signature, SigningKey, VerifyingKey};
use rand_core::{CryptoRng, RngCore};
use sha1::{Digest, Sha1};
use signature::{DigestSigner, DigestVerifier};

use std::fmt;

/// Default size of the prime modulus `p`, in bits.
pub const DEFAULT_DSA_KEY_BITS: usize = 2048;

/// Sizes of `p` accepted for generation.
pub const DSA_KEY_BITS: &[usize] = &[1024, 2048, 3072];

#[allow(deprecated)]
fn key_size(bits: usize) -> Result<KeySize, CryptoError> {
    match bits {
        1024 => Ok(KeySize::DSA_1024_160),
        2048 => Ok(KeySize::DSA_2048_256),
        3072 => Ok(KeySize::DSA_3072_256),
        _ => Err(CryptoError::UnsupportedKeySize {
            key_type: "DSA",
            size: bits,
        }),
    }
}

/// A DSA public key.
#[derive(Clone)]
pub struct DsaPubKey {
    key: VerifyingKey,
    hash: KeyHash,
    q_len: usize,
}

impl DsaPubKey {
    /// Load from big-endian domain parameters `p`, `q`, `g` and the public value `y`.
    pub fn from_components(p: &[u8], q: &[u8], g: &[u8], y: &[u8]) -> Result<Self, CryptoError> {
        let components = Components::from_components(
            BigUint::from_bytes_be(p),
            BigUint::from_bytes_be(q),
            BigUint::from_bytes_be(g),
        )
        .or(Err(CryptoError::BadKey))?;
        let key = VerifyingKey::from_components(components, BigUint::from_bytes_be(y))
            .or(Err(CryptoError::BadKey))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: VerifyingKey) -> Self {
        let components = key.components();
        let mut hasher = KeyHasher::new();
        hasher.update_integer(&components.p().to_bytes_be());
        hasher.update_integer(&components.q().to_bytes_be());
        hasher.update_integer(&components.g().to_bytes_be());
        hasher.update_integer(&key.y().to_bytes_be());
        let q_len = components.q().to_bytes_be().len();
        Self {
            hash: hasher.finalize(),
            key,
            q_len,
        }
    }

    pub fn hash(&self) -> KeyHash {
        self.hash
    }

    /// Size of `p`, in bits.
    pub fn bits(&self) -> usize {
        self.key.components().p().to_bytes_be().len() * 8
    }

    /// Length of a signature trailer.
    pub fn signature_size(&self) -> usize {
        2 * self.q_len
    }

    /// Domain parameters `p`, `q`, `g` followed by `y`, big-endian.
    pub(crate) fn public_components(&self) -> [Vec<u8>; 4] {
        let components = self.key.components();
        [
            components.p().to_bytes_be(),
            components.q().to_bytes_be(),
            components.g().to_bytes_be(),
            self.key.y().to_bytes_be(),
        ]
    }

    pub fn verify_stream(&self) -> DsaVerifyStream<'_> {
        DsaVerifyStream {
            key: &self.key,
            digest: Sha1::new(),
            q_len: self.q_len,
        }
    }
}

impl fmt::Debug for DsaPubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DsaPubKey")
            .field("bits", &self.bits())
            .field("hash", &self.hash)
            .finish()
    }
}

/// A DSA private key, along with its public half.
#[derive(Clone)]
pub struct DsaPrivKey {
    key: SigningKey,
    public: DsaPubKey,
}

impl DsaPrivKey {
    /// Generate fresh domain parameters of the given size, then a key pair within them.
    pub fn generate<R>(csprng: &mut R, bits: usize) -> Result<Self, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        let size = key_size(bits)?;
        let components = Components::generate(csprng, size);
        let key = SigningKey::generate(csprng, components);
        Ok(Self::from_key(key))
    }

    /// Load from big-endian domain parameters, public value `y`, and private value `x`.
    pub fn from_components(
        p: &[u8],
        q: &[u8],
        g: &[u8],
        y: &[u8],
        x: &[u8],
    ) -> Result<Self, CryptoError> {
        let public = DsaPubKey::from_components(p, q, g, y)?;
        let key = SigningKey::from_components(public.key.clone(), BigUint::from_bytes_be(x))
            .or(Err(CryptoError::BadKey))?;
        Ok(Self { key, public })
    }

    fn from_key(key: SigningKey) -> Self {
        let public = DsaPubKey::from_key(key.verifying_key().clone());
        Self { key, public }
    }

    pub fn hash(&self) -> KeyHash {
        self.public.hash
    }

    pub fn public_key(&self) -> &DsaPubKey {
        &self.public
    }

    /// The private value `x`, big-endian. The caller is responsible for wiping it.
    pub(crate) fn private_component(&self) -> Vec<u8> {
        self.key.x().to_bytes_be()
    }

    pub fn sign_stream(&self) -> DsaSignStream<'_> {
        DsaSignStream {
            key: &self.key,
            digest: Sha1::new(),
            q_len: self.public.q_len,
        }
    }
}

impl fmt::Debug for DsaPrivKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DsaPrivKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A single-use DSA signature.
pub struct DsaSignStream<'a> {
    key: &'a SigningKey,
    digest: Sha1,
    q_len: usize,
}

impl<'a> DsaSignStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn sign(self) -> Result<Vec<u8>, CryptoError> {
        let sig: Signature = self
            .key
            .try_sign_digest(self.digest)
            .or(Err(CryptoError::CryptoOperationFailed("DSA signing")))?;
        let mut out = pad_integer(&sig.r().to_bytes_be(), self.q_len)?;
        out.extend(pad_integer(&sig.s().to_bytes_be(), self.q_len)?);
        Ok(out)
    }
}

/// A single-use DSA signature check.
pub struct DsaVerifyStream<'a> {
    key: &'a VerifyingKey,
    digest: Sha1,
    q_len: usize,
}

impl<'a> DsaVerifyStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn verify(self, trailer: &[u8]) -> bool {
        if trailer.len() != 2 * self.q_len {
            return false;
        }
        let (r, s) = trailer.split_at(self.q_len);
        let Ok(sig) = Signature::from_components(BigUint::from_bytes_be(r), BigUint::from_bytes_be(s))
        else {
            return false;
        };
        self.key.verify_digest(self.digest, &sig).is_ok()
    }
}
