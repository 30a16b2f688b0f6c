//! RSA keys.
//!
//! [`RsaPrivKey`] signs with PKCS#1 v1.5 over SHA-1 and decrypts RSA-OAEP (SHA-1). Its public half,
//! [`RsaPubKey`], verifies and encrypts. Both share the same key hash, computed from the modulus
//! and public exponent, so a signature made by the private key names a key that a public-only key
//! set can find.
//!
//! Signatures are exactly as long as the modulus. Ciphertexts are also exactly as long as the
//! modulus and carry no integrity trailer of their own.

use crate::{
    error::CryptoError,
    hash::{KeyHash, KeyHasher},
    CryptoSrc,
};

use rand_core::{CryptoRng, RngCore};
use rsa::{
    traits::{PrivateKeyParts, PublicKeyParts},
    BigUint, Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey,
};
use sha1::{Digest, Sha1};
use zeroize::Zeroize;

use std::fmt;

/// Default modulus size, in bits.
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

/// Modulus sizes accepted for generation.
pub const RSA_KEY_BITS: &[usize] = &[1024, 2048, 4096];

/// OAEP overhead with SHA-1: two digests plus two bytes.
const OAEP_SHA1_OVERHEAD: usize = 2 * 20 + 2;

fn rsa_failed(_: rsa::Error) -> CryptoError {
    CryptoError::CryptoOperationFailed("RSA")
}

/// An RSA public key.
#[derive(Clone)]
pub struct RsaPubKey {
    key: RsaPublicKey,
    hash: KeyHash,
}

impl RsaPubKey {
    /// Load from the big-endian modulus and public exponent.
    pub fn from_components(n: &[u8], e: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .or(Err(CryptoError::BadKey))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: RsaPublicKey) -> Self {
        let mut hasher = KeyHasher::new();
        hasher.update_integer(&key.n().to_bytes_be());
        hasher.update_integer(&key.e().to_bytes_be());
        Self {
            hash: hasher.finalize(),
            key,
        }
    }

    pub fn hash(&self) -> KeyHash {
        self.hash
    }

    /// Modulus size, in bits.
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    /// Length of signatures and ciphertexts, in bytes.
    pub fn output_size(&self) -> usize {
        self.key.size()
    }

    /// Largest plaintext that fits in a single OAEP block.
    pub fn max_plaintext_size(&self) -> usize {
        self.key.size().saturating_sub(OAEP_SHA1_OVERHEAD)
    }

    pub(crate) fn modulus(&self) -> Vec<u8> {
        self.key.n().to_bytes_be()
    }

    pub(crate) fn exponent(&self) -> Vec<u8> {
        self.key.e().to_bytes_be()
    }

    pub fn verify_stream(&self) -> RsaVerifyStream<'_> {
        RsaVerifyStream {
            key: &self.key,
            digest: Sha1::new(),
        }
    }

    /// Start an encryption stream. The whole plaintext is buffered and encrypted in one OAEP
    /// block when the stream finishes, which is when the random source gets used.
    pub fn encrypt_stream<'a>(&'a self, csprng: &'a mut dyn CryptoSrc) -> RsaEncryptStream<'a> {
        RsaEncryptStream {
            key: &self.key,
            csprng,
            buffer: Vec::new(),
        }
    }
}

impl fmt::Debug for RsaPubKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RsaPubKey")
            .field("bits", &self.bits())
            .field("hash", &self.hash)
            .finish()
    }
}

/// An RSA private key, along with its public half.
#[derive(Clone)]
pub struct RsaPrivKey {
    key: RsaPrivateKey,
    public: RsaPubKey,
}

impl RsaPrivKey {
    /// Generate a new key with a `bits`-sized modulus.
    pub fn generate<R>(csprng: &mut R, bits: usize) -> Result<Self, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        if !RSA_KEY_BITS.contains(&bits) {
            return Err(CryptoError::UnsupportedKeySize {
                key_type: "RSA",
                size: bits,
            });
        }
        let key = RsaPrivateKey::new(csprng, bits)
            .or(Err(CryptoError::AlgorithmUnavailable("RSA key generation")))?;
        Ok(Self::from_key(key))
    }

    /// Load from big-endian components: modulus, public exponent, private exponent, and the two
    /// prime factors.
    pub fn from_components(
        n: &[u8],
        e: &[u8],
        d: &[u8],
        p: &[u8],
        q: &[u8],
    ) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_components(
            BigUint::from_bytes_be(n),
            BigUint::from_bytes_be(e),
            BigUint::from_bytes_be(d),
            vec![BigUint::from_bytes_be(p), BigUint::from_bytes_be(q)],
        )
        .or(Err(CryptoError::BadKey))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: RsaPrivateKey) -> Self {
        let public = RsaPubKey::from_key(key.to_public_key());
        Self { key, public }
    }

    pub fn hash(&self) -> KeyHash {
        self.public.hash
    }

    pub fn public_key(&self) -> &RsaPubKey {
        &self.public
    }

    /// The private exponent followed by the two primes, big-endian. The caller is responsible for
    /// wiping them.
    pub(crate) fn private_components(&self) -> Vec<Vec<u8>> {
        let mut fields = vec![self.key.d().to_bytes_be()];
        for prime in self.key.primes().iter().take(2) {
            fields.push(prime.to_bytes_be());
        }
        fields
    }

    pub fn sign_stream(&self) -> RsaSignStream<'_> {
        RsaSignStream {
            key: &self.key,
            digest: Sha1::new(),
        }
    }

    pub fn decrypt_stream(&self) -> RsaDecryptStream<'_> {
        RsaDecryptStream {
            key: &self.key,
            buffer: Vec::new(),
        }
    }
}

impl fmt::Debug for RsaPrivKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RsaPrivKey")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A single-use PKCS#1 v1.5 signature.
pub struct RsaSignStream<'a> {
    key: &'a RsaPrivateKey,
    digest: Sha1,
}

impl<'a> RsaSignStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn sign(self) -> Result<Vec<u8>, CryptoError> {
        let hashed = self.digest.finalize();
        self.key
            .sign(Pkcs1v15Sign::new::<Sha1>(), &hashed)
            .map_err(rsa_failed)
    }
}

/// A single-use PKCS#1 v1.5 signature check.
pub struct RsaVerifyStream<'a> {
    key: &'a RsaPublicKey,
    digest: Sha1,
}

impl<'a> RsaVerifyStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    pub fn verify(self, trailer: &[u8]) -> bool {
        let hashed = self.digest.finalize();
        self.key
            .verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, trailer)
            .is_ok()
    }
}

/// A single-use RSA-OAEP encryption.
pub struct RsaEncryptStream<'a> {
    key: &'a RsaPublicKey,
    csprng: &'a mut dyn CryptoSrc,
    buffer: Vec<u8>,
}

impl<'a> RsaEncryptStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn finish(mut self) -> Result<Vec<u8>, CryptoError> {
        if self.buffer.len() > self.key.size().saturating_sub(OAEP_SHA1_OVERHEAD) {
            self.buffer.zeroize();
            return Err(CryptoError::CryptoOperationFailed(
                "message too long for RSA-OAEP",
            ));
        }
        let mut rng = &mut *self.csprng;
        let out = self
            .key
            .encrypt(&mut rng, Oaep::new::<Sha1>(), &self.buffer)
            .map_err(rsa_failed);
        self.buffer.zeroize();
        out
    }
}

/// A single-use RSA-OAEP decryption.
pub struct RsaDecryptStream<'a> {
    key: &'a RsaPrivateKey,
    buffer: Vec<u8>,
}

impl<'a> RsaDecryptStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn finish(self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .decrypt(Oaep::new::<Sha1>(), &self.buffer)
            .map_err(rsa_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> RsaPrivKey {
        let mut csprng = rand::rngs::OsRng;
        RsaPrivKey::generate(&mut csprng, 1024).unwrap()
    }

    #[test]
    fn sign_and_encrypt() {
        let key = test_key();
        let public = key.public_key();
        assert_eq!(key.hash(), public.hash());
        assert_eq!(public.bits(), 1024);
        assert_eq!(public.output_size(), 128);

        let mut signer = key.sign_stream();
        signer.update(b"RSA ");
        signer.update(b"message");
        let sig = signer.sign().unwrap();
        assert_eq!(sig.len(), public.output_size());

        let mut verifier = public.verify_stream();
        verifier.update(b"RSA message");
        assert!(verifier.verify(&sig));
        let mut verifier = public.verify_stream();
        verifier.update(b"RSA massage");
        assert!(!verifier.verify(&sig));

        let mut csprng = rand::rngs::OsRng;
        let mut enc = public.encrypt_stream(&mut csprng);
        enc.update(b"secret");
        let ct = enc.finish().unwrap();
        assert_eq!(ct.len(), 128);
        let mut dec = key.decrypt_stream();
        dec.update(&ct);
        assert_eq!(dec.finish().unwrap(), b"secret");

        let mut enc = public.encrypt_stream(&mut csprng);
        enc.update(&vec![0u8; public.max_plaintext_size() + 1]);
        assert!(enc.finish().is_err());

        // Rebuild both halves from their components
        let fields = key.private_components();
        let rebuilt = RsaPrivKey::from_components(
            &public.modulus(),
            &public.exponent(),
            &fields[0],
            &fields[1],
            &fields[2],
        )
        .unwrap();
        assert_eq!(rebuilt.hash(), key.hash());
        let rebuilt_pub = RsaPubKey::from_components(&public.modulus(), &public.exponent()).unwrap();
        assert_eq!(rebuilt_pub.hash(), key.hash());
        let mut verifier = rebuilt_pub.verify_stream();
        verifier.update(b"RSA message");
        assert!(verifier.verify(&sig));
    }

    #[test]
    fn rejects_odd_sizes() {
        let mut csprng = rand::rngs::OsRng;
        if let Err(CryptoError::UnsupportedKeySize { size: 1000, .. }) =
            RsaPrivKey::generate(&mut csprng, 1000)
        {
        } else {
            panic!("1000-bit RSA keys should be rejected");
        }
    }
}
