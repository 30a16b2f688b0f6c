//! Signatures and ciphertexts.
//!
//! Every signature and ciphertext starts with a 5-byte [`Header`]: a format version byte and the
//! [`KeyHash`] of the key that produced it. The header is covered by the signature or integrity
//! trailer, so output made under one key or format version can't be passed off as another.
//!
//! ```text
//! signature  = header ‖ trailer
//! ciphertext = header ‖ prefix ‖ body ‖ trailer?
//! ```
//!
//! The ciphertext prefix is algorithm-specific (the IV for AES, nothing for RSA). The ciphertext
//! trailer is only present for keys with a non-zero
//! [`ciphertext_digest_size`](crate::key::Key::ciphertext_digest_size), and it is always checked
//! before any decryption happens.
//!
//! The front ends here borrow a [`KeySet`] and check its purpose once, on construction:
//!
//! | Front end | Accepted purposes |
//! |---|---|
//! | [`Verifier`], [`UnversionedVerifier`] | `SignAndVerify`, `Verify` |
//! | [`Signer`], [`UnversionedSigner`] | `SignAndVerify` |
//! | [`Encrypter`] | `DecryptAndEncrypt`, `Encrypt` |
//! | [`Crypter`] | `DecryptAndEncrypt` |
//!
//! Sets with the `Test` purpose are accepted by all of them.
//!
//! # Example
//!
//! ```
//! # use keyset_crypto::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut csprng = rand::rngs::OsRng;
//! let mut keyset = KeySet::generate(
//!     "example",
//!     KeyPurpose::DecryptAndEncrypt,
//!     KeyType::Aes,
//!     KeysetConfig::default(),
//! )?;
//! keyset.add_version(KeyStatus::Primary, &mut csprng)?;
//!
//! let crypter = Crypter::new(&keyset)?;
//! let ciphertext = crypter.encrypt(b"hello", &mut csprng)?;
//! assert_eq!(crypter.decrypt(&ciphertext)?, b"hello");
//!
//! // Text form, for places that can't carry raw bytes
//! let text = crypter.encrypt_encoded(b"hello", &mut csprng)?;
//! assert_eq!(crypter.decrypt_encoded(&text)?, b"hello");
//! # Ok(())
//! # }
//! ```

use crate::{
    error::CryptoError,
    hash::KeyHash,
    keyset::{KeySet, OperationClass},
    CryptoSrc, FORMAT_VERSION, HEADER_SIZE, KEY_HASH_SIZE,
};

use rand_core::{CryptoRng, RngCore};
use tracing::trace;

use std::convert::TryFrom;

/// The fixed prefix of every signature and ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    hash: KeyHash,
}

impl Header {
    pub fn new(hash: KeyHash) -> Self {
        Self { hash }
    }

    /// The hash of the key that produced the signature or ciphertext.
    pub fn hash(&self) -> &KeyHash {
        &self.hash
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = FORMAT_VERSION;
        bytes[1..].copy_from_slice(self.hash.as_bytes());
        bytes
    }

    pub fn encode_vec(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_bytes());
    }

    /// Split a header off the front of `data`. `short` is returned if there aren't enough bytes,
    /// and `BadVersion` if the version byte is wrong.
    pub fn parse(data: &[u8], short: CryptoError) -> Result<(Header, &[u8]), CryptoError> {
        if data.len() < HEADER_SIZE {
            return Err(short);
        }
        let (header, rest) = data.split_at(HEADER_SIZE);
        if header[0] != FORMAT_VERSION {
            return Err(CryptoError::BadVersion(header[0]));
        }
        let hash = KeyHash::try_from(&header[1..1 + KEY_HASH_SIZE])?;
        Ok((Header { hash }, rest))
    }
}

fn sign_with(keyset: &KeySet, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = keyset.primary_key()?;
    let header = Header::new(key.hash());
    let mut stream = key.sign_stream()?;
    let mut out = Vec::with_capacity(HEADER_SIZE + key.digest_size());
    header.encode_vec(&mut out);
    stream.update(&out);
    stream.update(message);
    out.extend_from_slice(&stream.sign()?);
    Ok(out)
}

fn verify_with(keyset: &KeySet, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
    let (header, trailer) = Header::parse(signature, CryptoError::ShortSignature)?;
    let key = keyset
        .key_by_hash(header.hash())
        .ok_or(CryptoError::KeyNotFound(header.hash))?;
    if trailer.len() < key.digest_size() {
        return Err(CryptoError::ShortSignature);
    }
    let mut stream = key.verify_stream()?;
    stream.update(&signature[..HEADER_SIZE]);
    stream.update(message);
    stream.verify(trailer)
}

fn encrypt_with(
    keyset: &KeySet,
    message: &[u8],
    csprng: &mut dyn CryptoSrc,
) -> Result<Vec<u8>, CryptoError> {
    let key = keyset.primary_key()?;
    let message = keyset.config().compression.compress(message)?;
    let header = Header::new(key.hash());
    let mut out = Vec::with_capacity(HEADER_SIZE + key.max_output_size(message.len()));
    header.encode_vec(&mut out);
    let mut stream = key.encrypt_stream(csprng)?;
    out.extend_from_slice(&stream.init());
    out.extend_from_slice(&stream.update(&message));
    out.extend_from_slice(&stream.finish()?);
    if key.ciphertext_digest_size() > 0 {
        let mut integrity = key.sign_stream()?;
        integrity.update(&out);
        out.extend_from_slice(&integrity.sign()?);
    }
    Ok(out)
}

fn decrypt_with(keyset: &KeySet, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (header, rest) = Header::parse(ciphertext, CryptoError::ShortCiphertext)?;
    let key = keyset
        .key_by_hash(header.hash())
        .ok_or(CryptoError::KeyNotFound(header.hash))?;

    let trailer_len = key.ciphertext_digest_size();
    let body = if trailer_len > 0 {
        if rest.len() < trailer_len {
            return Err(CryptoError::ShortCiphertext);
        }
        let (signed, trailer) = ciphertext.split_at(ciphertext.len() - trailer_len);
        let mut integrity = key.verify_stream()?;
        integrity.update(signed);
        if !integrity.verify(trailer)? {
            return Err(CryptoError::InvalidSignature);
        }
        &signed[HEADER_SIZE..]
    } else {
        rest
    };

    let mut stream = key.decrypt_stream()?;
    let mut plaintext = stream.update(body)?;
    plaintext.extend_from_slice(&stream.finish()?);
    keyset.config().compression.decompress(plaintext)
}

/// Verifies signatures made by a [`Signer`].
#[derive(Clone, Copy, Debug)]
pub struct Verifier<'a> {
    keyset: &'a KeySet,
}

impl<'a> Verifier<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Verifier)?;
        Ok(Self { keyset })
    }

    pub fn keyset(&self) -> &'a KeySet {
        self.keyset
    }

    /// Check a signature over `message`.
    ///
    /// A signature that simply doesn't match returns `Ok(false)`. Errors are reserved for
    /// signatures that are malformed (`ShortSignature`, `BadVersion`) or that name a key not in
    /// the set (`KeyNotFound`).
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        verify_with(self.keyset, message, signature)
    }

    /// Check a text-encoded signature.
    pub fn verify_encoded(&self, message: &[u8], signature: &str) -> Result<bool, CryptoError> {
        let signature = self.keyset.config().encoding.decode(signature)?;
        self.verify(message, &signature)
    }
}

/// Signs with the primary key of a key set. Can also verify.
#[derive(Clone, Copy, Debug)]
pub struct Signer<'a> {
    keyset: &'a KeySet,
}

impl<'a> Signer<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Signer)?;
        Ok(Self { keyset })
    }

    pub fn keyset(&self) -> &'a KeySet {
        self.keyset
    }

    /// Sign `message` with the primary key. Fails with `NoPrimaryKey` if the set has none.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        sign_with(self.keyset, message)
    }

    pub fn sign_encoded(&self, message: &[u8]) -> Result<String, CryptoError> {
        Ok(self.keyset.config().encoding.encode(&self.sign(message)?))
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        verify_with(self.keyset, message, signature)
    }

    pub fn verify_encoded(&self, message: &[u8], signature: &str) -> Result<bool, CryptoError> {
        self.as_verifier().verify_encoded(message, signature)
    }

    pub fn as_verifier(&self) -> Verifier<'a> {
        Verifier {
            keyset: self.keyset,
        }
    }
}

/// Checks bare signature trailers made by an [`UnversionedSigner`].
///
/// With no header to say which key was used, every key in the set is tried in turn.
#[derive(Clone, Copy, Debug)]
pub struct UnversionedVerifier<'a> {
    keyset: &'a KeySet,
}

impl<'a> UnversionedVerifier<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Verifier)?;
        Ok(Self { keyset })
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        for (version, key) in self.keyset.keys() {
            let mut stream = key.verify_stream()?;
            stream.update(message);
            if stream.verify(signature)? {
                trace!(version, hash = %key.hash(), "unversioned signature matched");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn verify_encoded(&self, message: &[u8], signature: &str) -> Result<bool, CryptoError> {
        let signature = self.keyset.config().encoding.decode(signature)?;
        self.verify(message, &signature)
    }
}

/// Produces bare signature trailers, with no header, for interoperating with formats that have
/// their own framing.
#[derive(Clone, Copy, Debug)]
pub struct UnversionedSigner<'a> {
    keyset: &'a KeySet,
}

impl<'a> UnversionedSigner<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Signer)?;
        Ok(Self { keyset })
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut stream = self.keyset.primary_key()?.sign_stream()?;
        stream.update(message);
        stream.sign()
    }

    pub fn sign_encoded(&self, message: &[u8]) -> Result<String, CryptoError> {
        Ok(self.keyset.config().encoding.encode(&self.sign(message)?))
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        UnversionedVerifier {
            keyset: self.keyset,
        }
        .verify(message, signature)
    }
}

/// Encrypts with the primary key of a key set.
#[derive(Clone, Copy, Debug)]
pub struct Encrypter<'a> {
    keyset: &'a KeySet,
}

impl<'a> Encrypter<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Encrypter)?;
        Ok(Self { keyset })
    }

    pub fn keyset(&self) -> &'a KeySet {
        self.keyset
    }

    /// Encrypt `message` with the primary key. Fails with `NoPrimaryKey` if the set has none.
    pub fn encrypt<R>(&self, message: &[u8], csprng: &mut R) -> Result<Vec<u8>, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        encrypt_with(self.keyset, message, csprng)
    }

    pub fn encrypt_encoded<R>(&self, message: &[u8], csprng: &mut R) -> Result<String, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        Ok(self
            .keyset
            .config()
            .encoding
            .encode(&self.encrypt(message, csprng)?))
    }
}

/// Decrypts ciphertexts made with any key in a key set. Can also encrypt.
#[derive(Clone, Copy, Debug)]
pub struct Crypter<'a> {
    keyset: &'a KeySet,
}

impl<'a> Crypter<'a> {
    pub fn new(keyset: &'a KeySet) -> Result<Self, CryptoError> {
        keyset.check_purpose(OperationClass::Crypter)?;
        Ok(Self { keyset })
    }

    pub fn keyset(&self) -> &'a KeySet {
        self.keyset
    }

    /// Decrypt a ciphertext.
    ///
    /// If the key attaches an integrity trailer, it is checked first, and a mismatch fails with
    /// `InvalidSignature` without decrypting anything.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        decrypt_with(self.keyset, ciphertext)
    }

    pub fn decrypt_encoded(&self, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = self.keyset.config().encoding.decode(ciphertext)?;
        self.decrypt(&ciphertext)
    }

    pub fn encrypt<R>(&self, message: &[u8], csprng: &mut R) -> Result<Vec<u8>, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        encrypt_with(self.keyset, message, csprng)
    }

    pub fn encrypt_encoded<R>(&self, message: &[u8], csprng: &mut R) -> Result<String, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        self.as_encrypter().encrypt_encoded(message, csprng)
    }

    pub fn as_encrypter(&self) -> Encrypter<'a> {
        Encrypter {
            keyset: self.keyset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Compression, KeysetConfig},
        key::KeyType,
        keyset::MemoryKeyset,
        metadata::{KeyPurpose, KeyStatus},
    };

    fn keyset(purpose: KeyPurpose, key_type: KeyType) -> KeySet {
        let mut csprng = rand::rngs::OsRng;
        let mut keyset = KeySet::generate("envelope", purpose, key_type, KeysetConfig::default())
            .unwrap();
        keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        keyset
    }

    #[test]
    fn header_layout() {
        let hash = KeyHash::from_bytes([0xde, 0xad, 0xbe, 0xef]);
        let header = Header::new(hash);
        assert_eq!(header.to_bytes(), [0x00, 0xde, 0xad, 0xbe, 0xef]);
        let data = [0x00, 0xde, 0xad, 0xbe, 0xef, 0x01, 0x02];
        let (parsed, rest) = Header::parse(&data, CryptoError::ShortSignature).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(rest, &[0x01u8, 0x02][..]);

        assert!(matches!(
            Header::parse(&data[..4], CryptoError::ShortCiphertext),
            Err(CryptoError::ShortCiphertext)
        ));
        let mut bad = data;
        bad[0] = 0x01;
        assert!(matches!(
            Header::parse(&bad, CryptoError::ShortSignature),
            Err(CryptoError::BadVersion(1))
        ));
    }

    #[test]
    fn hmac_sign_verify() {
        let keyset = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        let signer = Signer::new(&keyset).unwrap();
        let message = b"This is some test input";
        let signature = signer.sign(message).unwrap();
        assert_eq!(signature.len(), HEADER_SIZE + 20);
        assert_eq!(&signature[1..HEADER_SIZE], keyset.primary_key().unwrap().hash().as_bytes());
        assert!(signer.verify(message, &signature).unwrap());
        assert!(!signer.verify(b"This is some other input", &signature).unwrap());

        let mut flipped = signature.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0x01;
        assert!(!signer.verify(message, &flipped).unwrap());
    }

    #[test]
    fn verify_structural_errors() {
        let keyset = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        let signer = Signer::new(&keyset).unwrap();
        let message = b"message";
        let signature = signer.sign(message).unwrap();

        assert!(matches!(
            signer.verify(message, &signature[..3]),
            Err(CryptoError::ShortSignature)
        ));
        assert!(matches!(
            signer.verify(message, &signature[..HEADER_SIZE + 10]),
            Err(CryptoError::ShortSignature)
        ));

        let mut bad_version = signature.clone();
        bad_version[0] ^= 0x01;
        assert!(matches!(
            signer.verify(message, &bad_version),
            Err(CryptoError::BadVersion(1))
        ));

        let mut bad_hash = signature.clone();
        bad_hash[1] ^= 0xff;
        if let Err(CryptoError::KeyNotFound(hash)) = signer.verify(message, &bad_hash) {
            assert_eq!(hash.as_bytes(), &bad_hash[1..HEADER_SIZE]);
        } else {
            panic!("Unknown key hash should fail with KeyNotFound");
        }
    }

    #[test]
    fn aes_encrypt_decrypt() {
        let mut csprng = rand::rngs::OsRng;
        let keyset = keyset(KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
        let crypter = Crypter::new(&keyset).unwrap();
        let ciphertext = crypter.encrypt(b"hello", &mut csprng).unwrap();
        // Header, IV, one block, and the HMAC trailer
        assert_eq!(ciphertext.len(), HEADER_SIZE + 16 + 16 + 20);
        assert_eq!(crypter.decrypt(&ciphertext).unwrap(), b"hello");

        assert!(matches!(
            crypter.decrypt(&ciphertext[..4]),
            Err(CryptoError::ShortCiphertext)
        ));
        assert!(matches!(
            crypter.decrypt(&ciphertext[..HEADER_SIZE + 10]),
            Err(CryptoError::ShortCiphertext)
        ));

        let empty = crypter.encrypt(b"", &mut csprng).unwrap();
        assert_eq!(crypter.decrypt(&empty).unwrap(), b"");
    }

    #[test]
    fn tampering_is_caught_before_decryption() {
        let mut csprng = rand::rngs::OsRng;
        let keyset = keyset(KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
        let crypter = Crypter::new(&keyset).unwrap();
        let ciphertext = crypter.encrypt(b"attack at dawn", &mut csprng).unwrap();
        for i in HEADER_SIZE..ciphertext.len() {
            let mut tampered = ciphertext.clone();
            tampered[i] ^= 0x80;
            assert!(
                matches!(crypter.decrypt(&tampered), Err(CryptoError::InvalidSignature)),
                "Flipping byte {} should be caught",
                i
            );
        }
    }

    #[test]
    fn encoded_forms() {
        let mut csprng = rand::rngs::OsRng;
        let keyset = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        let signer = Signer::new(&keyset).unwrap();
        let text = signer.sign_encoded(b"text").unwrap();
        assert!(!text.contains('+') && !text.contains('/') && !text.contains('='));
        assert!(signer.verify_encoded(b"text", &text).unwrap());
        assert!(matches!(
            signer.verify_encoded(b"text", "not base64!"),
            Err(CryptoError::BadFormat(_))
        ));

        let keyset = self::keyset(KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
        let crypter = Crypter::new(&keyset).unwrap();
        let text = crypter.as_encrypter().encrypt_encoded(b"text", &mut csprng).unwrap();
        assert_eq!(crypter.decrypt_encoded(&text).unwrap(), b"text");
    }

    #[test]
    fn front_ends_check_purpose() {
        let signing = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        assert!(Verifier::new(&signing).is_ok());
        assert!(UnversionedVerifier::new(&signing).is_ok());
        assert!(matches!(
            Crypter::new(&signing),
            Err(CryptoError::UnacceptablePurpose { .. })
        ));
        assert!(matches!(
            Encrypter::new(&signing),
            Err(CryptoError::UnacceptablePurpose { .. })
        ));

        let crypting = keyset(KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
        assert!(Encrypter::new(&crypting).is_ok());
        assert!(matches!(
            Signer::new(&crypting),
            Err(CryptoError::UnacceptablePurpose { .. })
        ));

        let test = keyset(KeyPurpose::Test, KeyType::Aes);
        assert!(Crypter::new(&test).is_ok());
        assert!(Signer::new(&test).is_ok());
    }

    #[test]
    fn rotation_keeps_old_output_valid() {
        let mut csprng = rand::rngs::OsRng;
        let mut keyset = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        let old = Signer::new(&keyset).unwrap().sign(b"rotate").unwrap();
        let v2 = keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        let signer = Signer::new(&keyset).unwrap();
        let new = signer.sign(b"rotate").unwrap();
        assert_ne!(old[1..HEADER_SIZE], new[1..HEADER_SIZE]);
        assert!(signer.verify(b"rotate", &old).unwrap());
        assert!(signer.verify(b"rotate", &new).unwrap());

        keyset.demote(v2).unwrap();
        let signer = Signer::new(&keyset).unwrap();
        assert!(matches!(signer.sign(b"rotate"), Err(CryptoError::NoPrimaryKey)));
        assert!(signer.verify(b"rotate", &new).unwrap());
    }

    fn compressed_aes(compression: Compression) -> KeySet {
        let mut csprng = rand::rngs::OsRng;
        let config = KeysetConfig {
            compression,
            ..Default::default()
        };
        let mut keyset =
            KeySet::generate("compressed", KeyPurpose::DecryptAndEncrypt, KeyType::Aes, config)
                .unwrap();
        keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        keyset
    }

    #[test]
    fn compressed_encrypt_decrypt() {
        let mut csprng = rand::rngs::OsRng;
        let message = b"repetitive plaintext, repetitive plaintext, ".repeat(20);
        let plain = Crypter::new(&compressed_aes(Compression::None))
            .unwrap()
            .encrypt(&message, &mut csprng)
            .unwrap();
        for compression in [Compression::Gzip, Compression::Zlib] {
            let keyset = compressed_aes(compression);
            let crypter = Crypter::new(&keyset).unwrap();
            let ciphertext = crypter.encrypt(&message, &mut csprng).unwrap();
            assert!(ciphertext.len() < plain.len());
            assert_eq!(crypter.decrypt(&ciphertext).unwrap(), message);
            let empty = crypter.encrypt(b"", &mut csprng).unwrap();
            assert_eq!(crypter.decrypt(&empty).unwrap(), b"");

            // The trailer is still checked before anything is decrypted or decompressed
            let mut tampered = ciphertext.clone();
            let last = tampered.len() - 1;
            tampered[last] ^= 0x01;
            assert!(matches!(
                crypter.decrypt(&tampered),
                Err(CryptoError::InvalidSignature)
            ));
        }
    }

    #[test]
    fn compression_mismatch_fails_cleanly() {
        let mut csprng = rand::rngs::OsRng;
        let keyset = compressed_aes(Compression::Gzip);
        let ciphertext = Crypter::new(&keyset)
            .unwrap()
            .encrypt(b"compressed with gzip", &mut csprng)
            .unwrap();

        let stored = MemoryKeyset::export(&keyset);
        let zlib = KeysetConfig {
            compression: Compression::Zlib,
            ..Default::default()
        };
        let loaded = KeySet::read_with_config(&stored, OperationClass::Crypter, zlib).unwrap();
        assert!(matches!(
            Crypter::new(&loaded).unwrap().decrypt(&ciphertext),
            Err(CryptoError::CompressionFailed(_))
        ));

        let gzip = KeysetConfig {
            compression: Compression::Gzip,
            ..Default::default()
        };
        let loaded = KeySet::read_with_config(&stored, OperationClass::Crypter, gzip).unwrap();
        assert_eq!(
            Crypter::new(&loaded).unwrap().decrypt(&ciphertext).unwrap(),
            b"compressed with gzip"
        );
    }

    #[test]
    fn unversioned() {
        let mut csprng = rand::rngs::OsRng;
        let mut keyset = keyset(KeyPurpose::SignAndVerify, KeyType::Hmac);
        let old = UnversionedSigner::new(&keyset).unwrap().sign(b"bare").unwrap();
        assert_eq!(old.len(), 20);
        keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        let signer = UnversionedSigner::new(&keyset).unwrap();
        let new = signer.sign(b"bare").unwrap();
        let verifier = UnversionedVerifier::new(&keyset).unwrap();
        assert!(verifier.verify(b"bare", &old).unwrap());
        assert!(verifier.verify(b"bare", &new).unwrap());
        assert!(!verifier.verify(b"other", &new).unwrap());
        assert!(!signer.verify(b"bare", &new[..10]).unwrap());

        let text = signer.sign_encoded(b"bare").unwrap();
        assert!(verifier.verify_encoded(b"bare", &text).unwrap());
    }
}
