//! Key set configuration.
//!
//! A [`KeysetConfig`] controls how new key versions are generated, whether plaintext is
//! compressed before encryption, and how the `*_encoded` front end methods turn bytes into text. It is plain data: build it with [`Default`] and adjust the
//! fields, or deserialize it (with the `with-serde` feature) from whatever configuration format
//! the application already uses. Missing fields take their default values.

use crate::{
    aes_key::DEFAULT_AES_KEY_BITS, dsa_key::DEFAULT_DSA_KEY_BITS, error::CryptoError,
    hmac_key::DEFAULT_HMAC_KEY_BITS, key::KeyType, rsa_key::DEFAULT_RSA_KEY_BITS,
};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use flate2::{
    read::{GzDecoder, ZlibDecoder},
    write::{GzEncoder, ZlibEncoder},
    Compression as Level,
};

use std::{
    borrow::Cow,
    io::{Read, Write},
};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Default number of times to try generating a key whose hash doesn't collide with one already
/// in the set.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 32;

/// Text encoding used by the `*_encoded` methods on signers, verifiers, and crypters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
pub enum Encoding {
    /// URL-safe base64 alphabet without padding.
    #[default]
    WebSafeBase64,
    /// Standard base64 alphabet with padding.
    Base64,
}

impl Encoding {
    pub fn encode(&self, data: &[u8]) -> String {
        match self {
            Encoding::WebSafeBase64 => URL_SAFE_NO_PAD.encode(data),
            Encoding::Base64 => STANDARD.encode(data),
        }
    }

    pub fn decode(&self, text: &str) -> Result<Vec<u8>, CryptoError> {
        let decoded = match self {
            Encoding::WebSafeBase64 => URL_SAFE_NO_PAD.decode(text),
            Encoding::Base64 => STANDARD.decode(text),
        };
        decoded.or(Err(CryptoError::BadFormat("Not valid base64")))
    }
}

/// Compression applied to plaintext before encryption, and undone after decryption.
///
/// Ciphertexts don't record which compression was used, so the decrypting key set must be
/// configured the same way as the encrypting one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
}

impl Compression {
    pub fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>, CryptoError> {
        let compressed = match self {
            Compression::None => return Ok(Cow::Borrowed(data)),
            Compression::Gzip => {
                let mut enc = GzEncoder::new(Vec::new(), Level::default());
                enc.write_all(data).and_then(|_| enc.finish())
            }
            Compression::Zlib => {
                let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
                enc.write_all(data).and_then(|_| enc.finish())
            }
        };
        compressed
            .map(Cow::Owned)
            .or(Err(CryptoError::CompressionFailed("couldn't compress plaintext")))
    }

    pub fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::new();
        let result = match self {
            Compression::None => return Ok(data),
            Compression::Gzip => GzDecoder::new(&data[..]).read_to_end(&mut out),
            Compression::Zlib => ZlibDecoder::new(&data[..]).read_to_end(&mut out),
        };
        result.or(Err(CryptoError::CompressionFailed(
            "plaintext doesn't decompress with the configured compression",
        )))?;
        Ok(out)
    }
}

/// Generation and encoding settings for a key set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
pub struct KeysetConfig {
    /// AES key size in bits: 128, 192, or 256.
    pub aes_key_bits: usize,
    /// HMAC key size in bits.
    pub hmac_key_bits: usize,
    /// RSA modulus size in bits: 1024, 2048, or 4096.
    pub rsa_key_bits: usize,
    /// DSA prime modulus size in bits: 1024, 2048, or 3072.
    pub dsa_key_bits: usize,
    /// How many times to regenerate a key whose hash collides before giving up.
    pub max_generation_attempts: u32,
    /// Text encoding for the `*_encoded` methods.
    pub encoding: Encoding,
    /// Compression for plaintext going into `encrypt` and coming out of `decrypt`.
    pub compression: Compression,
}

impl Default for KeysetConfig {
    fn default() -> Self {
        Self {
            aes_key_bits: DEFAULT_AES_KEY_BITS,
            hmac_key_bits: DEFAULT_HMAC_KEY_BITS,
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            dsa_key_bits: DEFAULT_DSA_KEY_BITS,
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            encoding: Encoding::default(),
            compression: Compression::default(),
        }
    }
}

impl KeysetConfig {
    /// The configured generation size for a key type, in bits. Public key types report the size
    /// of their private counterpart.
    pub fn key_bits(&self, key_type: KeyType) -> usize {
        match key_type {
            KeyType::Aes => self.aes_key_bits,
            KeyType::Hmac => self.hmac_key_bits,
            KeyType::RsaPrivate | KeyType::RsaPublic => self.rsa_key_bits,
            KeyType::DsaPrivate | KeyType::DsaPublic => self.dsa_key_bits,
        }
    }

    /// Check that the retry ceiling allows at least one attempt.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.max_generation_attempts == 0 {
            return Err(CryptoError::BadFormat(
                "max_generation_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KeysetConfig::default();
        assert_eq!(config.key_bits(KeyType::Aes), 128);
        assert_eq!(config.key_bits(KeyType::Hmac), 256);
        assert_eq!(config.key_bits(KeyType::RsaPublic), 2048);
        assert_eq!(config.key_bits(KeyType::DsaPrivate), 2048);
        assert_eq!(config.max_generation_attempts, 32);
        assert_eq!(config.encoding, Encoding::WebSafeBase64);
        assert_eq!(config.compression, Compression::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let config = KeysetConfig {
            max_generation_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn encodings() {
        let data = [0xfbu8, 0xff, 0x00, 0x10];
        let web = Encoding::WebSafeBase64.encode(&data);
        assert_eq!(web, "-_8AEA");
        assert_eq!(Encoding::WebSafeBase64.decode(&web).unwrap(), data);
        let std = Encoding::Base64.encode(&data);
        assert_eq!(std, "+/8AEA==");
        assert_eq!(Encoding::Base64.decode(&std).unwrap(), data);
        if let Err(CryptoError::BadFormat(_)) = Encoding::WebSafeBase64.decode("+/8AEA==") {
        } else {
            panic!("Standard alphabet should not decode as web-safe base64");
        }
    }

    #[test]
    fn compression_round_trips() {
        let data = b"a highly compressible message a highly compressible message".repeat(8);
        for compression in [Compression::Gzip, Compression::Zlib] {
            let packed = compression.compress(&data).unwrap().into_owned();
            assert!(packed.len() < data.len());
            assert_eq!(compression.decompress(packed).unwrap(), data);
        }
        let packed = Compression::None.compress(&data).unwrap();
        assert!(matches!(packed, Cow::Borrowed(_)));
        assert_eq!(Compression::None.decompress(data.clone()).unwrap(), data);
    }

    #[test]
    fn compression_mismatch_fails() {
        let gzip = Compression::Gzip.compress(b"payload").unwrap().into_owned();
        if let Err(CryptoError::CompressionFailed(_)) = Compression::Zlib.decompress(gzip) {
        } else {
            panic!("gzip data should not decompress as zlib");
        }
        let zlib = Compression::Zlib.compress(b"payload").unwrap().into_owned();
        assert!(Compression::Gzip.decompress(zlib).is_err());
        assert!(Compression::Zlib.decompress(b"not compressed".to_vec()).is_err());
    }

    #[cfg(feature = "with-serde")]
    #[test]
    fn partial_json() {
        let config: KeysetConfig =
            serde_json::from_str(r#"{ "rsa_key_bits": 1024, "encoding": "base64", "compression": "gzip" }"#)
                .unwrap();
        assert_eq!(config.rsa_key_bits, 1024);
        assert_eq!(config.compression, Compression::Gzip);
        assert_eq!(config.encoding, Encoding::Base64);
        assert_eq!(config.aes_key_bits, 128);
    }
}
