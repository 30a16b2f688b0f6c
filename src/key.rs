//! Keys of every supported family.
//!
//! A [`Key`] is one of six concrete variants. Each variant hands out the capability streams from
//! [`stream`](crate::stream) that make sense for it; asking for any other stream fails with
//! [`CryptoError::AlgorithmUnavailable`].
//!
//! | Variant      | Sign | Verify | Encrypt | Decrypt | Ciphertext trailer |
//! |--------------|------|--------|---------|---------|--------------------|
//! | `Aes`        | yes  | yes    | yes     | yes     | HMAC-SHA1, 20 bytes|
//! | `Hmac`       | yes  | yes    |         |         |                    |
//! | `RsaPrivate` | yes  | yes    | yes     | yes     | none               |
//! | `RsaPublic`  |      | yes    | yes     |         | none               |
//! | `DsaPrivate` | yes  | yes    |         |         |                    |
//! | `DsaPublic`  |      | yes    |         |         |                    |
//!
//! An AES key's sign and verify streams run over its attached integrity key, which is what
//! authenticates AES ciphertexts.
//!
//! # Format
//!
//! Keys encode as a type byte followed by length-prefixed fields, each a 4-byte big-endian length
//! then the field bytes:
//!
//! - AES: AES key, HMAC key
//! - HMAC: key
//! - RSA private: `n`, `e`, `d`, `p`, `q`
//! - RSA public: `n`, `e`
//! - DSA private: `p`, `q`, `g`, `y`, `x`
//! - DSA public: `p`, `q`, `g`, `y`

use crate::{
    aes_key::AesKey,
    config::KeysetConfig,
    dsa_key::{DsaPrivKey, DsaPubKey},
    error::CryptoError,
    hash::KeyHash,
    hmac_key::{HmacKey, HMAC_DIGEST_SIZE},
    rsa_key::{RsaPrivKey, RsaPubKey},
    stream::{Capabilities, DecryptStream, EncryptStream, SignStream, VerifyStream},
    CryptoSrc,
};

use byteorder::{BigEndian, ByteOrder};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use std::{convert::TryFrom, fmt};

/// The key families a key set can hold. Every key in a set has the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum KeyType {
    Aes = 1,
    Hmac = 2,
    RsaPrivate = 3,
    RsaPublic = 4,
    DsaPrivate = 5,
    DsaPublic = 6,
}

impl KeyType {
    /// Whether keys of this type can be generated directly. Public types can only be derived from
    /// a private key.
    pub fn is_generatable(&self) -> bool {
        !matches!(self, KeyType::RsaPublic | KeyType::DsaPublic)
    }

    /// The type of the public half, for asymmetric private types.
    pub fn public_type(&self) -> Option<KeyType> {
        match self {
            KeyType::RsaPrivate => Some(KeyType::RsaPublic),
            KeyType::DsaPrivate => Some(KeyType::DsaPublic),
            _ => None,
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => KeyType::Aes,
            2 => KeyType::Hmac,
            3 => KeyType::RsaPrivate,
            4 => KeyType::RsaPublic,
            5 => KeyType::DsaPrivate,
            6 => KeyType::DsaPublic,
            _ => return Err(CryptoError::UnsupportedType(value)),
        })
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            KeyType::Aes => "AES",
            KeyType::Hmac => "HMAC-SHA1",
            KeyType::RsaPrivate => "RSA private",
            KeyType::RsaPublic => "RSA public",
            KeyType::DsaPrivate => "DSA private",
            KeyType::DsaPublic => "DSA public",
        };
        f.write_str(name)
    }
}

/// A single key of any supported family.
#[derive(Clone, Debug)]
pub enum Key {
    Aes(AesKey),
    Hmac(HmacKey),
    RsaPrivate(RsaPrivKey),
    RsaPublic(RsaPubKey),
    DsaPrivate(DsaPrivKey),
    DsaPublic(DsaPubKey),
}

impl Key {
    /// Generate a new key of the given type, sized according to `config`.
    pub fn generate<R>(
        key_type: KeyType,
        config: &KeysetConfig,
        csprng: &mut R,
    ) -> Result<Key, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        let bits = config.key_bits(key_type);
        Ok(match key_type {
            KeyType::Aes => Key::Aes(AesKey::generate(csprng, bits, config.hmac_key_bits)?),
            KeyType::Hmac => Key::Hmac(HmacKey::generate(csprng, bits)?),
            KeyType::RsaPrivate => Key::RsaPrivate(RsaPrivKey::generate(csprng, bits)?),
            KeyType::DsaPrivate => Key::DsaPrivate(DsaPrivKey::generate(csprng, bits)?),
            KeyType::RsaPublic | KeyType::DsaPublic => {
                return Err(CryptoError::UnsupportedType(key_type as u8))
            }
        })
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Aes(_) => KeyType::Aes,
            Key::Hmac(_) => KeyType::Hmac,
            Key::RsaPrivate(_) => KeyType::RsaPrivate,
            Key::RsaPublic(_) => KeyType::RsaPublic,
            Key::DsaPrivate(_) => KeyType::DsaPrivate,
            Key::DsaPublic(_) => KeyType::DsaPublic,
        }
    }

    /// The 4-byte identifier that goes into signature and ciphertext headers.
    pub fn hash(&self) -> KeyHash {
        match self {
            Key::Aes(k) => k.hash(),
            Key::Hmac(k) => k.hash(),
            Key::RsaPrivate(k) => k.hash(),
            Key::RsaPublic(k) => k.hash(),
            Key::DsaPrivate(k) => k.hash(),
            Key::DsaPublic(k) => k.hash(),
        }
    }

    /// Key size in bits. For AES this is the cipher key; for RSA and DSA, the prime modulus.
    pub fn bits(&self) -> usize {
        match self {
            Key::Aes(k) => k.bits(),
            Key::Hmac(k) => k.bits(),
            Key::RsaPrivate(k) => k.public_key().bits(),
            Key::RsaPublic(k) => k.bits(),
            Key::DsaPrivate(k) => k.public_key().bits(),
            Key::DsaPublic(k) => k.bits(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Key::Aes(_) | Key::RsaPrivate(_) => Capabilities::all(),
            Key::Hmac(_) | Key::DsaPrivate(_) => Capabilities::SIGN | Capabilities::VERIFY,
            Key::RsaPublic(_) => Capabilities::VERIFY | Capabilities::ENCRYPT,
            Key::DsaPublic(_) => Capabilities::VERIFY,
        }
    }

    /// Length of the trailer a sign stream produces.
    pub fn digest_size(&self) -> usize {
        match self {
            Key::Aes(_) | Key::Hmac(_) => HMAC_DIGEST_SIZE,
            Key::RsaPrivate(k) => k.public_key().output_size(),
            Key::RsaPublic(k) => k.output_size(),
            Key::DsaPrivate(k) => k.public_key().signature_size(),
            Key::DsaPublic(k) => k.signature_size(),
        }
    }

    /// Length of the integrity trailer appended to ciphertexts. Zero for keys whose ciphertexts
    /// carry no trailer.
    pub fn ciphertext_digest_size(&self) -> usize {
        match self {
            Key::Aes(_) => HMAC_DIGEST_SIZE,
            _ => 0,
        }
    }

    /// Upper bound on the stream output for `input_len` bytes of input. For encrypting keys this
    /// covers the prefix, ciphertext body, and ciphertext trailer; otherwise it is the signature
    /// trailer length.
    pub fn max_output_size(&self, input_len: usize) -> usize {
        match self {
            Key::Aes(k) => k.max_output_size(input_len),
            Key::RsaPrivate(k) => k.public_key().output_size(),
            Key::RsaPublic(k) => k.output_size(),
            _ => self.digest_size(),
        }
    }

    pub fn sign_stream(&self) -> Result<SignStream<'_>, CryptoError> {
        Ok(match self {
            Key::Aes(k) => SignStream::Hmac(k.integrity_stream()?),
            Key::Hmac(k) => SignStream::Hmac(k.stream()?),
            Key::RsaPrivate(k) => SignStream::Rsa(k.sign_stream()),
            Key::DsaPrivate(k) => SignStream::Dsa(k.sign_stream()),
            Key::RsaPublic(_) | Key::DsaPublic(_) => {
                return Err(CryptoError::AlgorithmUnavailable("public keys cannot sign"))
            }
        })
    }

    pub fn verify_stream(&self) -> Result<VerifyStream<'_>, CryptoError> {
        Ok(match self {
            Key::Aes(k) => VerifyStream::Hmac(k.integrity_stream()?),
            Key::Hmac(k) => VerifyStream::Hmac(k.stream()?),
            Key::RsaPrivate(k) => VerifyStream::Rsa(k.public_key().verify_stream()),
            Key::RsaPublic(k) => VerifyStream::Rsa(k.verify_stream()),
            Key::DsaPrivate(k) => VerifyStream::Dsa(k.public_key().verify_stream()),
            Key::DsaPublic(k) => VerifyStream::Dsa(k.verify_stream()),
        })
    }

    /// Start an encryption stream. AES draws its IV from `csprng` immediately; RSA holds on to
    /// it until the stream finishes.
    pub fn encrypt_stream<'a>(
        &'a self,
        csprng: &'a mut dyn CryptoSrc,
    ) -> Result<EncryptStream<'a>, CryptoError> {
        Ok(match self {
            Key::Aes(k) => EncryptStream::Aes(k.encrypt_stream(csprng)?),
            Key::RsaPrivate(k) => EncryptStream::Rsa(k.public_key().encrypt_stream(csprng)),
            Key::RsaPublic(k) => EncryptStream::Rsa(k.encrypt_stream(csprng)),
            _ => return Err(CryptoError::AlgorithmUnavailable("key cannot encrypt")),
        })
    }

    pub fn decrypt_stream(&self) -> Result<DecryptStream<'_>, CryptoError> {
        Ok(match self {
            Key::Aes(k) => DecryptStream::Aes(k.decrypt_stream()),
            Key::RsaPrivate(k) => DecryptStream::Rsa(k.decrypt_stream()),
            _ => return Err(CryptoError::AlgorithmUnavailable("key cannot decrypt")),
        })
    }

    /// The public half of an asymmetric private key. Fails for symmetric keys.
    pub fn public_key(&self) -> Result<Key, CryptoError> {
        match self {
            Key::RsaPrivate(k) => Ok(Key::RsaPublic(k.public_key().clone())),
            Key::DsaPrivate(k) => Ok(Key::DsaPublic(k.public_key().clone())),
            Key::RsaPublic(_) | Key::DsaPublic(_) => Ok(self.clone()),
            Key::Aes(_) | Key::Hmac(_) => {
                Err(CryptoError::NotExportable("symmetric keys have no public half"))
            }
        }
    }

    /// Append the encoded key material to a byte vector.
    pub fn encode_vec(&self, buf: &mut Vec<u8>) {
        buf.push(self.key_type() as u8);
        match self {
            Key::Aes(k) => {
                push_field(buf, k.raw());
                push_field(buf, k.hmac_key().raw());
            }
            Key::Hmac(k) => push_field(buf, k.raw()),
            Key::RsaPrivate(k) => {
                push_field(buf, &k.public_key().modulus());
                push_field(buf, &k.public_key().exponent());
                let mut fields = k.private_components();
                for field in fields.iter() {
                    push_field(buf, field);
                }
                fields.iter_mut().for_each(|f| f.zeroize());
            }
            Key::RsaPublic(k) => {
                push_field(buf, &k.modulus());
                push_field(buf, &k.exponent());
            }
            Key::DsaPrivate(k) => {
                for field in k.public_key().public_components().iter() {
                    push_field(buf, field);
                }
                let mut x = k.private_component();
                push_field(buf, &x);
                x.zeroize();
            }
            Key::DsaPublic(k) => {
                for field in k.public_components().iter() {
                    push_field(buf, field);
                }
            }
        }
    }

    /// Encode into a fresh byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_vec(&mut buf);
        buf
    }
}

impl TryFrom<&[u8]> for Key {
    type Error = CryptoError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let (&tag, data) = value.split_first().ok_or(CryptoError::BadLength {
            step: "get key type",
            expected: 1,
            actual: 0,
        })?;
        let key_type = KeyType::try_from(tag)?;
        let mut reader = FieldReader::new(data);
        let key = match key_type {
            KeyType::Aes => {
                let aes = reader.field("get AES key")?;
                let hmac = HmacKey::from_bytes(reader.field("get HMAC key")?)?;
                Key::Aes(AesKey::from_bytes(aes, hmac)?)
            }
            KeyType::Hmac => Key::Hmac(HmacKey::from_bytes(reader.field("get HMAC key")?)?),
            KeyType::RsaPrivate => {
                let n = reader.field("get RSA modulus")?;
                let e = reader.field("get RSA public exponent")?;
                let d = reader.field("get RSA private exponent")?;
                let p = reader.field("get RSA prime p")?;
                let q = reader.field("get RSA prime q")?;
                Key::RsaPrivate(RsaPrivKey::from_components(n, e, d, p, q)?)
            }
            KeyType::RsaPublic => {
                let n = reader.field("get RSA modulus")?;
                let e = reader.field("get RSA public exponent")?;
                Key::RsaPublic(RsaPubKey::from_components(n, e)?)
            }
            KeyType::DsaPrivate => {
                let p = reader.field("get DSA p")?;
                let q = reader.field("get DSA q")?;
                let g = reader.field("get DSA g")?;
                let y = reader.field("get DSA y")?;
                let x = reader.field("get DSA x")?;
                Key::DsaPrivate(DsaPrivKey::from_components(p, q, g, y, x)?)
            }
            KeyType::DsaPublic => {
                let p = reader.field("get DSA p")?;
                let q = reader.field("get DSA q")?;
                let g = reader.field("get DSA g")?;
                let y = reader.field("get DSA y")?;
                Key::DsaPublic(DsaPubKey::from_components(p, q, g, y)?)
            }
        };
        reader.finish()?;
        Ok(key)
    }
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    let mut len = [0u8; 4];
    BigEndian::write_u32(&mut len, field.len() as u32);
    buf.extend_from_slice(&len);
    buf.extend_from_slice(field);
}

/// Walks a sequence of length-prefixed fields.
struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn field(&mut self, step: &'static str) -> Result<&'a [u8], CryptoError> {
        let len = self.data.get(..4).ok_or(CryptoError::BadLength {
            step,
            expected: 4,
            actual: self.data.len(),
        })?;
        let len = BigEndian::read_u32(len) as usize;
        let end = len.saturating_add(4);
        let field = self.data.get(4..end).ok_or(CryptoError::BadLength {
            step,
            expected: len,
            actual: self.data.len() - 4,
        })?;
        self.data = &self.data[end..];
        Ok(field)
    }

    fn finish(self) -> Result<(), CryptoError> {
        if !self.data.is_empty() {
            return Err(CryptoError::BadLength {
                step: "end of key fields",
                expected: 0,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}
