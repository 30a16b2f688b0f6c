//! Capability streams.
//!
//! Every cryptographic operation runs through a stream created fresh from a
//! [`Key`](crate::key::Key) for one logical message. A stream is fed with zero or more `update`
//! calls and then consumed by its terminal call (`sign`, `verify`, or `finish`), so it can't be
//! reused for a second message or shared between two operations.
//!
//! There are four kinds of stream, one per capability:
//!
//! - [`SignStream`] produces a trailer over everything it was fed.
//! - [`VerifyStream`] checks a trailer, returning `false` for a mismatch.
//! - [`EncryptStream`] emits an algorithm-specific prefix from `init`, ciphertext from `update`,
//!   and the final ciphertext from `finish`.
//! - [`DecryptStream`] accepts the prefix and ciphertext through `update` and yields plaintext.
//!
//! Each is an enum over the concrete key families. Which families show up in which stream is
//! described by the [`Capabilities`] of a key.
//!
//! # Example
//!
//! ```
//! # use keyset_crypto::{key::*, stream::*, KeysetConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut csprng = rand::rngs::OsRng;
//! let key = Key::generate(KeyType::Hmac, &KeysetConfig::default(), &mut csprng)?;
//! assert!(key.capabilities().contains(Capabilities::SIGN | Capabilities::VERIFY));
//!
//! let mut signer = key.sign_stream()?;
//! signer.update(b"some data");
//! let trailer = signer.sign()?;
//!
//! let mut verifier = key.verify_stream()?;
//! verifier.update(b"some data");
//! assert!(verifier.verify(&trailer)?);
//! # Ok(())
//! # }
//! ```

use crate::{
    aes_key::{AesDecryptStream, AesEncryptStream},
    dsa_key::{DsaSignStream, DsaVerifyStream},
    error::CryptoError,
    hmac_key::HmacStream,
    rsa_key::{RsaDecryptStream, RsaEncryptStream, RsaSignStream, RsaVerifyStream},
};

use std::fmt;

bitflags::bitflags! {
    /// The set of streams a key can produce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Produces a trailer over a message.
        const SIGN = 0b0001;
        /// Checks a trailer against a message.
        const VERIFY = 0b0010;
        /// Encrypts a message.
        const ENCRYPT = 0b0100;
        /// Decrypts a message.
        const DECRYPT = 0b1000;
    }
}

/// A single-use signing computation.
pub enum SignStream<'a> {
    Hmac(HmacStream),
    Rsa(RsaSignStream<'a>),
    Dsa(DsaSignStream<'a>),
}

impl<'a> SignStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            SignStream::Hmac(s) => s.update(data),
            SignStream::Rsa(s) => s.update(data),
            SignStream::Dsa(s) => s.update(data),
        }
    }

    /// Consume the stream and produce its trailer.
    pub fn sign(self) -> Result<Vec<u8>, CryptoError> {
        match self {
            SignStream::Hmac(s) => Ok(s.sign()),
            SignStream::Rsa(s) => s.sign(),
            SignStream::Dsa(s) => s.sign(),
        }
    }
}

/// A single-use verification.
pub enum VerifyStream<'a> {
    Hmac(HmacStream),
    Rsa(RsaVerifyStream<'a>),
    Dsa(DsaVerifyStream<'a>),
}

impl<'a> VerifyStream<'a> {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            VerifyStream::Hmac(s) => s.update(data),
            VerifyStream::Rsa(s) => s.update(data),
            VerifyStream::Dsa(s) => s.update(data),
        }
    }

    /// Consume the stream and check the trailer. A trailer that doesn't match, including one of
    /// the wrong length, is `Ok(false)`.
    pub fn verify(self, trailer: &[u8]) -> Result<bool, CryptoError> {
        Ok(match self {
            VerifyStream::Hmac(s) => s.verify(trailer),
            VerifyStream::Rsa(s) => s.verify(trailer),
            VerifyStream::Dsa(s) => s.verify(trailer),
        })
    }
}

/// A single-use encryption.
pub enum EncryptStream<'a> {
    Aes(AesEncryptStream),
    Rsa(RsaEncryptStream<'a>),
}

impl<'a> EncryptStream<'a> {
    /// The algorithm-specific prefix that goes ahead of the ciphertext body (the IV, for AES).
    /// Empty if the algorithm has none.
    pub fn init(&mut self) -> Vec<u8> {
        match self {
            EncryptStream::Aes(s) => s.init(),
            EncryptStream::Rsa(_) => Vec::new(),
        }
    }

    /// Feed in plaintext, returning whatever ciphertext is ready.
    pub fn update(&mut self, data: &[u8]) -> Vec<u8> {
        match self {
            EncryptStream::Aes(s) => s.update(data),
            EncryptStream::Rsa(s) => {
                s.update(data);
                Vec::new()
            }
        }
    }

    /// Consume the stream and return the remaining ciphertext.
    pub fn finish(self) -> Result<Vec<u8>, CryptoError> {
        match self {
            EncryptStream::Aes(s) => Ok(s.finish()),
            EncryptStream::Rsa(s) => s.finish(),
        }
    }
}

/// A single-use decryption.
pub enum DecryptStream<'a> {
    Aes(AesDecryptStream),
    Rsa(RsaDecryptStream<'a>),
}

impl<'a> DecryptStream<'a> {
    /// Feed in the prefix and ciphertext, returning whatever plaintext is ready.
    pub fn update(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            DecryptStream::Aes(s) => s.update(data),
            DecryptStream::Rsa(s) => {
                s.update(data);
                Ok(Vec::new())
            }
        }
    }

    /// Consume the stream and return the remaining plaintext.
    pub fn finish(self) -> Result<Vec<u8>, CryptoError> {
        match self {
            DecryptStream::Aes(s) => s.finish(),
            DecryptStream::Rsa(s) => s.finish(),
        }
    }
}

macro_rules! stream_debug {
    ($name:ident { $($variant:ident),* }) => {
        impl<'a> fmt::Debug for $name<'a> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let kind = match self {
                    $($name::$variant(_) => stringify!($variant),)*
                };
                f.debug_tuple(stringify!($name)).field(&kind).finish()
            }
        }
    };
}

stream_debug!(SignStream { Hmac, Rsa, Dsa });
stream_debug!(VerifyStream { Hmac, Rsa, Dsa });
stream_debug!(EncryptStream { Aes, Rsa });
stream_debug!(DecryptStream { Aes, Rsa });
