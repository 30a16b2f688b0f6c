//! Key identifiers.
//!
//! Every key in a key set is addressed by a [`KeyHash`]: the first 4 bytes of a SHA-1 digest
//! computed over the key's canonical fields. The key hash is what goes into the header of every
//! signature and ciphertext, so a verifier can find the right key without trying them all.
//!
//! # Format
//!
//! The digest input is a sequence of length-prefixed fields. Each field is written as a 4-byte
//! big-endian length followed by the field bytes. Fields holding big integers have their leading
//! zero bytes stripped before being written, so the hash depends only on the integer's value and
//! not on how wide a buffer it was stored in.
//!
//! Only 4 bytes of digest are kept, so collisions inside a large key set are possible. A
//! [`KeySet`](crate::keyset::KeySet) rejects duplicates when loading and regenerates on collision
//! when adding a version.
//!
//! # Example
//!
//! ```
//! # use keyset_crypto::hash::*;
//! let mut hasher = KeyHasher::new();
//! hasher.update_field(b"some key bytes");
//! let hash = hasher.finalize();
//! assert_eq!(hash, prefix_hash(&[b"some key bytes"]));
//! println!("KeyHash(Base58): {}", hash);
//! ```

use crate::{error::CryptoError, KEY_HASH_SIZE};

use byteorder::{BigEndian, ByteOrder};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use std::{convert::TryFrom, fmt, hash};

/// A 4-byte key identifier.
///
/// Key hashes are public values. Equality still compares in constant time, matching how the rest
/// of the crate treats byte strings that are checked against attacker-provided input.
#[derive(Clone, Copy)]
pub struct KeyHash([u8; KEY_HASH_SIZE]);

impl KeyHash {
    /// Wrap 4 raw bytes as a key hash.
    pub fn from_bytes(bytes: [u8; KEY_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// The raw hash bytes, in the order they appear in a header.
    pub fn as_bytes(&self) -> &[u8; KEY_HASH_SIZE] {
        &self.0
    }

    /// Reinterpret the hash as a big-endian 32-bit integer. This is the lookup key a
    /// [`KeySet`](crate::keyset::KeySet) indexes by.
    pub fn to_u32(&self) -> u32 {
        BigEndian::read_u32(&self.0)
    }

    /// Convert from a base58-encoded string.
    pub fn from_base58(s: &str) -> Result<Self, CryptoError> {
        let raw = bs58::decode(s)
            .into_vec()
            .or(Err(CryptoError::BadFormat("Not valid Base58")))?;
        Self::try_from(&raw[..])
    }

    /// Convert into a base58-encoded string.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Append the raw hash bytes to a byte vector.
    pub fn encode_vec(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }
}

impl TryFrom<&[u8]> for KeyHash {
    type Error = CryptoError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; KEY_HASH_SIZE] = value.try_into().or(Err(CryptoError::BadLength {
            step: "get key hash",
            expected: KEY_HASH_SIZE,
            actual: value.len(),
        }))?;
        Ok(Self(raw))
    }
}

impl AsRef<[u8]> for KeyHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for KeyHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for KeyHash {}

impl hash::Hash for KeyHash {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("KeyHash")
            .field(&format_args!("{:02x?}", &self.0))
            .finish()
    }
}

impl fmt::Display for KeyHash {
    /// Display as a base58-encoded string.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::LowerHex for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::UpperHex for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Incrementally builds a [`KeyHash`] out of length-prefixed fields.
#[derive(Clone, Default)]
pub struct KeyHasher {
    state: Sha1,
}

impl KeyHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field exactly as given.
    pub fn update_field(&mut self, field: &[u8]) {
        let mut len = [0u8; 4];
        // Field lengths are bounded by key sizes, far below u32::MAX.
        BigEndian::write_u32(&mut len, field.len() as u32);
        self.state.update(len);
        self.state.update(field);
    }

    /// Add a big-endian unsigned integer field, with leading zero bytes stripped first.
    pub fn update_integer(&mut self, field: &[u8]) {
        self.update_field(strip_leading_zeros(field));
    }

    /// Finish hashing and keep the leading 4 bytes of the digest.
    pub fn finalize(self) -> KeyHash {
        let digest = self.state.finalize();
        let mut out = [0u8; KEY_HASH_SIZE];
        out.copy_from_slice(&digest[..KEY_HASH_SIZE]);
        KeyHash(out)
    }
}

impl fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyHasher").finish_non_exhaustive()
    }
}

/// Compute the key hash of a list of plain byte fields.
pub fn prefix_hash(fields: &[&[u8]]) -> KeyHash {
    let mut hasher = KeyHasher::new();
    for field in fields {
        hasher.update_field(field);
    }
    hasher.finalize()
}

/// Drop leading zero bytes from a big-endian integer. A value of zero becomes an empty slice.
pub fn strip_leading_zeros(value: &[u8]) -> &[u8] {
    let start = value.iter().take_while(|b| **b == 0).count();
    &value[start..]
}

/// Left-pad a big-endian integer with zeros to exactly `width` bytes. Fails if the integer
/// doesn't fit.
pub(crate) fn pad_integer(value: &[u8], width: usize) -> Result<Vec<u8>, CryptoError> {
    let value = strip_leading_zeros(value);
    if value.len() > width {
        return Err(CryptoError::BadLength {
            step: "pad integer",
            expected: width,
            actual: value.len(),
        });
    }
    let mut out = vec![0u8; width - value.len()];
    out.extend_from_slice(value);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_prefix_vector() {
        // SHA-1 of 00 00 00 03 'a' 'b' 'c'
        let mut expected = Sha1::new();
        expected.update(hex::decode("00000003616263").unwrap());
        let expected = expected.finalize();
        let hash = prefix_hash(&[b"abc"]);
        assert_eq!(hash.as_bytes(), &expected[..4]);
    }

    #[test]
    fn hasher_matches_prefix_hash() {
        let mut hasher = KeyHasher::new();
        hasher.update_field(b"first");
        hasher.update_field(b"second");
        assert_eq!(hasher.finalize(), prefix_hash(&[b"first", b"second"]));
    }

    #[test]
    fn field_boundaries_matter() {
        let a = prefix_hash(&[b"ab", b"c"]);
        let b = prefix_hash(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn integers_ignore_leading_zeros() {
        let mut padded = KeyHasher::new();
        padded.update_integer(&[0, 0, 0x01, 0x02]);
        let mut bare = KeyHasher::new();
        bare.update_integer(&[0x01, 0x02]);
        assert_eq!(padded.finalize(), bare.finalize());
        assert_eq!(strip_leading_zeros(&[0, 0, 0]), &[] as &[u8]);
    }

    #[test]
    fn pad_integer_widths() {
        assert_eq!(pad_integer(&[1, 2], 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(pad_integer(&[0, 0, 1, 2], 2).unwrap(), vec![1, 2]);
        if let Err(CryptoError::BadLength { expected: 1, actual: 2, .. }) = pad_integer(&[1, 2], 1)
        {
        } else {
            panic!("Integer wider than the pad width should be rejected");
        }
    }

    #[test]
    fn u32_lookup_is_big_endian() {
        let hash = KeyHash::from_bytes([0x01, 0x02, 0x03, 0x04]);
        assert_eq!(hash.to_u32(), 0x01020304);
        assert_eq!(format!("{:x}", hash), "01020304");
        assert_eq!(format!("{:X}", KeyHash::from_bytes([0xab, 0, 0, 0xcd])), "AB0000CD");
    }

    #[test]
    fn base58() {
        let hash = prefix_hash(&[b"base58 check"]);
        let enc = hash.to_base58();
        assert_eq!(KeyHash::from_base58(&enc).unwrap(), hash);
        assert_eq!(format!("{}", hash), enc);
        assert!(KeyHash::from_base58("0OIl").is_err());
    }

    #[test]
    fn wrong_length() {
        if let Err(CryptoError::BadLength { expected: 4, actual: 3, .. }) =
            KeyHash::try_from(&[1u8, 2, 3][..])
        {
        } else {
            panic!("Three bytes should not decode as a key hash");
        }
    }
}
