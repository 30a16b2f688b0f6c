//! Key set metadata.
//!
//! [`KeyMetadata`] is the bookkeeping half of a key set: its name, what it may be used for, which
//! key family it holds, and the list of [`KeyVersion`]s with their statuses. It holds no key
//! material.
//!
//! # Format
//!
//! Metadata encodes as:
//!
//! ```text
//! [codec version = 0]
//! [u16 name length][name, UTF-8]
//! [purpose byte][key type byte]
//! [u32 last assigned version number]
//! [u32 version count]
//! ( [u32 version number][status byte][exportable byte] )*
//! ```
//!
//! All integers are big-endian. Versions are written in ascending order.

use crate::{error::CryptoError, key::KeyType};

use byteorder::{BigEndian, ReadBytesExt};

use std::{convert::TryFrom, fmt, io::Read};

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

const METADATA_CODEC_VERSION: u8 = 0;

/// What a key set may be used for. Fixed when the set is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum KeyPurpose {
    DecryptAndEncrypt = 0,
    Encrypt = 1,
    SignAndVerify = 2,
    Verify = 3,
    Test = 127,
}

impl KeyPurpose {
    /// Whether a key set with this purpose may hold keys of `key_type`.
    pub fn accepts(&self, key_type: KeyType) -> bool {
        match self {
            KeyPurpose::DecryptAndEncrypt => {
                matches!(key_type, KeyType::Aes | KeyType::RsaPrivate)
            }
            KeyPurpose::Encrypt => matches!(key_type, KeyType::RsaPublic),
            KeyPurpose::SignAndVerify => matches!(
                key_type,
                KeyType::Hmac | KeyType::RsaPrivate | KeyType::DsaPrivate
            ),
            KeyPurpose::Verify => matches!(key_type, KeyType::RsaPublic | KeyType::DsaPublic),
            KeyPurpose::Test => true,
        }
    }
}

impl TryFrom<u8> for KeyPurpose {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => KeyPurpose::DecryptAndEncrypt,
            1 => KeyPurpose::Encrypt,
            2 => KeyPurpose::SignAndVerify,
            3 => KeyPurpose::Verify,
            127 => KeyPurpose::Test,
            _ => return Err(CryptoError::UnsupportedType(value)),
        })
    }
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            KeyPurpose::DecryptAndEncrypt => "DecryptAndEncrypt",
            KeyPurpose::Encrypt => "Encrypt",
            KeyPurpose::SignAndVerify => "SignAndVerify",
            KeyPurpose::Verify => "Verify",
            KeyPurpose::Test => "Test",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a key version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum KeyStatus {
    /// Used for all new signatures and ciphertexts. At most one version is primary.
    Primary = 0,
    /// Used only to verify and decrypt.
    #[default]
    Active = 1,
    /// Still usable for verifying and decrypting, but eligible for removal.
    ScheduledForRevocation = 2,
}

impl TryFrom<u8> for KeyStatus {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => KeyStatus::Primary,
            1 => KeyStatus::Active,
            2 => KeyStatus::ScheduledForRevocation,
            _ => return Err(CryptoError::UnsupportedType(value)),
        })
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            KeyStatus::Primary => "Primary",
            KeyStatus::Active => "Active",
            KeyStatus::ScheduledForRevocation => "ScheduledForRevocation",
        };
        f.write_str(name)
    }
}

/// One version entry in a key set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
pub struct KeyVersion {
    /// Version number, starting at 1. Never reused within a key set.
    pub version: u32,
    pub status: KeyStatus,
    pub exportable: bool,
}

impl KeyVersion {
    pub fn new(version: u32, status: KeyStatus) -> Self {
        Self {
            version,
            status,
            exportable: false,
        }
    }
}

/// The name, purpose, key type, and versions of a key set.
///
/// Deserializing goes through the same checks as the binary decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(try_from = "RawMetadata"))]
pub struct KeyMetadata {
    name: String,
    purpose: KeyPurpose,
    key_type: KeyType,
    last_version: u32,
    versions: Vec<KeyVersion>,
}

impl KeyMetadata {
    /// Create metadata for an empty key set. Fails if the purpose can't hold the key type.
    pub fn new(name: &str, purpose: KeyPurpose, key_type: KeyType) -> Result<Self, CryptoError> {
        if !purpose.accepts(key_type) {
            return Err(CryptoError::UnacceptablePurpose {
                purpose,
                context: "purpose does not allow this key type",
            });
        }
        if name.len() > u16::MAX as usize {
            return Err(CryptoError::BadLength {
                step: "key set name",
                expected: u16::MAX as usize,
                actual: name.len(),
            });
        }
        Ok(Self {
            name: name.to_owned(),
            purpose,
            key_type,
            last_version: 0,
            versions: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn purpose(&self) -> KeyPurpose {
        self.purpose
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// All versions, in ascending version order.
    pub fn versions(&self) -> &[KeyVersion] {
        &self.versions
    }

    pub fn version(&self, version: u32) -> Option<&KeyVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub(crate) fn version_mut(&mut self, version: u32) -> Option<&mut KeyVersion> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// The current primary version, if there is one.
    pub fn primary_version(&self) -> Option<&KeyVersion> {
        self.versions
            .iter()
            .find(|v| v.status == KeyStatus::Primary)
    }

    /// The highest version number ever assigned, including versions since removed.
    pub fn last_version(&self) -> u32 {
        self.last_version
    }

    /// Reserve the next version number.
    pub(crate) fn next_version(&self) -> Result<u32, CryptoError> {
        self.last_version
            .checked_add(1)
            .ok_or(CryptoError::BadFormat("version numbers exhausted"))
    }

    /// Add a version entry, keeping versions sorted. The version number must be one that was
    /// never assigned before.
    pub(crate) fn push_version(&mut self, entry: KeyVersion) -> Result<(), CryptoError> {
        if entry.version <= self.last_version {
            return Err(CryptoError::BadFormat("version number was already assigned"));
        }
        self.last_version = entry.version;
        self.versions.push(entry);
        Ok(())
    }

    pub(crate) fn remove_version(&mut self, version: u32) -> Option<KeyVersion> {
        let pos = self.versions.iter().position(|v| v.version == version)?;
        Some(self.versions.remove(pos))
    }

    /// Copy of this metadata with a different purpose and key type but the same versions. Used
    /// when exporting public keys.
    pub(crate) fn with_purpose(
        &self,
        purpose: KeyPurpose,
        key_type: KeyType,
    ) -> Result<Self, CryptoError> {
        let mut meta = Self::new(&self.name, purpose, key_type)?;
        meta.last_version = self.last_version;
        meta.versions = self.versions.clone();
        Ok(meta)
    }

    /// Append the encoded metadata to a byte vector.
    pub fn encode_vec(&self, buf: &mut Vec<u8>) {
        // The name length was checked on creation and decode
        buf.push(METADATA_CODEC_VERSION);
        buf.extend_from_slice(&(self.name.len() as u16).to_be_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(self.purpose as u8);
        buf.push(self.key_type as u8);
        buf.extend_from_slice(&self.last_version.to_be_bytes());
        buf.extend_from_slice(&(self.versions.len() as u32).to_be_bytes());
        for v in self.versions.iter() {
            buf.extend_from_slice(&v.version.to_be_bytes());
            buf.push(v.status as u8);
            buf.push(v.exportable as u8);
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_vec(&mut buf);
        buf
    }
}

fn short(step: &'static str) -> impl Fn(std::io::Error) -> CryptoError {
    move |_| CryptoError::BadLength {
        step,
        expected: 1,
        actual: 0,
    }
}

impl TryFrom<&[u8]> for KeyMetadata {
    type Error = CryptoError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut raw = value;
        let codec = raw.read_u8().map_err(short("get metadata codec version"))?;
        if codec != METADATA_CODEC_VERSION {
            return Err(CryptoError::UnsupportedType(codec));
        }
        let name_len = raw.read_u16::<BigEndian>().map_err(short("get name length"))? as usize;
        let mut name = vec![0u8; name_len];
        raw.read_exact(&mut name).map_err(short("get name"))?;
        let name = String::from_utf8(name).or(Err(CryptoError::BadFormat("name is not UTF-8")))?;
        let purpose = KeyPurpose::try_from(raw.read_u8().map_err(short("get purpose"))?)?;
        let key_type = KeyType::try_from(raw.read_u8().map_err(short("get key type"))?)?;
        let last_version = raw.read_u32::<BigEndian>().map_err(short("get last version"))?;
        let count = raw.read_u32::<BigEndian>().map_err(short("get version count"))?;

        let mut versions = Vec::new();
        for _ in 0..count {
            let version = raw.read_u32::<BigEndian>().map_err(short("get version number"))?;
            let status = KeyStatus::try_from(raw.read_u8().map_err(short("get status"))?)?;
            let exportable = match raw.read_u8().map_err(short("get exportable flag"))? {
                0 => false,
                1 => true,
                _ => return Err(CryptoError::BadFormat("exportable flag is not 0 or 1")),
            };
            versions.push(KeyVersion {
                version,
                status,
                exportable,
            });
        }
        if !raw.is_empty() {
            return Err(CryptoError::BadLength {
                step: "end of metadata",
                expected: 0,
                actual: raw.len(),
            });
        }
        KeyMetadata::from_parts(RawMetadata {
            name,
            purpose,
            key_type,
            last_version,
            versions,
        })
    }
}

/// Unchecked metadata fields, as they come off the wire or out of a deserializer.
#[cfg_attr(feature = "with-serde", derive(Deserialize))]
struct RawMetadata {
    name: String,
    purpose: KeyPurpose,
    key_type: KeyType,
    last_version: u32,
    versions: Vec<KeyVersion>,
}

impl KeyMetadata {
    fn from_parts(raw: RawMetadata) -> Result<Self, CryptoError> {
        let mut meta = Self::new(&raw.name, raw.purpose, raw.key_type)?;
        for entry in raw.versions {
            if entry.version == 0 || entry.version <= meta.last_version {
                return Err(CryptoError::BadFormat(
                    "version numbers must be positive and ascending",
                ));
            }
            meta.push_version(entry)?;
        }
        if raw.last_version < meta.last_version {
            return Err(CryptoError::BadFormat(
                "last assigned version is below an existing version",
            ));
        }
        meta.last_version = raw.last_version;
        Ok(meta)
    }
}

impl TryFrom<RawMetadata> for KeyMetadata {
    type Error = CryptoError;

    fn try_from(raw: RawMetadata) -> Result<Self, Self::Error> {
        KeyMetadata::from_parts(raw)
    }
}
