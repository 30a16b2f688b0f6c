//! Key sets.
//!
//! A [`KeySet`] owns a [`KeyMetadata`] plus one [`Key`] per version, indexed both by version
//! number and by key hash. Signing and encryption use the primary version; verification and
//! decryption look up whichever key the header names.
//!
//! Cryptographic operations only need `&KeySet`, so a set can be shared across threads freely.
//! The administrative operations ([`add_version`](KeySet::add_version),
//! [`promote`](KeySet::promote), [`demote`](KeySet::demote), [`revoke`](KeySet::revoke)) take
//! `&mut KeySet`. When a set needs to be rotated while other threads are using it, wrap it in a
//! [`SharedKeySet`], which puts a single reader-writer lock around it.
//!
//! Key sets are loaded through a [`KeysetReader`], which supplies the encoded metadata and the
//! encoded key material for each version. [`MemoryKeyset`] is a reader backed by plain byte
//! vectors, and can also be built by exporting an existing set.
//!
//! # Example
//!
//! ```
//! # use keyset_crypto::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut csprng = rand::rngs::OsRng;
//! let mut keyset = KeySet::generate(
//!     "example",
//!     KeyPurpose::SignAndVerify,
//!     KeyType::Hmac,
//!     KeysetConfig::default(),
//! )?;
//! let v1 = keyset.add_version(KeyStatus::Primary, &mut csprng)?;
//! let v2 = keyset.add_version(KeyStatus::Primary, &mut csprng)?;
//! assert_eq!(keyset.primary_key()?.hash(), keyset.key_by_version(v2).unwrap().hash());
//!
//! // Retire the first version
//! keyset.demote(v1)?;
//! keyset.revoke(v1)?;
//!
//! // Save it off, then load it back for signing
//! let stored = MemoryKeyset::export(&keyset);
//! let loaded = KeySet::read(&stored, OperationClass::Signer)?;
//! assert_eq!(loaded.versions().len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::{
    config::KeysetConfig,
    error::CryptoError,
    hash::KeyHash,
    key::{Key, KeyType},
    metadata::{KeyMetadata, KeyPurpose, KeyStatus, KeyVersion},
};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, trace};

use std::{
    collections::{BTreeMap, HashMap},
    convert::TryFrom,
    fmt,
};

/// The kind of front end a key set is being loaded for. Each accepts a subset of purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Accepts `SignAndVerify` and `Verify`.
    Verifier,
    /// Accepts `SignAndVerify`.
    Signer,
    /// Accepts `DecryptAndEncrypt` and `Encrypt`.
    Encrypter,
    /// Accepts `DecryptAndEncrypt`.
    Crypter,
    /// Accepts any purpose. Used for administration.
    Admin,
}

impl OperationClass {
    /// Whether a key set with `purpose` can back this class of operation. Sets with the `Test`
    /// purpose are accepted everywhere.
    pub fn accepts(&self, purpose: KeyPurpose) -> bool {
        use KeyPurpose::*;
        match self {
            OperationClass::Verifier => matches!(purpose, SignAndVerify | Verify | Test),
            OperationClass::Signer => matches!(purpose, SignAndVerify | Test),
            OperationClass::Encrypter => matches!(purpose, DecryptAndEncrypt | Encrypt | Test),
            OperationClass::Crypter => matches!(purpose, DecryptAndEncrypt | Test),
            OperationClass::Admin => true,
        }
    }
}

/// A source of encoded key set data.
///
/// Implementors typically read from files or a database. Failures should be reported as
/// [`CryptoError::ReaderError`]; any error returned aborts loading.
pub trait KeysetReader {
    /// The encoded [`KeyMetadata`].
    fn metadata(&self) -> Result<Vec<u8>, CryptoError>;
    /// The encoded [`Key`] for one version.
    fn key(&self, version: u32) -> Result<Vec<u8>, CryptoError>;
}

/// An in-memory [`KeysetReader`].
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyset {
    metadata: Vec<u8>,
    keys: BTreeMap<u32, Vec<u8>>,
}

impl MemoryKeyset {
    /// Build from already-encoded metadata and keys.
    pub fn new(metadata: Vec<u8>, keys: BTreeMap<u32, Vec<u8>>) -> Self {
        Self { metadata, keys }
    }

    /// Encode every version of an existing key set.
    pub fn export(keyset: &KeySet) -> Self {
        let keys = keyset
            .keys
            .iter()
            .map(|(version, key)| (*version, key.to_vec()))
            .collect();
        Self {
            metadata: keyset.metadata.to_vec(),
            keys,
        }
    }

    /// The encoded metadata.
    pub fn metadata_bytes(&self) -> &[u8] {
        &self.metadata
    }

    /// The encoded key for a version, if present.
    pub fn key_bytes(&self, version: u32) -> Option<&[u8]> {
        self.keys.get(&version).map(|k| k.as_slice())
    }
}

impl KeysetReader for MemoryKeyset {
    fn metadata(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(self.metadata.clone())
    }

    fn key(&self, version: u32) -> Result<Vec<u8>, CryptoError> {
        self.keys
            .get(&version)
            .cloned()
            .ok_or_else(|| CryptoError::ReaderError(format!("no key data for version {}", version)))
    }
}

/// A named, versioned collection of keys of one type.
#[derive(Clone)]
pub struct KeySet {
    metadata: KeyMetadata,
    config: KeysetConfig,
    keys: BTreeMap<u32, Key>,
    by_hash: HashMap<u32, u32>,
    primary: Option<u32>,
}

impl KeySet {
    /// Create a new, empty key set. Fails if `purpose` can't hold keys of `key_type`.
    pub fn generate(
        name: &str,
        purpose: KeyPurpose,
        key_type: KeyType,
        config: KeysetConfig,
    ) -> Result<Self, CryptoError> {
        config.validate()?;
        let metadata = KeyMetadata::new(name, purpose, key_type)?;
        debug!(keyset = name, %purpose, %key_type, "created key set");
        Ok(Self {
            metadata,
            config,
            keys: BTreeMap::new(),
            by_hash: HashMap::new(),
            primary: None,
        })
    }

    /// Load a key set for the given class of operation, with the default configuration.
    pub fn read<R>(reader: &R, class: OperationClass) -> Result<Self, CryptoError>
    where
        R: KeysetReader + ?Sized,
    {
        Self::read_with_config(reader, class, KeysetConfig::default())
    }

    /// Load a key set for the given class of operation.
    ///
    /// Fails with `UnacceptablePurpose` if the set's purpose doesn't suit `class`,
    /// `DuplicateKeyIdentifier` if two versions share a key hash, and `MultiplePrimaryKeys` if
    /// more than one version is primary.
    pub fn read_with_config<R>(
        reader: &R,
        class: OperationClass,
        config: KeysetConfig,
    ) -> Result<Self, CryptoError>
    where
        R: KeysetReader + ?Sized,
    {
        config.validate()?;
        let metadata = KeyMetadata::try_from(&reader.metadata()?[..])?;
        if !class.accepts(metadata.purpose()) {
            return Err(CryptoError::UnacceptablePurpose {
                purpose: metadata.purpose(),
                context: "purpose does not permit this operation",
            });
        }

        let mut keyset = KeySet {
            metadata: metadata.clone(),
            config,
            keys: BTreeMap::new(),
            by_hash: HashMap::new(),
            primary: None,
        };
        for version in metadata.versions() {
            let key = Key::try_from(&reader.key(version.version)?[..])?;
            if key.key_type() != metadata.key_type() {
                return Err(CryptoError::UnsupportedType(key.key_type() as u8));
            }
            let hash = key.hash();
            if keyset.by_hash.contains_key(&hash.to_u32()) {
                return Err(CryptoError::DuplicateKeyIdentifier(hash));
            }
            if version.status == KeyStatus::Primary {
                if keyset.primary.is_some() {
                    return Err(CryptoError::MultiplePrimaryKeys);
                }
                keyset.primary = Some(version.version);
            }
            keyset.by_hash.insert(hash.to_u32(), version.version);
            keyset.keys.insert(version.version, key);
        }
        debug!(
            keyset = keyset.metadata.name(),
            versions = keyset.keys.len(),
            ?class,
            "loaded key set"
        );
        Ok(keyset)
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn purpose(&self) -> KeyPurpose {
        self.metadata.purpose()
    }

    pub fn key_type(&self) -> KeyType {
        self.metadata.key_type()
    }

    pub fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &KeysetConfig {
        &self.config
    }

    /// All versions, in ascending order.
    pub fn versions(&self) -> &[KeyVersion] {
        self.metadata.versions()
    }

    /// Fail with `UnacceptablePurpose` unless this set can back `class`.
    pub fn check_purpose(&self, class: OperationClass) -> Result<(), CryptoError> {
        if class.accepts(self.purpose()) {
            Ok(())
        } else {
            Err(CryptoError::UnacceptablePurpose {
                purpose: self.purpose(),
                context: "purpose does not permit this operation",
            })
        }
    }

    /// The key used for new signatures and ciphertexts.
    pub fn primary_key(&self) -> Result<&Key, CryptoError> {
        self.primary
            .and_then(|v| self.keys.get(&v))
            .ok_or(CryptoError::NoPrimaryKey)
    }

    /// The primary version number, if there is one.
    pub fn primary_version(&self) -> Option<u32> {
        self.primary
    }

    pub fn key_by_hash(&self, hash: &KeyHash) -> Option<&Key> {
        self.by_hash
            .get(&hash.to_u32())
            .and_then(|v| self.keys.get(v))
    }

    pub fn key_by_version(&self, version: u32) -> Option<&Key> {
        self.keys.get(&version)
    }

    /// Iterate over all keys in ascending version order.
    pub fn keys(&self) -> impl Iterator<Item = (u32, &Key)> {
        self.keys.iter().map(|(v, k)| (*v, k))
    }

    /// Generate a new key and add it as the next version.
    ///
    /// If `status` is `Primary`, the current primary version (if any) becomes `Active`. Returns
    /// the new version number.
    pub fn add_version<R>(&mut self, status: KeyStatus, csprng: &mut R) -> Result<u32, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        let key_type = self.key_type();
        let config = self.config.clone();
        self.add_version_with(status, || Key::generate(key_type, &config, &mut *csprng))
    }

    /// Add a new version using keys from `generate`.
    ///
    /// A key whose hash matches one already in the set is discarded and `generate` is called
    /// again, up to the configured `max_generation_attempts`. After that the call fails with
    /// `ExhaustedKeyGeneration` and the set is left unchanged.
    pub fn add_version_with<F>(&mut self, status: KeyStatus, mut generate: F) -> Result<u32, CryptoError>
    where
        F: FnMut() -> Result<Key, CryptoError>,
    {
        let attempts = self.config.max_generation_attempts;
        for attempt in 1..=attempts {
            if let Some(version) = self.try_insert(status, generate()?, attempt)? {
                return Ok(version);
            }
        }
        Err(CryptoError::ExhaustedKeyGeneration { attempts })
    }

    /// Add `key` as the next version, unless its hash collides with a key already in the set.
    fn try_insert(
        &mut self,
        status: KeyStatus,
        key: Key,
        attempt: u32,
    ) -> Result<Option<u32>, CryptoError> {
        if key.key_type() != self.key_type() {
            return Err(CryptoError::UnsupportedType(key.key_type() as u8));
        }
        let hash = key.hash();
        if self.by_hash.contains_key(&hash.to_u32()) {
            trace!(attempt, %hash, "generated key hash collides, regenerating");
            return Ok(None);
        }

        let version = self.metadata.next_version()?;
        self.metadata.push_version(KeyVersion::new(version, KeyStatus::Active))?;
        self.by_hash.insert(hash.to_u32(), version);
        self.keys.insert(version, key);
        debug!(keyset = self.name(), version, %hash, %status, "added key version");
        match status {
            KeyStatus::Primary => self.promote(version)?,
            KeyStatus::ScheduledForRevocation => self.set_status(version, status),
            KeyStatus::Active => (),
        }
        Ok(Some(version))
    }

    /// Make a version primary. The previous primary version becomes `Active`. Does nothing if the
    /// version is already primary.
    pub fn promote(&mut self, version: u32) -> Result<(), CryptoError> {
        let status = self.status(version)?;
        if status == KeyStatus::Primary {
            return Ok(());
        }
        if let Some(old) = self.primary {
            self.set_status(old, KeyStatus::Active);
            debug!(keyset = self.name(), version = old, "demoted primary to active");
        }
        self.set_status(version, KeyStatus::Primary);
        self.primary = Some(version);
        debug!(keyset = self.name(), version, from = %status, "promoted to primary");
        Ok(())
    }

    /// Step a version down: `Primary` becomes `Active`, leaving the set with no primary, and
    /// `Active` becomes `ScheduledForRevocation`. A version already scheduled for revocation is
    /// left as it is.
    pub fn demote(&mut self, version: u32) -> Result<(), CryptoError> {
        let status = self.status(version)?;
        let new_status = match status {
            KeyStatus::Primary => {
                self.primary = None;
                KeyStatus::Active
            }
            KeyStatus::Active | KeyStatus::ScheduledForRevocation => {
                KeyStatus::ScheduledForRevocation
            }
        };
        self.set_status(version, new_status);
        debug!(keyset = self.name(), version, from = %status, to = %new_status, "demoted key version");
        Ok(())
    }

    /// Remove a version that is scheduled for revocation. Its version number is not reused.
    pub fn revoke(&mut self, version: u32) -> Result<(), CryptoError> {
        if self.status(version)? != KeyStatus::ScheduledForRevocation {
            return Err(CryptoError::InvalidStatusForRevocation(version));
        }
        self.metadata.remove_version(version);
        if let Some(key) = self.keys.remove(&version) {
            self.by_hash.remove(&key.hash().to_u32());
        }
        debug!(keyset = self.name(), version, "revoked key version");
        Ok(())
    }

    /// Build a key set holding only the public halves of this set's keys, with the same version
    /// numbers and statuses.
    ///
    /// A `SignAndVerify` set of RSA or DSA keys becomes a `Verify` set, and a `DecryptAndEncrypt`
    /// set of RSA keys becomes an `Encrypt` set. Anything else fails with `UnacceptablePurpose`.
    pub fn public_keyset(&self) -> Result<KeySet, CryptoError> {
        let purpose = match (self.purpose(), self.key_type()) {
            (KeyPurpose::SignAndVerify, KeyType::RsaPrivate | KeyType::DsaPrivate) => {
                KeyPurpose::Verify
            }
            (KeyPurpose::DecryptAndEncrypt, KeyType::RsaPrivate) => KeyPurpose::Encrypt,
            (purpose, _) => {
                return Err(CryptoError::UnacceptablePurpose {
                    purpose,
                    context: "key set has no public keys to export",
                })
            }
        };
        let key_type = self
            .key_type()
            .public_type()
            .ok_or(CryptoError::NotExportable("key type has no public half"))?;
        let metadata = self.metadata.with_purpose(purpose, key_type)?;
        let mut keys = BTreeMap::new();
        for (version, key) in self.keys.iter() {
            keys.insert(*version, key.public_key()?);
        }
        debug!(keyset = self.name(), %purpose, "exported public key set");
        Ok(KeySet {
            metadata,
            config: self.config.clone(),
            keys,
            by_hash: self.by_hash.clone(),
            primary: self.primary,
        })
    }

    fn status(&self, version: u32) -> Result<KeyStatus, CryptoError> {
        self.metadata
            .version(version)
            .map(|v| v.status)
            .ok_or(CryptoError::VersionNotFound(version))
    }

    fn set_status(&mut self, version: u32, status: KeyStatus) {
        if let Some(v) = self.metadata.version_mut(version) {
            v.status = status;
        }
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("name", &self.name())
            .field("purpose", &self.purpose())
            .field("key_type", &self.key_type())
            .field("versions", &self.versions())
            .field("primary", &self.primary)
            .finish()
    }
}

/// A [`KeySet`] behind a reader-writer lock.
///
/// Any number of threads can hold a read guard and run cryptographic operations at once.
/// Administrative operations take the write lock, so they never overlap each other or a reader.
#[derive(Debug)]
pub struct SharedKeySet {
    inner: RwLock<KeySet>,
}

impl SharedKeySet {
    pub fn new(keyset: KeySet) -> Self {
        Self {
            inner: RwLock::new(keyset),
        }
    }

    /// Lock for reading. Front ends like [`Signer`](crate::envelope::Signer) borrow from the
    /// guard.
    pub fn read(&self) -> RwLockReadGuard<'_, KeySet> {
        self.inner.read()
    }

    /// Lock for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, KeySet> {
        self.inner.write()
    }

    /// Generate a new key and add it as the next version.
    ///
    /// Keys are generated with no lock held. The write lock is only taken to check each new key's
    /// hash against the set and insert it.
    pub fn add_version<R>(&self, status: KeyStatus, csprng: &mut R) -> Result<u32, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        let (key_type, config) = {
            let keyset = self.inner.read();
            (keyset.key_type(), keyset.config().clone())
        };
        let attempts = config.max_generation_attempts;
        for attempt in 1..=attempts {
            let key = Key::generate(key_type, &config, &mut *csprng)?;
            if let Some(version) = self.inner.write().try_insert(status, key, attempt)? {
                return Ok(version);
            }
        }
        Err(CryptoError::ExhaustedKeyGeneration { attempts })
    }

    pub fn promote(&self, version: u32) -> Result<(), CryptoError> {
        self.inner.write().promote(version)
    }

    pub fn demote(&self, version: u32) -> Result<(), CryptoError> {
        self.inner.write().demote(version)
    }

    pub fn revoke(&self, version: u32) -> Result<(), CryptoError> {
        self.inner.write().revoke(version)
    }

    pub fn into_inner(self) -> KeySet {
        self.inner.into_inner()
    }
}

impl From<KeySet> for SharedKeySet {
    fn from(keyset: KeySet) -> Self {
        Self::new(keyset)
    }
}
