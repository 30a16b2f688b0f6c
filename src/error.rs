use thiserror::Error;

/// Possible error conditions for key set handling, signing, and encryption.
///
/// Errors fall into three groups. Structural errors mean the input or the key set doesn't have
/// the expected shape. Cryptographic errors mean a signature didn't check out or a primitive
/// refused to run. Lifecycle errors come out of the administrative operations on a
/// [`KeySet`](crate::keyset::KeySet).
///
/// None of these are transient; retrying the same call with the same input will fail the same
/// way.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The format version byte at the start of a signature or ciphertext isn't one this library
    /// produces.
    #[error("Unrecognized format version byte: {0}")]
    BadVersion(u8),
    /// A signature was too short to hold a header and the trailer for its key.
    #[error("Signature is too short")]
    ShortSignature,
    /// A ciphertext was too short to hold a header (and trailer, if the key uses one).
    #[error("Ciphertext is too short")]
    ShortCiphertext,
    /// No key in the set matches the key hash in a header.
    #[error("No key in the set has hash {0}")]
    KeyNotFound(crate::hash::KeyHash),
    /// Two keys in the same set share a key hash.
    #[error("Two keys in the set share the hash {0}")]
    DuplicateKeyIdentifier(crate::hash::KeyHash),
    /// More than one version in the key set is marked as primary.
    #[error("Key set has more than one primary version")]
    MultiplePrimaryKeys,
    /// The key set's purpose (or key type) doesn't permit the requested operation.
    #[error("Key set purpose {purpose} is unacceptable: {context}")]
    UnacceptablePurpose {
        purpose: crate::metadata::KeyPurpose,
        context: &'static str,
    },
    /// An integrity trailer failed verification. Decryption stops before producing plaintext.
    #[error("Signature or integrity trailer failed verification")]
    InvalidSignature,
    /// The underlying primitive failed while running.
    #[error("Cryptographic operation failed: {0}")]
    CryptoOperationFailed(&'static str),
    /// The underlying primitive couldn't be set up with the given parameters.
    #[error("Algorithm unavailable: {0}")]
    AlgorithmUnavailable(&'static str),
    /// The key set has no primary version to sign or encrypt with.
    #[error("Key set has no primary version")]
    NoPrimaryKey,
    /// The requested version number isn't in the key set.
    #[error("Version {0} is not in the key set")]
    VersionNotFound(u32),
    /// Only versions scheduled for revocation can be revoked.
    #[error("Version {0} must be scheduled for revocation before it can be revoked")]
    InvalidStatusForRevocation(u32),
    /// Key generation kept colliding with existing key hashes.
    #[error("Gave up generating a key with a unique hash after {attempts} attempts")]
    ExhaustedKeyGeneration { attempts: u32 },
    /// The key set reader failed to provide metadata or key material.
    #[error("Key set reader failed: {0}")]
    ReaderError(String),
    /// The provided data for encode/decode wasn't the correct length.
    #[error("Expected length {expected}, got {actual} on step [{step}]")]
    BadLength {
        step: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The data format doesn't match what was expected.
    #[error("Format of data is wrong: {0}")]
    BadFormat(&'static str),
    /// Plaintext couldn't be compressed, or decrypted plaintext didn't decompress with the key
    /// set's configured compression.
    #[error("Compression failed: {0}")]
    CompressionFailed(&'static str),
    /// A provided cryptographic key is weak or invalid.
    #[error("Crypto key is weak or invalid")]
    BadKey,
    /// Encoded key material or metadata carries a type, purpose, or status tag this library
    /// doesn't know.
    #[error("Unsupported type tag: {0}")]
    UnsupportedType(u8),
    /// A requested key size isn't one the key type supports.
    #[error("Unsupported key size {size} for {key_type}")]
    UnsupportedKeySize { key_type: &'static str, size: usize },
    /// The key can't be exported, or has no public half to export.
    #[error("Key cannot be exported: {0}")]
    NotExportable(&'static str),
}

impl CryptoError {
    /// Produce a plain string describing the error, suitable for the `custom` error constructor
    /// in serde.
    pub fn serde_err(&self) -> String {
        self.to_string()
    }
}
