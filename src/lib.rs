/*!
Versioned key sets for signing, verification, encryption, and decryption.

Applications hold a [`KeySet`]: a named collection of keys of one type, each stored under a
version number and carrying a [`KeyStatus`]. New signatures and ciphertexts are always made with
the single primary version, while any version still in the set can verify or decrypt. This makes
key rotation a matter of adding a new primary version, waiting for old data to age out, and then
demoting and revoking the old one.

Every signature and ciphertext starts with a 5-byte header holding a format version and the
[`KeyHash`] of the key used. Verifiers and decrypters look the key up by that hash, so callers
never need to track which key produced what.

```
# use keyset_crypto::*;
# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut csprng = rand::rngs::OsRng;
let mut keyset = KeySet::generate(
    "hmac-test",
    KeyPurpose::SignAndVerify,
    KeyType::Hmac,
    KeysetConfig::default(),
)?;
keyset.add_version(KeyStatus::Primary, &mut csprng)?;

let signer = Signer::new(&keyset)?;
let signature = signer.sign(b"This is some test input")?;
assert!(signer.verify(b"This is some test input", &signature)?);
# Ok(())
# }
```

# Cryptographic Algorithms Used

Each key set holds keys of exactly one type:

- AES: AES-CBC with PKCS#7 padding and a random IV, paired with an HMAC-SHA1 key that
  authenticates the header, IV, and ciphertext. 128-bit keys by default.
- HMAC: HMAC-SHA1 with 256-bit keys.
- RSA: RSA-OAEP (SHA-1) for encryption, PKCS#1 v1.5 with SHA-1 for signatures. 2048-bit moduli by
  default.
- DSA: DSA with SHA-1 digests and deterministic nonces. 2048/256 domain parameters by default.

Key hashes are the first 4 bytes of a SHA-1 digest over the key's public fields, each prefixed
with its big-endian length.

# Module Layout

- [`key`] holds the [`Key`] union over the concrete key types in [`aes_key`], [`hmac_key`],
  [`rsa_key`], and [`dsa_key`].
- [`stream`] holds the single-use capability streams every operation runs through.
- [`metadata`] and [`keyset`] manage versions and statuses.
- [`envelope`] builds and checks the header-prefixed signatures and ciphertexts.
- [`config`] sets key sizes, generation limits, plaintext compression, and text encoding.

*/

mod error;
pub use self::error::CryptoError;

pub mod hash;
pub use hash::KeyHash;

pub mod stream;

pub mod aes_key;
pub mod dsa_key;
pub mod hmac_key;
pub mod rsa_key;

pub mod key;
pub use key::{Key, KeyType};

pub mod metadata;
pub use metadata::{KeyMetadata, KeyPurpose, KeyStatus, KeyVersion};

pub mod config;
pub use config::{Compression, Encoding, KeysetConfig};

pub mod keyset;
pub use keyset::{KeySet, KeysetReader, MemoryKeyset, OperationClass, SharedKeySet};

pub mod envelope;
pub use envelope::{Crypter, Encrypter, Signer, UnversionedSigner, UnversionedVerifier, Verifier};

#[cfg(feature = "with-serde")]
pub mod serde;

use rand_core::{CryptoRng, RngCore};

/// The format version byte that starts every signature and ciphertext header.
pub const FORMAT_VERSION: u8 = 0;

/// Length of a [`KeyHash`].
pub const KEY_HASH_SIZE: usize = 4;

/// Length of the header on every signature and ciphertext: the format version plus the key hash.
pub const HEADER_SIZE: usize = 1 + KEY_HASH_SIZE;

/// Holds a cryptographic random number generator (RNG). This trait is needed so that a RNG can be
/// passed around as a trait object.
pub trait CryptoSrc: CryptoRng + RngCore {}
impl<T: CryptoRng + RngCore> CryptoSrc for T {}
