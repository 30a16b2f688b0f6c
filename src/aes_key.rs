//! AES-CBC keys with an attached HMAC integrity key.
//!
//! An [`AesKey`] encrypts with AES in CBC mode and PKCS#7 padding under a fresh random IV, and
//! carries an [`HmacKey`] that authenticates the whole ciphertext. The envelope layer appends the
//! HMAC trailer after the ciphertext body and checks it before decrypting anything.
//!
//! # Format
//!
//! The encryption stream output is the 16-byte IV followed by the padded ciphertext blocks, so a
//! message of `n` bytes becomes `16 + 16 * (n / 16 + 1)` bytes before the trailer is added.

use crate::{
    error::CryptoError,
    hash::{KeyHash, KeyHasher},
    hmac_key::{HmacKey, HmacStream, HMAC_DIGEST_SIZE},
};

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{
    block_padding::{Pkcs7, RawPadding},
    generic_array::GenericArray,
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use std::fmt;

/// AES block size, which is also the IV size.
pub const AES_BLOCK_SIZE: usize = 16;

/// Default AES key size, in bits.
pub const DEFAULT_AES_KEY_BITS: usize = 128;

/// A symmetric encryption key.
#[derive(Clone)]
pub struct AesKey {
    key: Vec<u8>,
    hmac: HmacKey,
    hash: KeyHash,
}

impl AesKey {
    /// Generate a new AES key of `bits` length, along with a new HMAC key of `hmac_bits` length.
    pub fn generate<R>(csprng: &mut R, bits: usize, hmac_bits: usize) -> Result<Self, CryptoError>
    where
        R: CryptoRng + RngCore,
    {
        check_key_len(bits / 8).or(Err(CryptoError::UnsupportedKeySize {
            key_type: "AES",
            size: bits,
        }))?;
        if bits % 8 != 0 {
            return Err(CryptoError::UnsupportedKeySize {
                key_type: "AES",
                size: bits,
            });
        }
        let mut key = vec![0u8; bits / 8];
        csprng.fill_bytes(&mut key);
        let hmac = HmacKey::generate(csprng, hmac_bits)?;
        Ok(Self::from_parts(key, hmac))
    }

    /// Load a key from the raw AES key bytes and its integrity key.
    pub fn from_bytes(raw: &[u8], hmac: HmacKey) -> Result<Self, CryptoError> {
        check_key_len(raw.len())?;
        Ok(Self::from_parts(raw.to_vec(), hmac))
    }

    fn from_parts(key: Vec<u8>, hmac: HmacKey) -> Self {
        let mut hasher = KeyHasher::new();
        hasher.update_field(&key);
        hasher.update_field(hmac.raw());
        Self {
            hash: hasher.finalize(),
            key,
            hmac,
        }
    }

    pub fn hash(&self) -> KeyHash {
        self.hash
    }

    /// AES key size, in bits.
    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }

    /// The attached integrity key.
    pub fn hmac_key(&self) -> &HmacKey {
        &self.hmac
    }

    pub(crate) fn raw(&self) -> &[u8] {
        &self.key
    }

    /// Upper bound on the encryption stream's output for `input_len` bytes of plaintext,
    /// including the IV and the integrity trailer.
    pub fn max_output_size(&self, input_len: usize) -> usize {
        AES_BLOCK_SIZE + (input_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE + HMAC_DIGEST_SIZE
    }

    /// Start an encryption stream under a freshly generated IV.
    pub fn encrypt_stream<R>(&self, csprng: &mut R) -> Result<AesEncryptStream, CryptoError>
    where
        R: CryptoRng + RngCore + ?Sized,
    {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        csprng.fill_bytes(&mut iv);
        let cipher = CbcEncryptor::new(&self.key, &iv)?;
        Ok(AesEncryptStream {
            cipher,
            iv,
            iv_taken: false,
            pending: Vec::with_capacity(AES_BLOCK_SIZE),
        })
    }

    /// Start a decryption stream. The first 16 bytes fed into it are taken as the IV.
    pub fn decrypt_stream(&self) -> AesDecryptStream {
        AesDecryptStream {
            key: self.key.clone(),
            state: DecryptState::AwaitingIv(Vec::with_capacity(AES_BLOCK_SIZE)),
        }
    }

    /// Start a stream over the integrity key.
    pub fn integrity_stream(&self) -> Result<HmacStream, CryptoError> {
        self.hmac.stream()
    }
}

impl Drop for AesKey {
    fn drop(&mut self) {
        self.key.zeroize();
        debug_assert!(self.key.iter().all(|b| *b == 0));
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AesKey")
            .field("bits", &self.bits())
            .field("hash", &self.hash)
            .field("hmac", &self.hmac)
            .finish()
    }
}

fn check_key_len(len: usize) -> Result<(), CryptoError> {
    match len {
        16 | 24 | 32 => Ok(()),
        _ => Err(CryptoError::BadLength {
            step: "get AES key",
            expected: 16,
            actual: len,
        }),
    }
}

fn unavailable<E>(_: E) -> CryptoError {
    CryptoError::AlgorithmUnavailable("AES-CBC")
}

enum CbcEncryptor {
    Aes128(cbc::Encryptor<Aes128>),
    Aes192(cbc::Encryptor<Aes192>),
    Aes256(cbc::Encryptor<Aes256>),
}

impl CbcEncryptor {
    fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        Ok(match key.len() {
            16 => Self::Aes128(cbc::Encryptor::new_from_slices(key, iv).map_err(unavailable)?),
            24 => Self::Aes192(cbc::Encryptor::new_from_slices(key, iv).map_err(unavailable)?),
            32 => Self::Aes256(cbc::Encryptor::new_from_slices(key, iv).map_err(unavailable)?),
            _ => return Err(CryptoError::AlgorithmUnavailable("AES-CBC")),
        })
    }

    /// Encrypt whole blocks in place. `data` must be a multiple of the block size.
    fn encrypt_blocks(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(block);
            match self {
                Self::Aes128(c) => c.encrypt_block_mut(block),
                Self::Aes192(c) => c.encrypt_block_mut(block),
                Self::Aes256(c) => c.encrypt_block_mut(block),
            }
        }
    }
}

enum CbcDecryptor {
    Aes128(cbc::Decryptor<Aes128>),
    Aes192(cbc::Decryptor<Aes192>),
    Aes256(cbc::Decryptor<Aes256>),
}

impl CbcDecryptor {
    fn new(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        Ok(match key.len() {
            16 => Self::Aes128(cbc::Decryptor::new_from_slices(key, iv).map_err(unavailable)?),
            24 => Self::Aes192(cbc::Decryptor::new_from_slices(key, iv).map_err(unavailable)?),
            32 => Self::Aes256(cbc::Decryptor::new_from_slices(key, iv).map_err(unavailable)?),
            _ => return Err(CryptoError::AlgorithmUnavailable("AES-CBC")),
        })
    }

    fn decrypt_blocks(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(block);
            match self {
                Self::Aes128(c) => c.decrypt_block_mut(block),
                Self::Aes192(c) => c.decrypt_block_mut(block),
                Self::Aes256(c) => c.decrypt_block_mut(block),
            }
        }
    }
}

/// A single-use AES-CBC encryption. Holds back any partial block until more data arrives or the
/// stream is finished.
pub struct AesEncryptStream {
    cipher: CbcEncryptor,
    iv: [u8; AES_BLOCK_SIZE],
    iv_taken: bool,
    pending: Vec<u8>,
}

impl AesEncryptStream {
    /// Returns the IV prefix. Only the first call returns it; later calls return nothing.
    pub fn init(&mut self) -> Vec<u8> {
        if self.iv_taken {
            return Vec::new();
        }
        self.iv_taken = true;
        self.iv.to_vec()
    }

    /// Encrypt as many whole blocks as are available, returning the resulting ciphertext.
    pub fn update(&mut self, data: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(data);
        let ready = self.pending.len() - (self.pending.len() % AES_BLOCK_SIZE);
        let mut out: Vec<u8> = self.pending.drain(..ready).collect();
        self.cipher.encrypt_blocks(&mut out);
        out
    }

    /// Pad and encrypt the final block.
    pub fn finish(mut self) -> Vec<u8> {
        let mut block = [0u8; AES_BLOCK_SIZE];
        let pos = self.pending.len();
        block[..pos].copy_from_slice(&self.pending);
        Pkcs7::raw_pad(&mut block, pos);
        self.cipher.encrypt_blocks(&mut block);
        self.pending.zeroize();
        block.to_vec()
    }
}

impl fmt::Debug for AesEncryptStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AesEncryptStream")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

enum DecryptState {
    AwaitingIv(Vec<u8>),
    Running {
        cipher: CbcDecryptor,
        pending: Vec<u8>,
    },
}

/// A single-use AES-CBC decryption. The last full block is always held back, since it carries the
/// padding and can only be handled by [`finish`](Self::finish).
pub struct AesDecryptStream {
    key: Vec<u8>,
    state: DecryptState,
}

impl AesDecryptStream {
    pub fn update(&mut self, mut data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if let DecryptState::AwaitingIv(iv) = &mut self.state {
            let take = (AES_BLOCK_SIZE - iv.len()).min(data.len());
            iv.extend_from_slice(&data[..take]);
            data = &data[take..];
            if iv.len() < AES_BLOCK_SIZE {
                return Ok(Vec::new());
            }
            let cipher = CbcDecryptor::new(&self.key, iv)?;
            self.state = DecryptState::Running {
                cipher,
                pending: Vec::new(),
            };
        }
        let DecryptState::Running { cipher, pending } = &mut self.state else {
            return Ok(Vec::new());
        };
        pending.extend_from_slice(data);
        if pending.len() <= AES_BLOCK_SIZE {
            return Ok(Vec::new());
        }
        let ready = ((pending.len() - 1) / AES_BLOCK_SIZE) * AES_BLOCK_SIZE;
        let mut out: Vec<u8> = pending.drain(..ready).collect();
        cipher.decrypt_blocks(&mut out);
        Ok(out)
    }

    /// Decrypt the final block and strip its padding.
    pub fn finish(mut self) -> Result<Vec<u8>, CryptoError> {
        let DecryptState::Running { cipher, pending } = &mut self.state else {
            return Err(CryptoError::ShortCiphertext);
        };
        if pending.len() != AES_BLOCK_SIZE {
            return Err(CryptoError::CryptoOperationFailed(
                "ciphertext is not a whole number of blocks",
            ));
        }
        cipher.decrypt_blocks(pending);
        let out = Pkcs7::raw_unpad(pending)
            .or(Err(CryptoError::CryptoOperationFailed("bad padding")))?
            .to_vec();
        pending.zeroize();
        Ok(out)
    }
}

impl Drop for AesDecryptStream {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for AesDecryptStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AesDecryptStream").finish_non_exhaustive()
    }
}
