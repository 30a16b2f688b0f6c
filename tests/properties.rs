use keyset_crypto::*;
use proptest::prelude::*;

use std::{collections::HashSet, sync::OnceLock};

fn hmac_keyset() -> &'static KeySet {
    static KEYSET: OnceLock<KeySet> = OnceLock::new();
    KEYSET.get_or_init(|| {
        let mut csprng = rand::rngs::OsRng;
        let mut keyset = KeySet::generate(
            "prop-hmac",
            KeyPurpose::SignAndVerify,
            KeyType::Hmac,
            KeysetConfig::default(),
        )
        .unwrap();
        keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        keyset
    })
}

fn aes_keyset() -> &'static KeySet {
    static KEYSET: OnceLock<KeySet> = OnceLock::new();
    KEYSET.get_or_init(|| {
        let mut csprng = rand::rngs::OsRng;
        let mut keyset = KeySet::generate(
            "prop-aes",
            KeyPurpose::DecryptAndEncrypt,
            KeyType::Aes,
            KeysetConfig::default(),
        )
        .unwrap();
        keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
        keyset
    })
}

proptest! {
    #[test]
    fn prop_sign_then_verify(message in proptest::collection::vec(any::<u8>(), 0..512)) {
        let signer = Signer::new(hmac_keyset()).unwrap();
        let signature = signer.sign(&message).unwrap();
        prop_assert!(signer.verify(&message, &signature).unwrap());
    }

    #[test]
    fn prop_other_message_fails(
        a in proptest::collection::vec(any::<u8>(), 0..128),
        b in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        prop_assume!(a != b);
        let signer = Signer::new(hmac_keyset()).unwrap();
        let signature = signer.sign(&a).unwrap();
        prop_assert!(!signer.verify(&b, &signature).unwrap());
    }

    #[test]
    fn prop_encrypt_then_decrypt(message in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let mut csprng = rand::rngs::OsRng;
        let crypter = Crypter::new(aes_keyset()).unwrap();
        let ciphertext = crypter.encrypt(&message, &mut csprng).unwrap();
        prop_assert_eq!(ciphertext.len(), HEADER_SIZE + 16 + (message.len() / 16 + 1) * 16 + 20);
        prop_assert_eq!(crypter.decrypt(&ciphertext).unwrap(), message);
    }

    #[test]
    fn prop_any_flip_is_rejected(
        message in proptest::collection::vec(any::<u8>(), 1..64),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut csprng = rand::rngs::OsRng;
        let crypter = Crypter::new(aes_keyset()).unwrap();
        let mut ciphertext = crypter.encrypt(&message, &mut csprng).unwrap();
        let i = index.index(ciphertext.len());
        ciphertext[i] ^= 1 << bit;
        let result = crypter.decrypt(&ciphertext);
        prop_assert!(result.is_err());
        if i >= HEADER_SIZE {
            prop_assert!(matches!(result, Err(CryptoError::InvalidSignature)));
        }
    }

    #[test]
    fn prop_garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let crypter = Crypter::new(aes_keyset()).unwrap();
        let _ = crypter.decrypt(&data);
        let verifier = Verifier::new(hmac_keyset()).unwrap();
        let _ = verifier.verify(b"message", &data);
        let _ = Key::try_from(&data[..]);
        let _ = KeyMetadata::try_from(&data[..]);
    }
}

#[test]
fn generated_hashes_are_distinct() {
    let mut csprng = rand::rngs::OsRng;
    let mut keyset = KeySet::generate(
        "many",
        KeyPurpose::SignAndVerify,
        KeyType::Hmac,
        KeysetConfig::default(),
    )
    .unwrap();
    for _ in 0..200 {
        keyset.add_version(KeyStatus::Active, &mut csprng).unwrap();
    }
    let hashes: HashSet<u32> = keyset.keys().map(|(_, key)| key.hash().to_u32()).collect();
    assert_eq!(hashes.len(), 200);
}
