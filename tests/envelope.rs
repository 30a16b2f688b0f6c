use keyset_crypto::*;

fn keyset(name: &str, purpose: KeyPurpose, key_type: KeyType) -> KeySet {
    let mut csprng = rand::rngs::OsRng;
    let mut keyset = KeySet::generate(name, purpose, key_type, KeysetConfig::default()).unwrap();
    keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
    keyset
}

#[test]
fn hmac_test_scenario() {
    let keyset = keyset("hmac-test", KeyPurpose::SignAndVerify, KeyType::Hmac);
    let message = b"This is some test input";

    let signer = Signer::new(&keyset).unwrap();
    let signature = signer.sign(message).unwrap();
    assert!(signer.verify(message, &signature).unwrap());

    let mut flipped = signature.clone();
    flipped[HEADER_SIZE + 3] ^= 0x10;
    assert!(!signer.verify(message, &flipped).unwrap());

    // The same set loaded back as a verifier agrees
    let stored = MemoryKeyset::export(&keyset);
    let loaded = KeySet::read(&stored, OperationClass::Verifier).unwrap();
    let verifier = Verifier::new(&loaded).unwrap();
    assert!(verifier.verify(message, &signature).unwrap());
    assert!(!verifier.verify(message, &flipped).unwrap());
}

#[test]
fn aes_hello_scenario() {
    let mut csprng = rand::rngs::OsRng;
    let keyset = keyset("aes-test", KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
    let crypter = Crypter::new(&keyset).unwrap();

    let ciphertext = crypter.encrypt(b"hello", &mut csprng).unwrap();
    assert_eq!(ciphertext[0], FORMAT_VERSION);
    assert_eq!(crypter.decrypt(&ciphertext).unwrap(), b"hello");

    for len in 0..HEADER_SIZE {
        assert!(matches!(
            crypter.decrypt(&ciphertext[..len]),
            Err(CryptoError::ShortCiphertext)
        ));
    }
}

#[test]
fn header_mutations() {
    let mut csprng = rand::rngs::OsRng;
    let signing = keyset("mutate-sign", KeyPurpose::SignAndVerify, KeyType::Hmac);
    let signer = Signer::new(&signing).unwrap();
    let signature = signer.sign(b"payload").unwrap();

    for bit in 0..8 {
        let mut mutated = signature.clone();
        mutated[0] ^= 1 << bit;
        assert!(matches!(
            signer.verify(b"payload", &mutated),
            Err(CryptoError::BadVersion(v)) if v == 1 << bit
        ));
    }
    for i in 1..HEADER_SIZE {
        let mut mutated = signature.clone();
        mutated[i] ^= 0x01;
        assert!(matches!(
            signer.verify(b"payload", &mutated),
            Err(CryptoError::KeyNotFound(_))
        ));
    }

    let crypting = keyset("mutate-crypt", KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
    let crypter = Crypter::new(&crypting).unwrap();
    let ciphertext = crypter.encrypt(b"payload", &mut csprng).unwrap();
    let mut mutated = ciphertext.clone();
    mutated[0] = 0x7f;
    assert!(matches!(
        crypter.decrypt(&mutated),
        Err(CryptoError::BadVersion(0x7f))
    ));
    let mut mutated = ciphertext.clone();
    mutated[2] ^= 0xff;
    assert!(matches!(
        crypter.decrypt(&mutated),
        Err(CryptoError::KeyNotFound(_))
    ));
}

#[test]
fn trailer_flip_releases_nothing() {
    let mut csprng = rand::rngs::OsRng;
    let keyset = keyset("trailer", KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
    let crypter = Crypter::new(&keyset).unwrap();
    let ciphertext = crypter.encrypt(b"a secret worth keeping", &mut csprng).unwrap();
    let trailer_start = ciphertext.len() - 20;
    for i in trailer_start..ciphertext.len() {
        let mut tampered = ciphertext.clone();
        tampered[i] ^= 0xff;
        assert!(matches!(
            crypter.decrypt(&tampered),
            Err(CryptoError::InvalidSignature)
        ));
    }
}

#[test]
fn cross_keyset_signatures_fail() {
    let a = keyset("a", KeyPurpose::SignAndVerify, KeyType::Hmac);
    let b = keyset("b", KeyPurpose::SignAndVerify, KeyType::Hmac);
    let signature = Signer::new(&a).unwrap().sign(b"shared").unwrap();
    assert!(matches!(
        Verifier::new(&b).unwrap().verify(b"shared", &signature),
        Err(CryptoError::KeyNotFound(_))
    ));
}

#[test]
fn rotation_lifecycle() {
    let mut csprng = rand::rngs::OsRng;
    let mut keyset = keyset("rotate", KeyPurpose::DecryptAndEncrypt, KeyType::Aes);
    let first = Crypter::new(&keyset)
        .unwrap()
        .encrypt(b"first", &mut csprng)
        .unwrap();

    let v2 = keyset.add_version(KeyStatus::Primary, &mut csprng).unwrap();
    assert_eq!(v2, 2);
    let primaries = keyset
        .versions()
        .iter()
        .filter(|v| v.status == KeyStatus::Primary)
        .count();
    assert_eq!(primaries, 1);
    assert_eq!(
        keyset.metadata().version(1).unwrap().status,
        KeyStatus::Active
    );

    let second = Crypter::new(&keyset)
        .unwrap()
        .encrypt(b"second", &mut csprng)
        .unwrap();
    let crypter = Crypter::new(&keyset).unwrap();
    assert_eq!(crypter.decrypt(&first).unwrap(), b"first");
    assert_eq!(crypter.decrypt(&second).unwrap(), b"second");

    keyset.demote(1).unwrap();
    keyset.revoke(1).unwrap();
    let crypter = Crypter::new(&keyset).unwrap();
    assert!(matches!(
        crypter.decrypt(&first),
        Err(CryptoError::KeyNotFound(_))
    ));
    assert_eq!(crypter.decrypt(&second).unwrap(), b"second");

    let v3 = keyset.add_version(KeyStatus::Active, &mut csprng).unwrap();
    assert_eq!(v3, 3);
    let stored = MemoryKeyset::export(&keyset);
    let loaded = KeySet::read(&stored, OperationClass::Crypter).unwrap();
    let versions: Vec<u32> = loaded.versions().iter().map(|v| v.version).collect();
    assert_eq!(versions, vec![2, 3]);
    assert_eq!(loaded.primary_version(), Some(2));
    assert_eq!(loaded.metadata().last_version(), 3);
}

#[test]
fn shared_keyset_across_threads() {
    let mut csprng = rand::rngs::OsRng;
    let shared = std::sync::Arc::new(SharedKeySet::from(keyset(
        "threads",
        KeyPurpose::SignAndVerify,
        KeyType::Hmac,
    )));
    let signature = {
        let guard = shared.read();
        Signer::new(&guard).unwrap().sign(b"threaded").unwrap()
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            let signature = signature.clone();
            std::thread::spawn(move || {
                let guard = shared.read();
                let verifier = Verifier::new(&guard).unwrap();
                verifier.verify(b"threaded", &signature).unwrap()
            })
        })
        .collect();
    shared.add_version(KeyStatus::Primary, &mut csprng).unwrap();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let guard = shared.read();
    assert_eq!(guard.primary_version(), Some(2));
    assert!(Verifier::new(&guard).unwrap().verify(b"threaded", &signature).unwrap());
}

#[test]
fn purpose_and_type_must_agree() {
    assert!(matches!(
        KeySet::generate("bad", KeyPurpose::SignAndVerify, KeyType::Aes, KeysetConfig::default()),
        Err(CryptoError::UnacceptablePurpose { .. })
    ));
    assert!(matches!(
        KeySet::generate("bad", KeyPurpose::Encrypt, KeyType::Hmac, KeysetConfig::default()),
        Err(CryptoError::UnacceptablePurpose { .. })
    ));

    let mut csprng = rand::rngs::OsRng;
    let mut keyset =
        KeySet::generate("public", KeyPurpose::Test, KeyType::RsaPublic, KeysetConfig::default())
            .unwrap();
    assert!(matches!(
        keyset.add_version(KeyStatus::Primary, &mut csprng),
        Err(CryptoError::UnsupportedType(_))
    ));
}

#[test]
fn no_primary_key() {
    let mut csprng = rand::rngs::OsRng;
    let keyset =
        KeySet::generate("empty", KeyPurpose::DecryptAndEncrypt, KeyType::Aes, KeysetConfig::default())
            .unwrap();
    let crypter = Crypter::new(&keyset).unwrap();
    assert!(matches!(
        crypter.encrypt(b"nothing", &mut csprng),
        Err(CryptoError::NoPrimaryKey)
    ));
}
