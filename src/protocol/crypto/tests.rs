use super::*;

fn unhex(s: &str) -> Vec<u8> {
    s.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

// --- kdf.rs ---

#[test]
fn test_derive_half_key_vectors() {
    // Session key of 20 bytes (SHA-1 output), as pairing produces.
    let secret = [0xAAu8; 20];
    assert_eq!(
        derive_half_key("Pair-Setup-AES-Key", &secret).to_vec(),
        unhex("9df4b96f5e8701ca00d5a3be5546f3d8"),
    );
    assert_eq!(
        derive_half_key("Pair-Setup-AES-IV", &secret).to_vec(),
        unhex("d9a9d74e2f1de04ed2440447f5be27b1"),
    );
}

#[test]
fn test_derive_half_key_depends_on_info() {
    let secret = [0x11u8; 32];
    assert_ne!(
        derive_half_key("Pair-Verify-AES-Key", &secret),
        derive_half_key("Pair-Verify-AES-IV", &secret),
    );
}

// --- aes.rs ---

#[test]
fn test_aes_gcm_known_answer() {
    // Independently computed with a 16-byte IV and no associated data.
    let key: Vec<u8> = (0..16).collect();
    let iv: [u8; 16] = core::array::from_fn(|i| (16 + i) as u8);
    let plaintext: Vec<u8> = (64..96).collect();

    let cipher = Aes128Gcm::new(&key).unwrap();
    let (ciphertext, tag) = cipher.seal(&iv, &plaintext).unwrap();

    assert_eq!(
        ciphertext,
        unhex("85dfb5f539f762cf9e5189c9ed626198a5ac72cc3953f1aff1dfddcd1f1e2dbf"),
    );
    assert_eq!(tag.to_vec(), unhex("04caebac4acdec91164425221eb29be6"));
}

#[test]
fn test_aes_gcm_rejects_short_key() {
    assert!(matches!(
        Aes128Gcm::new(&[0u8; 12]),
        Err(CryptoError::InvalidKeyLength { expected: 16, actual: 12 })
    ));
}

#[test]
fn test_aes_ctr_skip_matches_contiguous_stream() {
    let key = [0x42u8; 16];
    let iv = [0x17u8; 16];
    let tail = [0x33u8; 23];
    let payload = [0x77u8; 64];

    // Reference: encrypt tail then payload in one stream.
    let mut reference = Aes128Ctr::new(&key, &iv).unwrap();
    let _ = reference.encrypt(&tail);
    let expected = reference.encrypt(&payload);

    // Skipping the tail must land on the same keystream position.
    let mut cipher = Aes128Ctr::new(&key, &iv).unwrap();
    cipher.skip(tail.len());
    assert_eq!(cipher.encrypt(&payload), expected);
}

#[test]
fn test_aes_ctr_roundtrip() {
    let key = [0x01u8; 16];
    let iv = [0x02u8; 16];

    let mut enc = Aes128Ctr::new(&key, &iv).unwrap();
    let ciphertext = enc.encrypt(b"signature bytes");
    assert_ne!(ciphertext, b"signature bytes");

    let mut dec = Aes128Ctr::new(&key, &iv).unwrap();
    assert_eq!(dec.encrypt(&ciphertext), b"signature bytes");
}

#[test]
fn test_aes_ctr_rejects_short_iv() {
    assert!(Aes128Ctr::new(&[0u8; 16], &[0u8; 8]).is_err());
}

// --- ed25519.rs ---

#[test]
fn test_ed25519_from_seed_is_deterministic() {
    let seed = [0x11u8; 32];
    let kp1 = Ed25519KeyPair::from_seed(&seed);
    let kp2 = Ed25519KeyPair::from_seed(&seed);

    assert_eq!(kp1.public_bytes(), kp2.public_bytes());
    assert_eq!(kp1.seed_bytes(), seed);
    // Matches NaCl's sign.keyPair.fromSeed for the same seed.
    assert_eq!(
        kp1.public_bytes().to_vec(),
        unhex("d04ab232742bb4ab3a1368bd4615e4e6d0224ab71a016baf8520a332c9778737"),
    );
}

#[test]
fn test_ed25519_signature_known_answer() {
    let seed = [0x11u8; 32];
    let kp = Ed25519KeyPair::from_seed(&seed);

    let eph_pub = unhex("7b4e909bbe7ffe44c465a220037d608ee35897d31ef972f07f74892cb0f73f13");
    let recv_pub = unhex("0faa684ed28867b97f4a6a2dee5df8ce974e76b7018e3f22a1c4cf2678570f20");
    let mut message = eph_pub;
    message.extend_from_slice(&recv_pub);

    let signature = kp.sign(&message);
    assert_eq!(
        signature.to_vec(),
        unhex(concat!(
            "4253470d4434947963e17670ba33cec5d50a5627669deebcea0f7d63893c4ab6",
            "46f8357bd17541d2ba91156032f22c730320206e925e4a5468df50f87728e702",
        )),
    );
}

#[test]
fn test_ed25519_generate_unique() {
    let kp1 = Ed25519KeyPair::generate();
    let kp2 = Ed25519KeyPair::generate();
    assert_ne!(kp1.public_bytes(), kp2.public_bytes());
}

// --- x25519.rs ---

#[test]
fn test_x25519_from_seed_known_answer() {
    let seed = [0x11u8; 32];
    let kp = X25519KeyPair::from_seed(&seed);
    assert_eq!(
        kp.public_bytes().to_vec(),
        unhex("7b4e909bbe7ffe44c465a220037d608ee35897d31ef972f07f74892cb0f73f13"),
    );
}

#[test]
fn test_x25519_shared_secret_known_answer() {
    let kp = X25519KeyPair::from_seed(&[0x11u8; 32]);
    let peer: [u8; 32] =
        unhex("0faa684ed28867b97f4a6a2dee5df8ce974e76b7018e3f22a1c4cf2678570f20")
            .try_into()
            .unwrap();
    assert_eq!(
        kp.shared_secret(&peer).to_vec(),
        unhex("9e004098efc091d4ec2663b4e9f5cfd4d7064571690b4bea97ab146ab9f35056"),
    );
}

#[test]
fn test_x25519_agreement() {
    let alice = X25519KeyPair::from_seed(&[0x51u8; 32]);
    let bob = X25519KeyPair::from_seed(&[0x52u8; 32]);
    assert_eq!(
        alice.shared_secret(&bob.public_bytes()),
        bob.shared_secret(&alice.public_bytes()),
    );
}

// --- srp.rs ---

/// Reference exchange computed independently (fast-srp semantics: 2048-bit
/// group, SHA-1, padded A/B/S, RFC 2945 proof).
struct SrpVector {
    secret: Vec<u8>,
    salt: Vec<u8>,
    server_public: Vec<u8>,
    expected_a: Vec<u8>,
    expected_key: Vec<u8>,
    expected_proof: Vec<u8>,
}

fn srp_vector() -> SrpVector {
    SrpVector {
        secret: (1..=32).collect(),
        salt: vec![0x55; 16],
        server_public: unhex(concat!(
            "9adc6ced70b9263aa382ec3923ff8daceca649b6e8084da6b773e8bcbfb899fb",
            "f5eacbe37afa07d5dd3cdcdfa6dc473f9c3cce857528e7132a6a3ab962224b1e",
            "2b7a1feddd3d85cc6dd21a012838c589175ea0460807d50ffa020d5187dece2c",
            "d4b3b3e29db2afb3af69a34def097af77fb0f0dc7474fe949c3ac57b51b64e1b",
            "7e1cc972dc1bda8eac108036479a74516dbaba390b727d6afea4b287e5a7ebd5",
            "daaee237689d5ef761b7eef8dcd93fdecf48dd727dadfebb1df6bf5d5f45eb57",
            "1df912e46c178f77cdbba95c71e551c190e9f626f5f6df6c7451e9c3185e540a",
            "6fa5751f47a0da5461d04eb6f8a589c769d56e0888bc2fd354479f12eb469fd7",
        )),
        expected_a: unhex(concat!(
            "630acdff5d334462d92a29e0b7fa6e20020f3333292f6d3a640f1c7a76ad9d31",
            "7531c57979952e5736c88db118d060dc0539a812b9b0af3b4002380a9f28ae4a",
            "7c45a896542de05fbcf76a4e7e0739b9a55d5d6c7aba4f1e1b58729a79bc084d",
            "5ff513eaec33ce978f5bad87e579b5a95fc773198e22697b2eadab9eb94f84cd",
            "cf1fe94ff09f88d4ca46e968bba443ff71167571f19feb052869bd28d7dabf96",
            "3b7fe399a1f70e7e08d00e1a3778ed1dddc3325dd09e05d31e774d1fd295c4ab",
            "fbc613446232004d67cb03d6a034d2ce6ca0a544a0ff5b434b4b4267fa6c6d72",
            "acbbda2efc1ef1d1fe36d35382b089abe556862aec35b29d3d0cdf359a9cfed3",
        )),
        expected_key: unhex("7e5a304713c49008b5d5ca1e5e66f63e00c7ea33"),
        expected_proof: unhex("4922ccd60bcd54c987506e7f81ed5106d95cf25a"),
    }
}

#[test]
fn test_srp_public_value_known_answer() {
    let vector = srp_vector();
    let client = SrpClient::new(&vector.secret).unwrap();
    assert_eq!(client.public_key(), &vector.expected_a[..]);
    assert_eq!(client.public_key().len(), lengths::SRP_PUBLIC_KEY);
}

#[test]
fn test_srp_challenge_known_answer() {
    let vector = srp_vector();
    let client = SrpClient::new(&vector.secret).unwrap();
    let session = client
        .process_challenge(b"testuser", b"1234", &vector.salt, &vector.server_public)
        .unwrap();

    assert_eq!(session.session_key(), &vector.expected_key[..]);
    assert_eq!(session.proof(), &vector.expected_proof[..]);
}

#[test]
fn test_srp_proof_depends_on_pin() {
    let vector = srp_vector();
    let client = SrpClient::new(&vector.secret).unwrap();

    let right = client
        .process_challenge(b"testuser", b"1234", &vector.salt, &vector.server_public)
        .unwrap();
    let wrong = client
        .process_challenge(b"testuser", b"4321", &vector.salt, &vector.server_public)
        .unwrap();

    assert_ne!(right.proof(), wrong.proof());
    assert_ne!(right.session_key(), wrong.session_key());
}

#[test]
fn test_srp_rejects_degenerate_server_key() {
    let client = SrpClient::new(&[0x01u8; 32]).unwrap();
    let zero_b = vec![0u8; 256];
    assert!(matches!(
        client.process_challenge(b"testuser", b"1234", &[0x55; 16], &zero_b),
        Err(CryptoError::SrpError(_))
    ));
}

#[test]
fn test_srp_rejects_wrong_length_server_key() {
    let client = SrpClient::new(&[0x01u8; 32]).unwrap();
    assert!(
        client
            .process_challenge(b"testuser", b"1234", &[0x55; 16], &[0x42; 255])
            .is_err()
    );
}

// --- the full verification step 2 transform ---

#[test]
fn test_verify_payload_known_answer() {
    // End-to-end vector for "derive, sign, skip tail, encrypt signature".
    let seed = [0x11u8; 32];
    let receiver_public: [u8; 32] =
        unhex("0faa684ed28867b97f4a6a2dee5df8ce974e76b7018e3f22a1c4cf2678570f20")
            .try_into()
            .unwrap();
    let tail = [0x33u8; 16];

    let ephemeral = X25519KeyPair::from_seed(&seed);
    let shared = ephemeral.shared_secret(&receiver_public);

    let aes_key = derive_half_key("Pair-Verify-AES-Key", &shared);
    let aes_iv = derive_half_key("Pair-Verify-AES-IV", &shared);
    assert_eq!(aes_key.to_vec(), unhex("c299dd5aab1341f0dcf94ae39e1833db"));
    assert_eq!(aes_iv.to_vec(), unhex("e51d5d02f57571370d8a0833cd5a2a94"));

    let mut message = ephemeral.public_bytes().to_vec();
    message.extend_from_slice(&receiver_public);
    let signature = Ed25519KeyPair::from_seed(&seed).sign(&message);

    let mut cipher = Aes128Ctr::new(&aes_key, &aes_iv).unwrap();
    cipher.skip(tail.len());
    let payload = cipher.encrypt(&signature);

    assert_eq!(
        payload,
        unhex(concat!(
            "cf82cf07ac3f7c62f896e6a7a93e1a6d9fab026476d03e4b65ffcc47937d222a",
            "20cdd4fad4eef7ea6a3db809199e7672dca62f7d3b72e6eb9820479b26ad4b42",
        )),
    );
}
