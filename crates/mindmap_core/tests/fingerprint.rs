use mindmap_core::{compute_content_hash, compute_file_hash, is_valid_content_hash, ContentHash};
use std::fs;

#[test]
fn equal_bytes_give_equal_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    fs::write(&first, b"%PDF-1.4 same bytes").unwrap();
    fs::write(&second, b"%PDF-1.4 same bytes").unwrap();

    assert_eq!(
        compute_file_hash(&first).unwrap(),
        compute_file_hash(&second).unwrap()
    );
}

#[test]
fn single_byte_mutation_changes_hash() {
    let original = b"%PDF-1.4 content-sensitive".to_vec();
    let mut mutated = original.clone();
    mutated[9] ^= 0x01;

    assert_ne!(
        compute_content_hash(original.as_slice()).unwrap(),
        compute_content_hash(mutated.as_slice()).unwrap()
    );
}

#[test]
fn hash_is_sixteen_lowercase_hex_chars() {
    for input in [&b""[..], &b"a"[..], &b"\x00\xff\x10"[..], &[42u8; 20_000][..]] {
        let hash = compute_content_hash(input).unwrap();
        assert_eq!(hash.as_str().len(), 16);
        assert!(hash
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert!(is_valid_content_hash(hash.as_str()));
    }
}

#[test]
fn empty_input_matches_known_digest_prefix() {
    // sha256("") = e3b0c44298fc1c14...
    let hash = compute_content_hash(&b""[..]).unwrap();
    assert_eq!(hash, ContentHash::parse("e3b0c44298fc1c14").unwrap());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = compute_file_hash(dir.path().join("absent.pdf")).unwrap_err();
    assert!(matches!(err, mindmap_core::StoreError::Io { .. }));
}
