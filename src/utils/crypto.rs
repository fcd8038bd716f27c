// src/utils/crypto.rs
//! Content fingerprinting for anchored documents.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of the exact payload bytes.
//! It is computed locally, independent of the blob store, and written to the
//! ledger next to the content address so a verifier can cross-check both.

use ethers_core::utils::hex;
use ring::digest::{self, Context, SHA256};
use std::io::{self, Read};

/// Length of a hex-encoded fingerprint (32 bytes, two chars each).
pub const FINGERPRINT_HEX_LEN: usize = 64;

const READ_CHUNK: usize = 64 * 1024;

/// Computes the SHA-256 fingerprint of `payload` as lowercase hex.
///
/// # Arguments
/// * `payload` - Raw document bytes (may be empty)
///
/// # Returns
/// 64-character hex string. Equal payloads always produce equal output.
pub fn fingerprint(payload: &[u8]) -> String {
    hex::encode(digest::digest(&SHA256, payload).as_ref())
}

/// Streaming variant of [`fingerprint`] for payloads that are not in memory.
///
/// # Errors
/// Only I/O errors raised by `reader` are returned; payload content never
/// causes a failure.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut context = Context::new(&SHA256);
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.update(&buffer[..read]);
    }
    Ok(hex::encode(context.finish().as_ref()))
}

/// Returns true if `value` has the shape of a fingerprint produced here.
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_HEX_LEN
        && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn empty_payload_has_known_digest() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint(b""), fingerprint(b""));
    }

    #[test]
    fn deterministic_across_sizes() {
        for size in [0usize, 1, 31, 32, 33, 4096, READ_CHUNK + 17, 3 * READ_CHUNK] {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let first = fingerprint(&payload);
            assert_eq!(first, fingerprint(&payload), "size {}", size);
            assert!(is_fingerprint(&first));
        }
    }

    #[test]
    fn reader_matches_in_memory_digest() {
        let payload: Vec<u8> = (0..(2 * READ_CHUNK + 5)).map(|i| (i * 7 % 256) as u8).collect();
        let streamed = fingerprint_reader(Cursor::new(&payload)).unwrap();
        assert_eq!(streamed, fingerprint(&payload));
    }

    #[test]
    fn reader_surfaces_io_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }
        let err = fingerprint_reader(Broken).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn rejects_non_fingerprints() {
        assert!(!is_fingerprint("abc"));
        assert!(!is_fingerprint(&"G".repeat(64)));
        assert!(!is_fingerprint(&"A".repeat(64)));
    }

    proptest! {
        #[test]
        fn same_bytes_same_fingerprint(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            prop_assert_eq!(fingerprint(&payload), fingerprint(&payload.clone()));
        }

        /// Flipping any bits of a single byte changes the digest.
        #[test]
        fn single_byte_mutation_changes_fingerprint(
            payload in proptest::collection::vec(any::<u8>(), 1..2048),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut mutated = payload.clone();
            let i = index.index(mutated.len());
            mutated[i] ^= flip;
            prop_assert_ne!(fingerprint(&payload), fingerprint(&mutated));
        }
    }
}
