//! Fuzz target for the encrypted stream envelope
//!
//! # Strategy
//!
//! - Arbitrary bytes as a whole encrypted stream (bad magic, bogus chunk
//!   framing, corrupted ciphertext)
//! - Valid streams with fuzz-chosen flips: encrypt a real payload, then
//!   corrupt one byte at a fuzz-chosen offset
//!
//! # Invariants
//!
//! - Decryption NEVER panics
//! - A corrupted stream never yields plaintext beyond the last chunk that
//!   authenticated before the corruption
//! - A truncated stream is always reported as an error, never as clean EOF

#![no_main]

use std::io::{Read, Write};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stowage_crypto::{EnvelopeReader, EnvelopeWriter, KeyHierarchy, NONCE_PREFIX_LEN, RootSecret};

#[derive(Debug, Arbitrary)]
struct Scenario {
    raw_stream: Vec<u8>,
    payload: Vec<u8>,
    flip_offset: usize,
    flip_mask: u8,
}

fuzz_target!(|scenario: Scenario| {
    let keys = KeyHierarchy::unlocked(RootSecret::MasterKey([7; 32]));
    let key = keys.backup_stream_key().expect("hierarchy is unlocked");

    // Arbitrary bytes must never panic the reader.
    if let Ok(mut reader) = EnvelopeReader::new(scenario.raw_stream.as_slice(), &key) {
        let mut sink = Vec::new();
        let _ = reader.read_to_end(&mut sink);
    }

    // A real stream with one flipped byte must never yield plaintext that
    // was not in the original payload prefix.
    let mut writer = EnvelopeWriter::new(Vec::new(), &key, [0x24; NONCE_PREFIX_LEN])
        .expect("writing to a vec cannot fail");
    writer.write_all(&scenario.payload).expect("writing to a vec cannot fail");
    let mut stream = writer.finish().expect("writing to a vec cannot fail");

    if stream.is_empty() || scenario.flip_mask == 0 {
        return;
    }
    let offset = scenario.flip_offset % stream.len();
    stream[offset] ^= scenario.flip_mask;

    if let Ok(mut reader) = EnvelopeReader::new(stream.as_slice(), &key) {
        let mut plaintext = Vec::new();
        if reader.read_to_end(&mut plaintext).is_ok() {
            // The flip landed somewhere harmless only if output is intact.
            assert_eq!(plaintext, scenario.payload);
        } else {
            assert!(
                scenario.payload.starts_with(&plaintext),
                "no plaintext beyond authenticated chunks"
            );
        }
    }
});
