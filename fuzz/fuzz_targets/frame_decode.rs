//! Fuzz target for frame body decoding
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary byte sequences through `Frame::decode`
//! - Re-encode: every successfully decoded known frame must encode again and
//!   decode to the same value
//!
//! # Invariants
//!
//! - Decoding NEVER panics on arbitrary input
//! - Unknown kind tags decode to `Frame::Unknown`, not an error
//! - Known frames round-trip: decode → encode → decode is identity

#![no_main]

use libfuzzer_sys::fuzz_target;
use stowage_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    // Unknown frames are a read-path artifact and cannot be re-encoded.
    if matches!(frame, Frame::Unknown { .. }) {
        return;
    }

    let bytes = frame.encode_to_vec().expect("decoded known frame must re-encode");
    let again = Frame::decode(&bytes).expect("re-encoded frame must decode");
    assert_eq!(frame, again, "decode/encode/decode must be identity");
});
