//! Fuzz target for container stream reading
//!
//! # Strategy
//!
//! - Arbitrary bytes as a whole container stream: hostile length prefixes,
//!   truncations, garbage bodies, overlong varints
//!
//! # Invariants
//!
//! - Reading NEVER panics and NEVER allocates more than `MAX_FRAME_LEN`
//! - The reader always terminates: every iteration either consumes at least
//!   one byte or ends the stream
//! - A clean `None` only occurs at a frame boundary or inside a trailing
//!   length prefix

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use stowage_proto::ContainerReader;

fuzz_target!(|data: &[u8]| {
    let mut reader = ContainerReader::new(Cursor::new(data));

    loop {
        match reader.read_frame() {
            Ok(Some(_)) => {},
            // Clean EOF or a structural error both end the stream.
            Ok(None) | Err(_) => break,
        }
    }

    assert!(reader.bytes_read() <= data.len() as u64);
});
