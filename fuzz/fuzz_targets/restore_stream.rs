//! Fuzz target for the restore state machine
//!
//! # Strategy
//!
//! - Arbitrary bytes as a whole plaintext container stream driven through a
//!   full restore into an in-memory store
//!
//! # Invariants
//!
//! - Restore NEVER panics, whatever the stream
//! - Nothing is applied unless the stream opened with an account frame
//! - The reader always ends in `Done` or `Failed`

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use stowage_core::{
    ArchiveReader, AttachmentByteCounter, MemoryStore, NeverCancelled, ReaderState,
};

fuzz_target!(|data: &[u8]| {
    let store = MemoryStore::new();
    let counter = AttachmentByteCounter::new();
    let mut reader = ArchiveReader::new(&store, &counter);

    let result = reader.restore(Cursor::new(data), &NeverCancelled);

    match reader.state() {
        ReaderState::Done => assert!(result.is_ok()),
        ReaderState::Failed => assert!(result.is_err()),
        other => panic!("restore ended in {other:?}"),
    }

    if result.is_err() && reader.frames_read() == 0 {
        assert_eq!(store.recipient_count(), 0);
        assert_eq!(store.message_count(), 0);
    }
});
