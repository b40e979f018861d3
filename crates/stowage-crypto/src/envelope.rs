//! Streaming authenticated encryption envelope for cloud backups.
//!
//! Backups can exceed available memory, so the envelope is a STREAM-style
//! chunked construction rather than whole-stream MAC-then-decrypt: the byte
//! stream is split into chunks of at most [`CHUNK_LEN`] plaintext bytes and
//! each chunk is independently sealed with XChaCha20-Poly1305.
//!
//! Wire layout:
//!
//! ```text
//! [magic: 4] [nonce prefix: 15]
//! [flag: 1] [len: u32 BE] [ciphertext: len]   -- repeated
//! ```
//!
//! The chunk nonce is `prefix || counter(u64 BE) || flag`, where flag is 1
//! only on the last chunk. Binding the flag and counter into the nonce makes
//! reordering, chunk removal, and truncation all fail authentication: a
//! stream that ends without an authenticated final chunk is rejected as
//! truncated, and a single MAC failure invalidates the entire backup.

use std::io::{self, Read, Write};

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

use crate::{error::EnvelopeError, keys::BackupStreamKey};

/// Magic bytes identifying an encrypted backup stream.
pub const ENVELOPE_MAGIC: [u8; 4] = *b"STW1";

/// Maximum plaintext bytes per chunk (64 KiB).
pub const CHUNK_LEN: usize = 64 * 1024;

/// Length of the random per-stream nonce prefix.
pub const NONCE_PREFIX_LEN: usize = 15;

/// Poly1305 tag length.
const TAG_LEN: usize = 16;

const FLAG_MORE: u8 = 0;
const FLAG_FINAL: u8 = 1;

fn build_nonce(prefix: &[u8; NONCE_PREFIX_LEN], counter: u64, flag: u8) -> [u8; 24] {
    let mut nonce = [0u8; 24];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_LEN..23].copy_from_slice(&counter.to_be_bytes());
    nonce[23] = flag;
    nonce
}

/// Encrypting writer. Buffers plaintext into chunks and seals each one.
///
/// The caller provides the per-stream nonce prefix; it must be fresh random
/// bytes for every stream written under the same key. The stream is not
/// valid until [`EnvelopeWriter::finish`] has sealed the final chunk —
/// dropping the writer without finishing produces a stream every reader
/// rejects as truncated.
pub struct EnvelopeWriter<W: Write> {
    inner: W,
    cipher: XChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_LEN],
    counter: u64,
    buf: Vec<u8>,
}

impl<W: Write> EnvelopeWriter<W> {
    /// Start a new encrypted stream: writes the magic and nonce prefix
    /// header immediately.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from writing the header.
    pub fn new(
        mut inner: W,
        key: &BackupStreamKey,
        nonce_prefix: [u8; NONCE_PREFIX_LEN],
    ) -> Result<Self, EnvelopeError> {
        inner.write_all(&ENVELOPE_MAGIC)?;
        inner.write_all(&nonce_prefix)?;

        Ok(Self {
            inner,
            cipher: XChaCha20Poly1305::new(key.as_bytes().into()),
            prefix: nonce_prefix,
            counter: 0,
            buf: Vec::with_capacity(CHUNK_LEN),
        })
    }

    fn seal_chunk(&mut self, flag: u8) -> Result<(), EnvelopeError> {
        let nonce = build_nonce(&self.prefix, self.counter, flag);

        let Ok(ciphertext) =
            self.cipher.encrypt(XNonce::from_slice(&nonce), self.buf.as_slice())
        else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        self.inner.write_all(&[flag])?;
        self.inner.write_all(&(ciphertext.len() as u32).to_be_bytes())?;
        self.inner.write_all(&ciphertext)?;

        self.counter += 1;
        self.buf.clear();
        Ok(())
    }

    /// Seal the final chunk (possibly empty), flush, and return the sink.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures; the partial output must then be discarded by
    /// the caller.
    pub fn finish(mut self) -> Result<W, EnvelopeError> {
        self.seal_chunk(FLAG_FINAL)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EnvelopeWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut remaining = data;
        while !remaining.is_empty() {
            let room = CHUNK_LEN - self.buf.len();
            let take = room.min(remaining.len());
            self.buf.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if self.buf.len() == CHUNK_LEN {
                self.seal_chunk(FLAG_MORE).map_err(io::Error::from)?;
            }
        }
        Ok(data.len())
    }

    /// Flushes the sink only. Buffered plaintext stays buffered so chunk
    /// boundaries remain a function of the data, not of flush timing.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypting reader. Authenticates each chunk before yielding any of its
/// plaintext.
pub struct EnvelopeReader<R: Read> {
    inner: R,
    cipher: XChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_LEN],
    counter: u64,
    plain: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> EnvelopeReader<R> {
    /// Open an encrypted stream: reads and validates the header.
    ///
    /// # Errors
    ///
    /// - `EnvelopeError::BadMagic` if the stream is not an envelope
    /// - `EnvelopeError::Truncated` if the header itself is incomplete
    pub fn new(mut inner: R, key: &BackupStreamKey) -> Result<Self, EnvelopeError> {
        let mut magic = [0u8; 4];
        read_exact_or_truncated(&mut inner, &mut magic)?;
        if magic != ENVELOPE_MAGIC {
            return Err(EnvelopeError::BadMagic);
        }

        let mut prefix = [0u8; NONCE_PREFIX_LEN];
        read_exact_or_truncated(&mut inner, &mut prefix)?;

        Ok(Self {
            inner,
            cipher: XChaCha20Poly1305::new(key.as_bytes().into()),
            prefix,
            counter: 0,
            plain: Vec::new(),
            pos: 0,
            done: false,
        })
    }

    /// Read and authenticate the next chunk into the plaintext buffer.
    fn fill_next_chunk(&mut self) -> Result<(), EnvelopeError> {
        let mut head = [0u8; 5];
        read_exact_or_truncated(&mut self.inner, &mut head)?;

        let flag = head[0];
        if flag != FLAG_MORE && flag != FLAG_FINAL {
            return Err(EnvelopeError::Malformed(format!("invalid chunk flag {flag:#04x}")));
        }

        let len = u32::from_be_bytes([head[1], head[2], head[3], head[4]]) as usize;
        let max = CHUNK_LEN + TAG_LEN;
        if len > max {
            return Err(EnvelopeError::OversizedChunk { size: len, max });
        }

        let mut ciphertext = vec![0u8; len];
        read_exact_or_truncated(&mut self.inner, &mut ciphertext)?;

        let nonce = build_nonce(&self.prefix, self.counter, flag);
        let plain = self
            .cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| EnvelopeError::Integrity)?;

        self.counter += 1;
        self.plain = plain;
        self.pos = 0;
        if flag == FLAG_FINAL {
            self.done = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for EnvelopeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.plain.len() {
                let take = (self.plain.len() - self.pos).min(buf.len());
                buf[..take].copy_from_slice(&self.plain[self.pos..self.pos + take]);
                self.pos += take;
                return Ok(take);
            }

            if self.done {
                return Ok(0);
            }

            self.fill_next_chunk().map_err(io::Error::from)?;
        }
    }
}

/// `read_exact` mapping end-of-stream to `EnvelopeError::Truncated`: an
/// encrypted stream may only end after an authenticated final chunk.
fn read_exact_or_truncated(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), EnvelopeError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(EnvelopeError::Truncated),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => return Err(EnvelopeError::Io(err)),
        }
    }
    Ok(())
}
