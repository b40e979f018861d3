//! Local container framing: `varint32(length) || body`, repeated until EOF.
//!
//! Writing is purely sequential appends; there is no random access and no
//! partial-stream repair. Reading stops cleanly at end-of-stream, and a
//! truncated trailing length prefix is treated as end-of-data rather than an
//! error, so a file cut off mid-write still yields every complete frame.
//!
//! The cloud backup stream uses this exact framing written through the
//! authenticated encryption envelope in `stowage-crypto`; the two containers
//! share one frame schema and differ only in wrapping.

use std::io::{self, Read, Write};

use crate::{
    Frame, MAX_FRAME_LEN, ProtoError,
    varint::{read_varint32, write_varint32},
};

/// Sequential frame writer over any byte sink.
#[derive(Debug)]
pub struct ContainerWriter<W: Write> {
    inner: W,
    frames_written: u64,
}

impl<W: Write> ContainerWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner, frames_written: 0 }
    }

    /// Append one frame: length prefix, then body.
    ///
    /// # Errors
    ///
    /// - `ProtoError::FrameTooLarge` if the encoded body exceeds
    ///   [`MAX_FRAME_LEN`]
    /// - `ProtoError::UnknownKind` when asked to write a read-path
    ///   [`Frame::Unknown`]
    /// - `ProtoError::Io` on sink failure; the caller must discard the
    ///   partial output, the writer does not attempt repair
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), ProtoError> {
        let body = frame.encode_to_vec()?;

        if body.len() > MAX_FRAME_LEN as usize {
            return Err(ProtoError::FrameTooLarge {
                size: body.len(),
                max: MAX_FRAME_LEN as usize,
            });
        }

        write_varint32(&mut self.inner, body.len() as u32)?;
        self.inner.write_all(&body)?;
        self.frames_written += 1;

        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<(), ProtoError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> Result<W, ProtoError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Sequential frame reader over any byte source.
#[derive(Debug)]
pub struct ContainerReader<R: Read> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> ContainerReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self { inner, bytes_read: 0 }
    }

    /// Read the next frame. `Ok(None)` is clean end-of-stream, including a
    /// stream that ends partway through a length prefix.
    ///
    /// # Errors
    ///
    /// - `ProtoError::FrameTooLarge` if a declared length exceeds
    ///   [`MAX_FRAME_LEN`]; rejected before any allocation
    /// - `ProtoError::FrameTruncated` if the stream ends inside a frame body
    /// - `ProtoError::Malformed` for broken prefixes or payload bytes
    pub fn read_frame(&mut self) -> Result<Option<Frame>, ProtoError> {
        let Some(len) = read_varint32(&mut self.inner)? else {
            return Ok(None);
        };

        if len > MAX_FRAME_LEN {
            return Err(ProtoError::FrameTooLarge {
                size: len as usize,
                max: MAX_FRAME_LEN as usize,
            });
        }

        let mut body = vec![0u8; len as usize];
        read_exact_or_truncated(&mut self.inner, &mut body)?;
        self.bytes_read += u64::from(len);

        Frame::decode(&body).map(Some)
    }

    /// Total frame body bytes consumed so far. Used for restore progress.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// `read_exact` that reports how many bytes were actually available, for the
/// truncated-body error.
fn read_exact_or_truncated(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), ProtoError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtoError::FrameTruncated { expected: buf.len(), actual: filled });
            },
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => return Err(ProtoError::Io(err)),
        }
    }
    Ok(())
}
