//! LEB128 varint32 length prefixes for the local container.
//!
//! The container tolerates truncated files: an end-of-stream hit anywhere
//! inside a length prefix (including after zero bytes) is reported as clean
//! end-of-data, never as an error. A prefix that is present but overlong or
//! overflowing is malformed.

use std::io::{self, Read, Write};

use crate::ProtoError;

/// Maximum number of bytes in a varint32 encoding.
const MAX_VARINT32_BYTES: usize = 5;

/// Write `value` as an LEB128 varint32.
///
/// # Errors
///
/// Propagates I/O failures from the writer.
pub fn write_varint32(writer: &mut impl Write, mut value: u32) -> Result<(), ProtoError> {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            writer.write_all(&[byte])?;
            return Ok(());
        }
        writer.write_all(&[byte | 0x80])?;
    }
}

/// Read an LEB128 varint32 from the stream.
///
/// Returns `Ok(None)` on clean end-of-stream, including a stream that ends
/// partway through the prefix. This is the truncation-tolerance contract of
/// the local container format.
///
/// # Errors
///
/// - `ProtoError::Malformed` if the encoding is longer than five bytes or the
///   fifth byte carries bits beyond a u32
/// - `ProtoError::Io` for underlying read failures other than end-of-stream
pub fn read_varint32(reader: &mut impl Read) -> Result<Option<u32>, ProtoError> {
    let mut value: u32 = 0;

    for index in 0..MAX_VARINT32_BYTES {
        let Some(byte) = read_byte(reader)? else {
            return Ok(None);
        };

        let shift = index * 7;
        if index == MAX_VARINT32_BYTES - 1 && byte > 0x0F {
            return Err(ProtoError::Malformed("varint32 overflows u32".to_string()));
        }
        value |= u32::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
    }

    Err(ProtoError::Malformed("varint32 longer than five bytes".to_string()))
}

/// Read a single byte, retrying on `Interrupted`. `None` means end-of-stream.
fn read_byte(reader: &mut impl Read) -> Result<Option<u8>, ProtoError> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => return Err(ProtoError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn round_trip(value: u32) -> u32 {
        let mut buf = Vec::new();
        write_varint32(&mut buf, value).unwrap();
        read_varint32(&mut Cursor::new(buf)).unwrap().unwrap()
    }

    #[test]
    fn round_trips_boundary_values() {
        for value in [0, 1, 0x7F, 0x80, 0x3FFF, 0x4000, u32::MAX] {
            assert_eq!(round_trip(value), value);
        }
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let result = read_varint32(&mut Cursor::new(Vec::new())).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn truncated_prefix_is_clean_eof() {
        // A continuation bit with no following byte: the stream was cut
        // mid-prefix, which the container treats as end-of-data.
        let result = read_varint32(&mut Cursor::new(vec![0x80])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn overlong_prefix_is_malformed() {
        let result = read_varint32(&mut Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]));
        assert!(matches!(result, Err(ProtoError::Malformed(_))));
    }

    #[test]
    fn overflowing_fifth_byte_is_malformed() {
        // Fifth byte may only carry 4 bits of a u32.
        let result = read_varint32(&mut Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x10]));
        assert!(matches!(result, Err(ProtoError::Malformed(_))));
    }

    #[test]
    fn single_byte_encoding_for_small_values() {
        let mut buf = Vec::new();
        write_varint32(&mut buf, 42).unwrap();
        assert_eq!(buf, vec![42]);
    }
}
