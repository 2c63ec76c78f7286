//! Length-prefixed framing: a 4-byte big-endian length prefix followed by
//! a UTF-8 JSON payload.

use std::io::{Read, Write};

use crate::error::{Result, TransportError};

/// Read exactly `len` bytes, failing if the stream closes early — the
/// `recvall` idiom.
fn read_exact_or_eof<R: Read>(stream: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::MalformedMessage("connection closed mid-frame".to_string())
        } else {
            TransportError::Io(e)
        }
    })?;
    Ok(buf)
}

/// Read one length-prefixed frame and return its raw payload bytes.
pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>> {
    let len_bytes = read_exact_or_eof(stream, 4)?;
    let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
    read_exact_or_eof(stream, len)
}

/// Write one length-prefixed frame.
pub fn write_frame<W: Write>(stream: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| TransportError::MalformedMessage("payload too large to frame".to_string()))?;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        assert_eq!(&buf[0..4], &5u32.to_be_bytes());

        let mut cursor = Cursor::new(buf);
        let payload = read_frame(&mut cursor).unwrap();
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn rejects_truncated_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello world").unwrap();
        buf.truncate(6);
        let mut cursor = Cursor::new(buf);
        assert!(read_frame(&mut cursor).is_err());
    }
}
