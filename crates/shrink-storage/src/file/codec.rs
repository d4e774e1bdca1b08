//! Binary framing for the append-only log.
//!
//! Frame: `[len: u32 LE][payload: bincode record][crc32(payload): u32 LE]`.
//! Frames are concatenated with no file header.

use shrink_core::error::{Result, StorageError};
use shrink_core::ShortenedUrl;
use std::io::{ErrorKind, Read};

const LEN_SIZE: usize = 4;
const CRC_SIZE: usize = 4;

/// Frames larger than this are treated as corruption rather than allocated.
pub(crate) const MAX_RECORD_LEN: u32 = 1 << 20;

/// Appends one encoded frame for `url` to `buf`.
pub(crate) fn encode(url: &ShortenedUrl, buf: &mut Vec<u8>) -> Result<()> {
    let payload = bincode::serialize(url).map_err(|e| StorageError::Codec(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_RECORD_LEN)
        .ok_or_else(|| {
            StorageError::Codec(format!("record of {} bytes is too large", payload.len()))
        })?;

    buf.reserve(LEN_SIZE + payload.len() + CRC_SIZE);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(())
}

/// Decodes the next frame from `reader`.
///
/// Returns `Ok(None)` at a clean end of input. A partial frame or a checksum
/// mismatch is reported as [`StorageError::Corrupted`].
pub(crate) fn decode_next<R: Read>(reader: &mut R) -> Result<Option<ShortenedUrl>> {
    let mut len_buf = [0u8; LEN_SIZE];
    if !fill_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_RECORD_LEN {
        return Err(StorageError::Corrupted(format!(
            "record length {len} exceeds {MAX_RECORD_LEN}"
        )));
    }

    let mut payload = vec![0u8; len as usize];
    read_frame_part(reader, &mut payload)?;

    let mut crc_buf = [0u8; CRC_SIZE];
    read_frame_part(reader, &mut crc_buf)?;
    if crc32fast::hash(&payload) != u32::from_le_bytes(crc_buf) {
        return Err(StorageError::Corrupted("checksum mismatch".to_string()));
    }

    bincode::deserialize(&payload)
        .map(Some)
        .map_err(|e| StorageError::Corrupted(e.to_string()))
}

/// Fills `buf` completely. Returns `false` if the input was already at EOF.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(truncated()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

fn read_frame_part<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => truncated(),
        _ => e.into(),
    })
}

fn truncated() -> StorageError {
    StorageError::Corrupted("truncated record".to_string())
}
