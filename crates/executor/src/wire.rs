//! Frame encoding for the host channel
//!
//! ## Frame Format
//!
//! ```text
//! [length: u32 LE][payload: bytes]
//! ```
//!
//! - **length**: size of the payload, not including the length itself
//! - **payload**: MessagePack (`rmp_serde::to_vec_named`) of a
//!   [`Request`](crate::Request) or [`Response`](crate::Response)
//!
//! Named encoding keeps struct fields as map keys, so optional fields that
//! are skipped when empty still decode.

use std::io::{ErrorKind, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Size of the length prefix.
pub const LEN_PREFIX: usize = 4;

/// Largest payload either side accepts.
pub const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Serialize a message to a frame payload.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(message)?)
}

/// Deserialize a frame payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(payload)?)
}

/// Parse a length prefix, rejecting oversized frames.
pub fn frame_len(prefix: [u8; LEN_PREFIX]) -> Result<usize> {
    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::transport(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"
        )));
    }
    Ok(len)
}

/// Build the length prefix for `payload`.
pub fn prefix_for(payload: &[u8]) -> Result<[u8; LEN_PREFIX]> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(Error::transport(format!(
            "frame of {} bytes exceeds the {MAX_FRAME_LEN} byte limit",
            payload.len()
        )));
    }
    Ok((payload.len() as u32).to_le_bytes())
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_all(&prefix_for(payload)?)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean end of input before any prefix
/// byte; a stream cut mid-frame is a transport error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LEN_PREFIX];
    let mut filled = 0;
    while filled < LEN_PREFIX {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(Error::transport("stream ended inside a frame prefix")),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = frame_len(prefix)?;
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| Error::transport(format!("stream ended inside a frame: {e}")))?;
    Ok(Some(payload))
}
