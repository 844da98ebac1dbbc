//! IEEE-488.2 arbitrary block framing.
//!
//! A definite-length block is `#<d><N as d digits><N bytes of payload>`. The
//! instrument surrounds the block with whatever else is queued on the socket
//! (completion replies, echoes), so the decoder searches for the first `#`.

use crate::error::{Result, VnaError};
use tracing::debug;

// Offsets are byte positions in `bytes`.
fn header(bytes: &[u8]) -> Result<(usize, usize, Option<usize>)> {
    let startpos = bytes
        .iter()
        .position(|&b| b == b'#')
        .ok_or_else(|| VnaError::Framing("no start-of-block marker found".to_string()))?;
    debug!("block marker at {}", startpos);

    let size_of_length = match bytes.get(startpos + 1) {
        Some(c) if c.is_ascii_digit() => (c - b'0') as usize,
        Some(c) => {
            return Err(VnaError::Framing(format!(
                "expected length digit after '#', found {:?}",
                *c as char
            )))
        }
        None => return Err(VnaError::Framing("block header ends after '#'".to_string())),
    };

    // indefinite-length block, runs to the end of the buffer
    if size_of_length == 0 {
        return Ok((startpos, startpos + 2, None));
    }

    let len_start = startpos + 2;
    let len_end = len_start + size_of_length;
    let digits = bytes
        .get(len_start..len_end)
        .ok_or_else(|| VnaError::Framing("block header truncated".to_string()))?;
    if !digits.iter().all(|c| c.is_ascii_digit()) {
        return Err(VnaError::Framing(format!(
            "block length field {:?} is not numeric",
            String::from_utf8_lossy(digits)
        )));
    }
    let image_size: usize = std::str::from_utf8(digits)
        .map_err(|e| VnaError::Framing(e.to_string()))?
        .parse()
        .map_err(|e: std::num::ParseIntError| VnaError::Framing(e.to_string()))?;
    debug!("size_of_length: {}, image_size: {}", size_of_length, image_size);

    Ok((startpos, len_end, Some(image_size)))
}

/// Return the payload of the first block in `data`.
///
/// A buffer shorter than the declared length yields the bytes that are
/// present.
pub fn decode_block(data: &str) -> Result<&str> {
    let (_, offset, image_size) = header(data.as_bytes())?;
    let end = match image_size {
        Some(n) => (offset + n).min(data.len()),
        None => data.len(),
    };
    if end < offset + image_size.unwrap_or(0) {
        debug!(
            "block truncated: {} of {} payload bytes present",
            end - offset,
            image_size.unwrap_or(0)
        );
    }
    data.get(offset..end).ok_or_else(|| {
        VnaError::Framing("block payload ends inside a multi-byte character".to_string())
    })
}

/// Total number of bytes, counted from the start of `data`, needed to hold
/// the first block completely. `None` until the header itself has arrived or
/// for indefinite-length blocks.
pub fn declared_len(data: &[u8]) -> Option<usize> {
    match header(data) {
        Ok((_, offset, Some(n))) => Some(offset + n),
        _ => None,
    }
}

/// Frame `payload` as a definite-length block using the fewest length digits.
pub fn encode_block(payload: &str) -> String {
    let len = payload.len().to_string();
    format!("#{}{}{}", len.len(), len, payload)
}
