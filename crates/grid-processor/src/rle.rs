//! Run-length coding of 8-bit sample buffers.
//!
//! Layout (all header words big-endian u32):
//!
//! ```text
//! flag | key | total length | full length | coded length | body
//! ```
//!
//! The body copies bytes literally, except that runs longer than three
//! bytes, and any occurrence of the key byte, are written as the triple
//! `key, count, value`.

use bytes::{Buf, BufMut};

use crate::error::{GridProcessorError, Result};

/// Marks a run-length coded buffer.
pub const RLE_FLAG: u32 = 0xfe01_02fd;

/// Size of the coded header.
pub const RLE_HEADER_LEN: usize = 20;

/// Shortest run written as a triple.
const MIN_CODED_RUN: usize = 4;

/// Pick the key: the least frequent byte value, lowest value on ties.
fn choose_key(data: &[u8]) -> u8 {
    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let mut key = 0u8;
    for value in 1..256 {
        if counts[value] < counts[key as usize] {
            key = value as u8;
        }
    }
    key
}

/// Run-length encode `data`, with runs of at most `max_run` bytes per
/// triple.
///
/// Returns `None` when the coded form would not be smaller than the input.
pub fn rle_encode(data: &[u8], max_run: u8) -> Option<Vec<u8>> {
    if data.is_empty() {
        return None;
    }
    let max_run = max_run.max(1) as usize;
    let key = choose_key(data);

    let mut body = Vec::with_capacity(data.len() / 2);
    let mut i = 0;
    while i < data.len() {
        let value = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == value {
            run += 1;
        }
        i += run;

        while run > 0 {
            let chunk = run.min(max_run);
            if chunk >= MIN_CODED_RUN || value == key {
                body.extend_from_slice(&[key, chunk as u8, value]);
            } else {
                body.extend(std::iter::repeat(value).take(chunk));
            }
            run -= chunk;
        }

        if RLE_HEADER_LEN + body.len() >= data.len() {
            return None;
        }
    }

    let total = RLE_HEADER_LEN + body.len();
    let mut out = Vec::with_capacity(total);
    out.put_u32(RLE_FLAG);
    out.put_u32(key as u32);
    out.put_u32(total as u32);
    out.put_u32(data.len() as u32);
    out.put_u32(body.len() as u32);
    out.extend_from_slice(&body);
    Some(out)
}

/// Decode a buffer produced by [`rle_encode`].
pub fn rle_decode(coded: &[u8]) -> Result<Vec<u8>> {
    if coded.len() < RLE_HEADER_LEN {
        return Err(GridProcessorError::decompression(format!(
            "buffer of {} bytes is shorter than the header",
            coded.len()
        )));
    }
    let mut header = &coded[..RLE_HEADER_LEN];
    let flag = header.get_u32();
    if flag != RLE_FLAG {
        return Err(GridProcessorError::decompression(format!(
            "bad flag {:#010x}",
            flag
        )));
    }
    let key = header.get_u32() as u8;
    let total = header.get_u32() as usize;
    let full = header.get_u32() as usize;
    let coded_len = header.get_u32() as usize;
    if total != RLE_HEADER_LEN + coded_len || coded.len() < total {
        return Err(GridProcessorError::decompression(format!(
            "inconsistent lengths: total {}, coded {}, buffer {}",
            total,
            coded_len,
            coded.len()
        )));
    }

    let body = &coded[RLE_HEADER_LEN..total];
    let mut out = Vec::with_capacity(full);
    let mut i = 0;
    while i < body.len() {
        if body[i] == key {
            if i + 2 >= body.len() {
                return Err(GridProcessorError::decompression("truncated run"));
            }
            let count = body[i + 1] as usize;
            out.extend(std::iter::repeat(body[i + 2]).take(count));
            i += 3;
        } else {
            out.push(body[i]);
            i += 1;
        }
    }

    if out.len() != full {
        return Err(GridProcessorError::decompression(format!(
            "decoded {} bytes, header says {}",
            out.len(),
            full
        )));
    }
    Ok(out)
}
