//! Per-level height triples sent after the grid info.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ensure_len, scale, unscale};
use crate::error::ProtocolResult;

/// Lower boundary, centre and upper boundary of one vertical level (km).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHeight {
    pub lower: f64,
    pub mid: f64,
    pub upper: f64,
}

impl PlaneHeight {
    pub const WIRE_SIZE: usize = 3 * 4;

    pub fn new(lower: f64, mid: f64, upper: f64) -> Self {
        Self { lower, mid, upper }
    }
}

/// Encode a height table as `lower, mid, upper` words per level.
pub fn encode_heights(heights: &[PlaneHeight], divisor: i32) -> Bytes {
    let mut buf = BytesMut::with_capacity(heights.len() * PlaneHeight::WIRE_SIZE);
    encode_heights_into(heights, divisor, &mut buf);
    buf.freeze()
}

pub fn encode_heights_into(heights: &[PlaneHeight], divisor: i32, buf: &mut impl BufMut) {
    for h in heights {
        buf.put_i32(scale(h.lower, divisor));
        buf.put_i32(scale(h.mid, divisor));
        buf.put_i32(scale(h.upper, divisor));
    }
}

pub fn decode_heights(buf: &[u8], nz: usize, divisor: i32) -> ProtocolResult<Vec<PlaneHeight>> {
    let len = nz * PlaneHeight::WIRE_SIZE;
    ensure_len(buf, len, "plane heights")?;
    let mut buf = &buf[..len];
    let mut heights = Vec::with_capacity(nz);
    for _ in 0..nz {
        let lower = unscale(buf.get_i32(), divisor);
        let mid = unscale(buf.get_i32(), divisor);
        let upper = unscale(buf.get_i32(), divisor);
        heights.push(PlaneHeight::new(lower, mid, upper));
    }
    Ok(heights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heights_are_scaled_triples() {
        let heights = vec![PlaneHeight::new(0.25, 0.5, 0.75), PlaneHeight::new(0.75, 1.0, 1.25)];
        let bytes = encode_heights(&heights, 10_000);
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], &2_500i32.to_be_bytes());
        assert_eq!(decode_heights(&bytes, 2, 10_000).unwrap(), heights);
        assert!(decode_heights(&bytes, 3, 10_000).is_err());
    }
}
