//! Shared helpers for the fixed-size big-endian records.

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, ProtocolResult};

/// Scale factor for fractional values, known to clients by convention.
pub const DEFAULT_DIVISOR: i32 = 10_000;

/// Scale factor for lat/lon spacing and bounds in the grid info record.
pub const HIGHRES_DIVISOR: i32 = 1_000_000;

/// Width of every text label in the grid info record, including the NUL.
pub const LABEL_LEN: usize = 32;

/// Convert a physical value into its scaled wire integer.
pub fn scale(value: f64, divisor: i32) -> i32 {
    let scaled = (value * divisor as f64).round();
    scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Convert a scaled wire integer back into a physical value.
pub fn unscale(value: i32, divisor: i32) -> f64 {
    if divisor == 0 {
        return value as f64;
    }
    value as f64 / divisor as f64
}

pub(crate) fn ensure_len(buf: &[u8], expected: usize, record: &'static str) -> ProtocolResult<()> {
    if buf.len() < expected {
        return Err(ProtocolError::truncated(record, expected, buf.len()));
    }
    Ok(())
}

/// Write a NUL-padded label, truncating at a character boundary so the
/// terminating NUL always fits.
pub(crate) fn put_label(buf: &mut impl BufMut, label: &str) {
    let mut end = label.len().min(LABEL_LEN - 1);
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &label.as_bytes()[..end];
    buf.put_slice(bytes);
    buf.put_bytes(0, LABEL_LEN - bytes.len());
}

pub(crate) fn get_label(buf: &mut impl Buf) -> String {
    let mut raw = [0u8; LABEL_LEN];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(LABEL_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_scale_rounds_to_nearest() {
        assert_eq!(scale(1.5, DEFAULT_DIVISOR), 15_000);
        assert_eq!(scale(-0.00004, DEFAULT_DIVISOR), 0);
        assert_eq!(scale(0.00005, DEFAULT_DIVISOR), 1);
        assert_eq!(unscale(15_000, DEFAULT_DIVISOR), 1.5);
        assert_eq!(scale(1e12, DEFAULT_DIVISOR), i32::MAX);
    }

    #[test]
    fn test_label_is_nul_padded_and_truncated() {
        let mut buf = BytesMut::new();
        put_label(&mut buf, "km");
        assert_eq!(buf.len(), LABEL_LEN);
        assert_eq!(&buf[..3], b"km\0");

        let long = "x".repeat(40);
        let mut buf = BytesMut::new();
        put_label(&mut buf, &long);
        assert_eq!(buf.len(), LABEL_LEN);
        assert_eq!(buf[LABEL_LEN - 1], 0);
        assert_eq!(get_label(&mut buf.freeze()), "x".repeat(31));
    }

    #[test]
    fn test_label_truncation_respects_utf8() {
        // 15 two-byte characters fill 30 bytes; the 16th would cross 31.
        let label = "é".repeat(16);
        let mut buf = BytesMut::new();
        put_label(&mut buf, &label);
        assert_eq!(get_label(&mut buf.freeze()), "é".repeat(15));
    }
}
