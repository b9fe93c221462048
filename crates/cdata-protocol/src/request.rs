//! The fixed-size client request record.

use std::ops::BitOr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use cdata_common::{CdataError, CdataResult, TimeWindow};

use crate::codec::{ensure_len, unscale};
use crate::error::ProtocolResult;

/// Bitmask of what the client wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimaryCommand(u32);

impl PrimaryCommand {
    pub const GET_INFO: Self = Self(0x0001);
    pub const GET_DATA: Self = Self(0x0002);
    pub const GET_PLANE_HEIGHTS: Self = Self(0x0004);
    pub const GET_MOST_RECENT: Self = Self(0x0008);
    pub const GET_NEW: Self = Self(0x0010);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Whether the client asked for the newest data rather than a time.
    pub fn wants_latest(&self) -> bool {
        self.contains(Self::GET_MOST_RECENT) || self.contains(Self::GET_NEW)
    }
}

impl BitOr for PrimaryCommand {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The kind of slice named by the secondary command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    /// One horizontal plane at the level nearest the z-window midpoint.
    HorizontalPlane,
    /// A single plane summarizing every level.
    Composite,
    /// An arbitrary vertical section between two horizontal points.
    VerticalSection,
}

impl SliceKind {
    pub const XY_PLANE_CODE: i32 = 1;
    pub const V_PLANE_CODE: i32 = 8;
    pub const MAX_XY_PLANE_CODE: i32 = 16;

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::XY_PLANE_CODE => Some(SliceKind::HorizontalPlane),
            Self::MAX_XY_PLANE_CODE => Some(SliceKind::Composite),
            Self::V_PLANE_CODE => Some(SliceKind::VerticalSection),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            SliceKind::HorizontalPlane => Self::XY_PLANE_CODE,
            SliceKind::Composite => Self::MAX_XY_PLANE_CODE,
            SliceKind::VerticalSection => Self::V_PLANE_CODE,
        }
    }
}

/// A decoded client request. Values are kept exactly as they travel on
/// the wire; accessors convert scaled fields into physical units.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientRequest {
    pub primary_com: PrimaryCommand,
    pub second_com: i32,
    pub divisor: i32,
    pub lat_origin: i32,
    pub lon_origin: i32,
    pub ht_origin: i32,
    pub time_min: i32,
    pub time_cent: i32,
    pub time_max: i32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
    pub data_field: i32,
    pub data_type: i32,
    pub add_data_len: i32,
}

impl ClientRequest {
    /// Size of the record on the wire.
    pub const WIRE_SIZE: usize = 18 * 4;

    pub fn decode(buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len(buf, Self::WIRE_SIZE, "client request")?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        Ok(Self {
            primary_com: PrimaryCommand::from_bits(buf.get_u32()),
            second_com: buf.get_i32(),
            divisor: buf.get_i32(),
            lat_origin: buf.get_i32(),
            lon_origin: buf.get_i32(),
            ht_origin: buf.get_i32(),
            time_min: buf.get_i32(),
            time_cent: buf.get_i32(),
            time_max: buf.get_i32(),
            min_x: buf.get_i32(),
            max_x: buf.get_i32(),
            min_y: buf.get_i32(),
            max_y: buf.get_i32(),
            min_z: buf.get_i32(),
            max_z: buf.get_i32(),
            data_field: buf.get_i32(),
            data_type: buf.get_i32(),
            add_data_len: buf.get_i32(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        buf.put_u32(self.primary_com.bits());
        for word in [
            self.second_com,
            self.divisor,
            self.lat_origin,
            self.lon_origin,
            self.ht_origin,
            self.time_min,
            self.time_cent,
            self.time_max,
            self.min_x,
            self.max_x,
            self.min_y,
            self.max_y,
            self.min_z,
            self.max_z,
            self.data_field,
            self.data_type,
            self.add_data_len,
        ] {
            buf.put_i32(word);
        }
        buf.freeze()
    }

    pub fn slice_kind(&self) -> Option<SliceKind> {
        SliceKind::from_code(self.second_com)
    }

    /// Check the request before any data is touched.
    ///
    /// z must always be ordered. For planes and composites x and y must be
    /// ordered too; a vertical section's x/y pairs are its endpoints and
    /// may run in either direction.
    pub fn validate(&self) -> CdataResult<SliceKind> {
        if self.divisor <= 0 {
            return Err(CdataError::InvalidRequest(format!(
                "divisor must be positive, got {}",
                self.divisor
            )));
        }
        let kind = self.slice_kind().ok_or_else(|| {
            CdataError::InvalidRequest(format!("unknown secondary command {}", self.second_com))
        })?;
        let mut axes = vec![('z', self.min_z, self.max_z)];
        if kind != SliceKind::VerticalSection {
            axes.push(('x', self.min_x, self.max_x));
            axes.push(('y', self.min_y, self.max_y));
        }
        for (axis, min, max) in axes {
            if min > max {
                return Err(CdataError::InvertedRange {
                    axis,
                    min: min as i64,
                    max: max as i64,
                });
            }
        }
        if self.data_field < 0 {
            return Err(CdataError::InvalidRequest(format!(
                "negative field index {}",
                self.data_field
            )));
        }
        Ok(kind)
    }

    fn physical(&self, value: i32) -> f64 {
        unscale(value, self.divisor)
    }

    /// Requested x range in physical units (km or degrees).
    pub fn x_range(&self) -> (f64, f64) {
        (self.physical(self.min_x), self.physical(self.max_x))
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.physical(self.min_y), self.physical(self.max_y))
    }

    pub fn z_range(&self) -> (f64, f64) {
        (self.physical(self.min_z), self.physical(self.max_z))
    }

    /// Midpoint of the requested z window, used to pick a single plane.
    pub fn z_mid(&self) -> f64 {
        let (lo, hi) = self.z_range();
        (lo + hi) / 2.0
    }

    /// The client's origin override as (lat, lon) degrees, if any.
    pub fn origin(&self) -> Option<(f64, f64)> {
        if self.lat_origin == 0 && self.lon_origin == 0 {
            return None;
        }
        Some((self.physical(self.lat_origin), self.physical(self.lon_origin)))
    }

    pub fn time_window(&self) -> Option<TimeWindow> {
        TimeWindow::from_epoch(
            self.time_cent as i64,
            self.time_min as i64,
            self.time_max as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_DIVISOR;

    fn plane_request() -> ClientRequest {
        ClientRequest {
            primary_com: PrimaryCommand::GET_INFO | PrimaryCommand::GET_DATA,
            second_com: SliceKind::XY_PLANE_CODE,
            divisor: DEFAULT_DIVISOR,
            max_x: 9 * DEFAULT_DIVISOR,
            max_y: 9 * DEFAULT_DIVISOR,
            ..Default::default()
        }
    }

    #[test]
    fn test_wire_layout_is_big_endian_in_field_order() {
        let mut request = plane_request();
        request.add_data_len = 0x0102_0304;
        let bytes = request.encode();
        assert_eq!(bytes.len(), ClientRequest::WIRE_SIZE);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 1]);
        assert_eq!(&bytes[68..72], &[1, 2, 3, 4]);

        let decoded = ClientRequest::decode(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let err = ClientRequest::decode(&[0u8; 40]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "client request record truncated: expected 72 bytes, got 40"
        );
    }

    #[test]
    fn test_validate_rejects_inverted_x_for_planes() {
        let mut request = plane_request();
        request.min_x = 5 * DEFAULT_DIVISOR;
        request.max_x = DEFAULT_DIVISOR;
        let err = request.validate().unwrap_err();
        assert!(matches!(err, CdataError::InvertedRange { axis: 'x', .. }));
    }

    #[test]
    fn test_validate_allows_reversed_section_endpoints() {
        let mut request = plane_request();
        request.second_com = SliceKind::V_PLANE_CODE;
        request.min_x = 9 * DEFAULT_DIVISOR;
        request.max_x = 0;
        assert_eq!(request.validate().unwrap(), SliceKind::VerticalSection);

        request.min_z = 2;
        request.max_z = 1;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_divisor_and_command() {
        let mut request = plane_request();
        request.divisor = 0;
        assert!(request.validate().is_err());

        let mut request = plane_request();
        request.second_com = 3;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_scaled_accessors() {
        let mut request = plane_request();
        request.min_z = 5_000;
        request.max_z = 15_000;
        assert_eq!(request.x_range(), (0.0, 9.0));
        assert_eq!(request.z_mid(), 1.0);
        assert!(request.origin().is_none());

        request.lat_origin = 400_000;
        request.lon_origin = -1_050_000;
        assert_eq!(request.origin(), Some((40.0, -105.0)));
    }

    #[test]
    fn test_primary_command_flags() {
        let mut command = PrimaryCommand::GET_DATA | PrimaryCommand::GET_NEW;
        assert!(command.wants_latest());
        assert!(!command.contains(PrimaryCommand::GET_INFO));
        command.insert(PrimaryCommand::GET_INFO);
        assert!(command.contains(PrimaryCommand::GET_INFO | PrimaryCommand::GET_DATA));
        command.remove(PrimaryCommand::GET_NEW);
        assert!(!command.wants_latest());
    }
}
