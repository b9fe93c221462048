//! The fixed-size server reply record, always sent first.

use std::ops::BitOr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::ensure_len;
use crate::error::ProtocolResult;

/// Bitmask describing the outcome and what follows the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyStatus(u32);

impl ReplyStatus {
    pub const REQUEST_SATISFIED: Self = Self(0x0001);
    pub const INFO_FOLLOWS: Self = Self(0x0002);
    pub const PLANE_HEIGHTS_FOLLOW: Self = Self(0x0004);
    pub const DATA_FOLLOWS: Self = Self(0x0008);
    pub const NO_INFO: Self = Self(0x0010);
    pub const NO_DATA: Self = Self(0x0020);
    pub const IS_NEW_DATA: Self = Self(0x0040);
    pub const NO_NEW_DATA: Self = Self(0x0080);
    pub const VALIDATION_FAILED: Self = Self(0x0100);

    pub fn empty() -> Self {
        Self(0)
    }

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
}

impl BitOr for ReplyStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Orientation of the served slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Horizontal plane (or composite): payload rows run along x.
    Xy,
    /// Vertical section: payload rows run along the section path.
    Vertical,
}

impl Orientation {
    pub fn code(&self) -> i32 {
        match self {
            Orientation::Xy => 1,
            Orientation::Vertical => 4,
        }
    }
}

/// Sample type of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// One unsigned byte per sample.
    Char,
}

impl DataType {
    pub const CHAR_CODE: i32 = 1;

    pub fn code(&self) -> i32 {
        match self {
            DataType::Char => Self::CHAR_CODE,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            Self::CHAR_CODE => Some(DataType::Char),
            _ => None,
        }
    }
}

/// The server reply as carried on the wire.
///
/// Spacing, scale and bias are scaled by `divisor`; served bounds are
/// grid indices; times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerReply {
    pub status: ReplyStatus,
    pub orient: i32,
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
    pub z1: i32,
    pub z2: i32,
    pub scale: i32,
    pub bias: i32,
    pub divisor: i32,
    pub time_begin: i32,
    pub time_end: i32,
    pub time_cent: i32,
    pub time_expire: i32,
    pub bad_data_val: i32,
    pub data_type: i32,
    pub data_field: i32,
    pub n_points: i32,
    pub data_length: i32,
}

impl ServerReply {
    pub const WIRE_SIZE: usize = 26 * 4;

    /// An empty reply echoing the request's divisor and field.
    pub fn new(divisor: i32, data_field: i32) -> Self {
        Self {
            divisor,
            data_field,
            data_type: DataType::Char.code(),
            ..Default::default()
        }
    }

    pub fn decode(buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len(buf, Self::WIRE_SIZE, "server reply")?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        Ok(Self {
            status: ReplyStatus::from_bits(buf.get_u32()),
            orient: buf.get_i32(),
            nx: buf.get_i32(),
            ny: buf.get_i32(),
            nz: buf.get_i32(),
            dx: buf.get_i32(),
            dy: buf.get_i32(),
            dz: buf.get_i32(),
            x1: buf.get_i32(),
            x2: buf.get_i32(),
            y1: buf.get_i32(),
            y2: buf.get_i32(),
            z1: buf.get_i32(),
            z2: buf.get_i32(),
            scale: buf.get_i32(),
            bias: buf.get_i32(),
            divisor: buf.get_i32(),
            time_begin: buf.get_i32(),
            time_end: buf.get_i32(),
            time_cent: buf.get_i32(),
            time_expire: buf.get_i32(),
            bad_data_val: buf.get_i32(),
            data_type: buf.get_i32(),
            data_field: buf.get_i32(),
            n_points: buf.get_i32(),
            data_length: buf.get_i32(),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.status.bits());
        for word in [
            self.orient,
            self.nx,
            self.ny,
            self.nz,
            self.dx,
            self.dy,
            self.dz,
            self.x1,
            self.x2,
            self.y1,
            self.y2,
            self.z1,
            self.z2,
            self.scale,
            self.bias,
            self.divisor,
            self.time_begin,
            self.time_end,
            self.time_cent,
            self.time_expire,
            self.bad_data_val,
            self.data_type,
            self.data_field,
            self.n_points,
            self.data_length,
        ] {
            buf.put_i32(word);
        }
    }

    /// Mark the request as failed: nothing but this record follows.
    pub fn fail(&mut self, extra: ReplyStatus) {
        self.status.remove(
            ReplyStatus::REQUEST_SATISFIED
                | ReplyStatus::INFO_FOLLOWS
                | ReplyStatus::PLANE_HEIGHTS_FOLLOW
                | ReplyStatus::DATA_FOLLOWS,
        );
        self.status
            .insert(ReplyStatus::NO_INFO | ReplyStatus::NO_DATA | extra);
        self.n_points = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_wire_size_and_order() {
        let mut reply = ServerReply::new(10_000, 2);
        reply.status = ReplyStatus::REQUEST_SATISFIED | ReplyStatus::DATA_FOLLOWS;
        reply.nx = 10;
        reply.n_points = 100;
        reply.data_length = 100;

        let bytes = reply.encode();
        assert_eq!(bytes.len(), ServerReply::WIRE_SIZE);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0x09]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 10]);
        assert_eq!(&bytes[96..100], &[0, 0, 0, 100]);
        assert_eq!(ServerReply::decode(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_fail_clears_follow_bits() {
        let mut reply = ServerReply::new(10_000, 0);
        reply.status = ReplyStatus::REQUEST_SATISFIED | ReplyStatus::INFO_FOLLOWS;
        reply.n_points = 42;
        reply.fail(ReplyStatus::VALIDATION_FAILED);

        assert!(reply.status.contains(ReplyStatus::NO_INFO | ReplyStatus::NO_DATA));
        assert!(reply.status.contains(ReplyStatus::VALIDATION_FAILED));
        assert!(!reply.status.contains(ReplyStatus::REQUEST_SATISFIED));
        assert!(!reply.status.contains(ReplyStatus::INFO_FOLLOWS));
        assert_eq!(reply.n_points, 0);
    }

    #[test]
    fn test_data_type_codes() {
        assert_eq!(DataType::from_code(1), Some(DataType::Char));
        assert_eq!(DataType::from_code(2), None);
    }
}
