//! The grid metadata record sent when the client asks for info.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{ensure_len, get_label, put_label, LABEL_LEN};
use crate::error::ProtocolResult;

/// Grid metadata for the requested field.
///
/// Heights, spacing and bounds are scaled by `divisor`, except that lat/lon
/// grids scale dx, dy and the x/y bounds by `highres_divisor`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridInfo {
    pub order: i32,
    pub data_field: i32,
    pub projection: i32,
    pub lat_origin: i32,
    pub lon_origin: i32,
    pub ht_origin: i32,
    pub source_x: i32,
    pub source_y: i32,
    pub source_z: i32,
    pub nx: i32,
    pub ny: i32,
    pub nz: i32,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
    pub nfields: i32,
    pub divisor: i32,
    pub highres_divisor: i32,
    pub scale: i32,
    pub bias: i32,
    pub bad_data_val: i32,
    pub missing_data_val: i32,
    pub units_label_x: String,
    pub units_label_y: String,
    pub units_label_z: String,
    pub field_units: String,
    pub field_name: String,
    pub source_name: String,
}

impl GridInfo {
    const WORDS: usize = 28;
    const LABELS: usize = 6;
    pub const WIRE_SIZE: usize = Self::WORDS * 4 + Self::LABELS * LABEL_LEN;

    fn words(&self) -> [i32; Self::WORDS] {
        [
            self.order,
            self.data_field,
            self.projection,
            self.lat_origin,
            self.lon_origin,
            self.ht_origin,
            self.source_x,
            self.source_y,
            self.source_z,
            self.nx,
            self.ny,
            self.nz,
            self.dx,
            self.dy,
            self.dz,
            self.min_x,
            self.max_x,
            self.min_y,
            self.max_y,
            self.min_z,
            self.max_z,
            self.nfields,
            self.divisor,
            self.highres_divisor,
            self.scale,
            self.bias,
            self.bad_data_val,
            self.missing_data_val,
        ]
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into(&self, buf: &mut impl BufMut) {
        for word in self.words() {
            buf.put_i32(word);
        }
        for label in [
            &self.units_label_x,
            &self.units_label_y,
            &self.units_label_z,
            &self.field_units,
            &self.field_name,
            &self.source_name,
        ] {
            put_label(buf, label);
        }
    }

    pub fn decode(buf: &[u8]) -> ProtocolResult<Self> {
        ensure_len(buf, Self::WIRE_SIZE, "grid info")?;
        let mut buf = &buf[..Self::WIRE_SIZE];
        let mut words = [0i32; Self::WORDS];
        for word in words.iter_mut() {
            *word = buf.get_i32();
        }
        let [order, data_field, projection, lat_origin, lon_origin, ht_origin, source_x, source_y, source_z, nx, ny, nz, dx, dy, dz, min_x, max_x, min_y, max_y, min_z, max_z, nfields, divisor, highres_divisor, scale, bias, bad_data_val, missing_data_val] =
            words;
        Ok(Self {
            order,
            data_field,
            projection,
            lat_origin,
            lon_origin,
            ht_origin,
            source_x,
            source_y,
            source_z,
            nx,
            ny,
            nz,
            dx,
            dy,
            dz,
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
            nfields,
            divisor,
            highres_divisor,
            scale,
            bias,
            bad_data_val,
            missing_data_val,
            units_label_x: get_label(&mut buf),
            units_label_y: get_label(&mut buf),
            units_label_z: get_label(&mut buf),
            field_units: get_label(&mut buf),
            field_name: get_label(&mut buf),
            source_name: get_label(&mut buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_wire_size() {
        assert_eq!(GridInfo::WIRE_SIZE, 304);
        let info = GridInfo::default();
        assert_eq!(info.encode().len(), 304);
    }

    #[test]
    fn test_info_labels_follow_words() {
        let info = GridInfo {
            nx: 10,
            missing_data_val: 255,
            units_label_x: "km".to_string(),
            field_name: "DBZ".to_string(),
            source_name: "radar".to_string(),
            ..Default::default()
        };
        let bytes = info.encode();
        assert_eq!(&bytes[36..40], &[0, 0, 0, 10]);
        assert_eq!(&bytes[108..112], &[0, 0, 0, 255]);
        assert_eq!(&bytes[112..115], b"km\0");
        assert_eq!(&bytes[112 + 4 * 32..112 + 4 * 32 + 3], b"DBZ");

        let decoded = GridInfo::decode(&bytes).unwrap();
        assert_eq!(decoded, info);
    }
}
