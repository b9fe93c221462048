//! Reply assembly and wire ordering.
//!
//! The fixed reply record always goes first. Grid info, the height table
//! and the payload follow only when the matching status bit is set, in
//! that order.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use cdata_protocol::{
    encode_heights_into, scale, GridInfo, Orientation, PlaneHeight, ReplyStatus, ServerReply,
};
use grid_processor::{Extraction, FieldGeometry, VolumeData};

/// Everything written back for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyBundle {
    pub reply: ServerReply,
    pub info: Option<GridInfo>,
    pub heights: Option<Vec<PlaneHeight>>,
    pub payload: Vec<u8>,
}

impl ReplyBundle {
    pub fn new(reply: ServerReply) -> Self {
        Self {
            reply,
            info: None,
            heights: None,
            payload: Vec::new(),
        }
    }

    /// A bundle carrying only a failed reply.
    pub fn failed(mut reply: ServerReply, extra: ReplyStatus) -> Self {
        reply.fail(extra);
        Self::new(reply)
    }

    pub fn status(&self) -> ReplyStatus {
        self.reply.status
    }

    fn sends_info(&self) -> bool {
        self.reply.status.contains(ReplyStatus::INFO_FOLLOWS) && self.info.is_some()
    }

    fn sends_heights(&self) -> bool {
        self.reply.status.contains(ReplyStatus::PLANE_HEIGHTS_FOLLOW) && self.heights.is_some()
    }

    fn sends_data(&self) -> bool {
        self.reply.status.contains(ReplyStatus::DATA_FOLLOWS)
    }

    /// Number of bytes `encode` produces.
    pub fn wire_len(&self) -> usize {
        let mut len = ServerReply::WIRE_SIZE;
        if self.sends_info() {
            len += GridInfo::WIRE_SIZE;
        }
        if let (true, Some(heights)) = (self.sends_heights(), &self.heights) {
            len += heights.len() * PlaneHeight::WIRE_SIZE;
        }
        if self.sends_data() {
            len += self.payload.len();
        }
        len
    }

    /// Serialize everything the client receives, in transmission order.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.reply.encode_into(&mut buf);
        if let (true, Some(info)) = (self.sends_info(), &self.info) {
            info.encode_into(&mut buf);
        }
        if let (true, Some(heights)) = (self.sends_heights(), &self.heights) {
            encode_heights_into(heights, self.reply.divisor, &mut buf);
        }
        if self.sends_data() {
            buf.put_slice(&self.payload);
        }
        buf.freeze()
    }
}

/// Epoch seconds as a wire word, saturating outside the i32 range.
pub fn epoch_word(time: DateTime<Utc>) -> i32 {
    i32::try_from(time.timestamp()).unwrap_or(if time.timestamp() < 0 { i32::MIN } else { i32::MAX })
}

/// Copy volume times and byte decoding parameters into the reply.
pub fn apply_volume(reply: &mut ServerReply, volume: &VolumeData) {
    let divisor = reply.divisor;
    reply.time_begin = epoch_word(volume.times.begin);
    reply.time_end = epoch_word(volume.times.end);
    reply.time_cent = epoch_word(volume.times.centroid);
    reply.time_expire = epoch_word(volume.times.expire);
    reply.scale = scale(volume.field.scale, divisor);
    reply.bias = scale(volume.field.bias, divisor);
    reply.bad_data_val = volume.field.bad_value as i32;
}

/// Copy served dimensions, spacing, bounds and sizes into the reply.
pub fn apply_extraction(
    reply: &mut ServerReply,
    volume: &VolumeData,
    extraction: &Extraction,
    orientation: Orientation,
) {
    let divisor = reply.divisor;
    let grid = volume.grid();
    reply.orient = orientation.code();
    reply.nx = extraction.nx as i32;
    reply.ny = extraction.ny as i32;
    reply.nz = extraction.nz as i32;
    reply.dx = scale(grid.dx, divisor);
    reply.dy = scale(grid.dy, divisor);
    reply.dz = scale(grid.dz, divisor);
    let b = &extraction.bounds;
    reply.x1 = b.x1 as i32;
    reply.x2 = b.x2 as i32;
    reply.y1 = b.y1 as i32;
    reply.y2 = b.y2 as i32;
    reply.z1 = b.z1 as i32;
    reply.z2 = b.z2 as i32;
    reply.n_points = extraction.payload.len() as i32;
    reply.data_length = extraction.data_length as i32;
}

/// Grid metadata for the requested field.
pub fn grid_info(volume: &VolumeData, divisor: i32, highres_divisor: i32) -> GridInfo {
    let grid = volume.grid();
    let field = &volume.field;
    let latlon = grid.projection.is_latlon();
    let horizontal = if latlon { highres_divisor } else { divisor };
    let levels = field.vertical_levels();
    let heights = levels.heights();
    let (min_z, max_z) = match (heights.first(), heights.last()) {
        (Some(lo), Some(hi)) => (lo.min(*hi), lo.max(*hi)),
        _ => (grid.min_z, grid.max_z()),
    };
    let xy_units = if latlon { "deg" } else { "km" };

    GridInfo {
        // x varies fastest, then y, then z
        order: 0,
        data_field: volume.field_index as i32,
        projection: grid.projection.code(),
        lat_origin: scale(grid.origin_lat, divisor),
        lon_origin: scale(grid.origin_lon, divisor),
        ht_origin: 0,
        source_x: scale(volume.source.lon, divisor),
        source_y: scale(volume.source.lat, divisor),
        source_z: scale(volume.source.alt, divisor),
        nx: grid.nx as i32,
        ny: grid.ny as i32,
        nz: grid.nz as i32,
        dx: scale(grid.dx, horizontal),
        dy: scale(grid.dy, horizontal),
        dz: scale(grid.dz, divisor),
        min_x: scale(grid.min_x, horizontal),
        max_x: scale(grid.max_x(), horizontal),
        min_y: scale(grid.min_y, horizontal),
        max_y: scale(grid.max_y(), horizontal),
        min_z: scale(min_z, divisor),
        max_z: scale(max_z, divisor),
        nfields: volume.field_count as i32,
        divisor,
        highres_divisor,
        scale: scale(field.scale, divisor),
        bias: scale(field.bias, divisor),
        bad_data_val: field.bad_value as i32,
        missing_data_val: field.missing_value as i32,
        units_label_x: xy_units.to_string(),
        units_label_y: xy_units.to_string(),
        units_label_z: "km".to_string(),
        field_units: field.units.clone(),
        field_name: field.name.clone(),
        source_name: volume.source_name.clone(),
    }
}

/// Lower, mid and upper height of every level of a field.
pub fn plane_heights(field: &FieldGeometry) -> Vec<PlaneHeight> {
    field
        .vertical_levels()
        .boundaries()
        .into_iter()
        .map(|(lower, mid, upper)| PlaneHeight::new(lower, mid, upper))
        .collect()
}
