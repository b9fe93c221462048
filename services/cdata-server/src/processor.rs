//! Request processing: one client request in, one reply bundle out.
//!
//! Failures never escape as errors; they are reported through the reply
//! status bits so the client always receives a well-formed reply.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

use cdata_common::CdataError;
use cdata_protocol::{ClientRequest, Orientation, PrimaryCommand, ReplyStatus, ServerReply, SliceKind};
use grid_processor::{extract, Encoding, GridProcessorError, Slice, VolumeData};
use projection::CoordTransform;
use storage::{DataLocation, LocateRequest};

use crate::metrics;
use crate::reply::{apply_extraction, apply_volume, grid_info, plane_heights, ReplyBundle};
use crate::state::ServerContext;

fn slice_label(kind: SliceKind) -> &'static str {
    match kind {
        SliceKind::HorizontalPlane => "plane",
        SliceKind::Composite => "composite",
        SliceKind::VerticalSection => "vertical",
    }
}

/// Apply the command rules that do not depend on the data.
///
/// Plane heights imply grid info. Without a realtime source, "new data"
/// requests fall back to "most recent".
pub fn effective_command(requested: PrimaryCommand, realtime: bool) -> PrimaryCommand {
    let mut command = requested;
    if command.contains(PrimaryCommand::GET_PLANE_HEIGHTS) {
        command.insert(PrimaryCommand::GET_INFO);
    }
    if command.contains(PrimaryCommand::GET_NEW) && !realtime {
        command.remove(PrimaryCommand::GET_NEW);
        command.insert(PrimaryCommand::GET_MOST_RECENT);
    }
    command
}

/// Answer one request.
///
/// Runs synchronously; callers on the async runtime move it to the
/// blocking pool.
pub fn process_request(ctx: &ServerContext, request: &ClientRequest, now: DateTime<Utc>) -> ReplyBundle {
    ctx.stats.record(now);
    let reply = ServerReply::new(request.divisor, request.data_field);

    let kind = match request.validate() {
        Ok(kind) => kind,
        Err(e) => {
            metrics::record_request("invalid");
            report_failure(&e);
            return ReplyBundle::failed(reply, ReplyStatus::VALIDATION_FAILED);
        }
    };
    metrics::record_request(slice_label(kind));

    let command = effective_command(request.primary_com, ctx.config.data.realtime);
    let locate = if command.wants_latest() {
        LocateRequest::Latest
    } else {
        match request.time_window() {
            Some(window) => LocateRequest::Nearest(window),
            None => {
                let e = CdataError::InvalidTime(format!(
                    "window {}..{} around {}",
                    request.time_min, request.time_max, request.time_cent
                ));
                report_failure(&e);
                return ReplyBundle::failed(reply, ReplyStatus::VALIDATION_FAILED);
            }
        }
    };

    let location = {
        let mut window = ctx.window.blocking_lock();
        ctx.locator.locate(&locate, &mut window, now)
    };
    let Some(location) = location else {
        report_failure(&CdataError::DataNotAvailable(format!(
            "no data file matches {:?}",
            locate
        )));
        return ReplyBundle::failed(reply, ReplyStatus::empty());
    };
    debug!(path = ?location.path, time = ?location.time, "Located data");

    let volume = match read_volume(ctx, &location.path, kind, request) {
        Ok(volume) => volume,
        Err(e) => {
            debug!(path = ?location.path, "Volume read failed");
            report_failure(&CdataError::from(e));
            return ReplyBundle::failed(reply, ReplyStatus::empty());
        }
    };

    let mut bundle = answer(ctx, request, command, kind, &volume);

    let status = bundle.status();
    if status.contains(ReplyStatus::INFO_FOLLOWS) || status.contains(ReplyStatus::DATA_FOLLOWS) {
        bundle.reply.status.insert(ReplyStatus::REQUEST_SATISFIED);
        if status.contains(ReplyStatus::DATA_FOLLOWS) {
            ctx.window
                .blocking_lock()
                .record_served(served_time(&location, &volume));
        }
    }
    bundle
}

/// Log and count a request that cannot be answered.
fn report_failure(e: &CdataError) {
    if e.is_client_error() {
        info!(error = %e, kind = e.kind(), "Request cannot be answered");
    } else {
        warn!(error = %e, kind = e.kind(), "Request failed");
    }
    metrics::record_failure(e.kind());
}

fn served_time(location: &DataLocation, volume: &VolumeData) -> DateTime<Utc> {
    location.time.unwrap_or(volume.times.centroid)
}

/// Open the volume, perform the one read the slice needs, and close it.
fn read_volume(
    ctx: &ServerContext,
    path: &Path,
    kind: SliceKind,
    request: &ClientRequest,
) -> grid_processor::Result<VolumeData> {
    let mut handle = ctx.source.open(path)?;
    let field = request.data_field as usize;
    let count = handle.field_count();
    if field >= count {
        return Err(GridProcessorError::FieldOutOfRange { index: field, count });
    }
    match kind {
        SliceKind::HorizontalPlane => handle.read_plane(field, request.z_mid(), Encoding::Int8),
        SliceKind::Composite => handle.read_composite(field, Encoding::Int8),
        SliceKind::VerticalSection => handle.read_volume(field, Encoding::Int8),
    }
}

/// Fill info, heights and payload from an opened volume.
fn answer(
    ctx: &ServerContext,
    request: &ClientRequest,
    command: PrimaryCommand,
    kind: SliceKind,
    volume: &VolumeData,
) -> ReplyBundle {
    let mut reply = ServerReply::new(request.divisor, request.data_field);
    apply_volume(&mut reply, volume);
    let mut bundle = ReplyBundle::new(reply);

    if command.contains(PrimaryCommand::GET_INFO) {
        bundle.info = Some(grid_info(
            volume,
            request.divisor,
            ctx.config.extract.highres_divisor,
        ));
        bundle.reply.status.insert(ReplyStatus::INFO_FOLLOWS);
    } else {
        bundle.reply.status.insert(ReplyStatus::NO_INFO);
    }

    if command.contains(PrimaryCommand::GET_PLANE_HEIGHTS) {
        bundle.heights = Some(plane_heights(&volume.field));
        bundle.reply.status.insert(ReplyStatus::PLANE_HEIGHTS_FOLLOW);
    }

    if command.contains(PrimaryCommand::GET_NEW)
        && volume.times.centroid.timestamp() <= request.time_cent as i64
    {
        debug!(centroid = %volume.times.centroid, "Client already holds the newest data");
        bundle
            .reply
            .status
            .insert(ReplyStatus::NO_NEW_DATA | ReplyStatus::NO_DATA);
        return bundle;
    }

    if !command.contains(PrimaryCommand::GET_DATA) {
        bundle.reply.status.insert(ReplyStatus::NO_DATA);
        return bundle;
    }

    let (x, y) = (request.x_range(), request.y_range());
    let (slice, orientation) = match kind {
        SliceKind::HorizontalPlane => (Slice::Plane { x, y }, Orientation::Xy),
        SliceKind::Composite => (Slice::Composite { x, y }, Orientation::Xy),
        SliceKind::VerticalSection => (
            Slice::Vertical {
                start: (x.0, y.0),
                end: (x.1, y.1),
                z: request.z_range(),
            },
            Orientation::Vertical,
        ),
    };

    let extraction = CoordTransform::new(volume.grid(), request.origin())
        .map_err(GridProcessorError::from)
        .and_then(|transform| {
            extract(volume, &slice, &transform, &ctx.config.extract_options())
        });
    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(e) => {
            debug!(slice = ?slice, "Extraction failed");
            report_failure(&CdataError::from(e));
            bundle.reply.status.insert(ReplyStatus::NO_DATA);
            return bundle;
        }
    };

    if extraction.out_of_range {
        debug!(bounds = ?extraction.bounds, "Requested slice clamped to the grid");
    }
    if extraction.is_empty() {
        bundle.reply.status.insert(ReplyStatus::NO_DATA);
        return bundle;
    }

    apply_extraction(&mut bundle.reply, volume, &extraction, orientation);
    bundle.reply.status.insert(ReplyStatus::DATA_FOLLOWS);
    if command.wants_latest() {
        bundle.reply.status.insert(ReplyStatus::IS_NEW_DATA);
    }
    bundle.payload = extraction.payload;
    bundle
}
