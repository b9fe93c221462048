//! Wire schema for the cdata grid-data protocol.
//!
//! Every record has a fixed size and is made of 32-bit words sent in
//! big-endian order, so no length prefix is ever needed. Fractional
//! physical values travel as integers scaled by a shared divisor.

pub mod codec;
pub mod error;
pub mod heights;
pub mod info;
pub mod reply;
pub mod request;

pub use codec::{scale, unscale, DEFAULT_DIVISOR, HIGHRES_DIVISOR};
pub use error::{ProtocolError, ProtocolResult};
pub use heights::{decode_heights, encode_heights, encode_heights_into, PlaneHeight};
pub use info::GridInfo;
pub use reply::{DataType, Orientation, ReplyStatus, ServerReply};
pub use request::{ClientRequest, PrimaryCommand, SliceKind};
