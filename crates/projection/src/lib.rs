//! Coordinate transforms between physical space and grid indices.
//!
//! Implements the flat-earth projection and the per-axis index mapping
//! from scratch without external dependencies.

pub mod error;
pub mod flat;
pub mod transform;
pub mod vertical;

pub use error::{ProjectionError, ProjectionResult};
pub use flat::{FlatEarth, EARTH_RADIUS_KM};
pub use transform::{AxisTransform, CoordTransform, GridIndex};
pub use vertical::VerticalLevels;
