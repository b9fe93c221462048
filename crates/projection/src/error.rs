use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("Axis '{axis}' has no points")]
    EmptyAxis { axis: char },

    #[error("Axis '{axis}' has invalid spacing {spacing}")]
    InvalidSpacing { axis: char, spacing: f64 },
}
