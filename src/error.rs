use thiserror::Error;

/// Errors returned by orthtree construction and mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrthtreeError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid region: min exceeds max on axis {axis}")]
    InvalidRegion { axis: usize },

    #[error("too many dimensions: {found} exceeds the maximum of {max}")]
    TooManyDimensions { found: usize, max: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("item does not intersect the index bounds")]
    OutOfBounds,

    #[error("stale item handle")]
    StaleHandle,
}

pub type OrthtreeResult<T> = Result<T, OrthtreeError>;

#[test]
fn error_messages() {
    assert_eq!(
        OrthtreeError::DimensionMismatch { expected: 2, found: 3 }.to_string(),
        "dimension mismatch: expected 2, found 3"
    );
    assert_eq!(OrthtreeError::StaleHandle.to_string(), "stale item handle");
}
