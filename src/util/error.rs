//! Error types for edgematch.

use thiserror::Error;

/// Result alias for edgematch operations.
pub type EdgeMatchResult<T> = std::result::Result<T, EdgeMatchError>;

/// Errors that can occur when building or running the matcher.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EdgeMatchError {
    /// Width or height is zero, or the buffer size overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The exemplar cannot be matched (for example it has no edge pixels).
    #[error("degenerate exemplar: {reason}")]
    DegenerateExemplar { reason: &'static str },
    /// Transformation space parameters are unusable.
    #[error("invalid transformation space: {reason}")]
    InvalidSpace { reason: &'static str },
    /// Matcher configuration or call order is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// An index fell outside a container.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// Reading, decoding or writing an image failed.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
}
