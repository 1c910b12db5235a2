//! Error types for point cloud distribution.

use thiserror::Error;

/// Errors that can occur when loading point clouds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Position buffer is not a sequence of (x, y, z) triples
    #[error("Positions array must be divisible by 3 (x, y, z), got {len} values")]
    InvalidPositions {
        /// Number of values supplied
        len: usize,
    },

    /// Color buffer describes a different number of points than positions
    #[error("Colors array length {colors} does not match positions length {positions}")]
    ColorMismatch {
        /// Number of position values
        positions: usize,
        /// Number of color values
        colors: usize,
    },
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
