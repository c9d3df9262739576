//! Error types for blox and spatial function operations.

use thiserror::Error;

/// Result type for blox operations.
pub type BloxResult<T> = Result<T, BloxError>;

/// Errors that can occur while configuring spatial functions or extracting boundary points.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BloxError {
    /// Boundary detection was requested before a source image was attached.
    #[error("no source image attached")]
    NoSourceImage,

    /// The grid geometry no longer matches the source image geometry.
    #[error("stale source parameters: {0}")]
    StaleParameters(String),

    /// A parameter was rejected at the configuration boundary.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A physical point maps outside the grid extent.
    #[error("point {point:?} is outside the grid extent")]
    OutOfBounds {
        /// The physical coordinates that were out of bounds.
        point: Vec<f64>,
    },

    /// A voxel index lies outside the grid extent.
    #[error("index {index:?} is outside the grid extent")]
    IndexOutOfBounds {
        /// The offending voxel index.
        index: Vec<usize>,
    },

    /// The grid was used before its geometry was allocated.
    #[error("grid has not been allocated")]
    NotAllocated,

    /// An image buffer does not match the voxel count of its geometry.
    #[error("size mismatch: expected {expected} voxels, got {actual}")]
    SizeMismatch {
        /// Voxel count implied by the geometry.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
}
