//! Error types for tessellation and chop assignment

use thiserror::Error;

/// Errors that can occur while tessellating a region or assigning chops
#[derive(Debug, Clone, Error)]
pub enum TessellationError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Geometry engine failure while tessellating a point set
    #[error("tessellation failed: {0}")]
    TessellationFailed(String),
    /// A requested attribute column does not exist in the cell table
    #[error("missing attribute column: '{0}'")]
    MissingColumn(String),
    /// A named raster layer was not provided
    #[error("raster layer not available: '{0}'")]
    RasterMissing(String),
}

/// Result type alias for tessellation operations
pub type Result<T> = std::result::Result<T, TessellationError>;
