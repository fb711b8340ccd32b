//! Error types for zgrid

use thiserror::Error;

/// Main error type for zgrid operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Geometries in input layer do not have Z coordinates (feature {feature})")]
    MissingZ { feature: usize },

    #[error("Feature {feature} has {found} Z values for {expected} coordinates")]
    ZCountMismatch {
        feature: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported geometry in feature {feature}: {reason}")]
    UnsupportedGeometry { feature: usize, reason: String },

    #[error("Invalid extent: x [{x_min}, {x_max}], y [{y_min}, {y_max}]")]
    InvalidExtent {
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("No input vertices")]
    EmptyInput,

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("No data at ({x}, {y})")]
    NoData { x: f64, y: f64 },

    #[error("Write error: {0}")]
    Write(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Precondition failure, reported before any processing starts
    Input,
    /// No candidate samples for a single query point
    NoData,
    /// Output could not be written; partial output must be discarded
    Write,
    Other,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingZ { .. }
            | Error::ZCountMismatch { .. }
            | Error::UnsupportedGeometry { .. }
            | Error::InvalidExtent { .. }
            | Error::InvalidGrid(_)
            | Error::InvalidParameter { .. }
            | Error::InvalidDimensions { .. }
            | Error::EmptyInput
            | Error::GeoJson(_) => ErrorKind::Input,
            Error::NoData { .. } => ErrorKind::NoData,
            Error::Write(_) | Error::Io(_) | Error::IndexOutOfBounds { .. } => ErrorKind::Write,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Wrap any error raised while emitting output as [`Error::Write`].
    pub fn into_write(self) -> Self {
        match self {
            Error::Write(_) => self,
            other => Error::Write(other.to_string()),
        }
    }
}

/// Result type alias for zgrid operations
pub type Result<T> = std::result::Result<T, Error>;
