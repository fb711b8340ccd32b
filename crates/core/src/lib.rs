//! # zgrid core
//!
//! Core types and I/O for interpolating Z-valued vector data onto rasters.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced in-memory grid
//! - `Extent`, `GridSpec`, `GridLayout`: output grid definition and resolution
//! - `Feature`: 2D geometry with per-coordinate Z values
//! - `RasterSink`: cell-by-cell output (memory, ESRI ASCII grid, GeoTIFF)
//! - GeoJSON feature input

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, ErrorKind, Result};
pub use raster::{
    Extent, GeoTransform, GridLayout, GridSpec, Raster, RasterElement, MAX_GRID_DIMENSION,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::io::{MemorySink, RasterSink};
    pub use crate::raster::{Extent, GeoTransform, GridLayout, GridSpec, Raster, RasterElement};
    pub use crate::vector::{Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;
}
