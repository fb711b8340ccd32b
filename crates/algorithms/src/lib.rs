//! # zgrid algorithms
//!
//! Interpolation of Z-valued vector data onto raster grids.
//!
//! - **interpolation**: vertex extraction from points, structure lines and
//!   break lines, k-d tree search, IDW honoring break lines, and streaming
//!   grid output

pub mod interpolation;
pub mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::interpolation::{
        idw_z_interpolation, idw_z_layers, CancellationToken, Feedback, GridFileWriter,
        IdwInterpolator, IdwOptions, IdwZInterpolation, IdwZParams, InputType,
        InterpolationRequest, LayerInput, SearchStrategy, VertexSet, VertexSource, WriteOutcome,
    };
    pub use zgrid_core::prelude::*;
}
