//! Raster data structures and grid layout

mod element;
mod geotransform;
mod grid;
mod layout;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use layout::{Extent, GridLayout, GridSpec, MAX_GRID_DIMENSION};
