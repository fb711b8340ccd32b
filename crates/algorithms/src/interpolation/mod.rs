//! IDW interpolation of Z-valued vector data
//!
//! Pipeline, in dependency order:
//! - [`VertexSource`]: sample vertices from points, structure lines, break lines
//! - [`KdTree`]: 2D spatial index over the vertices
//! - [`IdwInterpolator`]: inverse distance weighting honoring break lines
//! - [`GridFileWriter`]: streams the interpolated grid into a raster sink

mod breaklines;
mod grid_writer;
mod idw;
mod idw_z;
pub mod kdtree;
mod vertex_source;

pub use breaklines::{BreakIndex, BreakSegment};
pub use grid_writer::{
    CancellationToken, Feedback, GridFileWriter, GridSummary, InterpolationRequest, ProgressFn,
    WriteOutcome, DEFAULT_ROWS_PER_BATCH,
};
pub use idw::{IdwInterpolator, IdwOptions, SearchStrategy};
pub use idw_z::{idw_z_interpolation, idw_z_layers, IdwZInterpolation, IdwZParams};
pub use kdtree::{KdTree, Neighbor};
pub use vertex_source::{InputType, LayerInput, VertexSet, VertexSource};

/// Role of a sample vertex, taken from the layer it was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Point,
    StructureLine,
    BreakLine,
}

/// A sample location with elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub kind: VertexKind,
    /// Line the vertex belongs to; `None` for points
    pub line_id: Option<u32>,
}

impl Vertex {
    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            kind: VertexKind::Point,
            line_id: None,
        }
    }

    pub fn on_line(x: f64, y: f64, z: f64, kind: VertexKind, line_id: u32) -> Self {
        Self {
            x,
            y,
            z,
            kind,
            line_id: Some(line_id),
        }
    }

    /// Squared Euclidean distance to (x, y)
    #[inline]
    pub fn dist_sq(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}
