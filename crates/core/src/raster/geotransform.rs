//! North-up affine transform between grid cells and map coordinates

use serde::{Deserialize, Serialize};

/// Affine transform of an axis-aligned (north-up) grid.
///
/// ```text
/// x = origin_x + col * cell_width
/// y = origin_y + row * cell_height
/// ```
///
/// `origin` is the upper-left corner of cell (0, 0) and `cell_height`
/// is negative, so row 0 is the northernmost row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X direction
    pub cell_width: f64,
    /// Cell size in Y direction (negative for north-up grids)
    pub cell_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
        }
    }

    /// Map coordinates of the center of cell (col, row)
    #[inline]
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_width,
            self.origin_y + (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Map coordinates of the upper-left corner of cell (col, row)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.cell_width,
            self.origin_y + row as f64 * self.cell_height,
        )
    }

    /// Fractional (col, row) of a map coordinate; `.floor()` gives the cell.
    ///
    /// Returns NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.cell_width == 0.0 || self.cell_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.cell_width,
            (y - self.origin_y) / self.cell_height,
        )
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(cols, rows);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
