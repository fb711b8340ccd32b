//! Output grid definition: extent, requested dimensions, resolved layout

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use geo::BoundingRect;
use geo_types::{MultiPoint, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance applied before rounding a derived cell count up, so that an
/// extent divisible by the cell size does not gain an extra column.
const COUNT_EPSILON: f64 = 1e-9;

/// Largest number of columns or rows a grid may have, requested or derived.
pub const MAX_GRID_DIMENSION: usize = 10_000_000;

/// Axis-aligned rectangle in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Extent {
    /// Create a validated extent
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        let extent = Self {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        extent.validate()?;
        Ok(extent)
    }

    /// Check `x_min < x_max` and `y_min < y_max` (NaN fails both).
    pub fn validate(&self) -> Result<()> {
        if self.x_min < self.x_max && self.y_min < self.y_max {
            Ok(())
        } else {
            Err(Error::InvalidExtent {
                x_min: self.x_min,
                x_max: self.x_max,
                y_min: self.y_min,
                y_max: self.y_max,
            })
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Bounding box of a set of (x, y) coordinates.
    ///
    /// A degenerate box (single point, or all points on one axis-parallel
    /// line) is padded by `pad` on the collapsed axis so it stays valid.
    pub fn enclosing<I>(coords: I, pad: f64) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let points: MultiPoint<f64> = coords.into_iter().map(Point::from).collect();
        let rect = points.bounding_rect().ok_or(Error::EmptyInput)?;
        let (mut x_min, mut y_min) = rect.min().x_y();
        let (mut x_max, mut y_max) = rect.max().x_y();

        if x_min == x_max {
            x_min -= pad;
            x_max += pad;
        }
        if y_min == y_max {
            y_min -= pad;
            y_max += pad;
        }
        Self::new(x_min, x_max, y_min, y_max)
    }
}

/// Parses the "xmin,xmax,ymin,ymax" form.
impl FromStr for Extent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidParameter {
                name: "extent",
                value: s.to_string(),
                reason: "expected xmin,xmax,ymin,ymax".into(),
            });
        }

        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| Error::InvalidParameter {
                name: "extent",
                value: s.to_string(),
                reason: format!("'{}' is not a number", part),
            })?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

/// Requested output grid.
///
/// Per axis, a zero cell size is derived from the cell count and a
/// non-zero cell size derives the cell count. A zero count with a zero
/// cell size cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub columns: usize,
    pub rows: usize,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    pub extent: Extent,
}

impl GridSpec {
    pub fn new(extent: Extent, columns: usize, rows: usize, cell_size_x: f64, cell_size_y: f64) -> Self {
        Self {
            columns,
            rows,
            cell_size_x,
            cell_size_y,
            extent,
        }
    }

    /// Grid with a fixed number of cells; cell sizes are derived.
    pub fn with_dimensions(extent: Extent, columns: usize, rows: usize) -> Self {
        Self::new(extent, columns, rows, 0.0, 0.0)
    }

    /// Grid with fixed cell sizes; cell counts are derived.
    pub fn with_cell_size(extent: Extent, cell_size_x: f64, cell_size_y: f64) -> Self {
        Self::new(extent, 0, 0, cell_size_x, cell_size_y)
    }

    /// Validate and compute the effective layout.
    pub fn resolve(&self) -> Result<GridLayout> {
        self.extent.validate()?;

        let (columns, cell_size_x) =
            resolve_axis("columns", self.columns, self.cell_size_x, self.extent.width())?;
        let (rows, cell_size_y) =
            resolve_axis("rows", self.rows, self.cell_size_y, self.extent.height())?;
        if columns.checked_mul(rows).is_none() {
            return Err(Error::InvalidGrid(format!(
                "{} x {} cells overflow the cell count",
                columns, rows
            )));
        }

        // Cells are anchored at the upper-left corner; derived counts may
        // overshoot the requested extent to the east and south.
        let extent = Extent {
            x_min: self.extent.x_min,
            x_max: self.extent.x_min + columns as f64 * cell_size_x,
            y_min: self.extent.y_max - rows as f64 * cell_size_y,
            y_max: self.extent.y_max,
        };

        Ok(GridLayout {
            columns,
            rows,
            cell_size_x,
            cell_size_y,
            extent,
        })
    }
}

fn resolve_axis(name: &'static str, count: usize, cell_size: f64, span: f64) -> Result<(usize, f64)> {
    if !cell_size.is_finite() || cell_size < 0.0 {
        return Err(Error::InvalidParameter {
            name: if name == "columns" { "cell_size_x" } else { "cell_size_y" },
            value: cell_size.to_string(),
            reason: "cell size must be a finite, non-negative number".into(),
        });
    }

    if cell_size > 0.0 {
        let derived = (span / cell_size - COUNT_EPSILON).ceil().max(1.0);
        if derived > MAX_GRID_DIMENSION as f64 {
            return Err(Error::InvalidGrid(format!(
                "cell size {} gives {} {}, more than {}",
                cell_size, derived, name, MAX_GRID_DIMENSION
            )));
        }
        return Ok((derived as usize, cell_size));
    }

    if count > MAX_GRID_DIMENSION {
        return Err(Error::InvalidGrid(format!(
            "{} {} is more than {}",
            count, name, MAX_GRID_DIMENSION
        )));
    }

    if count == 0 {
        return Err(Error::InvalidGrid(format!(
            "{} and cell size are both zero",
            name
        )));
    }

    Ok((count, span / count as f64))
}

/// Effective grid after [`GridSpec::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    /// Extent covered by whole cells
    pub extent: Extent,
}

impl GridLayout {
    /// North-up transform with row 0 at `y_max`
    pub fn transform(&self) -> GeoTransform {
        GeoTransform::new(
            self.extent.x_min,
            self.extent.y_max,
            self.cell_size_x,
            -self.cell_size_y,
        )
    }

    /// Map coordinates of the center of cell (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform().pixel_to_geo(col, row)
    }

    /// Number of cells; [`GridSpec::resolve`] rejects layouts whose
    /// product overflows, so this saturates only for hand-built layouts.
    pub fn cell_count(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Extent {
        Extent::new(0.0, size, 0.0, size).unwrap()
    }

    #[test]
    fn test_cell_size_from_dimensions() {
        let layout = GridSpec::with_dimensions(square(100.0), 300, 300).resolve().unwrap();
        assert_eq!(layout.columns, 300);
        assert_eq!(layout.rows, 300);
        assert_relative_eq!(layout.cell_size_x, 100.0 / 300.0, epsilon = 1e-12);
        assert_relative_eq!(layout.cell_size_y, 100.0 / 300.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dimensions_from_cell_size() {
        let layout = GridSpec::with_cell_size(square(100.0), 1.0, 1.0).resolve().unwrap();
        assert_eq!(layout.columns, 100);
        assert_eq!(layout.rows, 100);
        assert_relative_eq!(layout.extent.x_max, 100.0);
        assert_relative_eq!(layout.extent.y_min, 0.0);
    }

    #[test]
    fn test_cell_size_wins_over_count() {
        let layout = GridSpec::new(square(100.0), 300, 300, 10.0, 10.0).resolve().unwrap();
        assert_eq!(layout.columns, 10);
        assert_eq!(layout.rows, 10);
    }

    #[test]
    fn test_partial_cell_extends_extent() {
        let extent = Extent::new(0.0, 10.0, 0.0, 10.0).unwrap();
        let layout = GridSpec::with_cell_size(extent, 3.0, 4.0).resolve().unwrap();
        assert_eq!(layout.columns, 4);
        assert_eq!(layout.rows, 3);
        assert_relative_eq!(layout.extent.x_max, 12.0);
        assert_relative_eq!(layout.extent.y_min, -2.0);
        assert_relative_eq!(layout.extent.y_max, 10.0);
    }

    #[test]
    fn test_mixed_axes() {
        let extent = Extent::new(0.0, 50.0, 0.0, 20.0).unwrap();
        let layout = GridSpec::new(extent, 5, 0, 0.0, 2.0).resolve().unwrap();
        assert_eq!(layout.columns, 5);
        assert_relative_eq!(layout.cell_size_x, 10.0);
        assert_eq!(layout.rows, 10);
    }

    #[test]
    fn test_zero_count_and_zero_cell_size() {
        let err = GridSpec::with_dimensions(square(10.0), 0, 10).resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[test]
    fn test_negative_cell_size() {
        let err = GridSpec::with_cell_size(square(10.0), -1.0, 1.0).resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "cell_size_x", .. }));
    }

    #[test]
    fn test_tiny_cell_size_exceeds_dimension_limit() {
        let err = GridSpec::with_cell_size(square(1e6), 1e-6, 1e-6).resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }

    #[test]
    fn test_derived_count_at_limit_accepted() {
        let extent = Extent::new(0.0, MAX_GRID_DIMENSION as f64, 0.0, 1.0).unwrap();
        let layout = GridSpec::new(extent, 0, 1, 1.0, 0.0).resolve().unwrap();
        assert_eq!(layout.columns, MAX_GRID_DIMENSION);
        assert_eq!(layout.cell_count(), MAX_GRID_DIMENSION);
    }

    #[test]
    fn test_requested_count_over_limit() {
        let err = GridSpec::with_dimensions(square(10.0), MAX_GRID_DIMENSION + 1, 1)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[test]
    fn test_invalid_extent() {
        assert!(Extent::new(10.0, 0.0, 0.0, 10.0).is_err());
        assert!(Extent::new(0.0, 10.0, 5.0, 5.0).is_err());
        assert!(Extent::new(f64::NAN, 10.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn test_extent_from_str() {
        let extent: Extent = "0, 100, -5.5, 20".parse().unwrap();
        assert_relative_eq!(extent.x_max, 100.0);
        assert_relative_eq!(extent.y_min, -5.5);

        assert!("0,100,20".parse::<Extent>().is_err());
        assert!("0,abc,0,1".parse::<Extent>().is_err());
        assert!("5,1,0,1".parse::<Extent>().is_err());
    }

    #[test]
    fn test_enclosing_pads_degenerate_axis() {
        let extent = Extent::enclosing(vec![(1.0, 2.0), (5.0, 2.0)], 0.5).unwrap();
        assert_relative_eq!(extent.x_min, 1.0);
        assert_relative_eq!(extent.x_max, 5.0);
        assert_relative_eq!(extent.y_min, 1.5);
        assert_relative_eq!(extent.y_max, 2.5);

        assert!(matches!(
            Extent::enclosing(Vec::<(f64, f64)>::new(), 1.0),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_cell_centers_top_down() {
        let layout = GridSpec::with_dimensions(square(2.0), 2, 2).resolve().unwrap();
        let (x, y) = layout.cell_center(0, 0);
        assert_relative_eq!(x, 0.5);
        assert_relative_eq!(y, 1.5);
        let (x, y) = layout.cell_center(1, 1);
        assert_relative_eq!(x, 1.5);
        assert_relative_eq!(y, 0.5);
    }
}
