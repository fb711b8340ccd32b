//! IDW interpolation of Z values
//!
//! End-to-end operation: extract vertices from Z-valued layers, index them
//! and stream the interpolated grid into a sink.

use serde::{Deserialize, Serialize};
use tracing::info;
use zgrid_core::io::{MemorySink, RasterSink};
use zgrid_core::vector::FeatureCollection;
use zgrid_core::{Algorithm, Error, Extent, GridSpec, Raster, Result, MAX_GRID_DIMENSION};

use super::grid_writer::{Feedback, InterpolationRequest, WriteOutcome, DEFAULT_ROWS_PER_BATCH};
use super::idw::{IdwOptions, SearchStrategy, MAX_POWER};
use super::vertex_source::{InputType, LayerInput, VertexSet, VertexSource};

const MAX_CELL_SIZE: f64 = 999_999.0;

/// Padding applied to a collapsed axis of the default extent
const EXTENT_PAD: f64 = 1.0;

/// Parameters for IDW interpolation of Z values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwZParams {
    /// How the input layer is read (default: points)
    pub layer_type: InputType,
    /// Distance coefficient, within [0, 99.99] (default: 2.0)
    pub distance_coefficient: f64,
    /// Output columns; ignored when `cell_size_x` is non-zero (default: 300)
    pub columns: usize,
    /// Output rows; ignored when `cell_size_y` is non-zero (default: 300)
    pub rows: usize,
    /// Cell width; 0 derives it from `columns` (default: 0)
    pub cell_size_x: f64,
    /// Cell height; 0 derives it from `rows` (default: 0)
    pub cell_size_y: f64,
    /// Output extent; `None` uses the bounding box of the input vertices
    pub extent: Option<Extent>,
    pub search: SearchStrategy,
    pub snap_distance: f64,
    /// Densify structure and break lines to this vertex spacing
    pub densify_spacing: Option<f64>,
    /// Value written for cells without data (default: -9999)
    pub nodata: f64,
    pub rows_per_batch: usize,
}

impl Default for IdwZParams {
    fn default() -> Self {
        Self {
            layer_type: InputType::Points,
            distance_coefficient: 2.0,
            columns: 300,
            rows: 300,
            cell_size_x: 0.0,
            cell_size_y: 0.0,
            extent: None,
            search: SearchStrategy::All,
            snap_distance: 0.0,
            densify_spacing: None,
            nodata: -9999.0,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
        }
    }
}

impl IdwZParams {
    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        self.idw_options().validate()?;

        for (name, count) in [("columns", self.columns), ("rows", self.rows)] {
            if count > MAX_GRID_DIMENSION {
                return Err(Error::InvalidParameter {
                    name,
                    value: count.to_string(),
                    reason: format!("must be at most {}", MAX_GRID_DIMENSION),
                });
            }
        }

        for (name, size) in [("cell_size_x", self.cell_size_x), ("cell_size_y", self.cell_size_y)] {
            if !(0.0..=MAX_CELL_SIZE).contains(&size) {
                return Err(Error::InvalidParameter {
                    name,
                    value: size.to_string(),
                    reason: format!("must be within [0, {}]", MAX_CELL_SIZE),
                });
            }
        }

        if let Some(extent) = &self.extent {
            extent.validate()?;
        }

        if !self.nodata.is_finite() {
            return Err(Error::InvalidParameter {
                name: "nodata",
                value: self.nodata.to_string(),
                reason: "must be a finite number".into(),
            });
        }

        if self.rows_per_batch == 0 {
            return Err(Error::InvalidParameter {
                name: "rows_per_batch",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }

    pub fn idw_options(&self) -> IdwOptions {
        IdwOptions {
            power: self.distance_coefficient,
            search: self.search,
            snap_distance: self.snap_distance,
        }
    }

    pub fn vertex_source(&self) -> VertexSource {
        match self.densify_spacing {
            Some(spacing) => VertexSource::new().with_densify_spacing(spacing),
            None => VertexSource::new(),
        }
    }

    /// Requested grid over the configured extent, or the vertices' bounds.
    pub fn grid_spec(&self, vertices: &VertexSet) -> Result<GridSpec> {
        let extent = match self.extent {
            Some(extent) => extent,
            None => vertices.extent(EXTENT_PAD)?,
        };
        Ok(GridSpec::new(
            extent,
            self.columns,
            self.rows,
            self.cell_size_x,
            self.cell_size_y,
        ))
    }
}

/// Interpolate one layer, read as `params.layer_type`, into `sink`.
///
/// Inputs are validated before the sink sees any call: a feature without
/// Z values fails with [`Error::MissingZ`] and nothing is written.
pub fn idw_z_interpolation<S, F>(
    features: &FeatureCollection,
    params: &IdwZParams,
    sink: &mut S,
    feedback: &F,
) -> Result<WriteOutcome>
where
    S: RasterSink + ?Sized,
    F: Feedback + ?Sized,
{
    idw_z_layers(
        &[LayerInput::new(features, params.layer_type)],
        params,
        sink,
        feedback,
    )
}

/// Interpolate several layers, each with its own input type, into `sink`.
///
/// `params.layer_type` is not used; every layer carries its own.
pub fn idw_z_layers<S, F>(
    layers: &[LayerInput<'_>],
    params: &IdwZParams,
    sink: &mut S,
    feedback: &F,
) -> Result<WriteOutcome>
where
    S: RasterSink + ?Sized,
    F: Feedback + ?Sized,
{
    params.validate()?;

    let vertices = params.vertex_source().extract_layers(layers)?;
    let grid = params.grid_spec(&vertices)?;
    info!(
        "IDW over {} vertices ({} break segments), power {}",
        vertices.len(),
        vertices.breaks().len(),
        params.distance_coefficient
    );

    InterpolationRequest::new(vertices, grid, params.idw_options())
        .into_writer()?
        .with_rows_per_batch(params.rows_per_batch)
        .write_file(sink, feedback)
}

/// IDW interpolation of Z values into an in-memory raster
#[derive(Debug, Clone, Default)]
pub struct IdwZInterpolation;

impl Algorithm for IdwZInterpolation {
    type Input = FeatureCollection;
    type Output = Raster<f64>;
    type Params = IdwZParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "IdwZInterpolation"
    }

    fn description(&self) -> &'static str {
        "Interpolate Z values of points, structure lines or break lines onto a grid using IDW"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let mut sink = MemorySink::with_nodata(params.nodata);
        match idw_z_interpolation(&input, &params, &mut sink, &())? {
            WriteOutcome::Completed(_) => Ok(sink.into_raster()),
            WriteOutcome::Cancelled { rows_written } => Err(Error::Other(format!(
                "interpolation cancelled after {} rows",
                rows_written
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{line_string, point};
    use zgrid_core::vector::Feature;
    use zgrid_core::ErrorKind;

    fn corner_points() -> FeatureCollection {
        [(0.0, 0.0, 0.0), (1.0, 0.0, 10.0), (0.0, 1.0, 10.0), (1.0, 1.0, 20.0)]
            .into_iter()
            .map(|(x, y, z)| Feature::with_z(point!(x: x, y: y), vec![z]))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let params = IdwZParams::default();
        assert_eq!(params.layer_type, InputType::Points);
        assert_eq!(params.distance_coefficient, 2.0);
        assert_eq!((params.columns, params.rows), (300, 300));
        assert_eq!(params.extent, None);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: IdwZParams =
            serde_json::from_str(r#"{"distance_coefficient": 3.5, "layer_type": "break_lines"}"#).unwrap();
        assert_eq!(params.distance_coefficient, 3.5);
        assert_eq!(params.layer_type, InputType::BreakLines);
        assert_eq!(params.columns, 300);
        assert_eq!(params.search, SearchStrategy::All);
    }

    #[test]
    fn test_out_of_range_parameters() {
        let cases = [
            IdwZParams {
                distance_coefficient: 100.0,
                ..Default::default()
            },
            IdwZParams {
                columns: MAX_GRID_DIMENSION + 1,
                ..Default::default()
            },
            IdwZParams {
                cell_size_y: 1e7,
                ..Default::default()
            },
            IdwZParams {
                cell_size_x: -1.0,
                ..Default::default()
            },
            IdwZParams {
                nodata: f64::NAN,
                ..Default::default()
            },
        ];
        for params in cases {
            let err = params.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input, "{:?}", params);
        }
    }

    #[test]
    fn test_execute_fixed_extent() {
        let params = IdwZParams {
            columns: 1,
            rows: 1,
            extent: Some(Extent::new(0.0, 1.0, 0.0, 1.0).unwrap()),
            ..Default::default()
        };
        let raster = IdwZInterpolation.execute(corner_points(), params).unwrap();
        assert_eq!(raster.shape(), (1, 1));
        assert_relative_eq!(raster.get(0, 0).unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(raster.nodata(), Some(-9999.0));
    }

    #[test]
    fn test_default_extent_is_vertex_bounds() {
        let params = IdwZParams {
            columns: 4,
            rows: 2,
            ..Default::default()
        };
        let raster = IdwZInterpolation.execute(corner_points(), params).unwrap();
        assert_eq!(raster.shape(), (2, 4));
        let (x_min, y_min, x_max, y_max) = raster.bounds();
        assert_relative_eq!(x_min, 0.0);
        assert_relative_eq!(y_min, 0.0);
        assert_relative_eq!(x_max, 1.0);
        assert_relative_eq!(y_max, 1.0);
    }

    #[test]
    fn test_cell_size_derives_dimensions() {
        let params = IdwZParams {
            cell_size_x: 0.25,
            cell_size_y: 0.5,
            ..Default::default()
        };
        let raster = IdwZInterpolation.execute(corner_points(), params).unwrap();
        assert_eq!(raster.shape(), (2, 4));
    }

    #[test]
    fn test_break_line_layer() {
        let walls: FeatureCollection = vec![Feature::with_z(
            line_string![(x: 5.0, y: 0.0), (x: 5.0, y: 10.0)],
            vec![50.0, 50.0],
        )]
        .into_iter()
        .collect();
        let samples: FeatureCollection = vec![
            Feature::with_z(point!(x: 2.0, y: 5.0), vec![0.0]),
            Feature::with_z(point!(x: 8.0, y: 5.0), vec![100.0]),
        ]
        .into_iter()
        .collect();

        let params = IdwZParams {
            columns: 10,
            rows: 10,
            extent: Some(Extent::new(0.0, 10.0, 0.0, 10.0).unwrap()),
            ..Default::default()
        };

        let mut blocked = MemorySink::new();
        idw_z_layers(
            &[
                LayerInput::new(&samples, InputType::Points),
                LayerInput::new(&walls, InputType::BreakLines),
            ],
            &params,
            &mut blocked,
            &(),
        )
        .unwrap();

        let mut open = MemorySink::new();
        idw_z_layers(
            &[
                LayerInput::new(&samples, InputType::Points),
                LayerInput::new(&walls, InputType::StructureLines),
            ],
            &params,
            &mut open,
            &(),
        )
        .unwrap();

        // Cell (row 4, col 2) is centered at (2.5, 5.5), west of the wall
        let west_blocked = blocked.raster().get(4, 2).unwrap();
        let west_open = open.raster().get(4, 2).unwrap();
        assert!(west_blocked < west_open);
        assert!(west_blocked < 50.0);
    }
}
