//! Streaming the interpolated grid into a raster sink
//!
//! Rows are evaluated in batches, in parallel when the `parallel` feature
//! is enabled. The ordered collect of each batch keeps the sink fed in
//! row-major order regardless of which thread finished first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use zgrid_core::io::RasterSink;
use zgrid_core::{Error, ErrorKind, GeoTransform, GridLayout, GridSpec, Result};

use super::idw::{IdwInterpolator, IdwOptions};
use super::vertex_source::VertexSet;
use crate::maybe_rayon::*;

/// Rows evaluated between two cancellation checks
pub const DEFAULT_ROWS_PER_BATCH: usize = 16;

/// Progress reporting and cooperative cancellation for [`GridFileWriter`].
pub trait Feedback {
    /// Polled before every batch of rows.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Fraction of rows written, in [0, 1], never decreasing.
    fn set_progress(&self, _fraction: f64) {}
}

/// No progress, never cancelled.
impl Feedback for () {}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Feedback for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

/// Progress callback as [`Feedback`].
pub struct ProgressFn<F>(pub F);

impl<F: Fn(f64)> Feedback for ProgressFn<F> {
    fn set_progress(&self, fraction: f64) {
        (self.0)(fraction)
    }
}

/// Result of a completed write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSummary {
    pub layout: GridLayout,
    pub cells_written: usize,
    /// Cells with no candidate sample
    pub nodata_cells: usize,
}

/// How [`GridFileWriter::write_file`] ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteOutcome {
    Completed(GridSummary),
    /// Stopped at a batch boundary; the sink was not finalized
    Cancelled { rows_written: usize },
}

impl WriteOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WriteOutcome::Cancelled { .. })
    }

    pub fn summary(&self) -> Option<&GridSummary> {
        match self {
            WriteOutcome::Completed(summary) => Some(summary),
            WriteOutcome::Cancelled { .. } => None,
        }
    }
}

/// Everything needed to produce a grid: samples, output grid and IDW options.
#[derive(Debug, Clone)]
pub struct InterpolationRequest {
    pub vertices: VertexSet,
    pub grid: GridSpec,
    pub options: IdwOptions,
}

impl InterpolationRequest {
    pub fn new(vertices: VertexSet, grid: GridSpec, options: IdwOptions) -> Self {
        Self {
            vertices,
            grid,
            options,
        }
    }

    /// Validate the grid, index the vertices and build the writer.
    pub fn into_writer(self) -> Result<GridFileWriter> {
        self.grid.resolve()?;
        let interpolator = IdwInterpolator::new(self.vertices, self.options)?;
        Ok(GridFileWriter::new(interpolator, self.grid))
    }
}

/// Evaluates an [`IdwInterpolator`] at every cell center of a grid.
#[derive(Debug, Clone)]
pub struct GridFileWriter {
    interpolator: IdwInterpolator,
    spec: GridSpec,
    rows_per_batch: usize,
}

impl GridFileWriter {
    pub fn new(interpolator: IdwInterpolator, spec: GridSpec) -> Self {
        Self {
            interpolator,
            spec,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
        }
    }

    /// Rows evaluated per batch (minimum 1).
    pub fn with_rows_per_batch(mut self, rows: usize) -> Self {
        self.rows_per_batch = rows.max(1);
        self
    }

    pub fn interpolator(&self) -> &IdwInterpolator {
        &self.interpolator
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Write every cell of the grid into `sink`.
    ///
    /// The grid is resolved before the sink is touched, so an invalid grid
    /// leaves the sink untouched. Sink failures abort with
    /// [`Error::Write`]; cancellation is reported as
    /// [`WriteOutcome::Cancelled`].
    pub fn write_file<S, F>(&self, sink: &mut S, feedback: &F) -> Result<WriteOutcome>
    where
        S: RasterSink + ?Sized,
        F: Feedback + ?Sized,
    {
        let layout = self.spec.resolve()?;
        let transform = layout.transform();
        info!(
            "Writing {}x{} grid, cell size {} x {}, extent {}",
            layout.columns, layout.rows, layout.cell_size_x, layout.cell_size_y, layout.extent
        );

        sink.begin(&layout).map_err(Error::into_write)?;

        let mut rows_written = 0;
        let mut nodata_cells = 0;

        while rows_written < layout.rows {
            if feedback.is_cancelled() {
                info!("Cancelled after {} of {} rows", rows_written, layout.rows);
                return Ok(WriteOutcome::Cancelled { rows_written });
            }

            let start = rows_written;
            let end = (start + self.rows_per_batch).min(layout.rows);
            let batch: Vec<Vec<Option<f64>>> = (start..end)
                .into_par_iter()
                .map(|row| self.compute_row(&transform, row, layout.columns))
                .collect::<Result<Vec<_>>>()?;

            for (row, values) in (start..end).zip(batch) {
                for (col, value) in values.into_iter().enumerate() {
                    if value.is_none() {
                        nodata_cells += 1;
                    }
                    sink.set_cell(row, col, value).map_err(Error::into_write)?;
                }
                rows_written += 1;
                feedback.set_progress(rows_written as f64 / layout.rows as f64);
            }
            debug!("Rows {}..{} written", start, end);
        }

        sink.finalize().map_err(Error::into_write)?;

        let summary = GridSummary {
            layout,
            cells_written: layout.cell_count(),
            nodata_cells,
        };
        info!(
            "Grid complete: {} cells, {} without data",
            summary.cells_written, summary.nodata_cells
        );
        Ok(WriteOutcome::Completed(summary))
    }

    fn compute_row(&self, transform: &GeoTransform, row: usize, cols: usize) -> Result<Vec<Option<f64>>> {
        (0..cols)
            .map(|col| {
                let (x, y) = transform.pixel_to_geo(col, row);
                match self.interpolator.value_at(x, y) {
                    Ok(z) => Ok(Some(z)),
                    Err(e) if e.kind() == ErrorKind::NoData => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{SearchStrategy, Vertex};
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use zgrid_core::io::MemorySink;
    use zgrid_core::Extent;

    fn corners() -> VertexSet {
        VertexSet::from_vertices(vec![
            Vertex::point(0.0, 0.0, 0.0),
            Vertex::point(1.0, 0.0, 10.0),
            Vertex::point(0.0, 1.0, 10.0),
            Vertex::point(1.0, 1.0, 20.0),
        ])
    }

    fn unit_grid(n: usize) -> GridSpec {
        GridSpec::with_dimensions(Extent::new(0.0, 1.0, 0.0, 1.0).unwrap(), n, n)
    }

    fn writer(n: usize) -> GridFileWriter {
        InterpolationRequest::new(corners(), unit_grid(n), IdwOptions::default())
            .into_writer()
            .unwrap()
    }

    struct FailingSink {
        fail_at_row: usize,
    }

    impl RasterSink for FailingSink {
        fn set_cell(&mut self, row: usize, _col: usize, _value: Option<f64>) -> Result<()> {
            if row == self.fail_at_row {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            Ok(())
        }

        fn finalize(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_single_cell_center_of_square() {
        let mut sink = MemorySink::new();
        let outcome = writer(1).write_file(&mut sink, &()).unwrap();

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.cells_written, 1);
        assert_eq!(summary.nodata_cells, 0);
        assert!(sink.is_finalized());
        assert_relative_eq!(sink.raster().get(0, 0).unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rows_run_north_to_south() {
        let mut sink = MemorySink::new();
        writer(2).write_file(&mut sink, &()).unwrap();
        let raster = sink.into_raster();

        // Row 0 is the northern row: (0.25, 0.75) sits between z = 0 and z = 20
        assert_relative_eq!(raster.get(0, 0).unwrap(), 10.0, epsilon = 1e-12);
        assert!(raster.get(1, 0).unwrap() < 10.0);
        assert!(raster.get(0, 1).unwrap() > 10.0);
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let seen = Mutex::new(Vec::new());
        let feedback = ProgressFn(|f: f64| seen.lock().unwrap().push(f));
        let mut sink = MemorySink::new();
        writer(10)
            .with_rows_per_batch(3)
            .write_file(&mut sink, &feedback)
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_relative_eq!(*seen.last().unwrap(), 1.0);
    }

    struct CancelAfterFirstRow {
        reports: AtomicUsize,
    }

    impl Feedback for CancelAfterFirstRow {
        fn is_cancelled(&self) -> bool {
            self.reports.load(Ordering::SeqCst) > 0
        }

        fn set_progress(&self, _fraction: f64) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cancellation_stops_between_batches() {
        let feedback = CancelAfterFirstRow {
            reports: AtomicUsize::new(0),
        };
        let mut sink = MemorySink::new();
        let outcome = writer(4)
            .with_rows_per_batch(1)
            .write_file(&mut sink, &feedback)
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Cancelled { rows_written: 1 });
        assert!(!sink.is_finalized());
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        token.clone().cancel();
        let mut sink = MemorySink::new();
        let outcome = writer(4).write_file(&mut sink, &token).unwrap();
        assert_eq!(outcome, WriteOutcome::Cancelled { rows_written: 0 });
    }

    #[test]
    fn test_sink_failure_is_write_error() {
        let mut sink = FailingSink { fail_at_row: 1 };
        let err = writer(3).write_file(&mut sink, &()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
        assert!(matches!(err, Error::Write(ref msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_cells_without_candidates_are_nodata() {
        let options = IdwOptions {
            search: SearchStrategy::Radius(0.6),
            ..Default::default()
        };
        let grid = GridSpec::with_dimensions(Extent::new(0.0, 1.0, 0.0, 1.0).unwrap(), 3, 3);
        let mut sink = MemorySink::with_nodata(-9999.0);
        let outcome = InterpolationRequest::new(corners(), grid, options)
            .into_writer()
            .unwrap()
            .write_file(&mut sink, &())
            .unwrap();

        // Only the center cell is farther than 0.6 from every corner
        assert_eq!(outcome.summary().unwrap().nodata_cells, 1);
        assert_eq!(sink.raster().get(1, 1).unwrap(), -9999.0);
    }

    #[test]
    fn test_invalid_grid_rejected_before_writing() {
        let grid = GridSpec::with_dimensions(Extent::new(0.0, 1.0, 0.0, 1.0).unwrap(), 0, 5);
        let err = InterpolationRequest::new(corners(), grid, IdwOptions::default())
            .into_writer()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
