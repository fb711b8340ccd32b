//! Cell-by-cell raster output

use crate::error::Result;
use crate::raster::{GridLayout, Raster};

/// Destination for a grid written one cell at a time.
///
/// Writers call [`begin`](RasterSink::begin) once, then
/// [`set_cell`](RasterSink::set_cell) for every cell in row-major order
/// (row 0 is the northernmost row), then [`finalize`](RasterSink::finalize).
/// `None` marks a cell without data.
pub trait RasterSink {
    /// Prepare for a grid with the given layout.
    fn begin(&mut self, _layout: &GridLayout) -> Result<()> {
        Ok(())
    }

    /// Store the value of cell (row, col).
    fn set_cell(&mut self, row: usize, col: usize, value: Option<f64>) -> Result<()>;

    /// Flush and close the output.
    fn finalize(&mut self) -> Result<()>;
}

impl<S: RasterSink + ?Sized> RasterSink for &mut S {
    fn begin(&mut self, layout: &GridLayout) -> Result<()> {
        (**self).begin(layout)
    }

    fn set_cell(&mut self, row: usize, col: usize, value: Option<f64>) -> Result<()> {
        (**self).set_cell(row, col, value)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

/// Sink that collects the grid into an in-memory [`Raster<f64>`].
///
/// No-data cells hold `nodata` (NaN by default).
#[derive(Debug, Clone)]
pub struct MemorySink {
    raster: Raster<f64>,
    nodata: f64,
    finalized: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_nodata(f64::NAN)
    }

    pub fn with_nodata(nodata: f64) -> Self {
        Self {
            raster: Raster::filled(0, 0, nodata),
            nodata,
            finalized: false,
        }
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    pub fn into_raster(self) -> Raster<f64> {
        self.raster
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterSink for MemorySink {
    fn begin(&mut self, layout: &GridLayout) -> Result<()> {
        self.raster = Raster::for_layout(layout, self.nodata);
        self.finalized = false;
        Ok(())
    }

    fn set_cell(&mut self, row: usize, col: usize, value: Option<f64>) -> Result<()> {
        self.raster.set(row, col, value.unwrap_or(self.nodata))
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalized = true;
        Ok(())
    }
}
