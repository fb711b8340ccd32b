//! Streaming ESRI ASCII grid writer
//!
//! ```text
//! NCOLS 3
//! NROWS 2
//! XLLCORNER 0
//! YLLCORNER 0
//! DX 1
//! DY 1
//! NODATA_VALUE -9999
//! 1 2 3
//! 4 -9999 6
//! ```
//!
//! Rows are written north to south as they arrive, so the whole grid is
//! never held in memory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::io::RasterSink;
use crate::raster::GridLayout;

/// Conventional no-data value of ASCII grids
pub const DEFAULT_ASCII_NODATA: f64 = -9999.0;

/// [`RasterSink`] writing an ESRI ASCII grid.
///
/// Cells must arrive in row-major order; anything else is a write error.
pub struct AsciiGridSink<W: Write> {
    writer: W,
    nodata: f64,
    layout: Option<GridLayout>,
    next: (usize, usize),
}

impl AsciiGridSink<BufWriter<File>> {
    /// Create (or truncate) a grid file at `path`
    pub fn create<P: AsRef<Path>>(path: P, nodata: f64) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file), nodata))
    }
}

impl<W: Write> AsciiGridSink<W> {
    pub fn new(writer: W, nodata: f64) -> Self {
        Self {
            writer,
            nodata,
            layout: None,
            next: (0, 0),
        }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RasterSink for AsciiGridSink<W> {
    fn begin(&mut self, layout: &GridLayout) -> Result<()> {
        writeln!(self.writer, "NCOLS {}", layout.columns)?;
        writeln!(self.writer, "NROWS {}", layout.rows)?;
        writeln!(self.writer, "XLLCORNER {}", layout.extent.x_min)?;
        writeln!(self.writer, "YLLCORNER {}", layout.extent.y_min)?;
        writeln!(self.writer, "DX {}", layout.cell_size_x)?;
        writeln!(self.writer, "DY {}", layout.cell_size_y)?;
        writeln!(self.writer, "NODATA_VALUE {}", self.nodata)?;
        self.layout = Some(*layout);
        self.next = (0, 0);
        Ok(())
    }

    fn set_cell(&mut self, row: usize, col: usize, value: Option<f64>) -> Result<()> {
        let layout = self
            .layout
            .ok_or_else(|| Error::Write("ASCII grid header not written".into()))?;

        if (row, col) != self.next {
            return Err(Error::Write(format!(
                "ASCII grid cells must be written in order: expected ({}, {}), got ({}, {})",
                self.next.0, self.next.1, row, col
            )));
        }

        let value = value.filter(|v| v.is_finite()).unwrap_or(self.nodata);
        if col + 1 == layout.columns {
            writeln!(self.writer, "{}", value)?;
            self.next = (row + 1, 0);
        } else {
            write!(self.writer, "{} ", value)?;
            self.next = (row, col + 1);
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(layout) = self.layout {
            if self.next != (layout.rows, 0) {
                return Err(Error::Write(format!(
                    "ASCII grid incomplete: stopped at row {}, column {}",
                    self.next.0, self.next.1
                )));
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}
