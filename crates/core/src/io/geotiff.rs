//! Native GeoTIFF output (float32, single band)
//!
//! Georeferencing is written as ModelPixelScale + ModelTiepoint tags with a
//! minimal GeoKey directory, plus the GDAL no-data tag when the raster has
//! a no-data value. TIFF strips are encoded in one go, so [`GeoTiffSink`]
//! buffers the grid and encodes on `finalize`.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::io::{MemorySink, RasterSink};
use crate::raster::{GridLayout, Raster, RasterElement};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

/// Write a raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Encode a raster as an in-memory GeoTIFF
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Write(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder", e))?;
    let (rows, cols) = raster.shape();
    let too_large = |n: usize| Error::Write(format!("{} pixels exceed the TIFF size limit", n));
    let width = u32::try_from(cols).map_err(|_| too_large(cols))?;
    let height = u32::try_from(rows).map_err(|_| too_large(rows))?;

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(width, height)
        .map_err(|e| tiff_err("cannot create image", e))?;

    let gt = raster.transform();
    let scale = [gt.cell_width, gt.cell_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])
        .map_err(|e| tiff_err("pixel scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])
        .map_err(|e| tiff_err("tiepoint tag", e))?;

    // Version 1.1.0 with two keys: projected model, pixel-is-area.
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), &geokeys[..])
        .map_err(|e| tiff_err("geokey tag", e))?;

    if let Some(nodata) = raster.nodata() {
        let text = format!("{:?}", nodata);
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA_TAG), text.as_str())
            .map_err(|e| tiff_err("nodata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| tiff_err("cannot write image data", e))?;

    Ok(())
}

/// [`RasterSink`] producing a GeoTIFF file on `finalize`.
pub struct GeoTiffSink {
    path: PathBuf,
    buffer: MemorySink,
}

impl GeoTiffSink {
    pub fn new<P: Into<PathBuf>>(path: P, nodata: f64) -> Self {
        Self {
            path: path.into(),
            buffer: MemorySink::with_nodata(nodata),
        }
    }
}

impl RasterSink for GeoTiffSink {
    fn begin(&mut self, layout: &GridLayout) -> Result<()> {
        self.buffer.begin(layout)
    }

    fn set_cell(&mut self, row: usize, col: usize, value: Option<f64>) -> Result<()> {
        self.buffer.set_cell(row, col, value)
    }

    fn finalize(&mut self) -> Result<()> {
        self.buffer.finalize()?;
        write_geotiff(self.buffer.raster(), &self.path)
    }
}
