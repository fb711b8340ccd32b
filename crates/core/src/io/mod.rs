//! Reading Z-valued features and writing interpolated grids

mod ascii_grid;
mod geojson_io;
mod geotiff;
mod sink;

pub use ascii_grid::{AsciiGridSink, DEFAULT_ASCII_NODATA};
pub use geojson_io::{parse_features_geojson, read_features_geojson};
pub use geotiff::{write_geotiff, write_geotiff_to_buffer, GeoTiffSink};
pub use sink::{MemorySink, RasterSink};
