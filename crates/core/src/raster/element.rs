//! Cell value trait for interpolated rasters

use num_traits::{Float, NumCast};
use std::fmt::Debug;

/// Trait for types that can be stored in an interpolated raster cell.
///
/// Interpolation produces fractional elevations, so only floating point
/// cell types are supported.
pub trait RasterElement: Float + Debug + Send + Sync + 'static {
    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool {
        if self.is_nan() {
            return true;
        }
        match nodata {
            Some(nd) => {
                let scale = <Self as NumCast>::from(100.0).unwrap_or_else(Self::one);
                (*self - nd).abs() < Self::epsilon() * scale
            }
            None => false,
        }
    }
}

impl RasterElement for f32 {}

impl RasterElement for f64 {}
