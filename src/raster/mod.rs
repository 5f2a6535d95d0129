//! Raster module - store abstraction and masked arrays.
//!
//! The actual decoding of geospatial raster files (drivers, projections,
//! pixel formats) is an external collaborator reached through the
//! [`RasterStore`] trait. This crate only ever sees raster geometry and
//! validity-masked `f32` windows.

mod masked;
mod window;

pub use masked::{MaskedArray, Stats, DEFAULT_NODATA, FLOAT_TOLERANCE};
pub use window::WindowReader;

use thiserror::Error;

/// Errors surfaced by a raster store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file does not exist or no driver can open it.
    #[error("cannot open '{0}'")]
    NotOpenable(String),

    /// The file opened but carries no spatial reference.
    #[error("'{0}' has no spatial reference")]
    NotGeoreferenced(String),

    /// A windowed read failed.
    #[error("read of band '{band}' failed: {reason}")]
    Read { band: String, reason: String },
}

/// Raster geometry as reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
    /// Projection description (WKT or authority code).
    pub projection: String,
    /// Georeferenced origin of the top-left corner.
    pub origin: (f64, f64),
    /// Pixel size along x and y.
    pub pixel_size: (f64, f64),
}

/// Radiometric and thermal calibration coefficients for one band.
///
/// Populated from an external metadata file; every field is optional
/// because metadata files carry different subsets per band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    pub radiance_mult: Option<f64>,
    pub radiance_add: Option<f64>,
    pub radiance_max: Option<f64>,
    pub reflectance_max: Option<f64>,
    pub k1: Option<f64>,
    pub k2: Option<f64>,
}

impl Calibration {
    /// Number of coefficients present.
    pub fn coefficient_count(&self) -> usize {
        [
            self.radiance_mult.is_some(),
            self.radiance_add.is_some(),
            self.radiance_max.is_some(),
            self.reflectance_max.is_some(),
            self.k1.is_some(),
            self.k2.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Merge coefficients from `other`, counting how many were applied.
    /// Present values in `other` overwrite existing ones.
    pub fn merge(&mut self, other: &Calibration) -> usize {
        let mut applied = 0;
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = other.$field {
                    self.$field = Some(v);
                    applied += 1;
                }
            };
        }
        take!(radiance_mult);
        take!(radiance_add);
        take!(radiance_max);
        take!(reflectance_max);
        take!(k1);
        take!(k2);
        applied
    }
}

/// One opened raster dataset.
///
/// Implementations decode pixels however they like; the contract is that
/// `read_window` returns a validity-masked array of exactly
/// `out_width x out_height`, downsampling the requested window as needed.
pub trait RasterSource: Send + Sync {
    /// Raster geometry and projection.
    fn geometry(&self) -> Geometry;

    /// NoData sentinel declared for a band, if any.
    fn nodata(&self, band: &str) -> Option<f32>;

    /// Read a window of a band, resampled to the output shape.
    #[allow(clippy::too_many_arguments)]
    fn read_window(
        &self,
        band: &str,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
        out_width: usize,
        out_height: usize,
    ) -> Result<MaskedArray, StoreError>;
}

/// Factory for opened rasters; the external store boundary.
pub trait RasterStore: Send + Sync {
    /// Open a file reference.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotOpenable`] when nothing can read the file,
    /// [`StoreError::NotGeoreferenced`] when it opens but is not a
    /// spatially referenced raster.
    fn open(&self, file: &str) -> Result<std::sync::Arc<dyn RasterSource>, StoreError>;
}
