//! Per-connection session state and registries.
//!
//! A [`Session`] owns every handle created under it: bands, computed
//! indices and rendered previews. The maps are never handed out raw; the
//! executor goes through the accessors below, and the whole session sits
//! behind one mutex (see the executor).
//!
//! Handle ids are sequential per registry, starting at 0, and reset when
//! the session ends.

use std::collections::HashMap;
use std::sync::Arc;

use crate::raster::{Calibration, MaskedArray, RasterSource, Stats};

use super::metafile::Metafile;

/// Sensor context selected with `set_satellite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteContext {
    pub satellite: String,
    pub proc_level: String,
}

/// Reference to one opened raster band.
#[derive(Debug, Clone)]
pub struct BandHandle {
    pub id: u32,
    /// Owning file identity.
    pub file: String,
    /// Band label within the file.
    pub band: String,
    /// Resolved NoData sentinel.
    pub nodata: f32,
    pub calibration: Calibration,
    pub description: Option<String>,
}

/// A band handle together with its opened source.
pub struct BandEntry {
    pub handle: BandHandle,
    pub source: Arc<dyn RasterSource>,
}

/// Reference to one computed derived product.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    pub id: u32,
    pub name: String,
    pub nodata: f32,
    pub stats: Stats,
    /// Physical unit label, empty for dimensionless.
    pub unit: String,
    pub description: Option<String>,
    /// The computed product itself, kept so previews render from cache.
    pub array: MaskedArray,
}

/// Reference to one rendered 8-bit preview.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewHandle {
    pub id: u32,
    /// Source band label, index name or composite name.
    pub source: String,
    pub width: usize,
    pub height: usize,
    /// 1 for grayscale, 3 for color composites.
    pub channels: u8,
    /// Interleaved pixel bytes, `width * height * channels` long.
    pub pixels: Vec<u8>,
}

/// All mutable per-connection state.
#[derive(Default)]
pub struct Session {
    context: Option<SatelliteContext>,
    bands: HashMap<String, BandEntry>,
    indices: HashMap<String, IndexHandle>,
    previews: HashMap<(String, usize, usize), PreviewHandle>,
    next_band_id: u32,
    next_index_id: u32,
    next_preview_id: u32,
    sun_elevation: Option<f64>,
    earth_sun_distance: Option<f64>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected sensor context, `None` while uninitialized.
    pub fn context(&self) -> Option<&SatelliteContext> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, satellite: String, proc_level: String) {
        self.context = Some(SatelliteContext {
            satellite,
            proc_level,
        });
    }

    pub fn sun_elevation(&self) -> Option<f64> {
        self.sun_elevation
    }

    pub fn earth_sun_distance(&self) -> Option<f64> {
        self.earth_sun_distance
    }

    /// Band entry by label.
    pub fn band(&self, label: &str) -> Option<&BandEntry> {
        self.bands.get(label)
    }

    /// Register a band, replacing any previous entry under the same label.
    pub fn insert_band(
        &mut self,
        file: String,
        band: String,
        nodata: f32,
        source: Arc<dyn RasterSource>,
    ) -> BandHandle {
        let handle = BandHandle {
            id: self.next_band_id,
            file,
            band: band.clone(),
            nodata,
            calibration: Calibration::default(),
            description: None,
        };
        self.next_band_id += 1;
        self.bands.insert(
            band,
            BandEntry {
                handle: handle.clone(),
                source,
            },
        );
        handle
    }

    /// Attach parsed metadata to matching bands and the scene, returning
    /// the number of coefficient values applied.
    pub fn apply_metafile(&mut self, metafile: &Metafile) -> usize {
        let mut applied = 0;
        for (label, coefficients) in &metafile.bands {
            if let Some(entry) = self.bands.get_mut(label) {
                applied += entry.handle.calibration.merge(coefficients);
            }
        }
        if let Some(sun_elevation) = metafile.sun_elevation {
            self.sun_elevation = Some(sun_elevation);
            applied += 1;
        }
        if let Some(distance) = metafile.earth_sun_distance {
            self.earth_sun_distance = Some(distance);
            applied += 1;
        }
        applied
    }

    /// Cached index handle by name.
    pub fn index(&self, name: &str) -> Option<&IndexHandle> {
        self.indices.get(name)
    }

    /// Register a computed index. The caller guarantees the name is not
    /// cached yet; the whole product (array + stats + handle) is installed
    /// in one step.
    pub fn insert_index(
        &mut self,
        name: String,
        array: MaskedArray,
        stats: Stats,
        nodata: f32,
        unit: String,
        description: Option<String>,
    ) -> u32 {
        let id = self.next_index_id;
        self.next_index_id += 1;
        self.indices.insert(
            name.clone(),
            IndexHandle {
                id,
                name,
                nodata,
                stats,
                unit,
                description,
                array,
            },
        );
        id
    }

    /// Cached preview by (source, width, height).
    pub fn preview(&self, source: &str, width: usize, height: usize) -> Option<&PreviewHandle> {
        self.previews.get(&(source.to_string(), width, height))
    }

    /// Cached preview by id, for the resource facade.
    pub fn preview_by_id(&self, id: u32) -> Option<&PreviewHandle> {
        self.previews.values().find(|p| p.id == id)
    }

    /// Register a rendered preview.
    pub fn insert_preview(
        &mut self,
        source: String,
        width: usize,
        height: usize,
        channels: u8,
        pixels: Vec<u8>,
    ) -> u32 {
        let id = self.next_preview_id;
        self.next_preview_id += 1;
        self.previews.insert(
            (source.clone(), width, height),
            PreviewHandle {
                id,
                source,
                width,
                height,
                channels,
                pixels,
            },
        );
        id
    }

    /// Purge every registry and return to the uninitialized state.
    pub fn reset(&mut self) {
        *self = Session::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Geometry, StoreError};

    struct NullSource;

    impl RasterSource for NullSource {
        fn geometry(&self) -> Geometry {
            Geometry {
                width: 1,
                height: 1,
                projection: String::new(),
                origin: (0.0, 0.0),
                pixel_size: (1.0, 1.0),
            }
        }

        fn nodata(&self, _band: &str) -> Option<f32> {
            None
        }

        fn read_window(
            &self,
            _band: &str,
            _x_off: usize,
            _y_off: usize,
            _width: usize,
            _height: usize,
            out_width: usize,
            out_height: usize,
        ) -> Result<MaskedArray, StoreError> {
            Ok(MaskedArray::from_data(
                out_width,
                out_height,
                vec![0.0; out_width * out_height],
            ))
        }
    }

    fn source() -> Arc<dyn RasterSource> {
        Arc::new(NullSource)
    }

    #[test]
    fn test_band_ids_sequential_from_zero() {
        let mut session = Session::new();
        let a = session.insert_band("a.tif".into(), "2".into(), -9999.0, source());
        let b = session.insert_band("b.tif".into(), "4".into(), -9999.0, source());
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
    }

    #[test]
    fn test_band_replace_same_label() {
        let mut session = Session::new();
        session.insert_band("a.tif".into(), "2".into(), -9999.0, source());
        session.insert_band("b.tif".into(), "2".into(), -9999.0, source());

        let entry = session.band("2").unwrap();
        assert_eq!(entry.handle.file, "b.tif");
        assert_eq!(entry.handle.id, 1);
    }

    #[test]
    fn test_apply_metafile_counts_only_registered_bands() {
        let mut session = Session::new();
        session.insert_band("a.tif".into(), "4".into(), -9999.0, source());

        let mut metafile = Metafile::default();
        metafile.bands.insert(
            "4".into(),
            Calibration {
                radiance_mult: Some(0.01),
                radiance_add: Some(-48.0),
                ..Default::default()
            },
        );
        metafile.bands.insert(
            "7".into(),
            Calibration {
                radiance_mult: Some(0.02),
                ..Default::default()
            },
        );
        metafile.sun_elevation = Some(43.3);

        // Band 7 is not registered; its coefficient does not count.
        assert_eq!(session.apply_metafile(&metafile), 3);
        let band = session.band("4").unwrap();
        assert_eq!(band.handle.calibration.radiance_mult, Some(0.01));
        assert_eq!(session.sun_elevation(), Some(43.3));
    }

    #[test]
    fn test_preview_lookup_by_key_and_id() {
        let mut session = Session::new();
        let id = session.insert_preview("ndvi".into(), 100, 80, 1, vec![0; 8000]);

        assert!(session.preview("ndvi", 100, 80).is_some());
        assert!(session.preview("ndvi", 100, 81).is_none());
        assert_eq!(session.preview_by_id(id).unwrap().width, 100);
        assert!(session.preview_by_id(id + 1).is_none());
    }

    #[test]
    fn test_reset_purges_everything() {
        let mut session = Session::new();
        session.set_context("Landsat 8/9".into(), "L1".into());
        session.insert_band("a.tif".into(), "2".into(), -9999.0, source());
        session.insert_preview("2".into(), 10, 10, 1, vec![0; 100]);

        session.reset();

        assert!(session.context().is_none());
        assert!(session.band("2").is_none());
        assert!(session.preview("2", 10, 10).is_none());
        // Ids restart from zero in the fresh session.
        let handle = session.insert_band("a.tif".into(), "2".into(), -9999.0, source());
        assert_eq!(handle.id, 0);
    }
}
