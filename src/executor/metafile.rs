//! Calibration metadata parsing.
//!
//! The sensor delivers radiometric coefficients in a line-oriented
//! `KEY = VALUE` metadata file grouped by `GROUP`/`END_GROUP` markers.
//! Only the coefficient keys the executor understands are extracted;
//! everything else is skipped without complaint.

use std::collections::HashMap;

use crate::raster::Calibration;

/// Parsed metadata: per-band coefficients plus scene-level constants.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metafile {
    /// Coefficients keyed by band label.
    pub bands: HashMap<String, Calibration>,
    pub sun_elevation: Option<f64>,
    pub earth_sun_distance: Option<f64>,
}

impl Metafile {
    /// Total number of coefficient values parsed out of the file.
    pub fn coefficient_count(&self) -> usize {
        let band_coeffs: usize = self.bands.values().map(Calibration::coefficient_count).sum();
        band_coeffs
            + usize::from(self.sun_elevation.is_some())
            + usize::from(self.earth_sun_distance.is_some())
    }
}

/// Parse a metadata document. Unrecognized lines are ignored, so an empty
/// result is not an error here; the executor decides what zero applied
/// coefficients means.
pub fn parse(text: &str) -> Metafile {
    let mut metafile = Metafile::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line == "END" {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if key == "GROUP" || key == "END_GROUP" {
            continue;
        }

        match key {
            "SUN_ELEVATION" => metafile.sun_elevation = value.parse().ok(),
            "EARTH_SUN_DISTANCE" => metafile.earth_sun_distance = value.parse().ok(),
            _ => parse_band_key(&mut metafile, key, value),
        }
    }

    metafile
}

/// Recognize `<COEFFICIENT>_BAND_<label>` keys.
fn parse_band_key(metafile: &mut Metafile, key: &str, value: &str) {
    const PREFIXES: [(&str, fn(&mut Calibration) -> &mut Option<f64>); 6] = [
        ("RADIANCE_MULT_BAND_", |c| &mut c.radiance_mult),
        ("RADIANCE_ADD_BAND_", |c| &mut c.radiance_add),
        ("RADIANCE_MAXIMUM_BAND_", |c| &mut c.radiance_max),
        ("REFLECTANCE_MAXIMUM_BAND_", |c| &mut c.reflectance_max),
        ("K1_CONSTANT_BAND_", |c| &mut c.k1),
        ("K2_CONSTANT_BAND_", |c| &mut c.k2),
    ];

    for (prefix, field) in PREFIXES {
        if let Some(label) = key.strip_prefix(prefix) {
            let Ok(parsed) = value.parse::<f64>() else {
                return;
            };
            let calibration = metafile.bands.entry(label.to_string()).or_default();
            *field(calibration) = Some(parsed);
            return;
        }
    }
}
