//! Index math boundary.
//!
//! The numeric formulas for spectral indices, radiometric calibration and
//! preview rendering live outside this crate; the executor reaches them
//! through the [`IndexMath`] trait. Implementations are pure: masked
//! arrays in, masked array out, no session state.

use thiserror::Error;

use crate::raster::{Calibration, MaskedArray};

/// Formulas the executor can request, one per catalog index family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Plain two-band ratio, used by the diagnostic `test` index.
    Ratio,
    /// Normalized difference vegetation index: (nir - red) / (nir + red).
    Ndvi,
    /// Normalized difference built-up index: (swir1 - nir) / (swir1 + nir).
    Ndbi,
    /// Augmented normalized difference water index over six bands.
    Andwi,
    /// Water index 2015 linear combination over five bands.
    Wi2015,
    /// Normalized suspended material index: (r + g - b) / (r + g + b).
    Nsmi,
    /// Ocean color 3 ratio: max(aerosol, blue) / green.
    Oc3,
    /// CDOM estimate from a green/nir normalized difference polynomial.
    CdomNdwi,
    /// Thermal product corrected by vegetation and water classification.
    TemperatureCorrection,
}

impl Formula {
    /// Number of input arrays the formula consumes.
    pub fn arity(self) -> usize {
        match self {
            Self::Ratio | Self::Ndvi | Self::Ndbi | Self::CdomNdwi => 2,
            Self::Nsmi | Self::Oc3 => 3,
            Self::Wi2015 => 5,
            Self::Andwi => 6,
            Self::TemperatureCorrection => 2,
        }
    }
}

/// Scene and band context handed to formula evaluation.
///
/// `calibration` is parallel to the input array slice; band inputs carry
/// their coefficients, derived inputs carry `None`.
pub struct EvalContext<'a> {
    /// NoData sentinel for the output array.
    pub nodata: f32,
    /// Per-input calibration coefficients.
    pub calibration: &'a [Option<Calibration>],
    /// Scene sun elevation in degrees, if known.
    pub sun_elevation: Option<f64>,
    /// Scene Earth-Sun distance in AU, if known.
    pub earth_sun_distance: Option<f64>,
}

/// Errors surfaced by an index math implementation.
#[derive(Debug, Error)]
pub enum MathError {
    #[error("formula {formula:?} expects {expected} inputs, got {got}")]
    InputArity {
        formula: Formula,
        expected: usize,
        got: usize,
    },

    #[error("input arrays have mismatched shapes")]
    ShapeMismatch,

    /// Inputs are structurally fine but numerically unusable, e.g. every
    /// pixel masked.
    #[error("{0}")]
    Degenerate(String),
}

/// External spectral-index math.
pub trait IndexMath: Send + Sync {
    /// Evaluate a formula over validity-masked inputs.
    fn evaluate(
        &self,
        formula: Formula,
        inputs: &[&MaskedArray],
        ctx: &EvalContext<'_>,
    ) -> Result<MaskedArray, MathError>;

    /// Linear-stretch an array into 8-bit pixels for previews.
    /// Masked pixels map to 0.
    fn to_8bit(&self, array: &MaskedArray) -> Vec<u8>;

    /// Otsu-threshold binarization for water/class masks: valid pixels
    /// become 0.0 or 1.0, masked pixels keep `nodata`.
    fn otsu_binarize(&self, array: &MaskedArray, nodata: f32) -> Result<MaskedArray, MathError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_arity() {
        assert_eq!(Formula::Ratio.arity(), 2);
        assert_eq!(Formula::Ndvi.arity(), 2);
        assert_eq!(Formula::Nsmi.arity(), 3);
        assert_eq!(Formula::Wi2015.arity(), 5);
        assert_eq!(Formula::Andwi.arity(), 6);
        assert_eq!(Formula::TemperatureCorrection.arity(), 2);
    }
}
