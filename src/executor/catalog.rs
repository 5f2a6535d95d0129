//! Static catalog of supported satellites, processing levels and derived
//! indices.
//!
//! Each index declares its input sets in fixed priority order; the first
//! fully-satisfied set wins. Sets may be restricted to a satellite family
//! because band numbering differs between sensor generations.

use crate::math::Formula;

/// Satellites a session may select.
pub const SUPPORTED_SATELLITES: &[&str] = &["Landsat 8/9", "Landsat 4/5"];

/// Processing levels a session may select.
pub const SUPPORTED_PROC_LEVELS: &[&str] = &["L1", "L2"];

/// Name of the fixed natural-color preview composite.
pub const COMPOSITE_NATURAL_COLOR: &str = "nat_col";

/// One declared input of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A raster band by label, resolved from the band registry.
    Band(&'static str),
    /// Another derived index, computed recursively when absent.
    Index(&'static str),
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Band(label) => write!(f, "band '{label}'"),
            Input::Index(name) => write!(f, "index '{name}'"),
        }
    }
}

/// One admissible set of inputs, optionally bound to a satellite family.
#[derive(Debug, Clone, Copy)]
pub struct InputSet {
    /// `None` = valid for any satellite.
    pub satellite: Option<&'static str>,
    pub inputs: &'static [Input],
}

impl InputSet {
    /// Whether this set applies under the given satellite context.
    pub fn applies_to(&self, satellite: &str) -> bool {
        self.satellite.map_or(true, |s| s == satellite)
    }
}

/// How an index is produced from its gathered inputs.
#[derive(Debug, Clone, Copy)]
pub enum Pipeline {
    /// Run a formula through the index math.
    Evaluate(Formula),
    /// Otsu-threshold binarization of a single input.
    Binarize,
}

/// Catalog entry for one derived index.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    /// Physical unit label of the result, empty for dimensionless.
    pub unit: &'static str,
    pub description: &'static str,
    pub pipeline: Pipeline,
    /// Admissible input sets in priority order.
    pub input_sets: &'static [InputSet],
}

use Input::{Band, Index};

/// All indices the executor can compute.
pub static INDEX_CATALOG: &[IndexSpec] = &[
    IndexSpec {
        name: "test",
        unit: "",
        description: "diagnostic band ratio",
        pipeline: Pipeline::Evaluate(Formula::Ratio),
        input_sets: &[InputSet {
            satellite: None,
            inputs: &[Band("2"), Band("4")],
        }],
    },
    IndexSpec {
        name: "ndvi",
        unit: "",
        description: "normalized difference vegetation index",
        pipeline: Pipeline::Evaluate(Formula::Ndvi),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[Band("5"), Band("4")],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[Band("4"), Band("3")],
            },
        ],
    },
    IndexSpec {
        name: "ndbi",
        unit: "",
        description: "normalized difference built-up index",
        pipeline: Pipeline::Evaluate(Formula::Ndbi),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[Band("6"), Band("5")],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[Band("5"), Band("4")],
            },
        ],
    },
    IndexSpec {
        name: "andwi",
        unit: "",
        description: "augmented normalized difference water index",
        pipeline: Pipeline::Evaluate(Formula::Andwi),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[
                    Band("2"),
                    Band("3"),
                    Band("4"),
                    Band("5"),
                    Band("6"),
                    Band("7"),
                ],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[
                    Band("1"),
                    Band("2"),
                    Band("3"),
                    Band("4"),
                    Band("5"),
                    Band("7"),
                ],
            },
        ],
    },
    IndexSpec {
        name: "wi2015",
        unit: "",
        description: "water index 2015",
        pipeline: Pipeline::Evaluate(Formula::Wi2015),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[Band("3"), Band("4"), Band("5"), Band("6"), Band("7")],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[Band("2"), Band("3"), Band("4"), Band("5"), Band("7")],
            },
        ],
    },
    IndexSpec {
        name: "nsmi",
        unit: "",
        description: "normalized suspended material index",
        pipeline: Pipeline::Evaluate(Formula::Nsmi),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[Band("4"), Band("3"), Band("2")],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[Band("3"), Band("2"), Band("1")],
            },
        ],
    },
    IndexSpec {
        name: "oc3",
        unit: "",
        description: "ocean color 3 chlorophyll ratio",
        pipeline: Pipeline::Evaluate(Formula::Oc3),
        // The aerosol band only exists on the newer sensor generation.
        input_sets: &[InputSet {
            satellite: Some("Landsat 8/9"),
            inputs: &[Band("1"), Band("2"), Band("3")],
        }],
    },
    IndexSpec {
        name: "cdom",
        unit: "",
        description: "colored dissolved organic matter estimate",
        pipeline: Pipeline::Evaluate(Formula::CdomNdwi),
        input_sets: &[
            InputSet {
                satellite: Some("Landsat 8/9"),
                inputs: &[Band("3"), Band("5")],
            },
            InputSet {
                satellite: Some("Landsat 4/5"),
                inputs: &[Band("2"), Band("4")],
            },
        ],
    },
    IndexSpec {
        name: "water_mask",
        unit: "",
        description: "water classification mask from wi2015",
        pipeline: Pipeline::Binarize,
        input_sets: &[InputSet {
            satellite: None,
            inputs: &[Index("wi2015")],
        }],
    },
    IndexSpec {
        name: "temp_corr",
        unit: "K",
        description: "temperature product corrected by vegetation and water cover",
        pipeline: Pipeline::Evaluate(Formula::TemperatureCorrection),
        input_sets: &[InputSet {
            satellite: None,
            inputs: &[Index("ndvi"), Index("water_mask")],
        }],
    },
];

/// Look up an index by name.
pub fn index_spec(name: &str) -> Option<&'static IndexSpec> {
    INDEX_CATALOG.iter().find(|spec| spec.name == name)
}

/// Red/green/blue band labels of the natural-color composite for a
/// satellite family.
pub fn composite_bands(satellite: &str) -> Option<[&'static str; 3]> {
    match satellite {
        "Landsat 8/9" => Some(["4", "3", "2"]),
        "Landsat 4/5" => Some(["3", "2", "1"]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(index_spec("ndvi").is_some());
        assert!(index_spec("test").is_some());
        assert!(index_spec("rule34").is_none());
    }

    #[test]
    fn test_evaluate_arity_matches_declared_inputs() {
        for spec in INDEX_CATALOG {
            if let Pipeline::Evaluate(formula) = spec.pipeline {
                for set in spec.input_sets {
                    assert_eq!(
                        set.inputs.len(),
                        formula.arity(),
                        "arity mismatch for '{}'",
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_binarize_takes_one_input() {
        for spec in INDEX_CATALOG {
            if matches!(spec.pipeline, Pipeline::Binarize) {
                for set in spec.input_sets {
                    assert_eq!(set.inputs.len(), 1, "'{}' must binarize one input", spec.name);
                }
            }
        }
    }

    #[test]
    fn test_input_set_satellite_filter() {
        let spec = index_spec("ndvi").unwrap();
        let sets: Vec<_> = spec
            .input_sets
            .iter()
            .filter(|s| s.applies_to("Landsat 8/9"))
            .collect();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].inputs, &[Band("5"), Band("4")]);

        let spec = index_spec("test").unwrap();
        assert!(spec.input_sets[0].applies_to("Landsat 8/9"));
        assert!(spec.input_sets[0].applies_to("Landsat 4/5"));
    }

    #[test]
    fn test_composite_bands() {
        assert_eq!(composite_bands("Landsat 8/9"), Some(["4", "3", "2"]));
        assert_eq!(composite_bands("Landsat 4/5"), Some(["3", "2", "1"]));
        assert_eq!(composite_bands("Sentinel 2"), None);
    }
}
