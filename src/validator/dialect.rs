//! Per-version protocol dialects.
//!
//! Recorded protocol versions use incompatible parameter shapes, so each
//! version gets its own schema table instead of one unified superset. The
//! executor only ever runs the current dialect; older entries exist so the
//! validator can tell "unknown operation" apart from "known operation,
//! wrong protocol version".

use serde_json::{Map, Value};

use crate::protocol::Operation;
use crate::status::Status;

/// Operation names of one recorded protocol version.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    pub version: &'static str,
    pub operations: &'static [&'static str],
}

/// The implemented dialect.
pub static CURRENT: Dialect = Dialect {
    version: "2.0.0",
    operations: &[
        "ping",
        "shutdown",
        "set_satellite",
        "end_session",
        "import",
        "import_metafile",
        "calc_index",
        "calc_preview",
        "export_gtiff",
    ],
};

/// First recorded dialect. Upper-case control operations, integer band
/// numbers, no session context commands.
pub static LEGACY_1_2: Dialect = Dialect {
    version: "1.2.0",
    operations: &[
        "PING",
        "SHUTDOWN",
        "import_gtiff",
        "export_gtiff",
        "calc_index",
        "calc_preview",
    ],
};

/// All recorded dialects, newest first.
pub static DIALECTS: &[&Dialect] = &[&CURRENT, &LEGACY_1_2];

/// Dialect for a protocol version string, if recorded.
pub fn dialect_for(version: &str) -> Option<&'static Dialect> {
    DIALECTS.iter().find(|d| d.version == version).copied()
}

/// Check an operation's parameter shape under the current dialect.
///
/// Returns the first violation found: unknown keys win over missing keys,
/// then per-key type checks in declaration order, then range checks.
pub fn check_parameters(
    operation: Operation,
    parameters: &Map<String, Value>,
) -> Result<(), (Status, String)> {
    match operation {
        Operation::Ping => require_empty(operation, parameters, Status::PING_PARAMS),
        Operation::Shutdown => require_empty(operation, parameters, Status::SHUTDOWN_PARAMS),
        Operation::EndSession => require_empty(operation, parameters, Status::END_SESSION_PARAMS),
        Operation::Import => {
            require_keys(operation, parameters, &["file", "band"])?;
            require_string(operation, parameters, "file", Status::IMPORT_PARAM_TYPE)?;
            require_string(operation, parameters, "band", Status::IMPORT_PARAM_TYPE)
        }
        Operation::ImportMetafile => {
            require_keys(operation, parameters, &["file"])?;
            require_string(operation, parameters, "file", Status::METAFILE_PATH_TYPE)
        }
        Operation::CalcIndex => {
            require_keys(operation, parameters, &["index"])?;
            require_string(operation, parameters, "index", Status::INDEX_NAME_TYPE)
        }
        Operation::CalcPreview => {
            require_keys(operation, parameters, &["index", "width", "height"])?;
            require_string(operation, parameters, "index", Status::PREVIEW_SOURCE_TYPE)?;
            require_positive(operation, parameters, "width")?;
            require_positive(operation, parameters, "height")
        }
        Operation::SetSatellite => {
            require_keys(operation, parameters, &["satellite", "proc_level"])?;
            require_string(operation, parameters, "satellite", Status::SATELLITE_TYPE)?;
            require_string(operation, parameters, "proc_level", Status::PROC_LEVEL_TYPE)
        }
        Operation::ExportGtiff => {
            require_keys(operation, parameters, &["index"])?;
            require_string(operation, parameters, "index", Status::EXPORT_NAME_TYPE)
        }
    }
}

fn require_empty(
    operation: Operation,
    parameters: &Map<String, Value>,
    status: Status,
) -> Result<(), (Status, String)> {
    if parameters.is_empty() {
        Ok(())
    } else {
        Err((
            status,
            format!(
                "'parameters' must be an empty JSON object for '{}' request",
                operation.as_str()
            ),
        ))
    }
}

fn require_keys(
    operation: Operation,
    parameters: &Map<String, Value>,
    expected: &[&str],
) -> Result<(), (Status, String)> {
    for key in parameters.keys() {
        if !expected.contains(&key.as_str()) {
            return Err((
                Status::UNKNOWN_PARAM,
                format!(
                    "unknown key '{key}' in parameters for '{}' operation",
                    operation.as_str()
                ),
            ));
        }
    }
    let missing: Vec<&str> = expected
        .iter()
        .filter(|key| !parameters.contains_key(**key))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err((
            Status::MISSING_PARAM,
            format!(
                "keys {missing:?} are not specified in parameters for '{}' operation",
                operation.as_str()
            ),
        ));
    }
    Ok(())
}

fn require_string(
    operation: Operation,
    parameters: &Map<String, Value>,
    key: &str,
    status: Status,
) -> Result<(), (Status, String)> {
    if parameters.get(key).is_some_and(Value::is_string) {
        Ok(())
    } else {
        Err((
            status,
            format!(
                "invalid type for key '{key}' of '{}' operation: must be a string",
                operation.as_str()
            ),
        ))
    }
}

fn require_positive(
    operation: Operation,
    parameters: &Map<String, Value>,
    key: &str,
) -> Result<(), (Status, String)> {
    let Some(value) = parameters.get(key).and_then(Value::as_i64) else {
        return Err((
            Status::PREVIEW_DIMS_TYPE,
            format!(
                "invalid type for key '{key}' of '{}' operation: must be an integer",
                operation.as_str()
            ),
        ));
    };
    if value <= 0 {
        return Err((
            Status::PREVIEW_DIMS_RANGE,
            format!(
                "invalid value {value} for key '{key}' of '{}' operation: must be > 0",
                operation.as_str()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn code(result: Result<(), (Status, String)>) -> Option<Status> {
        result.err().map(|(status, _)| status)
    }

    #[test]
    fn test_dialect_lookup() {
        assert_eq!(dialect_for("2.0.0").unwrap().version, "2.0.0");
        assert_eq!(dialect_for("1.2.0").unwrap().version, "1.2.0");
        assert!(dialect_for("1.0.0").is_none());
    }

    #[test]
    fn test_dialects_do_not_share_control_op_spelling() {
        assert!(CURRENT.operations.contains(&"ping"));
        assert!(!CURRENT.operations.contains(&"PING"));
        assert!(LEGACY_1_2.operations.contains(&"PING"));
        assert!(!LEGACY_1_2.operations.contains(&"set_satellite"));
    }

    #[test]
    fn test_empty_param_operations() {
        assert!(check_parameters(Operation::Ping, &params(json!({}))).is_ok());
        assert_eq!(
            code(check_parameters(Operation::Ping, &params(json!({"a": 1})))),
            Some(Status::PING_PARAMS)
        );
        assert_eq!(
            code(check_parameters(Operation::Shutdown, &params(json!({"a": 1})))),
            Some(Status::SHUTDOWN_PARAMS)
        );
        assert_eq!(
            code(check_parameters(Operation::EndSession, &params(json!({"rule34": 42069})))),
            Some(Status::END_SESSION_PARAMS)
        );
    }

    #[test]
    fn test_import_shape() {
        let ok = json!({"file": "a.tif", "band": "5"});
        assert!(check_parameters(Operation::Import, &params(ok)).is_ok());

        assert_eq!(
            code(check_parameters(Operation::Import, &params(json!({"band": "5"})))),
            Some(Status::MISSING_PARAM)
        );
        assert_eq!(
            code(check_parameters(
                Operation::Import,
                &params(json!({"file": "a.tif", "band": "5", "arg": "val"}))
            )),
            Some(Status::UNKNOWN_PARAM)
        );
        assert_eq!(
            code(check_parameters(
                Operation::Import,
                &params(json!({"file": "a.tif", "band": 5}))
            )),
            Some(Status::IMPORT_PARAM_TYPE)
        );
    }

    #[test]
    fn test_preview_shape() {
        let ok = json!({"index": "test", "width": 100, "height": 100});
        assert!(check_parameters(Operation::CalcPreview, &params(ok)).is_ok());

        assert_eq!(
            code(check_parameters(
                Operation::CalcPreview,
                &params(json!({"width": 100, "height": 100}))
            )),
            Some(Status::MISSING_PARAM)
        );
        assert_eq!(
            code(check_parameters(
                Operation::CalcPreview,
                &params(json!({"index": 69, "width": 100, "height": 100}))
            )),
            Some(Status::PREVIEW_SOURCE_TYPE)
        );
        assert_eq!(
            code(check_parameters(
                Operation::CalcPreview,
                &params(json!({"index": "test", "width": "abc", "height": 100}))
            )),
            Some(Status::PREVIEW_DIMS_TYPE)
        );
        assert_eq!(
            code(check_parameters(
                Operation::CalcPreview,
                &params(json!({"index": "test", "width": 100, "height": -10}))
            )),
            Some(Status::PREVIEW_DIMS_RANGE)
        );
    }

    #[test]
    fn test_calc_index_and_satellite_shapes() {
        assert!(
            check_parameters(Operation::CalcIndex, &params(json!({"index": "ndvi"}))).is_ok()
        );
        assert_eq!(
            code(check_parameters(Operation::CalcIndex, &params(json!({"index": 69})))),
            Some(Status::INDEX_NAME_TYPE)
        );

        let ok = json!({"satellite": "Landsat 8/9", "proc_level": "L1"});
        assert!(check_parameters(Operation::SetSatellite, &params(ok)).is_ok());
        assert_eq!(
            code(check_parameters(
                Operation::SetSatellite,
                &params(json!({"satellite": 69, "proc_level": "L1"}))
            )),
            Some(Status::SATELLITE_TYPE)
        );
        assert_eq!(
            code(check_parameters(
                Operation::SetSatellite,
                &params(json!({"satellite": "Landsat 8/9", "proc_level": 1}))
            )),
            Some(Status::PROC_LEVEL_TYPE)
        );
    }

    #[test]
    fn test_metafile_shape() {
        assert!(
            check_parameters(Operation::ImportMetafile, &params(json!({"file": "MTL.txt"})))
                .is_ok()
        );
        assert_eq!(
            code(check_parameters(
                Operation::ImportMetafile,
                &params(json!({"file": 1}))
            )),
            Some(Status::METAFILE_PATH_TYPE)
        );
    }
}
