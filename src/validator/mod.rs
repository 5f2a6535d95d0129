//! Validator module - schema and version validation of inbound messages.
//!
//! [`validate`] is a pure function over the raw JSON document: it never
//! touches the session or the registries, and it returns the FIRST
//! failure found. Messages that survive come out as typed
//! [`Request`] values the executor can trust.
//!
//! The first two checks (unknown/missing top-level keys) reject with a
//! non-standard echo-back response carrying the original request fields
//! verbatim, because at that point the message may not even fit the
//! canonical envelope shape.

mod dialect;

pub use dialect::{check_parameters, dialect_for, Dialect, CURRENT, DIALECTS, LEGACY_1_2};

use serde_json::{json, Map, Value};

use crate::protocol::{
    is_version_string, Operation, Request, Response, ENVELOPE_KEYS, PROTOCOL_VERSION,
};
use crate::status::Status;

/// Outcome of validating one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// Schema rejection with a canonical response envelope.
    Reject(Response),
    /// Schema rejection echoing the original request fields verbatim.
    Echo(Value),
    /// Message is well-formed; hand it to the executor.
    Pass(Request),
}

/// Validate a raw request document.
pub fn validate(message: &Map<String, Value>) -> Validation {
    // Unknown and missing top-level keys come back as echo responses.
    for key in message.keys() {
        if !ENVELOPE_KEYS.contains(&key.as_str()) {
            return echo(
                message,
                Status::UNKNOWN_FIELD,
                format!("key '{key}' is unknown"),
            );
        }
    }
    if message.len() != ENVELOPE_KEYS.len() {
        let missing: Vec<&str> = ENVELOPE_KEYS
            .iter()
            .filter(|key| !message.contains_key(**key))
            .copied()
            .collect();
        return echo(
            message,
            Status::MISSING_FIELD,
            format!("keys {missing:?} are not specified"),
        );
    }

    let proto_version = &message["proto_version"];
    let server_version = &message["server_version"];
    let id = &message["id"];
    let operation = &message["operation"];
    let parameters = &message["parameters"];

    let reject = |status: Status, error: String| {
        Validation::Reject(Response {
            proto_version: PROTOCOL_VERSION.to_string(),
            server_version: server_version.clone(),
            id: id.clone(),
            status: status.code(),
            result: json!({ "error": error }),
        })
    };

    if !is_version_string(proto_version) {
        return reject(
            Status::BAD_PROTO_VERSION,
            format!("invalid protocol version string: {proto_version}"),
        );
    }
    if !is_version_string(server_version) {
        return reject(
            Status::BAD_SERVER_VERSION,
            format!("invalid server version string: {server_version}"),
        );
    }
    if id.as_i64().is_none() {
        return reject(Status::BAD_REQUEST_ID, format!("invalid request id: {id}"));
    }

    // Operation membership is checked against the dialect of the claimed
    // protocol version; unrecorded versions fall back to the current one
    // and get rejected by the version equality check below.
    let proto_str = proto_version.as_str().unwrap_or_default();
    let selected = dialect_for(proto_str).unwrap_or(&CURRENT);
    let operation_name = operation.as_str().unwrap_or_default();
    if operation.as_str().is_none() || !selected.operations.contains(&operation_name) {
        return reject(
            Status::UNKNOWN_OPERATION,
            format!("unknown operation {operation} requested"),
        );
    }

    let Some(parameters) = parameters.as_object() else {
        return reject(
            Status::BAD_PARAMETERS,
            "invalid 'parameters' key: must be of JSON object type".to_string(),
        );
    };

    // Version mismatch, as opposed to a version the executor refuses:
    // that one is a semantic check and carries an execution-layer code.
    if proto_str != PROTOCOL_VERSION {
        return reject(
            Status::PROTO_VERSION_MISMATCH,
            format!(
                "incorrect protocol version '{proto_str}': the current protocol version is {PROTOCOL_VERSION}"
            ),
        );
    }

    // Past the equality check only current-dialect operations remain.
    let Some(operation) = Operation::parse(operation_name) else {
        return reject(
            Status::UNKNOWN_OPERATION,
            format!("unknown operation '{operation_name}' requested"),
        );
    };

    if let Err((status, error)) = check_parameters(operation, parameters) {
        return reject(status, error);
    }

    Validation::Pass(Request {
        proto_version: proto_str.to_string(),
        server_version: server_version.as_str().unwrap_or_default().to_string(),
        id: id.as_i64().unwrap_or_default(),
        operation,
        parameters: parameters.clone(),
    })
}

/// Echo-back rejection: all original fields plus `status` and `result`.
fn echo(message: &Map<String, Value>, status: Status, error: String) -> Validation {
    let mut response = message.clone();
    response.insert("status".to_string(), Value::from(status.code()));
    response.insert("result".to_string(), json!({ "error": error }));
    Validation::Echo(Value::Object(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SERVER_VERSION;

    fn base_request() -> Value {
        json!({
            "proto_version": PROTOCOL_VERSION,
            "server_version": SERVER_VERSION,
            "id": 0,
            "operation": "ping",
            "parameters": {}
        })
    }

    fn validate_value(value: Value) -> Validation {
        validate(value.as_object().expect("test document must be an object"))
    }

    fn status_of(validation: Validation) -> Status {
        match validation {
            Validation::Reject(response) => response.status(),
            Validation::Echo(value) => {
                Status::from_code(value["status"].as_i64().unwrap_or_default() as i32)
            }
            Validation::Pass(_) => Status::OK,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let Validation::Pass(request) = validate_value(base_request()) else {
            panic!("expected pass");
        };
        assert_eq!(request.operation, Operation::Ping);
        assert_eq!(request.id, 0);
    }

    #[test]
    fn test_unknown_key_echoes_back() {
        let mut doc = base_request();
        doc["val"] = json!(420.69);

        let validation = validate_value(doc);
        let Validation::Echo(response) = &validation else {
            panic!("expected echo");
        };
        assert_eq!(response["val"], json!(420.69));
        assert_eq!(response["operation"], json!("ping"));
        assert_eq!(status_of(validation), Status::UNKNOWN_FIELD);
    }

    #[test]
    fn test_renamed_key_is_unknown() {
        // "version" instead of "proto_version".
        let doc = json!({
            "version": PROTOCOL_VERSION,
            "server_version": SERVER_VERSION,
            "id": 0,
            "operation": "ping",
            "parameters": {}
        });
        assert_eq!(status_of(validate_value(doc)), Status::UNKNOWN_FIELD);
    }

    #[test]
    fn test_missing_keys_echo_back() {
        for key in ENVELOPE_KEYS {
            let mut doc = base_request();
            doc.as_object_mut().unwrap().remove(key);
            assert_eq!(status_of(validate_value(doc)), Status::MISSING_FIELD, "{key}");
        }
    }

    #[test]
    fn test_bad_proto_version_strings() {
        for bad in ["abc", "120", "12.0", "a.2.0", "1.2.0-1"] {
            let mut doc = base_request();
            doc["proto_version"] = json!(bad);
            assert_eq!(status_of(validate_value(doc)), Status::BAD_PROTO_VERSION, "{bad}");
        }
        let mut doc = base_request();
        doc["proto_version"] = json!(1.2);
        assert_eq!(status_of(validate_value(doc)), Status::BAD_PROTO_VERSION);
    }

    #[test]
    fn test_bad_server_version_strings() {
        for bad in ["abc", "120", "12.0", "a.2.0", "1.2.0-1"] {
            let mut doc = base_request();
            doc["server_version"] = json!(bad);
            assert_eq!(status_of(validate_value(doc)), Status::BAD_SERVER_VERSION, "{bad}");
        }
    }

    #[test]
    fn test_bad_id() {
        for bad in [json!("abc"), json!(0.3), json!(null), json!(true)] {
            let mut doc = base_request();
            doc["id"] = bad.clone();
            assert_eq!(status_of(validate_value(doc)), Status::BAD_REQUEST_ID, "{bad}");
        }
    }

    #[test]
    fn test_unknown_operation() {
        let mut doc = base_request();
        doc["operation"] = json!("abc");
        assert_eq!(status_of(validate_value(doc.clone())), Status::UNKNOWN_OPERATION);

        // Legacy spelling is not part of the current dialect.
        doc["operation"] = json!("PING");
        assert_eq!(status_of(validate_value(doc.clone())), Status::UNKNOWN_OPERATION);

        doc["operation"] = json!(7);
        assert_eq!(status_of(validate_value(doc)), Status::UNKNOWN_OPERATION);
    }

    #[test]
    fn test_legacy_dialect_operation_set() {
        // A legacy operation under the legacy version number passes the
        // membership check and is rejected by the version equality check
        // instead.
        let doc = json!({
            "proto_version": "1.2.0",
            "server_version": SERVER_VERSION,
            "id": 0,
            "operation": "import_gtiff",
            "parameters": {"file": "a.tif", "band": 1}
        });
        assert_eq!(status_of(validate_value(doc)), Status::PROTO_VERSION_MISMATCH);

        // The same operation under the current version is unknown.
        let doc = json!({
            "proto_version": PROTOCOL_VERSION,
            "server_version": SERVER_VERSION,
            "id": 0,
            "operation": "import_gtiff",
            "parameters": {}
        });
        assert_eq!(status_of(validate_value(doc)), Status::UNKNOWN_OPERATION);
    }

    #[test]
    fn test_bad_parameters() {
        let mut doc = base_request();
        doc["parameters"] = json!("abc");
        assert_eq!(status_of(validate_value(doc)), Status::BAD_PARAMETERS);
    }

    #[test]
    fn test_version_mismatch() {
        let mut doc = base_request();
        doc["proto_version"] = json!("420.69.42069");
        assert_eq!(status_of(validate_value(doc)), Status::PROTO_VERSION_MISMATCH);
    }

    #[test]
    fn test_parameter_shape_reaches_operation_rules() {
        let mut doc = base_request();
        doc["operation"] = json!("calc_index");
        doc["parameters"] = json!({});
        assert_eq!(status_of(validate_value(doc.clone())), Status::MISSING_PARAM);

        doc["parameters"] = json!({"index": 69});
        assert_eq!(status_of(validate_value(doc)), Status::INDEX_NAME_TYPE);
    }

    #[test]
    fn test_reject_echoes_raw_correlation_fields() {
        // server_version may be garbage; it is echoed raw.
        let mut doc = base_request();
        doc["server_version"] = json!(42);
        let Validation::Reject(response) = validate_value(doc) else {
            panic!("expected reject");
        };
        assert_eq!(response.status(), Status::BAD_SERVER_VERSION);
        assert_eq!(response.server_version, json!(42));
        assert_eq!(response.proto_version, PROTOCOL_VERSION);
    }
}
