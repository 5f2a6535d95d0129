//! Message envelope types.
//!
//! Every payload on the wire is a JSON object with five request fields
//! (`proto_version`, `server_version`, `id`, `operation`, `parameters`);
//! responses add `status` and `result`. A response must echo the request's
//! version fields and correlation id verbatim; [`match_reply`] enforces
//! this and a mismatch is itself an error condition.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::status::Status;

/// Protocol version implemented by this server.
pub const PROTOCOL_VERSION: &str = "2.0.0";

/// Version of the server itself.
pub const SERVER_VERSION: &str = "1.0.0";

/// Protocol versions the executor accepts for execution.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2.0.0"];

/// Top-level request envelope keys, all required.
pub const ENVELOPE_KEYS: [&str; 5] = [
    "proto_version",
    "server_version",
    "id",
    "operation",
    "parameters",
];

/// Supported commands, one variant per wire operation name.
///
/// `ExportGtiff` is known to the protocol (and validated) but not
/// implemented by the executor, which answers it with
/// [`Status::UNSUPPORTED_OPERATION`]: raster serialization is the concern
/// of an external encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    Shutdown,
    SetSatellite,
    EndSession,
    Import,
    ImportMetafile,
    CalcIndex,
    CalcPreview,
    ExportGtiff,
}

impl Operation {
    /// Parse a wire operation name of the current protocol version.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "ping" => Self::Ping,
            "shutdown" => Self::Shutdown,
            "set_satellite" => Self::SetSatellite,
            "end_session" => Self::EndSession,
            "import" => Self::Import,
            "import_metafile" => Self::ImportMetafile,
            "calc_index" => Self::CalcIndex,
            "calc_preview" => Self::CalcPreview,
            "export_gtiff" => Self::ExportGtiff,
            _ => return None,
        })
    }

    /// Wire name of this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Shutdown => "shutdown",
            Self::SetSatellite => "set_satellite",
            Self::EndSession => "end_session",
            Self::Import => "import",
            Self::ImportMetafile => "import_metafile",
            Self::CalcIndex => "calc_index",
            Self::CalcPreview => "calc_preview",
            Self::ExportGtiff => "export_gtiff",
        }
    }
}

/// A fully validated request, safe to hand to the executor.
///
/// Only the validator constructs these; the executor may assume all
/// envelope and parameter-shape invariants hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub proto_version: String,
    pub server_version: String,
    pub id: i64,
    pub operation: Operation,
    pub parameters: Map<String, Value>,
}

impl Request {
    /// Fetch a string parameter. Falls back to an empty string; the
    /// validator has already guaranteed presence and type.
    pub fn str_param(&self, key: &str) -> &str {
        self.parameters.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Fetch an integer parameter, same contract as [`Self::str_param`].
    pub fn int_param(&self, key: &str) -> i64 {
        self.parameters.get(key).and_then(Value::as_i64).unwrap_or_default()
    }
}

/// A response envelope.
///
/// `server_version` and `id` are raw JSON values: rejection responses for
/// malformed envelopes echo whatever the request carried, which may not be
/// a string or an integer at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub proto_version: String,
    pub server_version: Value,
    pub id: Value,
    pub status: i32,
    pub result: Value,
}

impl Response {
    /// Success response echoing the request's correlation fields.
    pub fn ok(request: &Request, result: Value) -> Self {
        Self {
            proto_version: request.proto_version.clone(),
            server_version: Value::from(request.server_version.clone()),
            id: Value::from(request.id),
            status: Status::OK.code(),
            result,
        }
    }

    /// Failure response with an error message in the result.
    pub fn fail(request: &Request, status: Status, message: impl Into<String>) -> Self {
        Self {
            proto_version: request.proto_version.clone(),
            server_version: Value::from(request.server_version.clone()),
            id: Value::from(request.id),
            status: status.code(),
            result: json!({ "error": message.into() }),
        }
    }

    /// Status as a typed code.
    pub fn status(&self) -> Status {
        Status::from_code(self.status)
    }
}

/// Check whether a value is a 3-component numeric dotted version string
/// such as `"2.0.0"`.
pub fn is_version_string(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let mut components = 0;
    for part in s.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        components += 1;
    }
    components == 3
}

/// Verify that a reply correlates with its request.
///
/// The reply's `proto_version`, `server_version` and `id` must equal the
/// request's; otherwise the reply is replaced with a
/// [`Status::REPLY_MISMATCH`] error.
pub fn match_reply(request: &Request, reply: Response) -> Response {
    let matches = reply.proto_version == request.proto_version
        && reply.server_version.as_str() == Some(request.server_version.as_str())
        && reply.id.as_i64() == Some(request.id);

    if matches {
        return reply;
    }

    tracing::warn!(
        request_id = request.id,
        "reply correlation fields do not echo the request"
    );
    Response {
        proto_version: PROTOCOL_VERSION.to_string(),
        server_version: Value::from(request.server_version.clone()),
        id: Value::from(request.id),
        status: Status::REPLY_MISMATCH.code(),
        result: json!({ "error": "correlation fields do not match in request and response" }),
    }
}
