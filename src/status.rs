//! Versioned status-code taxonomy.
//!
//! Codes are partitioned into non-overlapping ranges with one meaning each:
//!
//! ```text
//! 10000-10010   envelope / schema violations
//! 10100-10900   per-operation parameter-shape violations
//! 20000-20004   version, dispatch and precondition failures
//! 20200-20801   per-operation execution failures
//! ```
//!
//! A code is stable once assigned and is never repurposed across protocol
//! versions; new behaviors get new codes. The codes are the authoritative,
//! transport-independent contract. [`Status::http_class`] is the mapping
//! table consumed by HTTP-style facades.

/// A protocol status code. `0` means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    /// Success.
    pub const OK: Status = Status(0);

    // Envelope / schema layer.

    /// Unknown top-level key in the request envelope.
    pub const UNKNOWN_FIELD: Status = Status(10_000);
    /// Required top-level key missing from the request envelope.
    pub const MISSING_FIELD: Status = Status(10_001);
    /// `proto_version` is not a 3-component numeric dotted string.
    pub const BAD_PROTO_VERSION: Status = Status(10_002);
    /// `server_version` is not a 3-component numeric dotted string.
    pub const BAD_SERVER_VERSION: Status = Status(10_003);
    /// `id` is not an integer.
    pub const BAD_REQUEST_ID: Status = Status(10_004);
    /// `operation` is not in the supported set for the protocol version.
    pub const UNKNOWN_OPERATION: Status = Status(10_005);
    /// `parameters` is not a JSON object.
    pub const BAD_PARAMETERS: Status = Status(10_006);
    /// Required parameter key missing for the operation.
    pub const MISSING_PARAM: Status = Status(10_007);
    /// Unknown parameter key for the operation.
    pub const UNKNOWN_PARAM: Status = Status(10_008);
    /// `proto_version` does not equal the implemented protocol version.
    pub const PROTO_VERSION_MISMATCH: Status = Status(10_009);
    /// Response correlation fields do not echo the request.
    pub const REPLY_MISMATCH: Status = Status(10_010);

    // Per-operation parameter shapes.

    /// `ping` parameters must be empty.
    pub const PING_PARAMS: Status = Status(10_100);
    /// `shutdown` parameters must be empty.
    pub const SHUTDOWN_PARAMS: Status = Status(10_200);
    /// `import` parameter has the wrong type.
    pub const IMPORT_PARAM_TYPE: Status = Status(10_300);
    /// `calc_preview` source name has the wrong type.
    pub const PREVIEW_SOURCE_TYPE: Status = Status(10_400);
    /// `calc_preview` width/height has the wrong type.
    pub const PREVIEW_DIMS_TYPE: Status = Status(10_401);
    /// `calc_preview` width/height out of range (must be positive).
    pub const PREVIEW_DIMS_RANGE: Status = Status(10_402);
    /// `calc_index` index name has the wrong type.
    pub const INDEX_NAME_TYPE: Status = Status(10_500);
    /// `set_satellite` satellite has the wrong type.
    pub const SATELLITE_TYPE: Status = Status(10_600);
    /// `set_satellite` processing level has the wrong type.
    pub const PROC_LEVEL_TYPE: Status = Status(10_601);
    /// `end_session` parameters must be empty.
    pub const END_SESSION_PARAMS: Status = Status(10_700);
    /// `import_metafile` path has the wrong type.
    pub const METAFILE_PATH_TYPE: Status = Status(10_800);
    /// `export_gtiff` index name has the wrong type.
    pub const EXPORT_NAME_TYPE: Status = Status(10_900);

    // Execution layer.

    /// `server_version` does not match the running server.
    pub const WRONG_SERVER_VERSION: Status = Status(20_000);
    /// Protocol version not in the executor's supported set.
    pub const UNSUPPORTED_PROTO_VERSION: Status = Status(20_001);
    /// Operation known to the protocol but not implemented by the executor.
    pub const UNSUPPORTED_OPERATION: Status = Status(20_002);
    /// Request throttled. Reserved for the facade layer.
    pub const TOO_MANY_REQUESTS: Status = Status(20_003);
    /// Data-bearing operation before `set_satellite`.
    pub const SESSION_NOT_INITIALIZED: Status = Status(20_004);

    /// Shutdown currently unavailable. Reserved for the host process.
    pub const SHUTDOWN_UNAVAILABLE: Status = Status(20_200);
    /// Shutdown failed. Reserved for the host process.
    pub const SHUTDOWN_FAILED: Status = Status(20_201);
    /// File opened but carries no spatial reference.
    pub const NOT_A_RASTER: Status = Status(20_300);
    /// File could not be opened at all.
    pub const FILE_NOT_OPENABLE: Status = Status(20_301);
    /// Preview source name is not a known band, index or composite.
    pub const PREVIEW_SOURCE_UNKNOWN: Status = Status(20_400);
    /// Preview source exists but has not been materialized yet.
    pub const PREVIEW_SOURCE_MISSING: Status = Status(20_401);
    /// Preview rendering failed.
    pub const PREVIEW_RENDER_FAILED: Status = Status(20_402);
    /// Index name is not in the catalog.
    pub const INDEX_UNKNOWN: Status = Status(20_500);
    /// No declared input set for the index is satisfied.
    pub const INDEX_INPUTS_MISSING: Status = Status(20_501);
    /// Index computation failed.
    pub const INDEX_COMPUTE_FAILED: Status = Status(20_502);
    /// Satellite not in the supported table.
    pub const SATELLITE_UNSUPPORTED: Status = Status(20_600);
    /// Processing level not in the supported table.
    pub const PROC_LEVEL_UNSUPPORTED: Status = Status(20_601);
    /// `end_session` while no session is active.
    pub const SESSION_NOT_ACTIVE: Status = Status(20_700);
    /// Metadata file yielded no recognizable coefficients.
    pub const METAFILE_NO_COEFFICIENTS: Status = Status(20_800);
    /// Metadata file could not be read.
    pub const METAFILE_UNREADABLE: Status = Status(20_801);

    /// Numeric code carried on the wire.
    #[inline]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Wrap a raw wire code.
    #[inline]
    pub const fn from_code(code: i32) -> Self {
        Status(code)
    }

    /// True for the success code.
    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// The taxonomy layer this code belongs to.
    pub const fn layer(self) -> Layer {
        match self.0 {
            0 => Layer::Success,
            10_000..=19_999 => Layer::Schema,
            _ => Layer::Execution,
        }
    }

    /// Transport-level outcome class for HTTP-style facades.
    ///
    /// The ranges, not individual codes, are the contract here; codes added
    /// later inside an existing range inherit its class.
    pub const fn http_class(self) -> HttpClass {
        match self.0 {
            0 => HttpClass::Success,
            20_003 => HttpClass::Throttled,
            20_200 => HttpClass::Unavailable,
            20_400 | 20_500 | 20_600 => HttpClass::NotFound,
            20_000..=20_002
            | 20_201
            | 20_300
            | 20_301
            | 20_401
            | 20_402
            | 20_502
            | 20_800
            | 20_801 => HttpClass::ServerError,
            _ => HttpClass::ClientError,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Taxonomy layer of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Code 0.
    Success,
    /// Envelope and parameter-shape violations (validator).
    Schema,
    /// Version, precondition and execution failures (executor).
    Execution,
}

/// Facade outcome classes, one per HTTP status family the facade uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpClass {
    /// 2xx.
    Success,
    /// 4xx generic.
    ClientError,
    /// 404.
    NotFound,
    /// 429.
    Throttled,
    /// 503.
    Unavailable,
    /// 5xx generic.
    ServerError,
}
