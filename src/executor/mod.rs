//! Executor module - stateful command dispatch.
//!
//! One [`SessionExecutor`] per connection. It validates semantic
//! preconditions (sensor context must be selected), resolves which bands
//! and indices a requested product depends on, triggers computation
//! through the external index math with data fetched via the raster
//! store, and memoizes results in the session registries.
//!
//! All session mutation is serialized behind a single async mutex. That
//! one lock is also what makes index computation at-most-once per name: a
//! concurrent duplicate request queues behind it and then hits the cache.

pub mod catalog;
pub mod metafile;
mod session;

pub use session::{
    BandEntry, BandHandle, IndexHandle, PreviewHandle, SatelliteContext, Session,
};

use serde_json::json;
use tokio::sync::Mutex;

use crate::math::{EvalContext, IndexMath};
use crate::protocol::{
    Operation, Request, Response, SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::raster::{MaskedArray, RasterStore, Stats, WindowReader, DEFAULT_NODATA};
use crate::status::Status;

use catalog::{IndexSpec, Input, InputSet, Pipeline};

/// Protocol failure: a status code plus a human-readable message.
type Failure = (Status, String);

/// Summary of a cached or freshly computed index.
struct IndexSummary {
    id: u32,
    stats: Stats,
    unit: String,
}

/// Stateful command dispatcher for one connection.
pub struct SessionExecutor<S, M> {
    store: S,
    math: M,
    reader: WindowReader,
    session: Mutex<Session>,
}

impl<S: RasterStore, M: IndexMath> SessionExecutor<S, M> {
    pub fn new(store: S, math: M) -> Self {
        Self {
            store,
            math,
            reader: WindowReader::default(),
            session: Mutex::new(Session::new()),
        }
    }

    /// Execute a validated request and produce the reply.
    ///
    /// The validator has already enforced envelope and parameter shapes;
    /// everything here is semantic.
    pub async fn execute(&self, request: &Request) -> Response {
        if request.server_version != SERVER_VERSION {
            return Response::fail(
                request,
                Status::WRONG_SERVER_VERSION,
                format!(
                    "incorrect server version '{}': the server runs version {}",
                    request.server_version, SERVER_VERSION
                ),
            );
        }
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&request.proto_version.as_str()) {
            return Response::fail(
                request,
                Status::UNSUPPORTED_PROTO_VERSION,
                format!(
                    "unsupported protocol version '{}': the server understands {:?}",
                    request.proto_version, SUPPORTED_PROTOCOL_VERSIONS
                ),
            );
        }

        match request.operation {
            Operation::Ping => Response::ok(request, json!({ "data": "PONG" })),
            // The acknowledgement is protocol-level; actually exiting the
            // process is the host's concern.
            Operation::Shutdown => Response::ok(request, json!({})),
            Operation::ExportGtiff => Response::fail(
                request,
                Status::UNSUPPORTED_OPERATION,
                "operation 'export_gtiff' is not implemented by this executor",
            ),
            Operation::SetSatellite => self.set_satellite(request).await,
            Operation::EndSession => self.end_session(request).await,
            Operation::Import => self.import(request).await,
            Operation::ImportMetafile => self.import_metafile(request).await,
            Operation::CalcIndex => self.calc_index(request).await,
            Operation::CalcPreview => self.calc_preview(request).await,
        }
    }

    /// Cached preview by id, for the resource facade.
    pub async fn preview(&self, id: u32) -> Option<PreviewHandle> {
        self.session.lock().await.preview_by_id(id).cloned()
    }

    async fn set_satellite(&self, request: &Request) -> Response {
        let satellite = request.str_param("satellite");
        let proc_level = request.str_param("proc_level");

        if !catalog::SUPPORTED_SATELLITES.contains(&satellite) {
            return Response::fail(
                request,
                Status::SATELLITE_UNSUPPORTED,
                format!(
                    "unsupported satellite '{satellite}': supported satellites are {:?}",
                    catalog::SUPPORTED_SATELLITES
                ),
            );
        }
        if !catalog::SUPPORTED_PROC_LEVELS.contains(&proc_level) {
            return Response::fail(
                request,
                Status::PROC_LEVEL_UNSUPPORTED,
                format!(
                    "unsupported processing level '{proc_level}': supported levels are {:?}",
                    catalog::SUPPORTED_PROC_LEVELS
                ),
            );
        }

        let mut session = self.session.lock().await;
        session.set_context(satellite.to_string(), proc_level.to_string());
        tracing::info!(satellite, proc_level, "session activated");
        Response::ok(request, json!({}))
    }

    async fn end_session(&self, request: &Request) -> Response {
        let mut session = self.session.lock().await;
        if session.context().is_none() {
            return Response::fail(
                request,
                Status::SESSION_NOT_ACTIVE,
                "no active session to end",
            );
        }
        session.reset();
        tracing::info!("session ended, registries purged");
        Response::ok(request, json!({}))
    }

    async fn import(&self, request: &Request) -> Response {
        let file = request.str_param("file");
        let band = request.str_param("band");

        let mut session = self.session.lock().await;
        if session.context().is_none() {
            return precondition(request);
        }

        // Same file identity already registered under this label: the
        // import is idempotent and returns the existing handle.
        if let Some(entry) = session.band(band) {
            if entry.handle.file == file {
                tracing::debug!(file, band, id = entry.handle.id, "band already imported");
                return Response::ok(request, json!({ "id": entry.handle.id }));
            }
            tracing::debug!(file, band, "replacing band registered under another file");
        }

        let source = match self.store.open(file) {
            Ok(source) => source,
            Err(err @ crate::raster::StoreError::NotGeoreferenced(_)) => {
                return Response::fail(request, Status::NOT_A_RASTER, err.to_string());
            }
            Err(err) => {
                return Response::fail(request, Status::FILE_NOT_OPENABLE, err.to_string());
            }
        };

        let nodata = source.nodata(band).unwrap_or(DEFAULT_NODATA);
        let handle = session.insert_band(file.to_string(), band.to_string(), nodata, source);
        Response::ok(request, json!({ "id": handle.id }))
    }

    async fn import_metafile(&self, request: &Request) -> Response {
        let file = request.str_param("file");

        let mut session = self.session.lock().await;
        if session.context().is_none() {
            return precondition(request);
        }

        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                return Response::fail(
                    request,
                    Status::METAFILE_UNREADABLE,
                    format!("cannot read metadata file '{file}': {err}"),
                );
            }
        };

        let parsed = metafile::parse(&text);
        let applied = session.apply_metafile(&parsed);
        if applied == 0 {
            return Response::fail(
                request,
                Status::METAFILE_NO_COEFFICIENTS,
                format!("no calibration coefficients recognized in '{file}'"),
            );
        }
        Response::ok(request, json!({ "applied": applied }))
    }

    async fn calc_index(&self, request: &Request) -> Response {
        let name = request.str_param("index");

        let mut session = self.session.lock().await;
        if session.context().is_none() {
            return precondition(request);
        }

        let mut visiting = Vec::new();
        match self.compute_index(&mut session, name, &mut visiting) {
            Ok(summary) => Response::ok(
                request,
                json!({ "id": summary.id, "stats": summary.stats, "unit": summary.unit }),
            ),
            Err((status, message)) => Response::fail(request, status, message),
        }
    }

    async fn calc_preview(&self, request: &Request) -> Response {
        let source = request.str_param("index");
        let width = request.int_param("width") as usize;
        let height = request.int_param("height") as usize;

        let mut session = self.session.lock().await;
        if session.context().is_none() {
            return precondition(request);
        }

        // (source, width, height) is a lookup key, not a resize request;
        // other dimensions of the same source are distinct entries.
        if let Some(preview) = session.preview(source, width, height) {
            tracing::debug!(source, width, height, id = preview.id, "preview cache hit");
            return Response::ok(
                request,
                json!({ "id": preview.id, "width": width, "height": height }),
            );
        }

        match self.render_preview(&session, source, width, height) {
            Ok((channels, pixels)) => {
                let id =
                    session.insert_preview(source.to_string(), width, height, channels, pixels);
                Response::ok(request, json!({ "id": id, "width": width, "height": height }))
            }
            Err((status, message)) => Response::fail(request, status, message),
        }
    }

    /// Compute an index through the memoizing path. `visiting` guards
    /// against cyclic dependency declarations.
    fn compute_index(
        &self,
        session: &mut Session,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<IndexSummary, Failure> {
        if let Some(handle) = session.index(name) {
            tracing::debug!(name, id = handle.id, "index cache hit");
            return Ok(IndexSummary {
                id: handle.id,
                stats: handle.stats,
                unit: handle.unit.clone(),
            });
        }

        if visiting.iter().any(|v| v == name) {
            return Err((
                Status::INDEX_COMPUTE_FAILED,
                format!("cyclic dependency while resolving index '{name}'"),
            ));
        }

        let Some(spec) = catalog::index_spec(name) else {
            return Err((
                Status::INDEX_UNKNOWN,
                format!("unknown index '{name}' requested"),
            ));
        };

        let satellite = session
            .context()
            .map(|c| c.satellite.clone())
            .unwrap_or_default();

        let candidates: Vec<&InputSet> = spec
            .input_sets
            .iter()
            .filter(|set| set.applies_to(&satellite))
            .collect();
        if candidates.is_empty() {
            return Err((
                Status::INDEX_INPUTS_MISSING,
                format!("index '{name}' is not defined for satellite '{satellite}'"),
            ));
        }

        // Fixed priority order: the first fully-satisfied set wins.
        let chosen = candidates.iter().find(|set| {
            set.inputs.iter().all(|input| {
                let mut seen = visiting.clone();
                self.input_available(session, &satellite, input, &mut seen)
            })
        });
        let Some(set) = chosen else {
            let missing: Vec<String> = candidates[0]
                .inputs
                .iter()
                .filter(|input| {
                    let mut seen = visiting.clone();
                    !self.input_available(session, &satellite, input, &mut seen)
                })
                .map(ToString::to_string)
                .collect();
            return Err((
                Status::INDEX_INPUTS_MISSING,
                format!(
                    "unsatisfied inputs for index '{name}': {}",
                    missing.join(", ")
                ),
            ));
        };

        visiting.push(name.to_string());
        let outcome = self.compute_with_set(session, spec, set, visiting);
        visiting.pop();
        let array = outcome?;

        let Some(stats) = array.stats() else {
            return Err((
                Status::INDEX_COMPUTE_FAILED,
                format!("index '{name}' has no valid pixels"),
            ));
        };

        // Atomic registration: the array, stats and handle go in together
        // or not at all.
        let id = session.insert_index(
            name.to_string(),
            array,
            stats,
            DEFAULT_NODATA,
            spec.unit.to_string(),
            Some(spec.description.to_string()),
        );
        tracing::info!(name, id, "index computed");
        Ok(IndexSummary {
            id,
            stats,
            unit: spec.unit.to_string(),
        })
    }

    /// Fetch every input of the chosen set and run the pipeline.
    fn compute_with_set(
        &self,
        session: &mut Session,
        spec: &IndexSpec,
        set: &InputSet,
        visiting: &mut Vec<String>,
    ) -> Result<MaskedArray, Failure> {
        let mut arrays = Vec::with_capacity(set.inputs.len());
        let mut calibrations = Vec::with_capacity(set.inputs.len());

        for input in set.inputs {
            match input {
                Input::Band(label) => {
                    let (source, nodata, calibration) = {
                        let Some(entry) = session.band(label) else {
                            return Err((
                                Status::INDEX_INPUTS_MISSING,
                                format!(
                                    "band '{label}' disappeared while resolving index '{}'",
                                    spec.name
                                ),
                            ));
                        };
                        (
                            entry.source.clone(),
                            entry.handle.nodata,
                            entry.handle.calibration.clone(),
                        )
                    };
                    let array = self
                        .reader
                        .read(source.as_ref(), label, nodata, None)
                        .map_err(|err| (Status::INDEX_COMPUTE_FAILED, err.to_string()))?;
                    arrays.push(array);
                    calibrations.push(Some(calibration));
                }
                Input::Index(dep) => {
                    self.compute_index(session, dep, visiting)?;
                    let array = session
                        .index(dep)
                        .map(|handle| handle.array.clone())
                        .ok_or_else(|| {
                            (
                                Status::INDEX_COMPUTE_FAILED,
                                format!("dependency '{dep}' missing after computation"),
                            )
                        })?;
                    arrays.push(array);
                    calibrations.push(None);
                }
            }
        }

        let refs: Vec<&MaskedArray> = arrays.iter().collect();
        let ctx = EvalContext {
            nodata: DEFAULT_NODATA,
            calibration: &calibrations,
            sun_elevation: session.sun_elevation(),
            earth_sun_distance: session.earth_sun_distance(),
        };

        let computed = match spec.pipeline {
            Pipeline::Evaluate(formula) => self.math.evaluate(formula, &refs, &ctx),
            Pipeline::Binarize => self.math.otsu_binarize(refs[0], DEFAULT_NODATA),
        };
        computed.map_err(|err| (Status::INDEX_COMPUTE_FAILED, err.to_string()))
    }

    /// Whether an input can be satisfied right now, recursing through
    /// index dependencies. `seen` carries the resolution chain so cyclic
    /// declarations terminate.
    fn input_available(
        &self,
        session: &Session,
        satellite: &str,
        input: &Input,
        seen: &mut Vec<String>,
    ) -> bool {
        match input {
            Input::Band(label) => session.band(label).is_some(),
            Input::Index(name) => {
                let name: &str = name;
                if session.index(name).is_some() {
                    return true;
                }
                if seen.iter().any(|v| v == name) {
                    return false;
                }
                let Some(spec) = catalog::index_spec(name) else {
                    return false;
                };
                seen.push(name.to_string());
                let satisfiable = spec
                    .input_sets
                    .iter()
                    .filter(|set| set.applies_to(satellite))
                    .any(|set| {
                        set.inputs
                            .iter()
                            .all(|input| self.input_available(session, satellite, input, seen))
                    });
                seen.pop();
                satisfiable
            }
        }
    }

    /// Resolve and render a preview source at the requested dimensions.
    fn render_preview(
        &self,
        session: &Session,
        source: &str,
        width: usize,
        height: usize,
    ) -> Result<(u8, Vec<u8>), Failure> {
        if catalog::index_spec(source).is_some() {
            let Some(handle) = session.index(source) else {
                return Err((
                    Status::PREVIEW_SOURCE_MISSING,
                    format!("index '{source}' has not been computed yet"),
                ));
            };
            let resampled = handle.array.resample_nearest(width, height);
            return Ok((1, self.math.to_8bit(&resampled)));
        }

        if let Some(entry) = session.band(source) {
            return Ok((1, self.render_band(entry, width, height)?));
        }

        if source == catalog::COMPOSITE_NATURAL_COLOR {
            let satellite = session
                .context()
                .map(|c| c.satellite.clone())
                .unwrap_or_default();
            let Some(labels) = catalog::composite_bands(&satellite) else {
                return Err((
                    Status::PREVIEW_SOURCE_UNKNOWN,
                    format!("no natural-color composite defined for satellite '{satellite}'"),
                ));
            };

            let mut channels = Vec::with_capacity(3);
            for label in labels {
                let Some(entry) = session.band(label) else {
                    return Err((
                        Status::PREVIEW_SOURCE_MISSING,
                        format!("composite '{source}' needs band '{label}' imported"),
                    ));
                };
                channels.push(self.render_band(entry, width, height)?);
            }

            let mut pixels = Vec::with_capacity(width * height * 3);
            for i in 0..width * height {
                for channel in &channels {
                    pixels.push(channel[i]);
                }
            }
            return Ok((3, pixels));
        }

        Err((
            Status::PREVIEW_SOURCE_UNKNOWN,
            format!("preview source '{source}' is not a known band, index or composite"),
        ))
    }

    /// Read a band downsampled to the preview dimensions and stretch it
    /// to 8 bits.
    fn render_band(
        &self,
        entry: &BandEntry,
        width: usize,
        height: usize,
    ) -> Result<Vec<u8>, Failure> {
        let geometry = entry.source.geometry();
        let mut array = entry
            .source
            .read_window(
                &entry.handle.band,
                0,
                0,
                geometry.width,
                geometry.height,
                width,
                height,
            )
            .map_err(|err| (Status::PREVIEW_RENDER_FAILED, err.to_string()))?;
        array.mask_nodata(entry.handle.nodata);
        Ok(self.math.to_8bit(&array))
    }
}

/// Rejection for data-bearing operations before `set_satellite`.
fn precondition(request: &Request) -> Response {
    Response::fail(
        request,
        Status::SESSION_NOT_INITIALIZED,
        "no satellite context selected: call 'set_satellite' first",
    )
}
