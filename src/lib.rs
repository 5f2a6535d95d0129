//! # rasterwire
//!
//! Session command-processing engine for derived raster products
//! (spectral indices, previews) served over a framed stream protocol.
//!
//! Each client connection gets its own [`SessionExecutor`]: a stateful
//! dispatcher that validates versioned JSON commands, resolves
//! dependencies between opened raster bands and derived indices, and
//! memoizes every computed product so repeated requests are served from
//! cache. Raster decoding and index numerics are external collaborators
//! behind the [`raster::RasterStore`] and [`math::IndexMath`] traits.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ─► FrameBuffer ─► JsonCodec ─► validate ─► SessionExecutor ─► reply
//!                                        (schema)    (semantics, caches)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rasterwire::transport::serve;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> rasterwire::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     serve(listener, || {
//!         rasterwire::SessionExecutor::new(GdalStore::new(), SpectralMath::new())
//!     })
//!     .await
//! }
//! ```

pub mod codec;
pub mod error;
pub mod executor;
pub mod math;
pub mod protocol;
pub mod raster;
pub mod status;
pub mod transport;
pub mod validator;

pub use error::{Result, WireError};
pub use executor::SessionExecutor;
pub use protocol::{Operation, Request, Response, PROTOCOL_VERSION, SERVER_VERSION};
pub use status::{HttpClass, Status};
