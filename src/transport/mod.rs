//! Transport module - framed connection handling.
//!
//! One independent [`SessionExecutor`] per accepted connection; sessions
//! never share raster state, so connections are embarrassingly parallel.
//! Framing and dispatch are synchronous within a connection: requests are
//! answered in arrival order.
//!
//! Transport errors (oversized length prefix, undecodable payload) are
//! fatal for the connection. Schema and execution failures are per-message
//! and leave the connection open.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::codec::JsonCodec;
use crate::error::{Result, WireError};
use crate::executor::SessionExecutor;
use crate::math::IndexMath;
use crate::protocol::{encode_frame, match_reply, FrameBuffer};
use crate::raster::RasterStore;
use crate::validator::{validate, Validation};

/// Socket read buffer size.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Drive one connection until EOF or a fatal transport error.
///
/// Reads frames, validates and executes each message, and writes the
/// framed reply before processing the next message.
pub async fn serve_connection<IO, S, M>(
    mut io: IO,
    executor: Arc<SessionExecutor<S, M>>,
) -> Result<()>
where
    IO: AsyncRead + AsyncWrite + Unpin,
    S: RasterStore,
    M: IndexMath,
{
    let mut frames = FrameBuffer::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = io.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let complete = frames.push(&buf[..n])?;
        for payload in complete {
            let reply = handle_payload(&executor, &payload).await?;
            let encoded = encode_frame(&JsonCodec::encode(&reply)?);
            io.write_all(&encoded).await?;
        }
    }
}

/// Validate and execute one message payload.
///
/// Errors here mean the payload was not a JSON object at all; the caller
/// must close the connection because message boundaries can no longer be
/// trusted.
async fn handle_payload<S, M>(
    executor: &SessionExecutor<S, M>,
    payload: &[u8],
) -> Result<Value>
where
    S: RasterStore,
    M: IndexMath,
{
    let document = JsonCodec::decode_value(payload)?;
    let Some(message) = document.as_object() else {
        return Err(WireError::Protocol(
            "message payload must be a JSON object".to_string(),
        ));
    };

    Ok(match validate(message) {
        Validation::Echo(response) => response,
        Validation::Reject(response) => serde_json::to_value(response)?,
        Validation::Pass(request) => {
            let reply = executor.execute(&request).await;
            let reply = match_reply(&request, reply);
            serde_json::to_value(reply)?
        }
    })
}

/// Accept loop: one executor and one task per connection.
///
/// `factory` builds the per-connection executor, typically closing over
/// shared raster store and index math handles.
pub async fn serve<S, M, F>(listener: TcpListener, factory: F) -> Result<()>
where
    S: RasterStore + 'static,
    M: IndexMath + 'static,
    F: Fn() -> SessionExecutor<S, M>,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let executor = Arc::new(factory());
        tracing::info!(%peer, "connection accepted");

        tokio::spawn(async move {
            match serve_connection(stream, executor).await {
                Ok(()) => tracing::debug!(%peer, "connection closed"),
                Err(err) => tracing::warn!(%peer, error = %err, "connection dropped"),
            }
        });
    }
}
