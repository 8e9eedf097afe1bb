//! Upstream chunk stream to newline-delimited JSON
//!
//! Every upstream chunk becomes exactly one line, in arrival order, written as
//! soon as it is received. The first failure (while opening the upstream call
//! or mid-stream) is reported in-band as one `{"error": "..."}` line, after
//! which the body ends and the upstream is not polled again. The response
//! status has already been sent by then, so this is the only way a client
//! learns about it.
//!
//! The relay owns the upstream stream: when the client disconnects the body
//! is dropped, and with it the upstream connection.

use std::future::Future;

use bytes::Bytes;
use chatrelay_core::HttpError;
use futures_util::{Stream, StreamExt, stream};
use serde::Serialize;

use crate::error::LlmError;

/// Content type of relayed bodies
pub const JSON_LINES_CONTENT_TYPE: &str = "application/json-lines";

enum RelayState<F, S> {
    Opening(F),
    Streaming(S),
    Finished,
}

/// Relay the stream produced by `open` as NDJSON lines
///
/// `open` is not polled until the body is, so the upstream call starts when
/// the response starts streaming.
pub fn relay<F, S, T>(open: F) -> impl Stream<Item = Bytes> + Send + 'static
where
    F: Future<Output = Result<S, LlmError>> + Send + 'static,
    S: Stream<Item = Result<T, LlmError>> + Send + Unpin + 'static,
    T: Serialize + Send + 'static,
{
    stream::unfold(RelayState::Opening(open), |state| async move {
        let mut chunks = match state {
            RelayState::Opening(open) => match open.await {
                Ok(chunks) => chunks,
                Err(e) => return Some((fail(&e), RelayState::Finished)),
            },
            RelayState::Streaming(chunks) => chunks,
            RelayState::Finished => return None,
        };

        match chunks.next().await {
            Some(Ok(chunk)) => match encode_line(&chunk) {
                Ok(line) => Some((line, RelayState::Streaming(chunks))),
                Err(e) => Some((fail(&e), RelayState::Finished)),
            },
            Some(Err(e)) => Some((fail(&e), RelayState::Finished)),
            None => {
                tracing::debug!("upstream stream completed");
                None
            }
        }
    })
}

/// Serialize one value as a JSON line
///
/// # Errors
///
/// Returns `LlmError::Internal` if the value cannot be serialized
pub fn encode_line<T: Serialize>(value: &T) -> Result<Bytes, LlmError> {
    let mut line = serde_json::to_vec(value).map_err(|e| LlmError::Internal(format!("failed to encode chunk: {e}")))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// The in-band error line for `error`, carrying only its client-safe message
pub fn error_line(error: &LlmError) -> Bytes {
    let mut line = serde_json::json!({ "error": error.client_message() }).to_string().into_bytes();
    line.push(b'\n');
    Bytes::from(line)
}

fn fail(error: &LlmError) -> Bytes {
    tracing::error!(error = %error, "chat stream failed");
    error_line(error)
}
