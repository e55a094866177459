//! Bounded body reading.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use super::transport::{BodyStream, TransportError};

/// Why a bounded read stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyError {
    /// The running byte count passed `limit`; the stream was dropped.
    TooLarge { limit: u64, received: u64 },
    /// The connection failed mid-body.
    Transport(TransportError),
}

/// Reads a streamed body, refusing to buffer more than `limit` bytes.
///
/// The size check happens before a chunk is appended, so the buffer never
/// grows past the limit. Returning drops the stream, which cancels the read.
pub(crate) async fn read_body_with_limit(
    mut body: BodyStream,
    limit: u64,
) -> Result<Bytes, BodyError> {
    let mut buffer = BytesMut::new();
    let mut received: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(BodyError::Transport)?;
        received = received.saturating_add(chunk.len() as u64);
        if received > limit {
            log::debug!("Body exceeded {limit} bytes after {received} bytes, aborting read");
            return Err(BodyError::TooLarge { limit, received });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}
