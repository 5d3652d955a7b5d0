use crate::models::chunk::EncodedChunk;
use crate::models::error::CaptureError;

/// Append-only, closable sequence of encoded chunks.
///
/// Owned and closed externally; the recorder only writes to it. `is_closed`
/// may change at any moment and must be re-checked before every write.
pub trait StreamSink: Send + Sync {
    fn is_closed(&self) -> bool;

    /// Append a chunk. Fails with `CaptureError::StreamClosed` after close.
    fn write_chunk(&self, chunk: EncodedChunk) -> Result<(), CaptureError>;
}
