use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::models::chunk::EncodedChunk;
use crate::models::error::CaptureError;
use crate::traits::stream_sink::StreamSink;

/// Channel-backed `StreamSink` handed to the transport.
///
/// Writes never block, so the sink can be fed from the real-time domain.
/// The transport consumes the paired `ChunkReader`.
pub struct ChunkStream {
    id: Uuid,
    closed: AtomicBool,
    sender: UnboundedSender<EncodedChunk>,
}

impl ChunkStream {
    pub fn new() -> (Arc<Self>, ChunkReader) {
        let (sender, receiver) = unbounded_channel();
        let stream = Arc::new(Self {
            id: Uuid::new_v4(),
            closed: AtomicBool::new(false),
            sender,
        });
        (stream, ChunkReader { receiver, finished: false })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Write the end chunk and close. Later calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The reader may already be gone.
        let _ = self.sender.send(EncodedChunk::end());
        log::debug!("closed audio stream {}", self.id);
    }
}

impl StreamSink for ChunkStream {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.sender.is_closed()
    }

    fn write_chunk(&self, chunk: EncodedChunk) -> Result<(), CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::StreamClosed);
        }
        self.sender.send(chunk).map_err(|_| CaptureError::StreamClosed)
    }
}

/// Consumer side of a `ChunkStream`.
pub struct ChunkReader {
    receiver: UnboundedReceiver<EncodedChunk>,
    finished: bool,
}

impl ChunkReader {
    /// Next data chunk in write order. `None` once the stream has ended.
    pub async fn read(&mut self) -> Option<EncodedChunk> {
        if self.finished {
            return None;
        }
        match self.receiver.recv().await {
            Some(chunk) if !chunk.is_end() => Some(chunk),
            _ => {
                self.finished = true;
                None
            }
        }
    }

    /// Like `read`, without waiting. `None` when nothing is queued.
    pub fn try_read(&mut self) -> Option<EncodedChunk> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(chunk) if !chunk.is_end() => Some(chunk),
            Ok(_) => {
                self.finished = true;
                None
            }
            Err(_) => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Concatenated payload of every remaining chunk up to the end.
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut bytes = Vec::new();
        while let Some(chunk) = self.read().await {
            bytes.extend_from_slice(chunk.buffer());
        }
        bytes
    }
}
