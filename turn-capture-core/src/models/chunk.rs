use chrono::{DateTime, Utc};

/// A block of encoded wave bytes written to a `StreamSink`.
///
/// Immutable once created; owned by the sink after the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    buffer: Vec<u8>,
    is_end: bool,
    time_received: DateTime<Utc>,
}

impl EncodedChunk {
    /// A data chunk stamped with the current time.
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            is_end: false,
            time_received: Utc::now(),
        }
    }

    /// The terminal chunk of a stream (empty payload).
    pub fn end() -> Self {
        Self {
            buffer: Vec::new(),
            is_end: true,
            time_received: Utc::now(),
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn time_received(&self) -> DateTime<Utc> {
        self.time_received
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}
