//! # turn-capture-core
//!
//! Platform-agnostic microphone capture and turn orchestration.
//!
//! Captures a device stream, converts it to a 16 kHz mono 16-bit wave
//! stream and writes it into a closable sink, while a `TurnController`
//! sequences single-utterance recognition turns against an injected
//! connector. Platform backends (e.g. `turn-capture-cpal`) implement the
//! `CaptureHost` trait and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! turn-capture-core (this crate)
//! ├── traits/       ← CaptureHost and graph nodes, StreamSink, RecognitionConnector
//! ├── models/       ← errors, configs, EncodedChunk, TurnState, recognition events
//! ├── processing/   ← SampleRateConverter, wave header and PCM helpers
//! ├── capture/      ← Recorder, backend selection, script-processor and worklet nodes
//! ├── stream/       ← ChunkStream (channel-backed StreamSink)
//! └── session/      ← TurnController, EventHub, MicrophoneSource
//! ```

pub mod capture;
pub mod models;
pub mod processing;
pub mod session;
pub mod stream;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use capture::backend::{select_backend, BackendKind, CaptureBackend};
pub use capture::first_bytes::{FirstBytesCallback, FirstBytesNotifier};
pub use capture::recorder::Recorder;
pub use capture::script_processor::ScriptProcessorNode;
pub use capture::worklet_backend::{WorkletBackend, WorkletHandle};
pub use capture::worklet_module::{
    MessagePort, SpeechProcessor, WorkletModule, WorkletProcessor, WorkletRegistry,
};
pub use capture::worklet_node::WorkletNode;
pub use models::chunk::EncodedChunk;
pub use models::config::{RecorderConfig, TurnConfig, WorkletModuleSetting};
pub use models::error::{CaptureError, TurnError};
pub use models::recognition::{
    CancellationDetails, CancellationErrorCode, CancellationReason, RecognitionMode,
    RecognitionResult, ResultReason, TurnEvent,
};
pub use models::state::TurnState;
pub use processing::sample_rate_converter::{SampleRateConverter, TARGET_SAMPLE_RATE};
pub use session::events::{EventHub, EventPublisher};
pub use session::microphone::MicrophoneSource;
pub use session::turn_controller::TurnController;
pub use stream::chunk_stream::{ChunkReader, ChunkStream};
pub use traits::capture_host::{CaptureHost, FrameHandler, InputStream, ProcessorNode, SourceNode};
pub use traits::connector::RecognitionConnector;
pub use traits::stream_sink::StreamSink;
