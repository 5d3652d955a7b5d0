use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::backend::BackendKind;
use crate::capture::first_bytes::FirstBytesCallback;
use crate::capture::recorder::Recorder;
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::stream::chunk_stream::{ChunkReader, ChunkStream};
use crate::traits::capture_host::{CaptureHost, InputStream};
use crate::traits::stream_sink::StreamSink;

struct Attachment {
    node_id: String,
    stream: Arc<ChunkStream>,
}

/// Microphone as seen by a transport: turned on once, then attached to
/// and detached from audio nodes, one at a time.
pub struct MicrophoneSource {
    host: Arc<dyn CaptureHost>,
    device: Option<String>,
    recorder: tokio::sync::Mutex<Recorder>,
    input: Mutex<Option<Arc<dyn InputStream>>>,
    attachment: Mutex<Option<Attachment>>,
}

impl MicrophoneSource {
    pub fn new(host: Arc<dyn CaptureHost>, device: Option<String>, config: RecorderConfig) -> Self {
        Self {
            host,
            device,
            recorder: tokio::sync::Mutex::new(Recorder::new(config)),
            input: Mutex::new(None),
            attachment: Mutex::new(None),
        }
    }

    /// Open the device input if it is not already live.
    pub fn turn_on(&self) -> Result<Arc<dyn InputStream>, CaptureError> {
        let mut input = self.input.lock();
        if let Some(stream) = input.as_ref().filter(|s| !s.is_stopped()) {
            return Ok(Arc::clone(stream));
        }
        let stream = self.host.open_input(self.device.as_deref())?;
        log::info!("microphone on: {}", stream.device_id());
        *input = Some(Arc::clone(&stream));
        Ok(stream)
    }

    pub fn is_on(&self) -> bool {
        self.input.lock().as_ref().is_some_and(|s| !s.is_stopped())
    }

    /// Start capturing for `node_id` and return the reader of its audio.
    ///
    /// A previous attachment is detached first.
    pub async fn attach(
        &self,
        node_id: &str,
        first_bytes: Option<FirstBytesCallback>,
    ) -> Result<ChunkReader, CaptureError> {
        let mut recorder = self.recorder.lock().await;
        recorder.release_media_resources();
        self.close_attachment();

        let input = self.turn_on()?;
        let (stream, reader) = ChunkStream::new();
        let sink: Arc<dyn StreamSink> = Arc::clone(&stream) as Arc<dyn StreamSink>;
        let kind = recorder
            .record(self.host.as_ref(), input, sink, first_bytes)
            .await?;
        log::debug!("attached {node_id} to stream {} via {kind}", stream.id());

        *self.attachment.lock() = Some(Attachment {
            node_id: node_id.to_string(),
            stream,
        });
        Ok(reader)
    }

    /// Stop capturing for `node_id` and end its stream. Unknown ids are ignored.
    pub async fn detach(&self, node_id: &str) {
        let mut recorder = self.recorder.lock().await;
        let attached = self
            .attachment
            .lock()
            .as_ref()
            .is_some_and(|a| a.node_id == node_id);
        if !attached {
            return;
        }
        recorder.release_media_resources();
        self.close_attachment();
    }

    /// Detach everything and stop the device input.
    pub async fn turn_off(&self) {
        let mut recorder = self.recorder.lock().await;
        recorder.release_media_resources();
        self.close_attachment();
        if let Some(input) = self.input.lock().take() {
            input.stop_tracks();
            log::info!("microphone off: {}", input.device_id());
        }
    }

    pub async fn active_backend(&self) -> Option<BackendKind> {
        self.recorder.lock().await.active_backend()
    }

    fn close_attachment(&self) {
        if let Some(attachment) = self.attachment.lock().take() {
            attachment.stream.close();
            log::debug!("detached {}", attachment.node_id);
        }
    }
}
