use std::sync::Arc;

use super::backend::{start_backend, BackendKind, CaptureBackend};
use super::first_bytes::{FirstBytesCallback, FirstBytesNotifier};
use super::worklet_backend::WorkletBackend;
use crate::models::chunk::EncodedChunk;
use crate::models::config::{RecorderConfig, WorkletModuleSetting};
use crate::models::error::CaptureError;
use crate::processing::sample_rate_converter::SampleRateConverter;
use crate::traits::capture_host::{CaptureHost, FrameHandler, InputStream, SourceNode};
use crate::traits::stream_sink::StreamSink;

/// The live capture path of one `record` call.
struct CaptureGraphResources {
    source: Box<dyn SourceNode>,
    backend: CaptureBackend,
    stream: Arc<dyn InputStream>,
}

/// Captures a device stream into a `StreamSink` as 16 kHz mono PCM.
///
/// Owns the capture graph of the current call and the worklet state that
/// is reused across sequential calls.
pub struct Recorder {
    config: RecorderConfig,
    worklet: WorkletBackend,
    resources: Option<CaptureGraphResources>,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        let worklet = WorkletBackend::new(&config.worklet_module);
        Self {
            config,
            worklet,
            resources: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Replace the worklet override. `"ignore"` disables the worklet path.
    pub fn set_worklet_url(&mut self, url: &str) {
        let setting = WorkletModuleSetting::from_override(url);
        match &setting {
            WorkletModuleSetting::Url(url) => self.worklet.set_module_url(url.clone()),
            WorkletModuleSetting::Builtin => self.worklet = WorkletBackend::new(&setting),
            WorkletModuleSetting::Ignore => {}
        }
        self.config.worklet_module = setting;
    }

    /// Backend of the active capture, if any.
    pub fn active_backend(&self) -> Option<BackendKind> {
        self.resources.as_ref().map(|r| r.backend.kind())
    }

    pub fn is_recording(&self) -> bool {
        self.resources.is_some()
    }

    /// Start capturing `stream` into `sink`.
    ///
    /// Any capture already running is released first. `first_bytes` fires
    /// once, on the first frame delivered by the new capture.
    pub async fn record(
        &mut self,
        host: &dyn CaptureHost,
        stream: Arc<dyn InputStream>,
        sink: Arc<dyn StreamSink>,
        first_bytes: Option<FirstBytesCallback>,
    ) -> Result<BackendKind, CaptureError> {
        self.release_media_resources();
        if stream.is_stopped() {
            return Err(CaptureError::InputStopped);
        }

        let mut source = host.create_source(Arc::clone(&stream))?;
        let selected = start_backend(&self.config.worklet_module, host, &mut self.worklet).await;
        let backend = match selected {
            Ok(backend) => backend,
            Err(err) => {
                source.disconnect();
                return Err(err);
            }
        };

        let handler = frame_handler(
            SampleRateConverter::to_target(host.sample_rate()),
            FirstBytesNotifier::armed(first_bytes),
            sink,
        );
        let started = backend
            .start(handler)
            .and_then(|()| source.connect(backend.node()));
        if let Err(err) = started {
            backend.stop();
            source.disconnect();
            return Err(err);
        }

        let kind = backend.kind();
        log::info!(
            "recording {} at {} Hz via {kind}",
            stream.device_id(),
            host.sample_rate()
        );
        self.resources = Some(CaptureGraphResources {
            source,
            backend,
            stream,
        });
        Ok(kind)
    }

    /// Tear down the capture graph. A no-op when nothing is recording.
    pub fn release_media_resources(&mut self) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        let CaptureGraphResources {
            mut source,
            backend,
            stream,
        } = resources;

        backend.stop();
        source.disconnect();
        if self.config.stop_input_on_release {
            stream.stop_tracks();
        }
        log::debug!("released capture graph for {}", stream.device_id());
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.release_media_resources();
    }
}

/// Per-call frame handler: notify, encode, then write if the sink is still open.
fn frame_handler(
    mut converter: SampleRateConverter,
    mut notifier: FirstBytesNotifier,
    sink: Arc<dyn StreamSink>,
) -> FrameHandler {
    Box::new(move |frame: &[f32]| {
        if let Some(latency) = notifier.fire() {
            log::debug!("first audio bytes after {} ms", latency.as_millis());
        }
        let Some(bytes) = converter.encode(frame) else {
            return;
        };
        if sink.is_closed() {
            return;
        }
        if let Err(err) = sink.write_chunk(EncodedChunk::new(bytes)) {
            log::debug!("dropped encoded chunk: {err}");
        }
    })
}
