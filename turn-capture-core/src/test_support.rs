//! Mocks shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::capture::script_processor::ScriptProcessorNode;
use crate::capture::worklet_module::{
    speech_processor_factory, WorkletModule, WorkletRegistry, SPEECH_PROCESSOR,
};
use crate::models::chunk::EncodedChunk;
use crate::models::error::{CaptureError, TurnError};
use crate::models::recognition::{RecognitionMode, RecognitionResult, ResultReason};
use crate::traits::capture_host::{CaptureHost, InputStream, ProcessorNode, SourceNode};
use crate::traits::connector::RecognitionConnector;
use crate::traits::stream_sink::StreamSink;

/// Poll `done` from a blocking context for up to two seconds.
pub(crate) fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

/// Poll `done` from async code, yielding to other tasks in between.
pub(crate) async fn eventually(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    done()
}

// ---------------------------------------------------------------------------
// Capture host
// ---------------------------------------------------------------------------

type SourceSlot = Arc<Mutex<Option<Arc<dyn ProcessorNode>>>>;

/// In-memory capture host. Frames are injected with `push_frame`.
pub(crate) struct MockHost {
    sample_rate: u32,
    supports_worklet: bool,
    fail_registration: bool,
    fail_script_processor: bool,
    auto_buffer_size: Option<usize>,
    registry: WorkletRegistry,
    module_loads: AtomicUsize,
    worklet_nodes: AtomicUsize,
    inputs_opened: AtomicUsize,
    script_sizes: Mutex<Vec<usize>>,
    sources: Mutex<Vec<SourceSlot>>,
}

impl MockHost {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            supports_worklet: true,
            fail_registration: false,
            fail_script_processor: false,
            auto_buffer_size: None,
            registry: WorkletRegistry::new(),
            module_loads: AtomicUsize::new(0),
            worklet_nodes: AtomicUsize::new(0),
            inputs_opened: AtomicUsize::new(0),
            script_sizes: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_failing_registration(mut self) -> Self {
        self.fail_registration = true;
        self
    }

    pub(crate) fn without_worklet(mut self) -> Self {
        self.supports_worklet = false;
        self
    }

    pub(crate) fn with_failing_script_processor(mut self) -> Self {
        self.fail_script_processor = true;
        self
    }

    pub(crate) fn with_auto_buffer_size(mut self, size: usize) -> Self {
        self.auto_buffer_size = Some(size);
        self
    }

    pub(crate) fn define_speech_module(&self, url: &str) {
        self.registry.define_module(url, SPEECH_PROCESSOR, speech_processor_factory());
    }

    /// Deliver one frame to every connected source.
    pub(crate) fn push_frame(&self, frame: &[f32]) {
        let nodes: Vec<Arc<dyn ProcessorNode>> = self
            .sources
            .lock()
            .iter()
            .filter_map(|slot| slot.lock().clone())
            .collect();
        for node in nodes {
            node.process(frame);
        }
    }

    pub(crate) fn connected_sources(&self) -> usize {
        self.sources
            .lock()
            .iter()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    pub(crate) fn module_loads(&self) -> usize {
        self.module_loads.load(Ordering::SeqCst)
    }

    pub(crate) fn worklet_nodes_created(&self) -> usize {
        self.worklet_nodes.load(Ordering::SeqCst)
    }

    pub(crate) fn inputs_opened(&self) -> usize {
        self.inputs_opened.load(Ordering::SeqCst)
    }

    pub(crate) fn script_buffer_sizes(&self) -> Vec<usize> {
        self.script_sizes.lock().clone()
    }
}

#[async_trait]
impl CaptureHost for MockHost {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn supports_worklet(&self) -> bool {
        self.supports_worklet
    }

    fn open_input(&self, device: Option<&str>) -> Result<Arc<dyn InputStream>, CaptureError> {
        self.inputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockInput::new(device.unwrap_or("default")))
    }

    fn create_source(
        &self,
        stream: Arc<dyn InputStream>,
    ) -> Result<Box<dyn SourceNode>, CaptureError> {
        if stream.is_stopped() {
            return Err(CaptureError::InputStopped);
        }
        let slot: SourceSlot = Arc::new(Mutex::new(None));
        self.sources.lock().push(Arc::clone(&slot));
        Ok(Box::new(MockSource { slot }))
    }

    fn create_script_processor(
        &self,
        buffer_size: usize,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError> {
        if self.fail_script_processor {
            return Err(CaptureError::GraphSetupFailed("script processor unavailable".into()));
        }
        let size = match (buffer_size, self.auto_buffer_size) {
            (0, Some(auto)) => auto,
            (0, None) => return Err(CaptureError::UnsupportedBufferSize(0)),
            (size, _) => size,
        };
        self.script_sizes.lock().push(buffer_size);
        Ok(Arc::new(ScriptProcessorNode::new(size)))
    }

    async fn add_worklet_module(&self, module: &WorkletModule) -> Result<(), CaptureError> {
        self.module_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_registration {
            return Err(CaptureError::WorkletRegistrationFailed("simulated load failure".into()));
        }
        self.registry.add_module(module)
    }

    fn create_worklet_node(
        &self,
        processor_name: &str,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError> {
        let node = self.registry.create_node(processor_name)?;
        self.worklet_nodes.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(node))
    }
}

struct MockSource {
    slot: SourceSlot,
}

impl SourceNode for MockSource {
    fn connect(&mut self, node: Arc<dyn ProcessorNode>) -> Result<(), CaptureError> {
        *self.slot.lock() = Some(node);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.slot.lock().take();
    }
}

pub(crate) struct MockInput {
    device_id: String,
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
}

impl MockInput {
    pub(crate) fn new(device_id: &str) -> Arc<Self> {
        Arc::new(Self {
            device_id: device_id.to_string(),
            stopped: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl InputStream for MockInput {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn stop_tracks(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Sink that keeps every accepted chunk.
#[derive(Default)]
pub(crate) struct RecordingSink {
    chunks: Mutex<Vec<EncodedChunk>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn chunks(&self) -> Vec<EncodedChunk> {
        self.chunks.lock().clone()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.chunks.lock().len()
    }
}

impl StreamSink for RecordingSink {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn write_chunk(&self, chunk: EncodedChunk) -> Result<(), CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::StreamClosed);
        }
        self.chunks.lock().push(chunk);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub(crate) fn sample_result() -> RecognitionResult {
    RecognitionResult {
        result_id: "result-1".into(),
        reason: ResultReason::RecognizedSpeech,
        text: "turn on the lights".into(),
        offset_ticks: 0,
        duration_ticks: 12_000_000,
    }
}

/// Scriptable connector that counts every call.
#[derive(Default)]
pub(crate) struct MockConnector {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    recognizes: AtomicUsize,
    stops: AtomicUsize,
    sent: Mutex<Vec<String>>,
    connect_error: Mutex<Option<TurnError>>,
    recognize_error: Mutex<Option<TurnError>>,
    stop_error_after_recognize: Mutex<Option<TurnError>>,
    send_error: Mutex<Option<TurnError>>,
    hold: AtomicBool,
    gate: Notify,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_connect(&self, err: TurnError) {
        *self.connect_error.lock() = Some(err);
    }

    pub(crate) fn fail_recognize(&self, err: TurnError) {
        *self.recognize_error.lock() = Some(err);
    }

    /// Stop calls succeed until a recognition has run, then fail with `err`.
    pub(crate) fn fail_stop_after_recognize(&self, err: TurnError) {
        *self.stop_error_after_recognize.lock() = Some(err);
    }

    pub(crate) fn fail_send(&self, err: TurnError) {
        *self.send_error.lock() = Some(err);
    }

    /// Make `recognize` wait for `release_recognize`.
    pub(crate) fn hold_recognize(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release_recognize(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn recognizes(&self) -> usize {
        self.recognizes.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_payloads(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.connects()
            + self.disconnects()
            + self.recognizes()
            + self.stops()
            + self.sent.lock().len()
    }
}

#[async_trait]
impl RecognitionConnector for MockConnector {
    async fn connect(&self) -> Result<(), TurnError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.connect_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> Result<(), TurnError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn recognize(&self, _mode: RecognitionMode) -> Result<RecognitionResult, TurnError> {
        self.recognizes.fetch_add(1, Ordering::SeqCst);
        if self.hold.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        match self.recognize_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(sample_result()),
        }
    }

    async fn stop_current_activity(&self) -> Result<(), TurnError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.recognizes() == 0 {
            return Ok(());
        }
        match self.stop_error_after_recognize.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn send_message(&self, payload: &str) -> Result<(), TurnError> {
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        self.sent.lock().push(payload.to_string());
        Ok(())
    }
}
