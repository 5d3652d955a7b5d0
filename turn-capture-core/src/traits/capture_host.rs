use std::sync::Arc;

use async_trait::async_trait;

use crate::capture::worklet_module::WorkletModule;
use crate::models::error::CaptureError;

/// Handler invoked with one mono frame of device-rate samples.
///
/// Runs in the real-time domain (device callback or worklet thread): it must
/// not block.
pub type FrameHandler = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// The underlying device stream (its tracks are the live capture).
pub trait InputStream: Send + Sync {
    /// Identifier of the device backing this stream.
    fn device_id(&self) -> &str;

    /// Stop every track. Idempotent.
    fn stop_tracks(&self);

    fn is_stopped(&self) -> bool;
}

/// Node that pulls frames out of an `InputStream`.
pub trait SourceNode: Send {
    /// Route channel-0 frames into `node`.
    fn connect(&mut self, node: Arc<dyn ProcessorNode>) -> Result<(), CaptureError>;

    /// Stop routing frames. Idempotent.
    fn disconnect(&mut self);
}

/// Processing node between a source and the destination.
pub trait ProcessorNode: Send + Sync {
    /// Deliver one frame from the source. Called in the real-time domain.
    fn process(&self, frame: &[f32]);

    /// Bind the handler, replacing any previous one.
    fn set_frame_handler(&self, handler: FrameHandler);

    fn connect_destination(&self) -> Result<(), CaptureError>;

    /// A node disconnected from the destination drops every frame it receives.
    fn disconnect_destination(&self);
}

/// Platform audio graph: device streams, nodes and worklet modules.
///
/// Implemented by:
/// - `CpalCaptureHost` (turn-capture-cpal)
/// - in-crate mocks for tests
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Native rate of delivered frames.
    fn sample_rate(&self) -> u32;

    fn supports_worklet(&self) -> bool;

    /// Open the device stream for `device` (default device when `None`).
    fn open_input(&self, device: Option<&str>) -> Result<Arc<dyn InputStream>, CaptureError>;

    fn create_source(
        &self,
        stream: Arc<dyn InputStream>,
    ) -> Result<Box<dyn SourceNode>, CaptureError>;

    /// Create a script-processing node. `buffer_size == 0` asks the host to
    /// negotiate one and fails with `UnsupportedBufferSize(0)` when it cannot.
    fn create_script_processor(
        &self,
        buffer_size: usize,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError>;

    /// Load a worklet module. Until this resolves no worklet node can be created.
    async fn add_worklet_module(&self, module: &WorkletModule) -> Result<(), CaptureError>;

    fn create_worklet_node(
        &self,
        processor_name: &str,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError>;
}
