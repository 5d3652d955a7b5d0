use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::processing::sample_rate_converter::TARGET_SAMPLE_RATE;
use crate::traits::capture_host::{CaptureHost, FrameHandler, ProcessorNode};

pub const MIN_BUFFER_SIZE: usize = 2048;
pub const MAX_BUFFER_SIZE: usize = 16384;

/// Block size used when the host cannot negotiate one.
///
/// Starts at `MIN_BUFFER_SIZE` and doubles, halving a working rate estimate,
/// while the estimate still covers twice the target rate.
pub fn fallback_buffer_size(device_rate: u32, target_rate: u32) -> usize {
    let mut buffer_size = MIN_BUFFER_SIZE;
    let mut rate = device_rate;
    while buffer_size < MAX_BUFFER_SIZE && rate >= 2 * target_rate {
        buffer_size <<= 1;
        rate >>= 1;
    }
    buffer_size
}

/// Create a script-processing node, negotiating the buffer size when the host can.
pub fn create_script_processor(
    host: &dyn CaptureHost,
) -> Result<Arc<dyn ProcessorNode>, CaptureError> {
    match host.create_script_processor(0) {
        Ok(node) => Ok(node),
        Err(err) => {
            let buffer_size = fallback_buffer_size(host.sample_rate(), TARGET_SAMPLE_RATE);
            log::debug!("automatic buffer size rejected ({err}); using {buffer_size}");
            host.create_script_processor(buffer_size)
                .map_err(|e| CaptureError::ProcessorStartFailed(e.to_string()))
        }
    }
}

struct ScriptState {
    block: Vec<f32>,
    handler: Option<FrameHandler>,
}

/// Processing node that runs its handler inline on the delivering thread.
///
/// Frames are regrouped into blocks of exactly `buffer_size` samples; each
/// full block is handed to the handler before `process` returns.
pub struct ScriptProcessorNode {
    buffer_size: usize,
    state: Mutex<ScriptState>,
    connected: AtomicBool,
}

impl ScriptProcessorNode {
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            buffer_size,
            state: Mutex::new(ScriptState {
                block: Vec::with_capacity(buffer_size),
                handler: None,
            }),
            connected: AtomicBool::new(false),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl ProcessorNode for ScriptProcessorNode {
    fn process(&self, frame: &[f32]) {
        if !self.connected.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.state.lock();
        let ScriptState { block, handler } = &mut *state;
        let mut rest = frame;
        while !rest.is_empty() {
            let take = (self.buffer_size - block.len()).min(rest.len());
            block.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if block.len() == self.buffer_size {
                if let Some(handler) = handler.as_mut() {
                    handler(block.as_slice());
                }
                block.clear();
            }
        }
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        let mut state = self.state.lock();
        state.block.clear();
        state.handler = Some(handler);
    }

    fn connect_destination(&self) -> Result<(), CaptureError> {
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn disconnect_destination(&self) {
        self.connected.store(false, Ordering::Release);
        self.state.lock().block.clear();
    }
}
