use std::sync::Arc;

use super::script_processor::create_script_processor;
use super::worklet_backend::{WorkletBackend, WorkletHandle};
use crate::models::config::WorkletModuleSetting;
use crate::models::error::CaptureError;
use crate::traits::capture_host::{CaptureHost, FrameHandler, ProcessorNode};

/// Which capture variant is delivering frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    ScriptProcessor,
    Worklet,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScriptProcessor => write!(f, "script-processor"),
            Self::Worklet => write!(f, "worklet"),
        }
    }
}

/// Backend selection policy.
///
/// The worklet path is tried only when it is not disabled, the host supports
/// it, and no earlier attempt on this recorder failed.
pub fn select_backend(
    setting: &WorkletModuleSetting,
    supports_worklet: bool,
    registration_failed: bool,
) -> BackendKind {
    if setting.is_ignore() || !supports_worklet || registration_failed {
        BackendKind::ScriptProcessor
    } else {
        BackendKind::Worklet
    }
}

/// A started-or-startable capture backend.
pub enum CaptureBackend {
    ScriptProcessor(Arc<dyn ProcessorNode>),
    Worklet(WorkletHandle),
}

impl CaptureBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::ScriptProcessor(_) => BackendKind::ScriptProcessor,
            Self::Worklet(_) => BackendKind::Worklet,
        }
    }

    /// The node the source should feed.
    pub fn node(&self) -> Arc<dyn ProcessorNode> {
        match self {
            Self::ScriptProcessor(node) => Arc::clone(node),
            Self::Worklet(handle) => Arc::clone(handle.node()),
        }
    }

    /// Bind `handler` (replacing any previous one) and connect to the destination.
    pub fn start(&self, handler: FrameHandler) -> Result<(), CaptureError> {
        let node = self.node();
        node.set_frame_handler(handler);
        node.connect_destination()
    }

    /// Disconnect from the destination and drop the bound handler.
    pub fn stop(&self) {
        let node = self.node();
        node.disconnect_destination();
        node.set_frame_handler(Box::new(|_| {}));
    }
}

/// Pick a backend and create its node, falling back to script processing
/// when the worklet path fails.
pub async fn start_backend(
    setting: &WorkletModuleSetting,
    host: &dyn CaptureHost,
    worklet: &mut WorkletBackend,
) -> Result<CaptureBackend, CaptureError> {
    match select_backend(setting, host.supports_worklet(), worklet.registration_failed()) {
        BackendKind::Worklet => match worklet.acquire(host).await {
            Ok(handle) => return Ok(CaptureBackend::Worklet(handle)),
            Err(err) => {
                log::warn!("worklet backend unavailable, falling back to script processor: {err}")
            }
        },
        BackendKind::ScriptProcessor => {}
    }
    create_script_processor(host).map(CaptureBackend::ScriptProcessor)
}
