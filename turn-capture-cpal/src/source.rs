use std::sync::Arc;

use turn_capture_core::models::error::CaptureError;
use turn_capture_core::traits::capture_host::{InputStream, ProcessorNode, SourceNode};

use crate::input::{CpalInput, Route};

/// Routes a `CpalInput` into one processor node.
pub struct CpalSource {
    input: Arc<CpalInput>,
    node: Option<Arc<dyn ProcessorNode>>,
}

impl CpalSource {
    pub(crate) fn new(input: Arc<CpalInput>) -> Self {
        Self { input, node: None }
    }

    fn route(&self) -> &Route {
        self.input.route()
    }
}

impl SourceNode for CpalSource {
    fn connect(&mut self, node: Arc<dyn ProcessorNode>) -> Result<(), CaptureError> {
        if self.input.is_stopped() {
            return Err(CaptureError::InputStopped);
        }
        *self.route().lock() = Some(Arc::clone(&node));
        self.node = Some(node);
        Ok(())
    }

    fn disconnect(&mut self) {
        let Some(node) = self.node.take() else {
            return;
        };
        let mut route = self.route().lock();
        // Another source may have taken over the input since.
        if route.as_ref().is_some_and(|current| Arc::ptr_eq(current, &node)) {
            route.take();
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
