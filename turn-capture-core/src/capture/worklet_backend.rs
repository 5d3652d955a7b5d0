use std::sync::Arc;

use super::worklet_module::WorkletModule;
use crate::models::config::WorkletModuleSetting;
use crate::models::error::CaptureError;
use crate::traits::capture_host::{CaptureHost, ProcessorNode};

/// Reusable reference to an instantiated worklet node.
///
/// Each reconnection produces a new handle value with a bumped generation;
/// the previous value is replaced, never mutated.
#[derive(Clone)]
pub struct WorkletHandle {
    node: Arc<dyn ProcessorNode>,
    generation: u64,
}

impl WorkletHandle {
    pub fn new(node: Arc<dyn ProcessorNode>) -> Self {
        Self { node, generation: 0 }
    }

    /// Handle for the same node, rebound to a new source.
    pub fn rebound(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            generation: self.generation + 1,
        }
    }

    pub fn node(&self) -> &Arc<dyn ProcessorNode> {
        &self.node
    }

    /// Number of times this node has been rebound.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    NotAttempted,
    Registered,
    Failed,
}

/// Per-recorder worklet state: the module, its registration outcome, and
/// the lazily created node.
pub struct WorkletBackend {
    module: Option<WorkletModule>,
    registration: Registration,
    handle: Option<WorkletHandle>,
}

impl WorkletBackend {
    pub fn new(setting: &WorkletModuleSetting) -> Self {
        let module = match setting {
            WorkletModuleSetting::Url(url) => Some(WorkletModule::from_url(url.clone())),
            WorkletModuleSetting::Builtin | WorkletModuleSetting::Ignore => None,
        };
        Self {
            module,
            registration: Registration::NotAttempted,
            handle: None,
        }
    }

    /// Point at a different module. Discards the node and the cached registration.
    pub fn set_module_url(&mut self, url: impl Into<String>) {
        self.module = Some(WorkletModule::from_url(url));
        self.registration = Registration::NotAttempted;
        self.handle = None;
    }

    pub fn module(&self) -> Option<&WorkletModule> {
        self.module.as_ref()
    }

    /// Whether registration or instantiation has already failed.
    pub fn registration_failed(&self) -> bool {
        self.registration == Registration::Failed
    }

    pub fn handle(&self) -> Option<&WorkletHandle> {
        self.handle.as_ref()
    }

    /// Return a handle ready to be bound to a new source.
    ///
    /// Registers the module on first use. Any failure is remembered, and
    /// later calls fail fast without touching the host.
    pub async fn acquire(&mut self, host: &dyn CaptureHost) -> Result<WorkletHandle, CaptureError> {
        if let Some(handle) = self.handle.take() {
            let rebound = handle.rebound();
            self.handle = Some(rebound.clone());
            return Ok(rebound);
        }
        if self.registration == Registration::Failed {
            return Err(CaptureError::WorkletRegistrationFailed(
                "previous registration failed".into(),
            ));
        }

        let module = self.module.get_or_insert_with(WorkletModule::builtin).clone();
        if self.registration == Registration::NotAttempted {
            if let Err(err) = host.add_worklet_module(&module).await {
                self.registration = Registration::Failed;
                return Err(err);
            }
            self.registration = Registration::Registered;
        }

        match host.create_worklet_node(module.processor_name()) {
            Ok(node) => {
                let handle = WorkletHandle::new(node);
                self.handle = Some(handle.clone());
                Ok(handle)
            }
            Err(err) => {
                self.registration = Registration::Failed;
                Err(err)
            }
        }
    }
}
