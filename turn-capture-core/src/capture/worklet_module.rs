use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use super::worklet_node::WorkletNode;
use crate::models::error::CaptureError;
use crate::traits::capture_host::FrameHandler;

/// Name the passthrough processor registers under.
pub const SPEECH_PROCESSOR: &str = "speech-processor";

const BUILTIN_SCHEME: &str = "builtin:";

/// A loadable worklet module: where it lives and which processor it registers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkletModule {
    url: String,
    processor_name: String,
}

impl WorkletModule {
    /// The built-in speech processor module, under a fresh unique URL.
    pub fn builtin() -> Self {
        Self {
            url: format!("{BUILTIN_SCHEME}{SPEECH_PROCESSOR}/{}", Uuid::new_v4().simple()),
            processor_name: SPEECH_PROCESSOR.to_string(),
        }
    }

    /// An externally hosted module. It must register `speech-processor`.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            processor_name: SPEECH_PROCESSOR.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    pub fn is_builtin(&self) -> bool {
        self.url.starts_with(BUILTIN_SCHEME)
    }
}

/// Code that runs inside a worklet's dedicated processing context.
pub trait WorkletProcessor: Send {
    /// Process one render quantum. Returning `false` retires the processor.
    fn process(&mut self, input: &[f32], output: &mut Vec<f32>, port: &MessagePort) -> bool;
}

/// Passthrough processor: copies input to output and forwards the raw input
/// frame to the host as one message.
#[derive(Debug, Default)]
pub struct SpeechProcessor;

impl WorkletProcessor for SpeechProcessor {
    fn process(&mut self, input: &[f32], output: &mut Vec<f32>, port: &MessagePort) -> bool {
        output.clear();
        output.extend_from_slice(input);
        port.post_message(input);
        true
    }
}

/// Host side of a worklet's message channel.
///
/// Each message is a flat array of samples for one input channel. Every
/// rebind of the owning node starts a new epoch. A message posted while the
/// worklet is still working on an earlier epoch is dropped, so audio never
/// crosses from one binding to the next.
#[derive(Default)]
pub struct MessagePort {
    binding: Mutex<Binding>,
    epoch: AtomicU64,
    posting: AtomicU64,
}

#[derive(Default)]
struct Binding {
    epoch: u64,
    handler: Option<FrameHandler>,
}

impl MessagePort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the message handler, replacing the previous one.
    pub fn set_handler(&self, handler: FrameHandler) {
        self.binding.lock().handler = Some(handler);
    }

    pub fn post_message(&self, data: &[f32]) {
        let mut binding = self.binding.lock();
        if binding.epoch != self.posting.load(Ordering::Acquire) {
            return;
        }
        if let Some(handler) = binding.handler.as_mut() {
            handler(data);
        }
    }

    /// Start a new epoch and return it.
    pub(crate) fn rebind(&self) -> u64 {
        let mut binding = self.binding.lock();
        binding.epoch += 1;
        self.epoch.store(binding.epoch, Ordering::Release);
        binding.epoch
    }

    /// Current epoch, readable without taking the handler lock.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Epoch of the frames the worklet is processing now.
    pub(crate) fn begin_epoch(&self, epoch: u64) {
        self.posting.store(epoch, Ordering::Release);
    }
}

pub type ProcessorFactory = Arc<dyn Fn() -> Box<dyn WorkletProcessor> + Send + Sync>;

/// Factory for the built-in passthrough processor.
pub fn speech_processor_factory() -> ProcessorFactory {
    Arc::new(|| Box::new(SpeechProcessor) as Box<dyn WorkletProcessor>)
}

/// Host-side registry of worklet modules and the processors they register.
///
/// The built-in module always loads. Other URLs load only if defined first
/// with `define_module`.
#[derive(Default)]
pub struct WorkletRegistry {
    available: Mutex<HashMap<String, (String, ProcessorFactory)>>,
    registered: Mutex<HashMap<String, ProcessorFactory>>,
}

impl WorkletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a module URL loadable.
    pub fn define_module(
        &self,
        url: impl Into<String>,
        processor_name: impl Into<String>,
        factory: ProcessorFactory,
    ) {
        self.available
            .lock()
            .insert(url.into(), (processor_name.into(), factory));
    }

    /// Load `module`, registering its processor.
    pub fn add_module(&self, module: &WorkletModule) -> Result<(), CaptureError> {
        let (name, factory) = if module.is_builtin() {
            (SPEECH_PROCESSOR.to_string(), speech_processor_factory())
        } else {
            self.available
                .lock()
                .get(module.url())
                .cloned()
                .ok_or_else(|| {
                    let message = format!("module not found: {}", module.url());
                    CaptureError::WorkletRegistrationFailed(message)
                })?
        };
        log::debug!("registered worklet processor '{}' from {}", name, module.url());
        self.registered.lock().insert(name, factory);
        Ok(())
    }

    pub fn is_registered(&self, processor_name: &str) -> bool {
        self.registered.lock().contains_key(processor_name)
    }

    /// Instantiate a registered processor on a new worklet node.
    pub fn create_node(&self, processor_name: &str) -> Result<WorkletNode, CaptureError> {
        let factory = self
            .registered
            .lock()
            .get(processor_name)
            .cloned()
            .ok_or_else(|| {
                let message = format!("processor not registered: {processor_name}");
                CaptureError::WorkletRegistrationFailed(message)
            })?;
        WorkletNode::spawn(processor_name, factory())
    }
}
