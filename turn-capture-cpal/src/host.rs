//! `CaptureHost` over a cpal input device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use cpal::traits::DeviceTrait;
use cpal::{
    SampleFormat, SampleRate, SupportedBufferSize, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use parking_lot::Mutex;

use turn_capture_core::capture::script_processor::{
    ScriptProcessorNode, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
use turn_capture_core::capture::worklet_module::{WorkletModule, WorkletRegistry};
use turn_capture_core::models::error::CaptureError;
use turn_capture_core::traits::capture_host::{CaptureHost, InputStream, ProcessorNode, SourceNode};

use crate::devices::find_input_device;
use crate::input::CpalInput;
use crate::source::CpalSource;

/// Capture host backed by one cpal input device.
///
/// Worklets run on dedicated threads, so they are always supported. Buffer
/// sizes can be negotiated only when the device reports a range.
pub struct CpalCaptureHost {
    device: Mutex<cpal::Device>,
    device_name: String,
    config: cpal::SupportedStreamConfig,
    registry: WorkletRegistry,
    inputs: Mutex<HashMap<String, Weak<CpalInput>>>,
    next_input: AtomicU64,
}

impl CpalCaptureHost {
    /// Use the named input device, or the default one.
    pub fn new(preferred_device: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = find_input_device(&host, preferred_device)?;
        let device_name = device.name().unwrap_or_else(|_| "Default Input".into());
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::GraphSetupFailed(format!("no default input config: {e}")))?;

        log::info!(
            "capture host on {device_name}: {} Hz, {} channels, {:?}",
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        Ok(Self {
            device: Mutex::new(device),
            device_name,
            config,
            registry: WorkletRegistry::new(),
            inputs: Mutex::new(HashMap::new()),
            next_input: AtomicU64::new(1),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Registry used to define URL-loaded worklet modules.
    pub fn registry(&self) -> &WorkletRegistry {
        &self.registry
    }

    fn lookup_input(&self, id: &str) -> Option<Arc<CpalInput>> {
        let mut inputs = self.inputs.lock();
        inputs.retain(|_, input| input.strong_count() > 0);
        inputs.get(id).and_then(Weak::upgrade)
    }
}

/// Script-processor block size the device can honor, if it reports a range.
pub(crate) fn negotiated_buffer_size(supported: &SupportedBufferSize) -> Option<usize> {
    match supported {
        SupportedBufferSize::Range { min, max } => {
            let (min, max) = (*min as usize, *max as usize);
            Some(MIN_BUFFER_SIZE.clamp(min.min(max), max).min(MAX_BUFFER_SIZE))
        }
        SupportedBufferSize::Unknown => None,
    }
}

/// A config for another device that delivers frames at the host's rate.
///
/// Frames are encoded from the host rate, so a device that cannot run at it
/// is rejected. Ranges in the preferred sample format win.
pub(crate) fn config_at_rate(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    rate: SampleRate,
    preferred: SampleFormat,
) -> Option<SupportedStreamConfig> {
    let mut candidates: Vec<_> = ranges
        .into_iter()
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .filter(|r| {
            matches!(
                r.sample_format(),
                SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
            )
        })
        .collect();
    candidates.sort_by_key(|r| r.sample_format() != preferred);
    candidates.into_iter().next().map(|r| r.with_sample_rate(rate))
}

#[async_trait]
impl CaptureHost for CpalCaptureHost {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    fn supports_worklet(&self) -> bool {
        true
    }

    fn open_input(&self, device: Option<&str>) -> Result<Arc<dyn InputStream>, CaptureError> {
        let (device, config) = match device.filter(|name| *name != self.device_name) {
            None => (self.device.lock().clone(), self.config.clone()),
            Some(name) => {
                let device = find_input_device(&cpal::default_host(), Some(name))?;
                let ranges = device
                    .supported_input_configs()
                    .map_err(|e| {
                        CaptureError::GraphSetupFailed(format!("{name}: no input configs: {e}"))
                    })?;
                let rate = self.config.sample_rate();
                let config = config_at_rate(ranges, rate, self.config.sample_format())
                    .ok_or_else(|| {
                        let message = format!("{name} cannot capture at {} Hz", rate.0);
                        CaptureError::GraphSetupFailed(message)
                    })?;
                (device, config)
            }
        };

        let name = device.name().unwrap_or_else(|_| self.device_name.clone());
        let id = format!("{name}#{}", self.next_input.fetch_add(1, Ordering::Relaxed));
        let input = CpalInput::open(id.clone(), device, config)?;
        self.inputs.lock().insert(id, Arc::downgrade(&input));
        Ok(input)
    }

    fn create_source(
        &self,
        stream: Arc<dyn InputStream>,
    ) -> Result<Box<dyn SourceNode>, CaptureError> {
        if stream.is_stopped() {
            return Err(CaptureError::InputStopped);
        }
        let input = self.lookup_input(stream.device_id()).ok_or_else(|| {
            CaptureError::GraphSetupFailed(format!(
                "{} was not opened by this host",
                stream.device_id()
            ))
        })?;
        Ok(Box::new(CpalSource::new(input)))
    }

    fn create_script_processor(
        &self,
        buffer_size: usize,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError> {
        let size = match buffer_size {
            0 => negotiated_buffer_size(self.config.buffer_size())
                .ok_or(CaptureError::UnsupportedBufferSize(0))?,
            n if n.is_power_of_two() && (MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&n) => n,
            n => return Err(CaptureError::UnsupportedBufferSize(n)),
        };
        log::debug!("script processor with {size}-frame blocks");
        Ok(Arc::new(ScriptProcessorNode::new(size)))
    }

    async fn add_worklet_module(&self, module: &WorkletModule) -> Result<(), CaptureError> {
        self.registry.add_module(module)
    }

    fn create_worklet_node(
        &self,
        processor_name: &str,
    ) -> Result<Arc<dyn ProcessorNode>, CaptureError> {
        Ok(Arc::new(self.registry.create_node(processor_name)?))
    }
}
