//! Device input stream: a cpal stream owned by a dedicated thread.
//!
//! cpal streams are not `Send`, so the stream is built, played and dropped on
//! the thread that owns it. Stopping the tracks signals that thread and joins it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

use turn_capture_core::models::error::CaptureError;
use turn_capture_core::traits::capture_host::{InputStream, ProcessorNode};

/// Processor node currently fed by the device, if any.
pub(crate) type Route = Arc<Mutex<Option<Arc<dyn ProcessorNode>>>>;

/// A live cpal input stream.
pub struct CpalInput {
    id: String,
    route: Route,
    stopped: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalInput {
    /// Build and start a stream for `device` on its own thread.
    pub(crate) fn open(
        id: String,
        device: cpal::Device,
        config: cpal::SupportedStreamConfig,
    ) -> Result<Arc<Self>, CaptureError> {
        let route: Route = Arc::new(Mutex::new(None));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);

        let worker = {
            let route = Arc::clone(&route);
            thread::Builder::new()
                .name(format!("cpal-input-{id}"))
                .spawn(move || {
                    let stream = match build_stream(&device, &config, route) {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    if let Err(e) = stream.play() {
                        let _ = ready_tx.send(Err(CaptureError::GraphSetupFailed(format!(
                            "failed to start input stream: {e}"
                        ))));
                        return;
                    }
                    let _ = ready_tx.send(Ok(()));
                    // Either a stop signal or a dropped sender ends the stream.
                    let _ = stop_rx.recv();
                    drop(stream);
                })
                .map_err(|e| CaptureError::Unknown(format!("failed to spawn input thread: {e}")))?
        };

        let started = ready_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::Unknown("input thread exited during setup".into()))
        });
        if let Err(e) = started {
            let _ = worker.join();
            return Err(e);
        }

        log::info!("input stream {id} started");
        Ok(Arc::new(Self {
            id,
            route,
            stopped: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
        }))
    }

    pub(crate) fn route(&self) -> &Route {
        &self.route
    }
}

impl InputStream for CpalInput {
    fn device_id(&self) -> &str {
        &self.id
    }

    fn stop_tracks(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.route.lock().take();
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                log::error!("input thread for {} panicked", self.id);
            }
        }
        log::info!("input stream {} stopped", self.id);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    route: Route,
) -> Result<cpal::Stream, CaptureError> {
    match config.sample_format() {
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, route),
        SampleFormat::I16 => build_stream_typed::<i16>(device, config, route),
        SampleFormat::U16 => build_stream_typed::<u16>(device, config, route),
        other => Err(CaptureError::GraphSetupFailed(format!(
            "unsupported sample format: {other:?}"
        ))),
    }
}

fn build_stream_typed<T>(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    route: Route,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels());
    let mut frame: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            &config.config(),
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let node = route.lock().clone();
                if let Some(node) = node {
                    frame.clear();
                    channel_zero(data, channels, &mut frame);
                    node.process(&frame);
                }
            },
            |err| log::error!("input stream error: {err}"),
            None,
        )
        .map_err(|e| CaptureError::GraphSetupFailed(format!("failed to build input stream: {e}")))
}

/// Append channel 0 of interleaved `data` to `out` as f32.
pub(crate) fn channel_zero<T>(data: &[T], channels: usize, out: &mut Vec<f32>)
where
    T: Sample,
    f32: FromSample<T>,
{
    out.extend(data.iter().step_by(channels.max(1)).map(|&s| f32::from_sample(s)));
}
