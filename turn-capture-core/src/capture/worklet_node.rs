use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use super::worklet_module::{MessagePort, WorkletProcessor};
use crate::models::error::CaptureError;
use crate::traits::capture_host::{FrameHandler, ProcessorNode};

/// Frames per worklet render quantum.
pub const RENDER_QUANTUM_FRAMES: usize = 128;

/// Frames the real-time side may queue before new ones are dropped.
const INBOX_DEPTH: usize = 64;

/// Processing node backed by a dedicated processing thread.
///
/// The real-time callback only enqueues a copy of each frame (never blocks),
/// tagged with the port's current epoch. The worklet thread regroups samples
/// into render quanta, runs the processor on each, and the processor's
/// messages reach the bound handler through the node's `MessagePort`.
///
/// Connecting or disconnecting the destination starts a new epoch. Queued
/// frames and partial quanta from an older epoch are discarded, so a reused
/// node never carries audio from one binding into the next.
pub struct WorkletNode {
    processor_name: String,
    inbox: Option<Sender<(u64, Vec<f32>)>>,
    port: Arc<MessagePort>,
    connected: AtomicBool,
    worker: Option<thread::JoinHandle<()>>,
}

impl WorkletNode {
    pub fn spawn(
        processor_name: &str,
        processor: Box<dyn WorkletProcessor>,
    ) -> Result<Self, CaptureError> {
        let (tx, rx) = bounded(INBOX_DEPTH);
        let port = Arc::new(MessagePort::new());

        let worker = {
            let port = Arc::clone(&port);
            thread::Builder::new()
                .name(format!("worklet-{processor_name}"))
                .spawn(move || run_processor(rx, processor, &port))
                .map_err(|e| CaptureError::Unknown(format!("failed to spawn worklet thread: {e}")))?
        };

        Ok(Self {
            processor_name: processor_name.to_string(),
            inbox: Some(tx),
            port,
            connected: AtomicBool::new(false),
            worker: Some(worker),
        })
    }

    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    pub fn port(&self) -> &Arc<MessagePort> {
        &self.port
    }
}

fn run_processor(
    inbox: Receiver<(u64, Vec<f32>)>,
    mut processor: Box<dyn WorkletProcessor>,
    port: &MessagePort,
) {
    let mut pending: Vec<f32> = Vec::with_capacity(RENDER_QUANTUM_FRAMES * 4);
    let mut output: Vec<f32> = Vec::with_capacity(RENDER_QUANTUM_FRAMES);
    let mut current = 0;

    while let Ok((epoch, frame)) = inbox.recv() {
        if epoch != port.epoch() {
            continue;
        }
        if epoch != current {
            pending.clear();
            current = epoch;
            port.begin_epoch(epoch);
        }
        pending.extend_from_slice(&frame);

        let mut start = 0;
        while pending.len() - start >= RENDER_QUANTUM_FRAMES {
            let quantum = &pending[start..start + RENDER_QUANTUM_FRAMES];
            if !processor.process(quantum, &mut output, port) {
                log::debug!("worklet processor retired");
                return;
            }
            start += RENDER_QUANTUM_FRAMES;
        }
        pending.drain(..start);
    }
}

impl ProcessorNode for WorkletNode {
    fn process(&self, frame: &[f32]) {
        if !self.connected.load(Ordering::Acquire) {
            return;
        }
        let Some(inbox) = self.inbox.as_ref() else {
            return;
        };
        match inbox.try_send((self.port.epoch(), frame.to_vec())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("worklet '{}' inbox full; dropping frame", self.processor_name)
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn set_frame_handler(&self, handler: FrameHandler) {
        self.port.set_handler(handler);
    }

    fn connect_destination(&self) -> Result<(), CaptureError> {
        self.port.rebind();
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn disconnect_destination(&self) {
        self.connected.store(false, Ordering::Release);
        self.port.rebind();
    }
}

impl Drop for WorkletNode {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
        // Closing the inbox ends the worklet thread.
        self.inbox.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("worklet thread '{}' panicked", self.processor_name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::capture::worklet_module::SpeechProcessor;
    use crate::test_support::wait_until;

    #[test]
    fn posts_one_message_per_render_quantum() {
        let node = WorkletNode::spawn("speech-processor", Box::new(SpeechProcessor)).unwrap();
        let messages = Arc::new(Mutex::new(Vec::<Vec<f32>>::new()));
        let sink = Arc::clone(&messages);
        node.set_frame_handler(Box::new(move |data| sink.lock().push(data.to_vec())));
        node.connect_destination().unwrap();

        let frame: Vec<f32> = (0..300).map(|i| i as f32).collect();
        node.process(&frame);

        assert!(wait_until(|| messages.lock().len() == 2));
        let messages = messages.lock();
        assert!(messages.iter().all(|m| m.len() == RENDER_QUANTUM_FRAMES));
        assert_eq!(messages[1][0], 128.0);
    }

    #[test]
    fn disconnected_node_posts_nothing() {
        let node = WorkletNode::spawn("speech-processor", Box::new(SpeechProcessor)).unwrap();
        let count = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&count);
        node.set_frame_handler(Box::new(move |_| *counter.lock() += 1));

        node.process(&[0.0; 512]);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn reconnect_discards_partial_quantum() {
        let node = WorkletNode::spawn("speech-processor", Box::new(SpeechProcessor)).unwrap();
        let messages = Arc::new(Mutex::new(Vec::<Vec<f32>>::new()));
        let sink = Arc::clone(&messages);
        node.set_frame_handler(Box::new(move |data| sink.lock().push(data.to_vec())));
        node.connect_destination().unwrap();
        node.process(&[0.9; 100]);
        thread::sleep(Duration::from_millis(20));

        node.disconnect_destination();
        node.connect_destination().unwrap();
        node.process(&[0.0; 128]);

        assert!(wait_until(|| messages.lock().len() == 1));
        thread::sleep(Duration::from_millis(20));
        let messages = messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn drop_joins_worker() {
        let node = WorkletNode::spawn("speech-processor", Box::new(SpeechProcessor)).unwrap();
        node.connect_destination().unwrap();
        node.process(&[0.0; 256]);
        drop(node);
    }
}
