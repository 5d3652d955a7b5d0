use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::events::{EventHub, EventPublisher};
use crate::models::config::TurnConfig;
use crate::models::error::TurnError;
use crate::models::recognition::{RecognitionResult, TurnEvent};
use crate::models::state::TurnState;
use crate::traits::connector::RecognitionConnector;

struct TurnInner<C> {
    connector: C,
    config: TurnConfig,
    state: Mutex<TurnState>,
    disposed: AtomicBool,
    events: EventHub,
}

/// Single-utterance turn orchestration over an injected connector.
///
/// A turn runs connect → stop any prior activity → recognize → stop, and
/// ends in exactly one of the caller's two callbacks. Turns run on the
/// current tokio runtime; at most one is in flight at a time.
pub struct TurnController<C: RecognitionConnector> {
    inner: Arc<TurnInner<C>>,
}

impl<C: RecognitionConnector> Clone for TurnController<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RecognitionConnector> TurnController<C> {
    pub fn new(connector: C) -> Self {
        let config = TurnConfig::default();
        Self {
            inner: Arc::new(TurnInner {
                connector,
                events: EventHub::new(config.event_capacity),
                config,
                state: Mutex::new(TurnState::Idle),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_config(connector: C, config: TurnConfig) -> Result<Self, TurnError> {
        config.validate().map_err(TurnError::Setup)?;
        Ok(Self {
            inner: Arc::new(TurnInner {
                connector,
                events: EventHub::new(config.event_capacity),
                config,
                state: Mutex::new(TurnState::Idle),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    pub fn state(&self) -> TurnState {
        *self.inner.state.lock()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.inner.events.subscribe()
    }

    pub fn publisher(&self) -> EventPublisher {
        self.inner.events.publisher()
    }

    /// Start one turn.
    ///
    /// Returns `None` without invoking either callback when a turn is already
    /// in flight. When the controller is disposed, or no tokio runtime is
    /// available, `on_error` is invoked before returning and `None` is
    /// returned. Otherwise the turn runs on a spawned task whose handle is
    /// returned; exactly one callback fires when it finishes.
    pub fn listen_once<R, E>(&self, on_result: R, on_error: E) -> Option<JoinHandle<()>>
    where
        R: FnOnce(RecognitionResult) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        if self.is_disposed() {
            on_error(TurnError::Disposed.describe());
            return None;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                on_error(TurnError::Setup(err.to_string()).describe());
                // Without a runtime the async stop and disconnect cannot run,
                // so this marks the controller disposed without tearing down
                // the connection. The owner still has to drop the connector.
                self.inner.disposed.store(true, Ordering::Release);
                return None;
            }
        };
        {
            let mut state = self.inner.state.lock();
            if state.is_in_flight() {
                log::debug!("turn already in flight; ignoring listen_once");
                return None;
            }
            *state = TurnState::InFlight;
        }

        let inner = Arc::clone(&self.inner);
        Some(runtime.spawn(async move { inner.run_turn(on_result, on_error).await }))
    }

    pub async fn connect(&self) -> Result<(), TurnError> {
        self.ensure_not_disposed()?;
        self.inner.connector.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), TurnError> {
        self.ensure_not_disposed()?;
        self.inner.connector.disconnect().await
    }

    /// Dispose, failing if that already happened.
    pub async fn close(&self) -> Result<(), TurnError> {
        self.ensure_not_disposed()?;
        self.inner.dispose().await;
        Ok(())
    }

    /// Stop any in-flight recognition and disconnect. Idempotent.
    pub async fn dispose(&self) {
        self.inner.dispose().await;
    }

    /// Forward an application payload through the connection.
    ///
    /// Independent of the turn state. Panics raised by either callback are
    /// caught and discarded.
    pub fn send_activity<S, F>(
        &self,
        payload: impl Into<String>,
        on_sent: S,
        on_error: F,
    ) -> Option<JoinHandle<()>>
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        if self.is_disposed() {
            swallow_panics(move || on_error(TurnError::Disposed.describe()));
            return None;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                swallow_panics(move || on_error(TurnError::Send(err.to_string()).to_string()));
                return None;
            }
        };

        let payload = payload.into();
        let inner = Arc::clone(&self.inner);
        Some(runtime.spawn(async move {
            match inner.connector.send_message(&payload).await {
                Ok(()) => swallow_panics(on_sent),
                Err(err) => swallow_panics(move || on_error(err.to_string())),
            }
        }))
    }

    fn ensure_not_disposed(&self) -> Result<(), TurnError> {
        if self.is_disposed() {
            Err(TurnError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<C: RecognitionConnector> TurnInner<C> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn set_state(&self, state: TurnState) {
        *self.state.lock() = state;
    }

    async fn run_turn<R, E>(&self, on_result: R, on_error: E)
    where
        R: FnOnce(RecognitionResult) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        let turn_id = Uuid::new_v4();
        log::debug!("turn {turn_id} started");

        if let Err(err) = self.prepare().await {
            self.set_state(TurnState::Idle);
            if err.is_fatal() {
                log::error!("turn {turn_id} setup failed: {}", err.describe());
                on_error(err.describe());
                self.dispose().await;
            } else {
                log::warn!("turn {turn_id} failed to start: {err}");
                on_error(err.to_string());
            }
            return;
        }

        match self.connector.recognize(self.config.recognition_mode).await {
            Ok(result) => match self.connector.stop_current_activity().await {
                Ok(()) => {
                    self.set_state(TurnState::Idle);
                    log::debug!("turn {turn_id} completed");
                    on_result(result);
                }
                Err(err) => {
                    self.set_state(TurnState::Idle);
                    log::warn!("turn {turn_id} could not stop after result: {err}");
                    on_error(err.to_string());
                }
            },
            Err(err) => {
                if let Err(stop_err) = self.connector.stop_current_activity().await {
                    log::debug!("turn {turn_id} stop after failure also failed: {stop_err}");
                }
                self.set_state(TurnState::Idle);
                log::warn!("turn {turn_id} failed: {err}");
                on_error(err.to_string());
            }
        }
    }

    async fn prepare(&self) -> Result<(), TurnError> {
        self.connector.connect().await?;
        self.connector.stop_current_activity().await?;
        if self.is_disposed() {
            return Err(TurnError::Disposed);
        }
        Ok(())
    }

    async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.connector.stop_current_activity().await {
            log::debug!("stop during dispose failed: {err}");
        }
        if let Err(err) = self.connector.disconnect().await {
            log::debug!("disconnect during dispose failed: {err}");
        }
        self.set_state(TurnState::Idle);
        log::info!("turn controller disposed");
    }
}

fn swallow_panics(callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::debug!("activity callback panicked; ignored");
    }
}
