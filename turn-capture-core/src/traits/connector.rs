use async_trait::async_trait;

use crate::models::error::TurnError;
use crate::models::recognition::{RecognitionMode, RecognitionResult};

/// Connection/recognition collaborator driven by the `TurnController`.
///
/// The transport behind it owns the wire protocol and starts/stops audio
/// capture through its own lifecycle hooks (see `MicrophoneSource`).
#[async_trait]
pub trait RecognitionConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), TurnError>;

    async fn disconnect(&self) -> Result<(), TurnError>;

    /// Run one recognition and resolve with its result or failure.
    async fn recognize(&self, mode: RecognitionMode) -> Result<RecognitionResult, TurnError>;

    /// Stop whatever recognition activity is running. Succeeds when idle.
    async fn stop_current_activity(&self) -> Result<(), TurnError>;

    async fn send_message(&self, payload: &str) -> Result<(), TurnError>;
}
