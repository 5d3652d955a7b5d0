use thiserror::Error;

/// Errors raised by the capture domain (device, graph, backends, sink).
///
/// None of these ever cross the real-time boundary: a frame that cannot be
/// encoded or written is dropped and logged. They surface only from setup
/// calls such as `Recorder::record`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("input tracks already stopped")]
    InputStopped,

    #[error("unsupported buffer size: {0}")]
    UnsupportedBufferSize(usize),

    #[error("capture graph setup failed: {0}")]
    GraphSetupFailed(String),

    #[error("worklet registration failed: {0}")]
    WorkletRegistrationFailed(String),

    #[error("Unable to start audio worklet node for recorder: {0}")]
    ProcessorStartFailed(String),

    #[error("stream closed")]
    StreamClosed,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Errors surfaced by a turn, always through the caller's error callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("the connector has been disposed")]
    Disposed,

    #[error("{0}")]
    Setup(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Recognition(String),

    #[error("{0}")]
    Send(String),
}

impl TurnError {
    /// Stable kind name used when formatting structured errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disposed => "ObjectDisposedError",
            Self::Setup(_) => "SetupError",
            Self::Connection(_) => "ConnectionError",
            Self::Recognition(_) => "RecognitionError",
            Self::Send(_) => "SendError",
        }
    }

    /// `"<Kind>: <message>"`.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }

    /// Setup and disposed-use failures tear down the whole controller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disposed | Self::Setup(_))
    }
}

impl From<CaptureError> for TurnError {
    fn from(error: CaptureError) -> Self {
        Self::Setup(error.to_string())
    }
}
