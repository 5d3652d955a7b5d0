use serde::{Deserialize, Serialize};

/// Recognition mode requested from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionMode {
    Interactive,
    Conversation,
    Dictation,
}

/// Why a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultReason {
    RecognizingSpeech,
    RecognizedSpeech,
    NoMatch,
    Canceled,
}

/// Result handed to the caller when a turn completes.
///
/// Offsets and durations are in 100-nanosecond ticks, as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub result_id: String,
    pub reason: ResultReason,
    pub text: String,
    pub offset_ticks: u64,
    pub duration_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    Error,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationErrorCode {
    NoError,
    AuthenticationFailure,
    BadRequest,
    TooManyRequests,
    Forbidden,
    ConnectionFailure,
    ServiceTimeout,
    ServiceError,
    ServiceUnavailable,
    RuntimeError,
}

/// Payload of a canceled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    pub error_code: CancellationErrorCode,
    pub error_details: String,
    pub session_id: Option<String>,
}

impl CancellationDetails {
    pub fn end_of_stream() -> Self {
        Self {
            reason: CancellationReason::EndOfStream,
            error_code: CancellationErrorCode::NoError,
            error_details: String::new(),
            session_id: None,
        }
    }

    pub fn error(code: CancellationErrorCode, details: impl Into<String>) -> Self {
        Self {
            reason: CancellationReason::Error,
            error_code: code,
            error_details: details.into(),
            session_id: None,
        }
    }
}

/// Events published by the transport while a connector is alive.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Intermediate hypothesis.
    Recognizing(RecognitionResult),
    /// Final result of an utterance.
    Recognized(RecognitionResult),
    Canceled(CancellationDetails),
    /// Opaque application payload from the service.
    ActivityReceived(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_serializes_to_json() {
        let result = RecognitionResult {
            result_id: "r1".into(),
            reason: ResultReason::RecognizedSpeech,
            text: "hello".into(),
            offset_ticks: 0,
            duration_ticks: 10_000_000,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["reason"], "recognized_speech");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn cancellation_constructors() {
        let eos = CancellationDetails::end_of_stream();
        assert_eq!(eos.reason, CancellationReason::EndOfStream);
        assert_eq!(eos.error_code, CancellationErrorCode::NoError);

        let err = CancellationDetails::error(CancellationErrorCode::ConnectionFailure, "closed");
        assert_eq!(err.reason, CancellationReason::Error);
        assert_eq!(err.error_details, "closed");
    }

    #[test]
    fn mode_deserializes_lowercase() {
        let mode: RecognitionMode = serde_json::from_str("\"dictation\"").unwrap();
        assert_eq!(mode, RecognitionMode::Dictation);
    }
}
