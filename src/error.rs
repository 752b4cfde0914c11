use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur in the voice relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Broker connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Inbound payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Payload exceeds the configured maximum size
    #[error("payload too large: {size} bytes (max {max})")]
    OversizedPayload { size: usize, max: usize },

    /// Audio capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Capture window produced no usable audio
    #[error("capture window produced no audio data")]
    EmptyCapture,

    /// Capture duration outside the allowed range
    #[error("invalid capture duration: {0}s")]
    InvalidDuration(f64),

    /// Wake word detector error
    #[error("wake word error: {0}")]
    WakeWord(String),

    /// Transcription engine error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
