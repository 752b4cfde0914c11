use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command message published to the automation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    pub text: String,
    /// Capture time as epoch seconds
    pub timestamp: f64,
}

impl CommandMessage {
    pub fn new(text: String) -> Self {
        Self {
            text,
            timestamp: epoch_seconds(),
        }
    }
}

/// Response message received from the automation engine.
///
/// Fields other than `tts_text` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub tts_text: Option<String>,
}

/// A decoded inbound message delivered from the network loop
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Value,
}

/// Current time as fractional epoch seconds
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
