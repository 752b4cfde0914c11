pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod mqtt;
pub mod session;

pub use audio::{AudioManager, AudioPort, CueFile, WakeFeed};
pub use config::Config;
pub use engine::{Synthesizer, Transcriber, Transcription, VoiceParams, WakeWordDetector};
pub use error::{RelayError, Result};
pub use mqtt::{
    CommandMessage, ConnectionState, InboundMessage, MqttClient, RelayTransport, ResponseMessage,
};
pub use session::{PipelineStage, RelaySession, SessionConfig, StatsSnapshot};
