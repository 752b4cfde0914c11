use std::path::PathBuf;

use crate::config::Config;
use crate::engine::VoiceParams;

/// Configuration for a relay session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub commands_topic: String,
    pub responses_topic: String,
    pub qos: u8,

    /// Capture window after wake detection, in seconds
    pub record_seconds: f64,
    pub sample_rate: u32,

    /// Command/response text beyond this many characters is truncated
    pub max_text_length: usize,

    pub start_cue: Option<PathBuf>,
    pub end_cue: Option<PathBuf>,

    pub voice: VoiceParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            commands_topic: "voice/commands/text".to_string(),
            responses_topic: "voice/responses/text".to_string(),
            qos: 0,
            record_seconds: 6.0,
            sample_rate: 16000,
            max_text_length: 500,
            start_cue: None,
            end_cue: None,
            voice: VoiceParams::default(),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            commands_topic: cfg.topics.commands.clone(),
            responses_topic: cfg.topics.responses.clone(),
            qos: cfg.topics.qos,
            record_seconds: cfg.audio.record_seconds,
            sample_rate: cfg.audio.sample_rate,
            max_text_length: cfg.limits.max_text_length,
            start_cue: cfg.audio.start_cue.as_ref().map(PathBuf::from),
            end_cue: cfg.audio.end_cue.as_ref().map(PathBuf::from),
            voice: VoiceParams {
                rate: cfg.engines.tts.rate,
                volume: cfg.engines.tts.volume,
                length_scale: cfg.engines.tts.length_scale,
                speaker: cfg.engines.tts.speaker.clone(),
            },
        }
    }
}
