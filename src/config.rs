use anyhow::Result;
use serde::Deserialize;

use crate::error::RelayError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub topics: TopicsConfig,
    pub audio: AudioConfig,
    pub engines: EngineConfig,
    pub limits: LimitsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
    pub client_id: String,
    /// Maximum payload size in bytes, enforced on both directions
    pub max_payload_size: usize,
    pub connect_retries: u32,
    /// Initial wait between connect attempts; doubles per attempt
    pub connect_backoff_secs: f64,
    /// How long each attempt waits for the broker acknowledgment
    pub connect_timeout_secs: f64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            tls: false,
            client_id: "vox-relay".to_string(),
            max_payload_size: 100_000,
            connect_retries: 5,
            connect_backoff_secs: 2.0,
            connect_timeout_secs: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub commands: String,
    pub responses: String,
    pub qos: u8,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            commands: "voice/commands/text".to_string(),
            responses: "voice/responses/text".to_string(),
            qos: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device index (None = system default)
    pub input_device_index: Option<usize>,
    /// Output device index (None = system default)
    pub output_device_index: Option<usize>,
    pub sample_rate: u32,
    /// Capture window after wake detection, in seconds
    pub record_seconds: f64,
    /// Safety ceiling for any capture window
    pub max_record_seconds: f64,
    /// Delay after opening an input stream before samples are kept
    pub stabilize_delay_ms: u64,
    /// Block size fed to the wake word detector, in samples
    pub wake_block_size: usize,
    pub start_cue: Option<String>,
    pub end_cue: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device_index: None,
            output_device_index: None,
            sample_rate: 16000,
            record_seconds: 6.0,
            max_record_seconds: 30.0,
            stabilize_delay_ms: 100,
            wake_block_size: 512,
            start_cue: Some("audio_feedback/start_listen.wav".to_string()),
            end_cue: Some("audio_feedback/end_listen.wav".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub wake: WakeConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub backend: String,
    pub model_path: Option<String>,
    /// RMS level (0.0-1.0) the energy backend treats as speech
    pub threshold: f32,
    /// Consecutive loud blocks required before a detection fires
    pub sustain_blocks: u32,
    /// Blocks to ignore after a detection
    pub cooldown_blocks: u32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            backend: "energy".to_string(),
            model_path: None,
            threshold: 0.15,
            sustain_blocks: 3,
            cooldown_blocks: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub backend: String,
    pub model_path: Option<String>,
    /// Canned phrase returned by the fixture backend (wiring checks)
    pub fixture_text: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            backend: "fixture".to_string(),
            model_path: None,
            fixture_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub backend: String,
    pub model_path: Option<String>,
    pub speaker: Option<String>,
    pub rate: f32,
    pub volume: f32,
    pub length_scale: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: "tone".to_string(),
            model_path: None,
            speaker: None,
            rate: 1.0,
            volume: 1.0,
            length_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum command/response text length in characters
    pub max_text_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_text_length: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to built-in defaults
    /// when the file does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate critical settings before any resource is acquired.
    pub fn validate(&self) -> std::result::Result<(), RelayError> {
        if self.mqtt.host.is_empty() {
            return Err(RelayError::Config("mqtt.host must not be empty".to_string()));
        }
        if self.mqtt.port == 0 {
            return Err(RelayError::Config("mqtt.port must not be 0".to_string()));
        }
        if self.mqtt.max_payload_size == 0 {
            return Err(RelayError::Config(
                "mqtt.max_payload_size must be positive".to_string(),
            ));
        }
        if self.topics.commands.is_empty() || self.topics.responses.is_empty() {
            return Err(RelayError::Config("topics must not be empty".to_string()));
        }
        if self.topics.qos > 2 {
            return Err(RelayError::Config(format!(
                "invalid topics.qos: {} (expected 0, 1 or 2)",
                self.topics.qos
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(RelayError::Config(
                "audio.sample_rate must be positive".to_string(),
            ));
        }
        if self.audio.record_seconds <= 0.0 {
            return Err(RelayError::Config(format!(
                "invalid audio.record_seconds: {}",
                self.audio.record_seconds
            )));
        }
        if self.audio.record_seconds > self.audio.max_record_seconds {
            return Err(RelayError::Config(format!(
                "audio.record_seconds ({}) exceeds audio.max_record_seconds ({})",
                self.audio.record_seconds, self.audio.max_record_seconds
            )));
        }
        if self.audio.wake_block_size == 0 {
            return Err(RelayError::Config(
                "audio.wake_block_size must be positive".to_string(),
            ));
        }
        if self.limits.max_text_length == 0 {
            return Err(RelayError::Config(
                "limits.max_text_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
