pub mod diagnostic;
pub mod energy;

use tracing::info;

use crate::config::{SttConfig, TtsConfig, WakeConfig};
use crate::error::{RelayError, Result};

pub use diagnostic::{FixtureTranscriber, ToneSynthesizer};
pub use energy::EnergyWakeDetector;

/// Wake phrase detector contract.
///
/// Consumes one fixed-size block of 16-bit samples per call and returns
/// a non-negative keyword index on detection, negative otherwise.
pub trait WakeWordDetector: Send {
    /// Block size in samples the detector expects per `process` call.
    fn frame_length(&self) -> usize;

    fn process(&mut self, frame: &[i16]) -> Result<i32>;

    /// Release engine resources. Called once at shutdown.
    fn release(&mut self) {}
}

impl std::fmt::Debug for dyn WakeWordDetector + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn WakeWordDetector")
    }
}

/// Result of a transcription call.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
}

/// Speech-to-text engine contract: raw 16-bit little-endian PCM in,
/// text out.
pub trait Transcriber: Send {
    fn transcribe(&mut self, pcm: &[u8], sample_rate: u32) -> Result<Transcription>;
}

impl std::fmt::Debug for dyn Transcriber + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Transcriber")
    }
}

/// Voice parameters passed to the synthesizer.
#[derive(Debug, Clone)]
pub struct VoiceParams {
    pub rate: f32,
    pub volume: f32,
    pub length_scale: f32,
    pub speaker: Option<String>,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
            length_scale: 1.0,
            speaker: None,
        }
    }
}

/// Text-to-speech engine contract: text plus voice parameters in, raw
/// 16-bit little-endian PCM out.
pub trait Synthesizer: Send {
    fn synthesize(&mut self, text: &str, params: &VoiceParams) -> Result<Vec<u8>>;
}

impl std::fmt::Debug for dyn Synthesizer + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Synthesizer")
    }
}

/// Build the wake detector named by the configuration.
///
/// Model-based engines live outside this crate behind the trait; the
/// built-in `energy` backend is an RMS-threshold detector suitable for
/// wiring checks and push-loud-to-talk setups.
pub fn create_wake_detector(cfg: &WakeConfig, block_size: usize) -> Result<Box<dyn WakeWordDetector>> {
    match cfg.backend.as_str() {
        "energy" => {
            info!(
                "wake backend: energy (threshold {}, sustain {} blocks)",
                cfg.threshold, cfg.sustain_blocks
            );
            Ok(Box::new(EnergyWakeDetector::new(
                block_size,
                cfg.threshold,
                cfg.sustain_blocks,
                cfg.cooldown_blocks,
            )))
        }
        other => Err(RelayError::Config(format!(
            "unknown wake backend: {other} (built-in: energy)"
        ))),
    }
}

/// Build the transcriber named by the configuration.
pub fn create_transcriber(cfg: &SttConfig) -> Result<Box<dyn Transcriber>> {
    match cfg.backend.as_str() {
        "fixture" => {
            info!("stt backend: fixture");
            Ok(Box::new(FixtureTranscriber::new(cfg.fixture_text.clone())))
        }
        other => Err(RelayError::Config(format!(
            "unknown stt backend: {other} (built-in: fixture)"
        ))),
    }
}

/// Build the synthesizer named by the configuration.
pub fn create_synthesizer(cfg: &TtsConfig, sample_rate: u32) -> Result<Box<dyn Synthesizer>> {
    match cfg.backend.as_str() {
        "tone" => {
            info!("tts backend: tone");
            Ok(Box::new(ToneSynthesizer::new(sample_rate)))
        }
        other => Err(RelayError::Config(format!(
            "unknown tts backend: {other} (built-in: tone)"
        ))),
    }
}
