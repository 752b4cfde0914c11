//! Diagnostic engine backends for running the relay without models.

use tracing::debug;

use super::{Synthesizer, Transcriber, Transcription, VoiceParams};
use crate::error::Result;

/// Transcriber that returns a configured canned phrase for any audio.
/// Lets the whole capture-to-publish path be exercised without a model.
pub struct FixtureTranscriber {
    text: String,
}

impl FixtureTranscriber {
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

impl Transcriber for FixtureTranscriber {
    fn transcribe(&mut self, pcm: &[u8], _sample_rate: u32) -> Result<Transcription> {
        debug!("fixture transcriber consumed {} bytes", pcm.len());
        Ok(Transcription {
            text: self.text.clone(),
        })
    }
}

/// Synthesizer that renders a sine beep whose length scales with the
/// text, so responses are audible without a voice model.
pub struct ToneSynthesizer {
    sample_rate: u32,
}

/// Beep pitch in Hz.
const TONE_HZ: f64 = 440.0;
/// Seconds of tone per character of text.
const SECONDS_PER_CHAR: f64 = 0.04;
const MIN_SECONDS: f64 = 0.2;
const MAX_SECONDS: f64 = 3.0;

impl ToneSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Synthesizer for ToneSynthesizer {
    fn synthesize(&mut self, text: &str, params: &VoiceParams) -> Result<Vec<u8>> {
        let chars = text.chars().count() as f64;
        let rate = f64::from(params.rate.max(0.1));
        let seconds = (chars * SECONDS_PER_CHAR * f64::from(params.length_scale) / rate)
            .clamp(MIN_SECONDS, MAX_SECONDS);

        let amplitude = f64::from(params.volume.clamp(0.0, 1.0)) * 0.3 * f64::from(i16::MAX);
        let total = (seconds * f64::from(self.sample_rate)) as usize;

        let mut pcm = Vec::with_capacity(total * 2);
        for n in 0..total {
            let t = n as f64 / f64::from(self.sample_rate);
            let sample = (amplitude * (2.0 * std::f64::consts::PI * TONE_HZ * t).sin()) as i16;
            pcm.extend_from_slice(&sample.to_le_bytes());
        }

        debug!("tone synthesizer rendered {seconds:.2}s for {} chars", chars as usize);
        Ok(pcm)
    }
}
