use std::path::Path;

use hound::WavReader;
use tracing::debug;

use crate::error::{RelayError, Result};

/// A feedback cue loaded from a WAV file, downmixed to mono.
pub struct CueFile {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl CueFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .map_err(|e| RelayError::Playback(format!("failed to open WAV file: {e}")))?;

        let spec = reader.spec();
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RelayError::Playback(format!("failed to read audio samples: {e}")))?;

        let samples = match spec.channels {
            1 => raw,
            2 => stereo_to_mono(&raw),
            n => {
                return Err(RelayError::Playback(format!(
                    "unsupported channel count in {}: {n}",
                    path.display()
                )))
            }
        };

        debug!(
            "cue file loaded: {} ({} samples at {} Hz)",
            path.display(),
            samples.len(),
            spec.sample_rate
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            samples,
        })
    }
}

fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}
