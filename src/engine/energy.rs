use tracing::debug;

use super::WakeWordDetector;
use crate::error::Result;

/// RMS-energy wake detector.
///
/// Fires when `sustain_blocks` consecutive blocks exceed the RMS
/// threshold, then ignores `cooldown_blocks` blocks so one utterance
/// cannot trigger twice. Not a real keyword spotter; useful for wiring
/// checks and push-loud-to-talk setups.
pub struct EnergyWakeDetector {
    block_size: usize,
    threshold: f32,
    sustain_blocks: u32,
    cooldown_blocks: u32,
    hot_blocks: u32,
    cooldown: u32,
}

impl EnergyWakeDetector {
    pub fn new(block_size: usize, threshold: f32, sustain_blocks: u32, cooldown_blocks: u32) -> Self {
        Self {
            block_size,
            threshold,
            sustain_blocks: sustain_blocks.max(1),
            cooldown_blocks,
            hot_blocks: 0,
            cooldown: 0,
        }
    }
}

impl WakeWordDetector for EnergyWakeDetector {
    fn frame_length(&self) -> usize {
        self.block_size
    }

    fn process(&mut self, frame: &[i16]) -> Result<i32> {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return Ok(-1);
        }
        if frame.is_empty() {
            return Ok(-1);
        }

        if rms_energy(frame) > self.threshold {
            self.hot_blocks += 1;
        } else {
            self.hot_blocks = 0;
        }

        if self.hot_blocks >= self.sustain_blocks {
            self.hot_blocks = 0;
            self.cooldown = self.cooldown_blocks;
            return Ok(0);
        }
        Ok(-1)
    }

    fn release(&mut self) {
        debug!("energy wake detector released");
    }
}

/// RMS energy of a block, normalized to 0.0-1.0.
fn rms_energy(samples: &[i16]) -> f32 {
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = f64::from(s) / f64::from(i16::MAX);
            normalized * normalized
        })
        .sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}
