pub mod feed;
pub mod file;
pub mod manager;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use feed::WakeFeed;
pub use file::CueFile;
pub use manager::AudioManager;

/// Scoped access to the single shared audio device.
///
/// Implementations must serialize capture and playback internally: at
/// most one operation may have a stream open at a time.
#[async_trait]
pub trait AudioPort: Send + Sync {
    /// Capture a fixed window of mono 16-bit samples.
    async fn capture_window(&self, seconds: f64) -> Result<Vec<i16>>;

    /// Play raw samples; returns false on any failure.
    async fn play_samples(&self, samples: &[i16]) -> bool;

    /// Play a WAV file; returns false on any failure.
    async fn play_file(&self, path: &Path) -> bool;
}
