use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::file::CueFile;
use super::AudioPort;
use crate::config::AudioConfig;
use crate::error::{RelayError, Result};

/// Owns scoped access to the audio device for capture and playback.
///
/// This is the single long-lived audio-subsystem handle for the process:
/// created once at startup, released exactly once at shutdown. All
/// capture/playback operations go through one internal lock, since
/// opening two streams on one physical device concurrently is undefined
/// behavior at the driver level. Streams themselves are scoped to each
/// operation and closed on every exit path.
pub struct AudioManager {
    cfg: AudioConfig,
    device_guard: Mutex<()>,
    released: AtomicBool,
}

impl AudioManager {
    pub fn new(cfg: AudioConfig) -> Self {
        info!("audio manager initialized (sample rate: {} Hz)", cfg.sample_rate);
        Self {
            cfg,
            device_guard: Mutex::new(()),
            released: AtomicBool::new(false),
        }
    }

    /// Release the audio subsystem. Idempotent; any operation after this
    /// fails cleanly.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("audio manager already released");
            return;
        }
        info!("audio resources released");
    }

    /// Log available devices for diagnostics. Failures are logged only.
    pub fn list_devices(&self) {
        let host = cpal::default_host();
        info!("available audio devices:");
        match host.input_devices() {
            Ok(devices) => {
                for (i, device) in devices.enumerate() {
                    let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
                    info!("  input  [{i}] {name}");
                }
            }
            Err(e) => error!("could not list input devices: {e}"),
        }
        match host.output_devices() {
            Ok(devices) => {
                for (i, device) in devices.enumerate() {
                    let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
                    info!("  output [{i}] {name}");
                }
            }
            Err(e) => error!("could not list output devices: {e}"),
        }
    }

    async fn capture_window_inner(&self, seconds: f64) -> Result<Vec<i16>> {
        if self.released.load(Ordering::SeqCst) {
            return Err(RelayError::Capture("audio manager has been released".to_string()));
        }
        // Validation happens before any lock or stream is taken.
        if !(seconds > 0.0) {
            return Err(RelayError::InvalidDuration(seconds));
        }
        if seconds > self.cfg.max_record_seconds {
            return Err(RelayError::InvalidDuration(seconds));
        }

        let _guard = self.device_guard.lock().await;

        let index = self.cfg.input_device_index;
        let sample_rate = self.cfg.sample_rate;
        let stabilize = Duration::from_millis(self.cfg.stabilize_delay_ms);

        tokio::task::spawn_blocking(move || capture_blocking(index, sample_rate, seconds, stabilize))
            .await
            .map_err(|e| RelayError::Capture(format!("capture task failed: {e}")))?
    }

    async fn play_samples_inner(&self, samples: &[i16]) -> bool {
        if self.released.load(Ordering::SeqCst) {
            error!("cannot play: audio manager has been released");
            return false;
        }
        if samples.is_empty() {
            warn!("empty sample buffer, skipping playback");
            return false;
        }

        let _guard = self.device_guard.lock().await;

        let index = self.cfg.output_device_index;
        let sample_rate = self.cfg.sample_rate;
        let samples = samples.to_vec();

        match tokio::task::spawn_blocking(move || play_blocking(index, samples, sample_rate)).await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("playback failed: {e}");
                false
            }
            Err(e) => {
                error!("playback task failed: {e}");
                false
            }
        }
    }

    async fn play_file_inner(&self, path: &Path) -> bool {
        if self.released.load(Ordering::SeqCst) {
            error!("cannot play: audio manager has been released");
            return false;
        }
        if !path.exists() {
            warn!("WAV file not found: {}", path.display());
            return false;
        }
        if !path.is_file() {
            warn!("path is not a file: {}", path.display());
            return false;
        }

        let cue = match CueFile::open(path) {
            Ok(cue) => cue,
            Err(e) => {
                error!("failed to load WAV file {}: {e}", path.display());
                return false;
            }
        };
        if cue.samples.is_empty() {
            warn!("WAV file {} contains no samples", path.display());
            return false;
        }

        let _guard = self.device_guard.lock().await;

        let index = self.cfg.output_device_index;
        match tokio::task::spawn_blocking(move || {
            play_blocking(index, cue.samples, cue.sample_rate)
        })
        .await
        {
            Ok(Ok(())) => {
                debug!("WAV playback complete: {}", path.display());
                true
            }
            Ok(Err(e)) => {
                error!("failed to play WAV {}: {e}", path.display());
                false
            }
            Err(e) => {
                error!("playback task failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl AudioPort for AudioManager {
    async fn capture_window(&self, seconds: f64) -> Result<Vec<i16>> {
        self.capture_window_inner(seconds).await
    }

    async fn play_samples(&self, samples: &[i16]) -> bool {
        self.play_samples_inner(samples).await
    }

    async fn play_file(&self, path: &Path) -> bool {
        self.play_file_inner(path).await
    }
}

pub(crate) fn select_input_device(index: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();
    match index {
        Some(i) => host
            .input_devices()
            .map_err(|e| RelayError::Capture(e.to_string()))?
            .nth(i)
            .ok_or_else(|| RelayError::Capture(format!("no input device at index {i}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| RelayError::Capture("no input device available".to_string())),
    }
}

fn select_output_device(index: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();
    match index {
        Some(i) => host
            .output_devices()
            .map_err(|e| RelayError::Playback(e.to_string()))?
            .nth(i)
            .ok_or_else(|| RelayError::Playback(format!("no output device at index {i}"))),
        None => host
            .default_output_device()
            .ok_or_else(|| RelayError::Playback("no output device available".to_string())),
    }
}

pub(crate) fn input_config(device: &Device, sample_rate: u32) -> Result<StreamConfig> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| RelayError::Capture(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .ok_or_else(|| {
            RelayError::Capture(format!("no mono input config at {sample_rate} Hz"))
        })?;

    Ok(supported.with_sample_rate(SampleRate(sample_rate)).config())
}

fn output_config(device: &Device, sample_rate: u32) -> Result<StreamConfig> {
    let mono = device
        .supported_output_configs()
        .map_err(|e| RelayError::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        });

    let supported = match mono {
        Some(config) => config,
        None => device
            .supported_output_configs()
            .map_err(|e| RelayError::Playback(e.to_string()))?
            .find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| {
                RelayError::Playback(format!("no output config at {sample_rate} Hz"))
            })?,
    };

    Ok(supported.with_sample_rate(SampleRate(sample_rate)).config())
}

fn capture_blocking(
    index: Option<usize>,
    sample_rate: u32,
    seconds: f64,
    stabilize: Duration,
) -> Result<Vec<i16>> {
    let device = select_input_device(index)?;
    let config = input_config(&device, sample_rate)?;

    let (tx, rx) = std_mpsc::channel::<Vec<i16>>();
    let read_errors = Arc::new(AtomicU64::new(0));
    let error_count = Arc::clone(&read_errors);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let block: Vec<i16> = data
                    .iter()
                    .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
                    .collect();
                let _ = tx.send(block);
            },
            move |err| {
                error_count.fetch_add(1, Ordering::Relaxed);
                warn!("audio block read error, skipping: {err}");
            },
            None,
        )
        .map_err(|e| RelayError::Capture(e.to_string()))?;

    stream.play().map_err(|e| RelayError::Capture(e.to_string()))?;

    // Let the stream settle, then discard the startup transient so the
    // first kept blocks are clean speech.
    std::thread::sleep(stabilize);
    while rx.try_recv().is_ok() {}

    let target = (seconds * sample_rate as f64) as usize;
    let mut samples: Vec<i16> = Vec::with_capacity(target);
    let deadline = Instant::now() + Duration::from_secs_f64(seconds) + Duration::from_secs(2);

    while samples.len() < target && Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(block) => samples.extend_from_slice(&block),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!("no audio block within 500ms, still waiting");
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(stream);

    if samples.is_empty() {
        return Err(RelayError::EmptyCapture);
    }
    samples.truncate(target);

    debug!(
        "capture complete: {} samples ({} read errors)",
        samples.len(),
        read_errors.load(Ordering::Relaxed)
    );
    Ok(samples)
}

fn play_blocking(index: Option<usize>, samples: Vec<i16>, sample_rate: u32) -> Result<()> {
    let device = select_output_device(index)?;
    let config = output_config(&device, sample_rate)?;
    let channels = config.channels as usize;

    let total = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let cb_samples = Arc::clone(&samples);
    let cb_position = Arc::clone(&position);
    let cb_finished = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let pos = cb_position.load(Ordering::Relaxed);
                    let value = if pos < cb_samples.len() {
                        cb_position.store(pos + 1, Ordering::Relaxed);
                        cb_samples[pos] as f32 / 32768.0
                    } else {
                        cb_finished.store(true, Ordering::Relaxed);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
            },
            |err| error!("audio playback error: {err}"),
            None,
        )
        .map_err(|e| RelayError::Playback(e.to_string()))?;

    stream.play().map_err(|e| RelayError::Playback(e.to_string()))?;

    // Poll for completion; the device callback signals when the buffer
    // has been fully consumed.
    let duration_ms = total as u64 * 1000 / u64::from(sample_rate.max(1));
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);
    while !finished.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    // Give the device a moment to drain its last buffer.
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    debug!("playback complete: {total} samples");
    Ok(())
}
