// Audio manager contract tests that run without a real device: duration
// validation, released-state behavior and cue-file loading all fail or
// succeed before any stream would be opened.

use std::path::Path;

use vox_relay::audio::{AudioManager, AudioPort, CueFile};
use vox_relay::config::AudioConfig;
use vox_relay::RelayError;

fn manager() -> AudioManager {
    AudioManager::new(AudioConfig::default())
}

#[tokio::test]
async fn test_capture_window_rejects_zero_duration() {
    let audio = manager();
    let err = audio.capture_window(0.0).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidDuration(_)));
}

#[tokio::test]
async fn test_capture_window_rejects_negative_duration() {
    let audio = manager();
    let err = audio.capture_window(-1.0).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidDuration(_)));
}

#[tokio::test]
async fn test_capture_window_rejects_duration_above_ceiling() {
    let audio = manager();
    // Default safety ceiling is 30 seconds.
    let err = audio.capture_window(31.0).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidDuration(_)));
}

#[tokio::test]
async fn test_play_file_missing_path_returns_false() {
    let audio = manager();
    assert!(!audio.play_file(Path::new("no/such/cue.wav")).await);
}

#[tokio::test]
async fn test_play_samples_empty_buffer_returns_false() {
    let audio = manager();
    assert!(!audio.play_samples(&[]).await);
}

#[tokio::test]
async fn test_operations_fail_after_release() {
    let audio = manager();
    audio.release();
    // Release is idempotent.
    audio.release();

    let err = audio.capture_window(2.0).await.unwrap_err();
    assert!(matches!(err, RelayError::Capture(_)));
    assert!(!audio.play_samples(&[1, 2, 3]).await);
    assert!(!audio.play_file(Path::new("cue.wav")).await);
}

#[test]
fn test_cue_file_loads_mono_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cue.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for sample in [100i16, -200, 300, -400] {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let cue = CueFile::open(&path).unwrap();
    assert_eq!(cue.sample_rate, 16000);
    assert_eq!(cue.samples, vec![100, -200, 300, -400]);
}

#[test]
fn test_cue_file_downmixes_stereo() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    // Two frames: (100, 300) and (-200, -400).
    for sample in [100i16, 300, -200, -400] {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let cue = CueFile::open(&path).unwrap();
    assert_eq!(cue.sample_rate, 22050);
    assert_eq!(cue.samples, vec![200, -300]);
}

#[test]
fn test_cue_file_rejects_missing_file() {
    assert!(CueFile::open("no/such/file.wav").is_err());
}
