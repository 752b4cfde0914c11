use vox_relay::config::{SttConfig, TtsConfig, WakeConfig};
use vox_relay::engine::{
    create_synthesizer, create_transcriber, create_wake_detector, EnergyWakeDetector,
    FixtureTranscriber, ToneSynthesizer, Synthesizer, Transcriber, VoiceParams, WakeWordDetector,
};
use vox_relay::RelayError;

fn loud_block(len: usize) -> Vec<i16> {
    vec![12000i16; len]
}

fn quiet_block(len: usize) -> Vec<i16> {
    vec![10i16; len]
}

#[test]
fn test_energy_detector_fires_after_sustained_loudness() {
    let mut detector = EnergyWakeDetector::new(512, 0.15, 3, 10);

    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    // Third consecutive loud block crosses the sustain requirement.
    assert_eq!(detector.process(&loud_block(512)).unwrap(), 0);
}

#[test]
fn test_energy_detector_ignores_silence() {
    let mut detector = EnergyWakeDetector::new(512, 0.15, 3, 10);

    for _ in 0..20 {
        assert_eq!(detector.process(&quiet_block(512)).unwrap(), -1);
    }
}

#[test]
fn test_energy_detector_resets_on_quiet_block() {
    let mut detector = EnergyWakeDetector::new(512, 0.15, 3, 10);

    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    assert_eq!(detector.process(&quiet_block(512)).unwrap(), -1);
    // The streak restarts after silence.
    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    assert_eq!(detector.process(&loud_block(512)).unwrap(), 0);
}

#[test]
fn test_energy_detector_cooldown_suppresses_retrigger() {
    let mut detector = EnergyWakeDetector::new(512, 0.15, 1, 5);

    assert_eq!(detector.process(&loud_block(512)).unwrap(), 0);
    // Loud blocks during cooldown do not fire again.
    for _ in 0..5 {
        assert_eq!(detector.process(&loud_block(512)).unwrap(), -1);
    }
    assert_eq!(detector.process(&loud_block(512)).unwrap(), 0);
}

#[test]
fn test_fixture_transcriber_returns_configured_phrase() {
    let mut stt = FixtureTranscriber::new("turn on the lights".to_string());
    let result = stt.transcribe(&[0u8; 64000], 16000).unwrap();
    assert_eq!(result.text, "turn on the lights");
}

#[test]
fn test_tone_synthesizer_produces_even_pcm() {
    let mut tts = ToneSynthesizer::new(16000);
    let pcm = tts.synthesize("Hello there", &VoiceParams::default()).unwrap();

    assert!(!pcm.is_empty());
    assert_eq!(pcm.len() % 2, 0, "16-bit PCM must be an even byte count");
    // 11 chars at 0.04 s/char = 0.44 s at 16 kHz = 7040 samples.
    assert_eq!(pcm.len() / 2, 7040);
}

#[test]
fn test_tone_synthesizer_clamps_short_and_long_text() {
    let mut tts = ToneSynthesizer::new(16000);

    let short = tts.synthesize("a", &VoiceParams::default()).unwrap();
    assert_eq!(short.len() / 2, 3200, "floor of 0.2 s");

    let long = tts
        .synthesize(&"a".repeat(500), &VoiceParams::default())
        .unwrap();
    assert_eq!(long.len() / 2, 48000, "ceiling of 3 s");
}

#[test]
fn test_tone_synthesizer_zero_volume_is_silent() {
    let mut tts = ToneSynthesizer::new(16000);
    let params = VoiceParams {
        volume: 0.0,
        ..VoiceParams::default()
    };
    let pcm = tts.synthesize("quiet", &params).unwrap();
    assert!(pcm.iter().all(|&b| b == 0));
}

#[test]
fn test_factory_builds_configured_backends() {
    let wake = create_wake_detector(&WakeConfig::default(), 512).unwrap();
    assert_eq!(wake.frame_length(), 512);

    assert!(create_transcriber(&SttConfig::default()).is_ok());
    assert!(create_synthesizer(&TtsConfig::default(), 16000).is_ok());
}

#[test]
fn test_factory_rejects_unknown_backends() {
    let wake = WakeConfig {
        backend: "porcupine".to_string(),
        ..WakeConfig::default()
    };
    assert!(matches!(
        create_wake_detector(&wake, 512).unwrap_err(),
        RelayError::Config(_)
    ));

    let stt = SttConfig {
        backend: "vosk".to_string(),
        ..SttConfig::default()
    };
    assert!(matches!(
        create_transcriber(&stt).unwrap_err(),
        RelayError::Config(_)
    ));

    let tts = TtsConfig {
        backend: "piper".to_string(),
        ..TtsConfig::default()
    };
    assert!(matches!(
        create_synthesizer(&tts, 16000).unwrap_err(),
        RelayError::Config(_)
    ));
}
