use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::PipelineStage;
use super::stats::{SessionStats, StatsSnapshot};
use crate::audio::AudioPort;
use crate::engine::{Synthesizer, Transcriber, WakeWordDetector};
use crate::mqtt::{CommandMessage, InboundMessage, RelayTransport, ResponseMessage};

/// The relay session: sequences wake-detection, capture, transcription
/// and publish, and plays back synthesized responses arriving from the
/// broker.
///
/// Two flows run concurrently: the wake loop driven by the microphone
/// block channel, and the inbound task fed by the network loop. They
/// share nothing mutable beyond the channels and the audio port, whose
/// internal lock serializes device access.
pub struct RelaySession {
    config: SessionConfig,
    transport: Arc<dyn RelayTransport>,
    audio: Arc<dyn AudioPort>,
    detector: StdMutex<Box<dyn WakeWordDetector>>,
    transcriber: StdMutex<Box<dyn Transcriber>>,
    synthesizer: StdMutex<Box<dyn Synthesizer>>,
    stage: StdMutex<PipelineStage>,
    running: AtomicBool,
    stats: SessionStats,
    inbound_task: Mutex<Option<JoinHandle<()>>>,
}

impl RelaySession {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn RelayTransport>,
        audio: Arc<dyn AudioPort>,
        detector: Box<dyn WakeWordDetector>,
        transcriber: Box<dyn Transcriber>,
        synthesizer: Box<dyn Synthesizer>,
    ) -> Self {
        Self {
            config,
            transport,
            audio,
            detector: StdMutex::new(detector),
            transcriber: StdMutex::new(transcriber),
            synthesizer: StdMutex::new(synthesizer),
            stage: StdMutex::new(PipelineStage::Idle),
            running: AtomicBool::new(false),
            stats: SessionStats::default(),
            inbound_task: Mutex::new(None),
        }
    }

    /// Drive the session until the block channel closes or `stop` is
    /// called. Spawns the inbound-response task, then runs the wake loop
    /// on the calling task.
    pub async fn run(
        self: &Arc<Self>,
        mut blocks: mpsc::Receiver<Vec<i16>>,
        mut inbound: mpsc::Receiver<InboundMessage>,
    ) -> anyhow::Result<()> {
        self.running.store(true, Ordering::SeqCst);

        if !self
            .transport
            .subscribe(&self.config.responses_topic, self.config.qos)
            .await
        {
            // Not fatal: commands still flow out, responses just won't arrive.
            error!(
                "could not subscribe to response topic {}",
                self.config.responses_topic
            );
        }

        let session = Arc::clone(self);
        let inbound_task = tokio::spawn(async move {
            info!("inbound response task started");
            while let Some(msg) = inbound.recv().await {
                if !session.running.load(Ordering::SeqCst) {
                    break;
                }
                session.handle_inbound(msg).await;
            }
            info!("inbound response task stopped");
        });
        {
            let mut handle = self.inbound_task.lock().await;
            *handle = Some(inbound_task);
        }

        self.set_stage(PipelineStage::Listening);
        info!("listening for wake word");

        while let Some(block) = blocks.recv().await {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let hit = {
                let mut detector = self.detector.lock().unwrap_or_else(|e| e.into_inner());
                detector.process(&block)
            };

            match hit {
                Ok(index) if index >= 0 => {
                    info!("wake word detected (keyword {index})");
                    self.stats.wake_detections.fetch_add(1, Ordering::Relaxed);
                    self.handle_command().await;
                    self.set_stage(PipelineStage::Listening);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("wake detector error: {e}");
                    // Pace the loop so a persistent detector fault
                    // doesn't spin hot.
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }

        self.set_stage(PipelineStage::Idle);
        info!("wake loop ended");
        Ok(())
    }

    /// Run one capture-transcribe-publish cycle after a wake detection.
    ///
    /// Every error path returns the session to Idle; publish failures
    /// are observable only via logs and the end-listening cue plays
    /// regardless of publish outcome.
    pub async fn handle_command(&self) {
        if let Some(cue) = &self.config.start_cue {
            // Best-effort; failures are logged by the audio port.
            let _ = self.audio.play_file(cue).await;
        }

        self.set_stage(PipelineStage::Recording);
        info!("recording command ({:.1}s window)", self.config.record_seconds);
        let samples = match self.audio.capture_window(self.config.record_seconds).await {
            Ok(samples) => samples,
            Err(e) => {
                error!("capture failed: {e}");
                self.set_stage(PipelineStage::Idle);
                return;
            }
        };

        self.set_stage(PipelineStage::Transcribing);
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let transcription = {
            let mut transcriber = self.transcriber.lock().unwrap_or_else(|e| e.into_inner());
            transcriber.transcribe(&pcm, self.config.sample_rate)
        };
        let text = match transcription {
            Ok(result) => result.text.trim().to_string(),
            Err(e) => {
                error!("transcription failed: {e}");
                self.set_stage(PipelineStage::Idle);
                return;
            }
        };

        if text.is_empty() {
            info!("no speech recognized, skipping publish");
        } else {
            let text = self.bounded_text(text);
            info!("transcribed command: {text:?}");

            self.set_stage(PipelineStage::Publishing);
            let message = CommandMessage::new(text);
            match serde_json::to_value(&message) {
                Ok(payload) => {
                    if self
                        .transport
                        .publish_json(&self.config.commands_topic, &payload, self.config.qos, false)
                        .await
                    {
                        self.stats.commands_published.fetch_add(1, Ordering::Relaxed);
                        info!("command published to {}", self.config.commands_topic);
                    } else {
                        self.stats.publish_failures.fetch_add(1, Ordering::Relaxed);
                        error!("could not publish command");
                    }
                }
                Err(e) => {
                    self.stats.publish_failures.fetch_add(1, Ordering::Relaxed);
                    error!("could not encode command: {e}");
                }
            }
        }

        if let Some(cue) = &self.config.end_cue {
            let _ = self.audio.play_file(cue).await;
        }
        self.set_stage(PipelineStage::Idle);
    }

    /// Handle one decoded inbound message from the network loop.
    pub async fn handle_inbound(&self, msg: InboundMessage) {
        if msg.topic != self.config.responses_topic {
            debug!("ignoring message on {}", msg.topic);
            return;
        }

        let response: ResponseMessage = match serde_json::from_value(msg.payload) {
            Ok(response) => response,
            Err(e) => {
                warn!("malformed response payload: {e}");
                return;
            }
        };

        let Some(text) = response.tts_text.filter(|t| !t.trim().is_empty()) else {
            warn!("response without tts_text field, ignoring");
            return;
        };
        let text = self.bounded_text(text);
        info!("response received ({} chars), speaking", text.chars().count());

        self.set_stage(PipelineStage::Synthesizing);
        let pcm = {
            let mut synthesizer = self.synthesizer.lock().unwrap_or_else(|e| e.into_inner());
            synthesizer.synthesize(&text, &self.config.voice)
        };
        let pcm = match pcm {
            Ok(pcm) => pcm,
            Err(e) => {
                error!("speech synthesis failed: {e}");
                self.set_stage(PipelineStage::Idle);
                return;
            }
        };

        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        self.set_stage(PipelineStage::Playing);
        if self.audio.play_samples(&samples).await {
            self.stats.responses_played.fetch_add(1, Ordering::Relaxed);
        } else {
            error!("response playback failed");
        }
        self.set_stage(PipelineStage::Idle);
    }

    /// Signal the wake loop to exit and stop the inbound task.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = {
            let mut guard = self.inbound_task.lock().await;
            guard.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Release collaborator engine resources. Called once at shutdown,
    /// after the wake loop has stopped.
    pub fn release_engines(&self) {
        let mut detector = self.detector.lock().unwrap_or_else(|e| e.into_inner());
        detector.release();
        debug!("engines released");
    }

    pub fn stage(&self) -> PipelineStage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn set_stage(&self, next: PipelineStage) {
        let mut stage = self.stage.lock().unwrap_or_else(|e| e.into_inner());
        if *stage != next {
            debug!("stage {} -> {}", *stage, next);
            *stage = next;
        }
    }

    fn bounded_text(&self, text: String) -> String {
        let max = self.config.max_text_length;
        if text.chars().count() > max {
            warn!(
                "text too long ({} chars), truncating to {max}",
                text.chars().count()
            );
            truncate_chars(&text, max)
        } else {
            text
        }
    }
}

/// Truncate to at most `max_chars` characters, never splitting a
/// character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
