use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vox_relay::audio::{AudioManager, AudioPort, WakeFeed};
use vox_relay::config::Config;
use vox_relay::engine;
use vox_relay::mqtt::{MqttClient, RelayTransport};
use vox_relay::session::{RelaySession, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "vox-relay", about = "Wake-word voice command relay over MQTT", version)]
struct Cli {
    /// Path to the configuration file (extension optional)
    #[arg(long, default_value = "config/vox-relay")]
    config: String,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = Config::load(&cli.config).context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.level)),
        )
        .init();

    info!("vox-relay v{}", env!("CARGO_PKG_VERSION"));
    cfg.validate().context("invalid configuration")?;

    let audio = Arc::new(AudioManager::new(cfg.audio.clone()));
    if cli.list_devices {
        audio.list_devices();
        return Ok(());
    }

    let detector = engine::create_wake_detector(&cfg.engines.wake, cfg.audio.wake_block_size)
        .context("failed to initialize wake detector")?;
    let transcriber = engine::create_transcriber(&cfg.engines.stt)
        .context("failed to initialize transcription engine")?;
    let synthesizer = engine::create_synthesizer(&cfg.engines.tts, cfg.audio.sample_rate)
        .context("failed to initialize speech synthesizer")?;

    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let mqtt = Arc::new(
        MqttClient::new(&cfg.mqtt, inbound_tx).context("failed to initialize MQTT client")?,
    );

    let connected = mqtt
        .connect(
            cfg.mqtt.connect_retries,
            Duration::from_secs_f64(cfg.mqtt.connect_backoff_secs),
            Duration::from_secs_f64(cfg.mqtt.connect_timeout_secs),
        )
        .await;
    if !connected {
        bail!(
            "could not connect to MQTT broker at {}:{}",
            cfg.mqtt.host,
            cfg.mqtt.port
        );
    }

    let block_size = detector.frame_length();
    let (mut feed, blocks_rx) =
        WakeFeed::start(cfg.audio.input_device_index, cfg.audio.sample_rate, block_size)
            .context("failed to open microphone for wake detection")?;

    let session = Arc::new(RelaySession::new(
        SessionConfig::from(&cfg),
        Arc::clone(&mqtt) as Arc<dyn RelayTransport>,
        Arc::clone(&audio) as Arc<dyn AudioPort>,
        detector,
        transcriber,
        synthesizer,
    ));

    let run_session = {
        let session = Arc::clone(&session);
        async move { session.run(blocks_rx, inbound_rx).await }
    };

    tokio::select! {
        _ = wait_for_signal() => info!("shutdown signal received"),
        result = run_session => match result {
            Ok(()) => warn!("wake loop ended unexpectedly"),
            Err(e) => error!("session error: {e}"),
        },
    }

    // Ordered teardown; every step is best-effort so one failure cannot
    // block the next.
    session.stop().await;
    feed.stop();
    mqtt.stop_network_loop();
    mqtt.disconnect().await;
    session.release_engines();
    audio.release();

    let stats = session.stats();
    info!(
        "session finished: {} wake detections, {} commands published ({} failures), {} responses played",
        stats.wake_detections,
        stats.commands_published,
        stats.publish_failures,
        stats.responses_played
    );

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        Err(e) => {
            warn!("could not install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
