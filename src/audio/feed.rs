use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::manager::{input_config, select_input_device};
use crate::error::{RelayError, Result};

/// Continuous microphone feed for wake-word detection.
///
/// A dedicated thread owns the long-lived input stream; the stream
/// callback chunks samples into fixed-size blocks and forwards them to
/// the orchestrator's channel. Blocks are dropped (and counted) when the
/// consumer lags, which is acceptable for wake detection. The feed
/// stream stays open across capture windows; the scoped operations in
/// `AudioManager` serialize among themselves, not against this stream.
pub struct WakeFeed {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl WakeFeed {
    /// Open the input stream and start forwarding blocks. Fails if the
    /// device cannot be opened, which is fatal at startup.
    pub fn start(
        input_device_index: Option<usize>,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<(Self, mpsc::Receiver<Vec<i16>>)> {
        let (block_tx, block_rx) = mpsc::channel::<Vec<i16>>(32);
        let stop = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let thread_stop = Arc::clone(&stop);
        let thread_dropped = Arc::clone(&dropped);
        let handle = thread::Builder::new()
            .name("wake-feed".to_string())
            .spawn(move || {
                feed_thread(
                    input_device_index,
                    sample_rate,
                    block_size,
                    block_tx,
                    thread_stop,
                    thread_dropped,
                    ready_tx,
                );
            })
            .map_err(|e| RelayError::Capture(format!("could not spawn wake feed thread: {e}")))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                return Err(RelayError::Capture(
                    "wake feed did not start in time".to_string(),
                ));
            }
        }

        info!("wake feed started ({block_size} sample blocks at {sample_rate} Hz)");
        Ok((
            Self {
                stop,
                thread: Some(handle),
                dropped,
            },
            block_rx,
        ))
    }

    /// Stop the feed thread and close its stream. The block channel
    /// closes once the thread exits.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("wake feed thread panicked");
            }
            let dropped = self.dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                warn!("wake feed dropped {dropped} blocks under load");
            }
            info!("wake feed stopped");
        }
    }
}

impl Drop for WakeFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn feed_thread(
    index: Option<usize>,
    sample_rate: u32,
    block_size: usize,
    block_tx: mpsc::Sender<Vec<i16>>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    ready_tx: std_mpsc::Sender<Result<()>>,
) {
    let stream = match open_feed_stream(index, sample_rate, block_size, block_tx, dropped) {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // The stream callback does all the work; this thread just keeps the
    // stream alive until asked to stop.
    while !stop.load(Ordering::SeqCst) {
        thread::park_timeout(Duration::from_millis(100));
    }

    drop(stream);
    debug!("wake feed thread exiting");
}

fn open_feed_stream(
    index: Option<usize>,
    sample_rate: u32,
    block_size: usize,
    block_tx: mpsc::Sender<Vec<i16>>,
    dropped: Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let device = select_input_device(index)?;
    let config = input_config(&device, sample_rate)?;

    let mut pending: Vec<i16> = Vec::with_capacity(block_size * 2);
    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                pending.extend(
                    data.iter()
                        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16),
                );
                while pending.len() >= block_size {
                    let block: Vec<i16> = pending.drain(..block_size).collect();
                    if block_tx.try_send(block).is_err() {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            |err| warn!("wake feed stream error: {err}"),
            None,
        )
        .map_err(|e| RelayError::Capture(e.to_string()))?;

    stream.play().map_err(|e| RelayError::Capture(e.to_string()))?;
    Ok(stream)
}
