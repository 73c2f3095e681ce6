use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use common::anyhow::{Result, anyhow};
use common::ffmpeg_next as ffmpeg;
use common::log::{debug, error, info};
use common::probe::StreamSettings;
use common::selector::VideoCandidate;
use common::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::session::PlaybackControl;

/// Live feed of encoded chunks mirroring the player's output.
///
/// While the player is paused the feed is silent; chunks resume when
/// playback does.
pub struct MediaStream {
    pub(crate) settings: StreamSettings,
    pub(crate) chunks: UnboundedReceiver<Vec<u8>>,
}

impl MediaStream {
    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }
}

/// Playback engine for the selected video.
///
/// Owns a demux thread that reads the file's video packets, paces them
/// against a pause-aware clock, and feeds them into the capture stream.
pub struct Player {
    playing: Arc<AtomicBool>,
    restart: Arc<AtomicBool>,
    stop_signal: Arc<AtomicBool>,
    position_ms: Arc<AtomicU64>,
    stream: Option<MediaStream>,
}

impl Player {
    /// Spawn the demux thread for `target`. Starts paused at position
    /// zero.
    pub fn open(target: &VideoCandidate) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let playing = Arc::new(AtomicBool::new(false));
        let restart = Arc::new(AtomicBool::new(false));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let position_ms = Arc::new(AtomicU64::new(0));

        let path = target.path.clone();
        {
            let playing = Arc::clone(&playing);
            let restart = Arc::clone(&restart);
            let stop_signal = Arc::clone(&stop_signal);
            let position_ms = Arc::clone(&position_ms);
            thread::spawn(move || {
                playback_loop(path, tx, playing, restart, stop_signal, position_ms);
            });
        }
        info!("[player] playback thread started for {}", target.path.display());

        Self {
            playing,
            restart,
            stop_signal,
            position_ms,
            stream: Some(MediaStream {
                settings: target.settings.clone(),
                chunks: rx,
            }),
        }
    }

    /// Hand out the live capture feed. Only available once.
    pub fn capture_stream(&mut self) -> Result<MediaStream> {
        self.stream
            .take()
            .ok_or_else(|| anyhow!("capture stream already taken"))
    }
}

impl PlaybackControl for Player {
    /// Seek back to the start and resume, regardless of prior state.
    fn replay(&self) {
        self.restart.store(true, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Position of the last delivered packet.
    fn position(&self) -> Duration {
        Duration::from_millis(self.position_ms.load(Ordering::SeqCst))
    }
}

/// Pause-aware stopwatch tracking how far playback has advanced.
struct PlaybackClock {
    base: Duration,
    started: Option<Instant>,
}

impl PlaybackClock {
    fn new() -> Self {
        Self {
            base: Duration::ZERO,
            started: None,
        }
    }

    fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.base += started.elapsed();
        }
    }

    fn reset(&mut self) {
        self.base = Duration::ZERO;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn elapsed(&self) -> Duration {
        self.base
            + self
                .started
                .map(|started| started.elapsed())
                .unwrap_or(Duration::ZERO)
    }
}

fn playback_loop(
    path: PathBuf,
    tx: UnboundedSender<Vec<u8>>,
    playing: Arc<AtomicBool>,
    restart: Arc<AtomicBool>,
    stop_signal: Arc<AtomicBool>,
    position_ms: Arc<AtomicU64>,
) {
    let mut input = match ffmpeg::format::input(&path) {
        Ok(input) => input,
        Err(e) => {
            error!("[player] failed to open {}: {}", path.display(), e);
            return;
        }
    };

    let (video_index, time_base) = match input.streams().best(ffmpeg::media::Type::Video) {
        Some(stream) => (stream.index(), f64::from(stream.time_base())),
        None => {
            error!("[player] no video stream in {}", path.display());
            return;
        }
    };

    let mut clock = PlaybackClock::new();

    loop {
        if stop_signal.load(Ordering::SeqCst) {
            break;
        }

        if restart.swap(false, Ordering::SeqCst) {
            if let Err(e) = input.seek(0, ..) {
                error!("[player] seek to start failed: {}", e);
            }
            clock.reset();
            position_ms.store(0, Ordering::SeqCst);
        }

        if !playing.load(Ordering::SeqCst) {
            clock.pause();
            thread::sleep(Duration::from_millis(10));
            continue;
        }
        clock.resume();

        let next = {
            let mut packets = input.packets();
            packets.next().map(|(stream, packet)| (stream.index(), packet))
        };

        let Some((index, packet)) = next else {
            debug!("[player] end of stream reached");
            playing.store(false, Ordering::SeqCst);
            continue;
        };

        if index != video_index {
            continue;
        }

        if let Some(ts) = packet.pts().or(packet.dts()) {
            let media_time = Duration::try_from_secs_f64(ts.max(0) as f64 * time_base)
                .unwrap_or(Duration::ZERO);
            let elapsed = clock.elapsed();
            if media_time > elapsed {
                thread::sleep(media_time - elapsed);
            }
            position_ms.store(media_time.as_millis() as u64, Ordering::SeqCst);
        }

        if let Some(data) = packet.data() {
            if tx.send(data.to_vec()).is_err() {
                debug!("[player] capture stream receiver dropped");
                break;
            }
        }
    }

    debug!("[player] playback thread for {} exiting", path.display());
}
