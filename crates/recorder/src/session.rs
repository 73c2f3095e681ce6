use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::log::{debug, error, info, warn};
use storage::ChunkBuffer;

use crate::player::MediaStream;

/// Commands the session issues to the playback side.
pub trait PlaybackControl: Send + Sync {
    /// Seek playback back to the start and resume it.
    fn replay(&self);
    fn pause(&self);
    /// End playback for good; the capture feed closes afterwards.
    fn shutdown(&self);
    /// Current playback position.
    fn position(&self) -> Duration;
}

/// Lifecycle of a recording session. Transitions are user-triggered
/// only; the session is one-shot and cannot leave `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

/// One recording session over a captured stream.
///
/// Holds the playback handle, the chunk buffer, and the output path
/// that the control panel's buttons operate on.
pub struct RecordingSession {
    state: Mutex<SessionState>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    buffer: ChunkBuffer,
    playback: Box<dyn PlaybackControl>,
    output: PathBuf,
}

impl RecordingSession {
    /// Wire `stream` into a new idle session and spawn the drain
    /// thread delivering its chunks.
    pub fn new(
        playback: Box<dyn PlaybackControl>,
        stream: MediaStream,
        output: PathBuf,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            state: Mutex::new(SessionState::Idle),
            started_at: Mutex::new(None),
            buffer: ChunkBuffer::new(),
            playback,
            output,
        });

        let mut chunks = stream.chunks;
        let drain = Arc::clone(&session);
        thread::spawn(move || {
            while let Some(chunk) = chunks.blocking_recv() {
                drain.ingest(chunk);
            }
            debug!("[recorder] capture feed closed");
        });

        session
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// One chunk from the capture feed. Buffered only while recording.
    fn ingest(&self, chunk: Vec<u8>) {
        if self.state() == SessionState::Recording {
            self.buffer.push(chunk);
        }
    }

    /// Reset playback to the start and resume it. No guard.
    pub fn replay(&self) {
        info!("[recorder] replaying target from the start");
        self.playback.replay();
    }

    /// Begin buffering captured chunks.
    pub fn start(&self) {
        *self.started_at.lock().unwrap() = Some(Utc::now());
        *self.state.lock().unwrap() = SessionState::Recording;
        info!("[recorder] recording started");
    }

    /// End the session: pause playback, save the buffer, shut the
    /// capture feed down. Saving is fire-and-forget; failures are
    /// logged and not returned.
    pub fn stop(&self) {
        *self.state.lock().unwrap() = SessionState::Stopped;
        self.playback.pause();
        info!(
            "[recorder] playback paused at {:.2}s",
            self.playback.position().as_secs_f64()
        );

        let chunks = self.buffer.len();
        let bytes = self.buffer.total_bytes();
        match self.buffer.save_to_file(&self.output) {
            Ok(()) => info!(
                "[recorder] saved {} chunk(s), {} bytes to {}",
                chunks,
                bytes,
                self.output.display()
            ),
            Err(e) => error!("[recorder] {}", e),
        }

        match *self.started_at.lock().unwrap() {
            Some(started_at) => info!(
                "[recorder] session ran from {} to {}",
                started_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ),
            None => warn!("[recorder] stop without start, nothing was buffered"),
        }

        self.playback.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ffmpeg_next::codec;
    use common::probe::StreamSettings;
    use common::tokio::sync::mpsc::{self, UnboundedSender};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct StubPlayback {
        replayed: AtomicBool,
        paused: AtomicBool,
        shut_down: AtomicBool,
    }

    impl PlaybackControl for Arc<StubPlayback> {
        fn replay(&self) {
            self.replayed.store(true, Ordering::SeqCst);
        }

        fn pause(&self) {
            self.paused.store(true, Ordering::SeqCst);
        }

        fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }

        fn position(&self) -> Duration {
            Duration::from_millis(1500)
        }
    }

    fn test_stream() -> (UnboundedSender<Vec<u8>>, MediaStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = MediaStream {
            settings: StreamSettings {
                width: 640,
                height: 360,
                fps: 30.0,
                codec: codec::Id::H264,
            },
            chunks: rx,
        };
        (tx, stream)
    }

    fn test_session() -> (
        Arc<StubPlayback>,
        UnboundedSender<Vec<u8>>,
        Arc<RecordingSession>,
        tempfile::TempDir,
    ) {
        let stub = Arc::new(StubPlayback::default());
        let (tx, stream) = test_stream();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("download.webm");
        let session = RecordingSession::new(Box::new(Arc::clone(&stub)), stream, output);
        (stub, tx, session, dir)
    }

    #[test]
    fn test_chunks_before_start_are_discarded() {
        let (_stub, _tx, session, _dir) = test_session();

        session.ingest(vec![1, 2]);
        session.start();
        session.ingest(vec![3]);
        session.stop();

        assert_eq!(std::fs::read(session.output_path()).unwrap(), vec![3]);
    }

    #[test]
    fn test_stop_saves_chunks_in_delivery_order() {
        let (stub, _tx, session, _dir) = test_session();

        session.start();
        assert_eq!(session.state(), SessionState::Recording);

        session.ingest(vec![1]);
        session.ingest(vec![]);
        session.ingest(vec![2, 3]);
        session.stop();

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(stub.paused.load(Ordering::SeqCst));
        assert!(stub.shut_down.load(Ordering::SeqCst));
        assert_eq!(
            std::fs::read(session.output_path()).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_stop_without_start_saves_empty_file() {
        let (stub, _tx, session, _dir) = test_session();

        session.stop();

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(stub.paused.load(Ordering::SeqCst));
        assert_eq!(std::fs::read(session.output_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_replay_forwards_to_playback() {
        let (stub, _tx, session, _dir) = test_session();

        session.replay();
        assert!(stub.replayed.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_drain_thread_delivers_chunks_from_the_feed() {
        let (_stub, tx, session, _dir) = test_session();

        session.start();
        tx.send(vec![10, 11]).unwrap();
        tx.send(vec![12]).unwrap();
        drop(tx);

        // Give the drain thread a moment to deliver before stopping.
        thread::sleep(Duration::from_millis(200));
        session.stop();

        assert_eq!(
            std::fs::read(session.output_path()).unwrap(),
            vec![10, 11, 12]
        );
    }
}
