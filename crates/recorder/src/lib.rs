pub mod player;
pub mod session;

pub use player::{MediaStream, Player};
pub use session::{PlaybackControl, RecordingSession, SessionState};
