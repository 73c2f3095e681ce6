pub mod probe;

pub mod selector;

pub use anyhow;
pub use ffmpeg_next;
pub use log;
pub use tokio;
