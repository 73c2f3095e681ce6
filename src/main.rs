use std::env;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use common::{ffmpeg_next, selector};
use dioxus::{
    desktop::{Config, WindowBuilder, window},
    prelude::*,
};
use log::{error, info, warn};
use recorder::{Player, RecordingSession};

static CSS: Asset = asset!("/assets/main.css");

/// Fixed name of the recording artifact, written to the working
/// directory when the session stops.
const OUTPUT_FILE: &str = "download.webm";

/// Set once during setup, before the panel launches.
static SESSION: OnceLock<Arc<RecordingSession>> = OnceLock::new();

#[derive(Debug, Default)]
struct CliOptions {
    media_dir: Option<PathBuf>,
    video: Option<PathBuf>,
}

impl CliOptions {
    fn parse(args: impl Iterator<Item = String>) -> Self {
        let mut opts = Self::default();
        let mut args = args.skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--video" => opts.video = args.next().map(PathBuf::from),
                _ if opts.media_dir.is_none() => opts.media_dir = Some(PathBuf::from(arg)),
                _ => warn!("[panel] ignoring extra argument {}", arg),
            }
        }
        opts
    }

    fn media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    info!("recording the widest video in the media directory; pass --video <path> to pick the target yourself");

    let opts = CliOptions::parse(env::args());
    let session = match setup(&opts) {
        Ok(session) => session,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };
    let _ = SESSION.set(session);

    let d_cfg = Config::new()
        .with_window(
            WindowBuilder::new()
                .with_title("Recap")
                .with_decorations(true)
                .with_always_on_top(true),
        )
        .with_background_color((255, 255, 255, 255)) // White background
        .with_disable_context_menu(true);

    dioxus::LaunchBuilder::desktop().with_cfg(d_cfg).launch(app);
}

/// Selection and capture happen here, eagerly; the panel only launches
/// once both have succeeded.
fn setup(opts: &CliOptions) -> Result<Arc<RecordingSession>> {
    ffmpeg_next::init()?;

    let target = selector::select_target(&opts.media_dir(), opts.video.as_deref())?;

    let mut player = Player::open(&target);
    let stream = player.capture_stream()?;
    info!("[capture] video track settings: {:?}", stream.settings());

    Ok(RecordingSession::new(
        Box::new(player),
        stream,
        PathBuf::from(OUTPUT_FILE),
    ))
}

pub fn app() -> Element {
    use_context_provider(|| {
        SESSION
            .get()
            .expect("session is initialized before the panel launches")
            .clone()
    });

    rsx! {
        document::Stylesheet { href: CSS }
        div { class: "panel",
            ReplayButton {}
            StartButton {}
            StopButton {}
        }
    }
}

#[component]
fn ReplayButton() -> Element {
    let session = use_context::<Arc<RecordingSession>>();
    rsx! {
        button {
            class: "panel-button",
            onclick: move |_| session.replay(),
            "Play from start"
        }
    }
}

#[component]
fn StartButton() -> Element {
    let session = use_context::<Arc<RecordingSession>>();
    rsx! {
        button {
            class: "panel-button",
            onclick: move |_| session.start(),
            "Start recording"
        }
    }
}

#[component]
fn StopButton() -> Element {
    let session = use_context::<Arc<RecordingSession>>();
    rsx! {
        button {
            class: "panel-button",
            onclick: move |_| {
                session.stop();
                info!("[panel] control panel closed");
                window().close();
            },
            "Stop recording"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults_to_working_directory() {
        let opts = parse(&["recap"]);
        assert_eq!(opts.media_dir(), PathBuf::from("."));
        assert!(opts.video.is_none());
    }

    #[test]
    fn test_positional_media_directory() {
        let opts = parse(&["recap", "/tmp/videos"]);
        assert_eq!(opts.media_dir(), PathBuf::from("/tmp/videos"));
    }

    #[test]
    fn test_video_override_flag() {
        let opts = parse(&["recap", "--video", "/tmp/clip.mp4"]);
        assert_eq!(opts.video, Some(PathBuf::from("/tmp/clip.mp4")));
        assert_eq!(opts.media_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_override_and_directory_together() {
        let opts = parse(&["recap", "/tmp/videos", "--video", "clip.webm"]);
        assert_eq!(opts.media_dir(), PathBuf::from("/tmp/videos"));
        assert_eq!(opts.video, Some(PathBuf::from("clip.webm")));
    }
}
