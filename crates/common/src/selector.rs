use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use log::{debug, info};

use crate::probe::{self, StreamSettings};

/// File extensions treated as playable video.
const VIDEO_EXTENSIONS: &[&str] = &["avi", "m4v", "mkv", "mov", "mp4", "webm"];

/// One playable video found in the media directory.
#[derive(Debug, Clone)]
pub struct VideoCandidate {
    pub path: PathBuf,
    pub settings: StreamSettings,
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Enumerate the playable videos in `dir`, in file-name order.
///
/// Files that fail to probe are not playable and are skipped.
pub fn scan_dir(dir: &Path) -> Result<Vec<VideoCandidate>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_video_extension(path))
        .collect();
    paths.sort();

    let mut candidates = Vec::new();
    for path in paths {
        match probe::probe(&path) {
            Ok(settings) => {
                debug!(
                    "[selector] found {} ({}x{} @ {:.2}fps)",
                    path.display(),
                    settings.width,
                    settings.height,
                    settings.fps
                );
                candidates.push(VideoCandidate { path, settings });
            }
            Err(e) => debug!("[selector] skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(candidates)
}

/// The candidate with strictly maximal width. Ties keep the earliest.
pub fn pick_widest(candidates: &[VideoCandidate]) -> Option<&VideoCandidate> {
    let mut best = candidates.first()?;
    for candidate in &candidates[1..] {
        if candidate.settings.width > best.settings.width {
            best = candidate;
        }
    }
    Some(best)
}

/// Resolve the recording target.
///
/// A preset path wins unconditionally; otherwise the widest video in
/// `dir` is taken as the main one. No playable video is fatal.
pub fn select_target(dir: &Path, preset: Option<&Path>) -> Result<VideoCandidate> {
    if let Some(path) = preset {
        let settings = probe::probe(path)?;
        info!("[selector] using preset target {}", path.display());
        return Ok(VideoCandidate {
            path: path.to_path_buf(),
            settings,
        });
    }

    let candidates = scan_dir(dir)?;
    let Some(best) = pick_widest(&candidates) else {
        bail!("no playable video found in {}", dir.display());
    };
    info!(
        "[selector] selected {} ({}x{}) out of {} candidate(s)",
        best.path.display(),
        best.settings.width,
        best.settings.height,
        candidates.len()
    );
    Ok(best.clone())
}
