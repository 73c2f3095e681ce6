use std::path::Path;

use anyhow::{Context as _, Result};
use ffmpeg_next::{codec, media};

/// Properties of a video stream as negotiated by the demuxer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: codec::Id,
}

/// Open `path` and read out the settings of its best video stream.
///
/// Fails if the file cannot be opened, carries no video stream, or the
/// stream cannot be decoded. Callers treat a failing probe as "not
/// playable".
pub fn probe(path: &Path) -> Result<StreamSettings> {
    let input = ffmpeg_next::format::input(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let stream = input
        .streams()
        .best(media::Type::Video)
        .with_context(|| format!("no video stream in {}", path.display()))?;

    let rate = stream.avg_frame_rate();
    let fps = if rate.denominator() != 0 {
        f64::from(rate)
    } else {
        0.0
    };

    let parameters = stream.parameters();
    let codec_id = parameters.id();

    let decoder = codec::context::Context::from_parameters(parameters)?
        .decoder()
        .video()
        .with_context(|| format!("cannot decode video stream in {}", path.display()))?;

    Ok(StreamSettings {
        width: decoder.width(),
        height: decoder.height(),
        fps,
        codec: codec_id,
    })
}
