pub mod video_player;

use crate::playback::{FrameNum, FrameRate};
use anyhow::Context;
use ffmpeg_next::{Rational, Stream, format, media::Type};
use log::{debug, info};
use std::path::Path;

/// Opens `path` and locates its best video stream.
pub fn open_video_input(path: &Path) -> anyhow::Result<(format::context::Input, usize)> {
    let input_ctx = format::input(path)
        .with_context(|| format!("failed to get input format context for {path:?} from ffmpeg"))?;

    for stream in input_ctx.streams() {
        debug!(
            "stream {}: {:?}, time base {}",
            stream.index(),
            stream.parameters().medium(),
            stream.time_base()
        );
    }

    let stream_index = input_ctx
        .streams()
        .best(Type::Video)
        .map(|stream| stream.index())
        .with_context(|| format!("failed to locate a video stream in {path:?}"))?;
    info!("using video stream at index {stream_index}");

    Ok((input_ctx, stream_index))
}

/// Average frame rate, falling back to the stream's base rate.
pub fn stream_frame_rate(stream: &Stream) -> FrameRate {
    let avg = FrameRate::from(stream.avg_frame_rate());
    if avg.is_valid() {
        avg
    } else {
        stream.rate().into()
    }
}

/// Frame count from the container, or estimated from the duration when the
/// container doesn't record one.
pub fn stream_frame_count(
    stream: &Stream,
    container_duration: i64,
    frame_rate: FrameRate,
) -> FrameNum {
    estimate_frame_count(
        stream.frames(),
        stream.duration(),
        stream.time_base(),
        container_duration,
        frame_rate,
    )
}

/// Prefers the recorded `frames`, then the stream duration in `time_base`
/// units, then the container duration in `AV_TIME_BASE` units.
pub fn estimate_frame_count(
    frames: i64,
    stream_duration: i64,
    time_base: Rational,
    container_duration: i64,
    frame_rate: FrameRate,
) -> FrameNum {
    if frames > 0 {
        return FrameNum(frames as u64);
    }

    let seconds = if stream_duration > 0 {
        stream_duration as f64 * rational_f64(time_base)
    } else if container_duration > 0 {
        container_duration as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
    } else {
        0.0
    };
    FrameNum((seconds * frame_rate.fps()).round() as u64)
}

pub fn rational_f64(value: Rational) -> f64 {
    if value.denominator() == 0 {
        return 0.0;
    }
    f64::from(value.numerator()) / f64::from(value.denominator())
}
