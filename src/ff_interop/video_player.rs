use super::{open_video_input, rational_f64, stream_frame_count, stream_frame_rate};
use crate::playback::{FrameNum, FrameRate, MediaInfo, MediaSource, VideoFrame};
use anyhow::Context;
use ffmpeg_next::{
    Packet, Rational, codec, format, frame, software::scaling, util::error::EAGAIN,
};
use log::{debug, info};
use std::path::Path;

/// Index of the frame presented at `timestamp` (in `time_base` units) for a
/// stream starting at `start_time`.
pub fn timestamp_to_frame(
    timestamp: i64,
    start_time: i64,
    time_base: Rational,
    frame_rate: FrameRate,
) -> FrameNum {
    let seconds = (timestamp - start_time) as f64 * rational_f64(time_base);
    FrameNum((seconds * frame_rate.fps()).round().max(0.0) as u64)
}

/// Container-level seek timestamp, in `AV_TIME_BASE` units, for the start of
/// frame `target`.
pub fn frame_to_seek_timestamp(
    target: FrameNum,
    start_time: i64,
    time_base: Rational,
    frame_rate: FrameRate,
) -> i64 {
    let start_seconds = start_time as f64 * rational_f64(time_base);
    let seconds = target.0 as f64 / frame_rate.fps() + start_seconds;
    (seconds * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)).round() as i64
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Received {
    Frame,
    NeedsInput,
    Drained,
}

/// Splits a `receive_frame` result into the decoder's normal states and real
/// decode failures.
fn classify_receive(result: Result<(), ffmpeg_next::Error>) -> anyhow::Result<Received> {
    match result {
        Ok(()) => Ok(Received::Frame),
        Err(ffmpeg_next::Error::Other { errno: EAGAIN }) => Ok(Received::NeedsInput),
        Err(ffmpeg_next::Error::Eof) => Ok(Received::Drained),
        Err(err) => Err(err).context("failed to receive decoded frame from video decoder"),
    }
}

/// Sequential RGB24 decoder over one video stream with frame-accurate seeking.
pub struct FfmpegVideoDecoder {
    stream_index: usize,
    input_ctx: format::context::Input,
    info: MediaInfo,
    time_base: Rational,
    start_time: i64,

    video_decoder: codec::decoder::Video,
    scaler_ctx: scaling::Context,
    decoded_frame: frame::Video,
    rgb_frame: frame::Video,

    position: FrameNum,
    eof_sent: bool,
}

impl FfmpegVideoDecoder {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let (input_ctx, stream_index) = open_video_input(path)?;
        Self::new(input_ctx, stream_index)
    }

    pub fn new(input_ctx: format::context::Input, stream_index: usize) -> anyhow::Result<Self> {
        let video_stream = input_ctx
            .stream(stream_index)
            .with_context(|| format!("failed to locate stream at index {stream_index}"))?;
        info!("got video stream at index {stream_index}");

        let frame_rate = stream_frame_rate(&video_stream);
        let frame_count = stream_frame_count(&video_stream, input_ctx.duration(), frame_rate);
        let time_base = video_stream.time_base();
        let start_time = match video_stream.start_time() {
            // AV_NOPTS_VALUE
            i64::MIN => 0,
            start => start,
        };

        let video_decoder = codec::context::Context::from_parameters(video_stream.parameters())
            .context("failed to create video decoder")
            .and_then(|c| {
                c.decoder()
                    .video()
                    .context("failed to get video from decoder context")
            })?;
        info!("created video decoder");

        let scaler_ctx = scaling::context::Context::get(
            video_decoder.format(),
            video_decoder.width(),
            video_decoder.height(),
            format::Pixel::RGB24,
            video_decoder.width(),
            video_decoder.height(),
            scaling::flag::Flags::BILINEAR,
        )
        .context("failed to create software scaler for pixel reformatting")?;
        info!("created software scaler");

        let info = MediaInfo {
            frame_rate,
            frame_count,
            width: video_decoder.width(),
            height: video_decoder.height(),
        };

        Ok(Self {
            stream_index,
            input_ctx,
            info,
            time_base,
            start_time,
            video_decoder,
            scaler_ctx,
            decoded_frame: frame::Video::empty(),
            rgb_frame: frame::Video::empty(),
            position: FrameNum::ZERO,
            eof_sent: false,
        })
    }

    fn frame_index_of(&self, timestamp: Option<i64>) -> FrameNum {
        let Some(timestamp) = timestamp else {
            return self.position;
        };
        timestamp_to_frame(
            timestamp,
            self.start_time,
            self.time_base,
            self.info.frame_rate,
        )
    }

    fn next_video_packet(&mut self) -> Option<Packet> {
        for (stream, packet) in self.input_ctx.packets() {
            if stream.index() == self.stream_index {
                return Some(packet);
            }
        }
        None
    }

    fn convert_decoded(&mut self, index: FrameNum) -> anyhow::Result<VideoFrame> {
        self.scaler_ctx
            .run(&self.decoded_frame, &mut self.rgb_frame)
            .context("failed to convert decoded video frame to rgb24 pixel format")?;

        Ok(VideoFrame {
            index,
            width: self.rgb_frame.width(),
            height: self.rgb_frame.height(),
            stride: self.rgb_frame.stride(0),
            data: self.rgb_frame.data(0).to_vec(),
        })
    }
}

impl MediaSource for FfmpegVideoDecoder {
    fn info(&self) -> MediaInfo {
        self.info
    }

    fn position(&self) -> FrameNum {
        self.position
    }

    fn seek(&mut self, target: FrameNum) -> anyhow::Result<()> {
        let timestamp = frame_to_seek_timestamp(
            target,
            self.start_time,
            self.time_base,
            self.info.frame_rate,
        );
        let seconds = timestamp as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);

        // lands on the keyframe at or before the target; read_frame decodes
        // forward and drops the pre-roll
        self.input_ctx
            .seek(timestamp, ..=timestamp)
            .with_context(|| format!("failed to seek input to {seconds:.3}s"))?;
        self.video_decoder.flush();
        self.eof_sent = false;
        self.position = target;
        debug!("seeked to frame {target} ({seconds:.3}s)");
        Ok(())
    }

    fn read_frame(&mut self) -> anyhow::Result<Option<VideoFrame>> {
        loop {
            let received = classify_receive(
                self.video_decoder.receive_frame(&mut self.decoded_frame),
            )?;
            match received {
                Received::Frame => {
                    let timestamp = self
                        .decoded_frame
                        .timestamp()
                        .or_else(|| self.decoded_frame.pts());
                    let index = self.frame_index_of(timestamp);
                    // pre-roll between the keyframe and the seek target
                    if index < self.position {
                        continue;
                    }

                    let frame = self.convert_decoded(index)?;
                    self.position = index.next();
                    return Ok(Some(frame));
                }
                Received::Drained => return Ok(None),
                Received::NeedsInput => {}
            }

            if self.eof_sent {
                return Ok(None);
            }

            match self.next_video_packet() {
                Some(packet) => self
                    .video_decoder
                    .send_packet(&packet)
                    .context("failed to send packet from input to video decoder")?,
                None => {
                    debug!("input exhausted, draining decoder");
                    self.video_decoder
                        .send_eof()
                        .context("failed to signal end of input to video decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }
}
