use super::{FrameNum, FrameRate};
use std::time::Duration;

/// One decoded picture, packed as 8-bit RGB rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub index: FrameNum,
    pub width: u32,
    pub height: u32,
    /// Bytes per row in `data`, at least `width * 3`.
    pub stride: usize,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Repacks the frame into tightly packed RGBA with opaque alpha.
    pub fn to_rgba(&self) -> Vec<u8> {
        let (width, height) = (self.width as usize, self.height as usize);
        let mut rgba = Vec::with_capacity(width * height * 4);
        for row in self.data.chunks(self.stride.max(1)).take(height) {
            let Some(pixels) = row.get(..width * Self::BYTES_PER_PIXEL) else {
                break;
            };
            for px in pixels.chunks_exact(Self::BYTES_PER_PIXEL) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
            }
        }
        rgba
    }
}

/// Properties read once when a media file is opened.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub frame_rate: FrameRate,
    pub frame_count: FrameNum,
    pub width: u32,
    pub height: u32,
}

/// An open, seekable, decodable video stream.
pub trait MediaSource {
    fn info(&self) -> MediaInfo;

    /// Index of the frame the next [`MediaSource::read_frame`] will return.
    fn position(&self) -> FrameNum;

    fn seek(&mut self, target: FrameNum) -> anyhow::Result<()>;

    /// Decodes the frame at [`MediaSource::position`] and advances past it.
    /// `Ok(None)` means the stream is exhausted.
    fn read_frame(&mut self) -> anyhow::Result<Option<VideoFrame>>;
}

/// Periodic trigger driving frame pulls.
pub trait FrameTimer {
    fn start(&mut self, interval: Duration);

    fn stop(&mut self);

    /// Retargets the cadence; a running timer keeps running.
    fn set_interval(&mut self, interval: Duration);

    fn is_active(&self) -> bool;
}

/// Where the controller's observable effects land.
pub trait FrameSink {
    fn show_frame(&mut self, frame: &VideoFrame);

    fn show_speed(&mut self, text: &str);
}
