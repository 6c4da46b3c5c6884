use derive_more::{Display, From};

/// Zero-based index of a decodable frame within a video stream.
#[derive(Debug, Default, Display, From, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameNum(pub u64);

impl FrameNum {
    pub const ZERO: Self = Self(0);

    pub fn saturating_add(self, frames: u64) -> Self {
        Self(self.0.saturating_add(frames))
    }

    pub fn saturating_sub(self, frames: u64) -> Self {
        Self(self.0.saturating_sub(frames))
    }

    /// The next frame index, used after a frame at `self` has been consumed.
    pub fn next(self) -> Self {
        self.saturating_add(1)
    }
}
