use super::FrameRate;
use std::{fmt, time::Duration};

/// Playback speed multiplier, always a power of two between 1/16x and 4x.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Speed {
    exponent: i8,
}

impl Speed {
    pub const NORMAL: Self = Self { exponent: 0 };
    pub const MAX: Self = Self { exponent: 2 };
    pub const MIN: Self = Self { exponent: -4 };

    pub fn multiplier(self) -> f64 {
        2f64.powi(i32::from(self.exponent))
    }

    /// Twice as fast, unless already at [`Speed::MAX`].
    pub fn doubled(self) -> Self {
        if self < Self::MAX {
            Self {
                exponent: self.exponent + 1,
            }
        } else {
            self
        }
    }

    /// Half as fast, unless already at [`Speed::MIN`].
    pub fn halved(self) -> Self {
        if self > Self::MIN {
            Self {
                exponent: self.exponent - 1,
            }
        } else {
            self
        }
    }

    /// Text shown in the transport speed label.
    pub fn label(self) -> String {
        format!("Speed: x{self}")
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.multiplier())
    }
}

/// Delay between periodic pulls: `round(1000 / fps / speed)` milliseconds,
/// never shorter than one millisecond.
pub fn frame_interval(rate: FrameRate, speed: Speed) -> Duration {
    let fps = rate.fps();
    if fps <= 0.0 {
        return Duration::from_millis(1000);
    }
    let millis = (1000.0 / fps / speed.multiplier()).round().max(1.0);
    Duration::from_millis(millis as u64)
}
