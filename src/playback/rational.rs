use ffmpeg_next::Rational;

/// Nominal frame rate of a stream as an exact fraction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRate {
    pub num: i32,
    pub den: i32,
}

impl FrameRate {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn fps(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// A usable rate has a strictly positive numerator and denominator.
    pub fn is_valid(self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Whole frames covered by `seconds` of playback, truncated.
    pub fn frames_in(self, seconds: u64) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        // exact integer math so 30000/1001 doesn't drift
        let frames = u128::from(seconds) * self.num as u128 / self.den as u128;
        u64::try_from(frames).unwrap_or(u64::MAX)
    }
}

impl From<Rational> for FrameRate {
    fn from(value: Rational) -> Self {
        Self {
            num: value.numerator(),
            den: value.denominator(),
        }
    }
}
