use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub};

/// Rational media timestamp: `value / timescale` seconds.
///
/// All timestamps and durations flowing through a session use this type so
/// that no precision is lost while rebasing or accumulating offsets.
/// Arithmetic between two times with different timescales rescales both to
/// the finer timescale first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: u32,
}

/// Default timescale used when converting from floating-point seconds.
pub const DEFAULT_TIMESCALE: u32 = 600;

impl MediaTime {
    pub fn new(value: i64, timescale: u32) -> Self {
        debug_assert!(timescale > 0, "timescale must be positive");
        Self { value, timescale }
    }

    pub fn zero() -> Self {
        Self::new(0, DEFAULT_TIMESCALE)
    }

    /// Convert floating-point seconds to a rational time at `timescale`.
    pub fn from_seconds(seconds: f64, timescale: u32) -> Self {
        Self::new((seconds * timescale as f64).round() as i64, timescale)
    }

    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Rescale to another timescale. Rounds to the nearest tick.
    pub fn rescaled(&self, timescale: u32) -> Self {
        if self.timescale == timescale {
            return *self;
        }
        let scaled = self.value as i128 * timescale as i128;
        let half = self.timescale as i128 / 2;
        let rounded = if scaled >= 0 { scaled + half } else { scaled - half };
        Self::new((rounded / self.timescale as i128) as i64, timescale)
    }

    /// The finer of the two timescales, used as the common base for arithmetic.
    fn common_timescale(&self, other: &Self) -> u32 {
        self.timescale.max(other.timescale)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        let ts = self.common_timescale(&rhs);
        MediaTime::new(
            self.rescaled(ts).value.saturating_add(rhs.rescaled(ts).value),
            ts,
        )
    }
}

impl AddAssign for MediaTime {
    fn add_assign(&mut self, rhs: MediaTime) {
        *self = *self + rhs;
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        let ts = self.common_timescale(&rhs);
        MediaTime::new(
            self.rescaled(ts).value.saturating_sub(rhs.rescaled(ts).value),
            ts,
        )
    }
}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiplied comparison avoids rounding from rescaling.
        let lhs = self.value as i128 * other.timescale as i128;
        let rhs = other.value as i128 * self.timescale as i128;
        lhs.cmp(&rhs)
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: MediaTime,
    pub end: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, end: MediaTime) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> MediaTime {
        self.end - self.start
    }

    pub fn contains(&self, time: MediaTime) -> bool {
        time >= self.start && time < self.end
    }
}
