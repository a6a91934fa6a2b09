use std::{
    fmt::{Debug, Formatter},
    ops::Sub,
};

use chrono::{DateTime, Utc};

pub type Interval<Tz = Utc> = RangeExclusive<DateTime<Tz>>;

#[must_use]
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct RangeExclusive<T: Copy> {
    /// Inclusive.
    pub start: T,

    /// Exclusive.
    pub end: T,
}

impl<T: Copy + Debug> Debug for RangeExclusive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl<T: Copy> RangeExclusive<T> {
    pub const fn from_std(range: std::ops::Range<T>) -> Self {
        Self { start: range.start, end: range.end }
    }
}

impl<T: Copy + Sub> RangeExclusive<T> {
    #[must_use]
    pub fn len(self) -> <T as Sub>::Output {
        self.end - self.start
    }
}

impl<T: Copy + PartialOrd> RangeExclusive<T> {
    #[must_use]
    pub fn contains(self, other: T) -> bool {
        (self.start <= other) && (other < self.end)
    }

    /// Check whether the closed ranges `[start, end]` intersect, so touching ends count.
    #[must_use]
    pub fn touches(self, other: Self) -> bool {
        (self.start <= other.end) && (other.start <= self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let range = RangeExclusive::from_std(1..3);
        assert!(!range.contains(0));
        assert!(range.contains(1));
        assert!(!range.contains(3));
    }

    #[test]
    fn test_touches() {
        let range = RangeExclusive::from_std(1..3);
        assert!(range.touches(RangeExclusive::from_std(3..5)));
        assert!(range.touches(RangeExclusive::from_std(0..1)));
        assert!(range.touches(RangeExclusive::from_std(2..4)));
        assert!(!range.touches(RangeExclusive::from_std(4..5)));
    }
}
