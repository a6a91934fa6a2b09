use std::fmt::{Debug, Display, Formatter};

/// Whole percent, the way the inverter stores state-of-charge registers.
#[derive(
    Clone,
    Copy,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    serde::Deserialize,
    serde::Serialize,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Into,
)]
#[must_use]
pub struct Percent(pub u16);

impl Percent {
    pub const HUNDRED: Self = Self(100);

    pub fn to_proportion(self) -> f64 {
        0.01 * f64::from(self.0)
    }

    /// Round the proportion up to the whole percent, clamped to `0..=100`.
    pub fn ceil_from_proportion(proportion: f64) -> Self {
        // Absorb the representation error of products like `0.3 * 100.0`:
        const EPSILON: f64 = 1e-9;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (proportion * 100.0 - EPSILON).ceil().clamp(0.0, 100.0) as u16;
        Self(percent)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Debug for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
