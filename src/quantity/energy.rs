use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, percent::Percent, power::Kilowatts};

pub type KilowattHours = Quantity<1, 1, 0>;

impl KilowattHours {
    pub fn from_watt_hours(watt_hours: f64) -> Self {
        Self::new(watt_hours * 0.001)
    }

    /// Counter registers report energy in tenths of a kilowatt-hour.
    pub fn from_hectowatt_hours(hectowatt_hours: u32) -> Self {
        Self::new(f64::from(hectowatt_hours) * 0.1)
    }
}

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}kWh", self.0)
    }
}

impl Mul<Percent> for KilowattHours {
    type Output = Self;

    fn mul(self, percent: Percent) -> Self::Output {
        self * percent.to_proportion()
    }
}

impl Div<Kilowatts> for KilowattHours {
    type Output = TimeDelta;

    fn div(self, rhs: Kilowatts) -> Self::Output {
        #[expect(clippy::cast_possible_truncation)]
        let seconds = (self.0.0 / rhs.0.0 * 3600.0).round() as i64;
        TimeDelta::try_seconds(seconds).unwrap_or(TimeDelta::MAX)
    }
}

impl Div<TimeDelta> for KilowattHours {
    type Output = Kilowatts;

    fn div(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity::new(self.0.0 / hours)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_runway() {
        let runway = KilowattHours::new(6.0) / Kilowatts::new(0.5);
        assert_eq!(runway, TimeDelta::hours(12));
    }

    #[test]
    fn test_average_power() {
        let power = KilowattHours::new(20.0) / TimeDelta::days(1);
        assert_abs_diff_eq!(power.into_inner(), 20.0 / 24.0);
    }

    #[test]
    fn test_from_hectowatt_hours() {
        assert_abs_diff_eq!(KilowattHours::from_hectowatt_hours(12345).into_inner(), 1234.5);
    }
}
