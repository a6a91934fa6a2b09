use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};

use crate::quantity::{energy::KilowattHours, percent::Percent, power::Kilowatts};

#[derive(Copy, Clone, Debug, Builder)]
pub struct Battery {
    pub state_of_charge: Percent,
    pub capacity: KilowattHours,

    /// State-of-charge the battery never discharges below.
    #[builder(default = Percent(10))]
    pub reserve: Percent,

    pub charge_rate: Kilowatts,

    /// Overrides the average rate derived from the daily load.
    pub discharge_rate: Option<Kilowatts>,

    /// How long before running flat the charging must start.
    #[builder(default = TimeDelta::zero())]
    pub safety_margin: TimeDelta,
}

impl Battery {
    /// Energy stored above the reserve.
    pub fn usable_residual(&self) -> KilowattHours {
        (self.capacity * self.state_of_charge - self.capacity * self.reserve).max(KilowattHours::ZERO)
    }
}

/// How long the battery lasts on its own.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Runway {
    pub usable_residual: KilowattHours,
    pub discharge_rate: Kilowatts,
    pub until_empty: TimeDelta,

    /// Never earlier than the current time.
    pub must_charge_before: DateTime<Utc>,
}

impl Runway {
    pub fn new(battery: &Battery, daily_load: KilowattHours, now: DateTime<Utc>) -> Self {
        let discharge_rate =
            battery.discharge_rate.unwrap_or_else(|| daily_load / TimeDelta::days(1));
        let usable_residual = battery.usable_residual();
        let until_empty = if discharge_rate > Kilowatts::ZERO {
            usable_residual / discharge_rate
        } else {
            TimeDelta::MAX
        };
        let lead = until_empty
            .checked_sub(&battery.safety_margin)
            .unwrap_or_else(TimeDelta::zero)
            .max(TimeDelta::zero());
        let must_charge_before = now.checked_add_signed(lead).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { usable_residual, discharge_rate, until_empty, must_charge_before }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::slot::tests::midnight;

    fn battery(state_of_charge: u16) -> Battery {
        Battery::builder()
            .state_of_charge(Percent(state_of_charge))
            .capacity(KilowattHours::new(13.0))
            .reserve(Percent(10))
            .charge_rate(Kilowatts::new(2.7))
            .build()
    }

    #[test]
    fn test_runway_from_daily_load() {
        // 13 kWh × 50% usable at 0.5 kW:
        let runway = Runway::new(&battery(60), KilowattHours::new(12.0), midnight());
        assert_abs_diff_eq!(runway.usable_residual.into_inner(), 6.5, epsilon = 1e-9);
        assert_abs_diff_eq!(runway.discharge_rate.into_inner(), 0.5, epsilon = 1e-9);
        assert_eq!(runway.until_empty, TimeDelta::hours(13));
        assert_eq!(runway.must_charge_before, midnight() + TimeDelta::hours(13));
    }

    #[test]
    fn test_safety_margin() {
        let battery = Battery { safety_margin: TimeDelta::hours(1), ..battery(60) };
        let runway = Runway::new(&battery, KilowattHours::new(12.0), midnight());
        assert_eq!(runway.must_charge_before, midnight() + TimeDelta::hours(12));
    }

    #[test]
    fn test_depleted_battery_must_charge_now() {
        let battery = Battery { safety_margin: TimeDelta::hours(1), ..battery(5) };
        let runway = Runway::new(&battery, KilowattHours::new(12.0), midnight());
        assert_eq!(runway.usable_residual, KilowattHours::ZERO);
        assert_eq!(runway.must_charge_before, midnight());
    }

    #[test]
    fn test_discharge_rate_override() {
        let battery = Battery { discharge_rate: Some(Kilowatts::new(1.3)), ..battery(60) };
        let runway = Runway::new(&battery, KilowattHours::new(12.0), midnight());
        assert_eq!(runway.until_empty, TimeDelta::hours(5));
    }

    #[test]
    fn test_no_load_lasts_forever() {
        let runway = Runway::new(&battery(60), KilowattHours::ZERO, midnight());
        assert_eq!(runway.must_charge_before, DateTime::<Utc>::MAX_UTC);
    }
}
