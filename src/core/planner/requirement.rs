use bon::bon;
use chrono::TimeDelta;

use crate::quantity::{energy::KilowattHours, power::Kilowatts};

/// How much grid energy tomorrow needs on top of what the battery already holds.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Requirement {
    /// Load not covered by the solar forecast.
    pub shortfall: KilowattHours,

    /// Shortfall with the buffer applied.
    pub top_up: KilowattHours,

    pub energy_to_charge: KilowattHours,
    pub n_slots: usize,
    pub duration: TimeDelta,
}

#[bon]
impl Requirement {
    #[builder]
    pub fn new(
        daily_load: KilowattHours,
        solar_forecast: KilowattHours,
        top_up_buffer: f64,
        usable_residual: KilowattHours,
        charge_rate: Kilowatts,
        slot_duration: TimeDelta,
    ) -> Self {
        // Keep `ceil` from rounding up representation errors like `2.0000000000000004`:
        const EPSILON: f64 = 1e-9;

        let shortfall = (daily_load - solar_forecast).max(KilowattHours::ZERO);
        let top_up = shortfall * (1.0 + top_up_buffer);
        let energy_to_charge = (top_up - usable_residual).max(KilowattHours::ZERO);
        let energy_per_slot = charge_rate * slot_duration;

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_slots = if energy_per_slot > KilowattHours::ZERO {
            (energy_to_charge / energy_per_slot - EPSILON).ceil().max(0.0) as usize
        } else {
            0
        };
        let duration = slot_duration * i32::try_from(n_slots).unwrap_or(i32::MAX);

        Self { shortfall, top_up, energy_to_charge, n_slots, duration }
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.n_slots != 0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{
            planner::runway::{Battery, Runway},
            slot::tests::midnight,
        },
        quantity::percent::Percent,
    };

    #[test]
    fn test_slots_needed() {
        let requirement = Requirement::builder()
            .daily_load(KilowattHours::new(20.0))
            .solar_forecast(KilowattHours::new(16.0))
            .top_up_buffer(0.0)
            .usable_residual(KilowattHours::ZERO)
            .charge_rate(Kilowatts::new(2.7))
            .slot_duration(TimeDelta::minutes(30))
            .build();
        assert_abs_diff_eq!(requirement.shortfall.into_inner(), 4.0);
        assert_eq!(requirement.n_slots, 3);
        assert_eq!(requirement.duration, TimeDelta::minutes(90));
    }

    #[test]
    fn test_buffer_and_residual() {
        let requirement = Requirement::builder()
            .daily_load(KilowattHours::new(20.0))
            .solar_forecast(KilowattHours::new(16.0))
            .top_up_buffer(0.1)
            .usable_residual(KilowattHours::new(1.7))
            .charge_rate(Kilowatts::new(2.7))
            .slot_duration(TimeDelta::minutes(30))
            .build();
        assert_abs_diff_eq!(requirement.top_up.into_inner(), 4.4, epsilon = 1e-9);
        assert_abs_diff_eq!(requirement.energy_to_charge.into_inner(), 2.7, epsilon = 1e-9);
        assert_eq!(requirement.n_slots, 2);
    }

    #[test]
    fn test_sunny_day_requires_nothing() {
        let requirement = Requirement::builder()
            .daily_load(KilowattHours::new(10.0))
            .solar_forecast(KilowattHours::new(25.0))
            .top_up_buffer(0.1)
            .usable_residual(KilowattHours::ZERO)
            .charge_rate(Kilowatts::new(2.7))
            .slot_duration(TimeDelta::minutes(30))
            .build();
        assert_eq!(requirement.shortfall, KilowattHours::ZERO);
        assert!(!requirement.is_required());
    }

    #[test]
    fn test_solar_forecast_leaves_the_discharge_rate_alone() {
        let battery = Battery::builder()
            .state_of_charge(Percent(60))
            .capacity(KilowattHours::new(13.0))
            .charge_rate(Kilowatts::new(2.7))
            .build();
        let daily_load = KilowattHours::new(20.0);
        let runway = Runway::new(&battery, daily_load, midnight());

        let requirements = [0.0, 8.0, 16.0].map(|solar_forecast| {
            Requirement::builder()
                .daily_load(daily_load)
                .solar_forecast(KilowattHours::new(solar_forecast))
                .top_up_buffer(0.0)
                .usable_residual(runway.usable_residual)
                .charge_rate(battery.charge_rate)
                .slot_duration(TimeDelta::minutes(30))
                .build()
        });
        assert_abs_diff_eq!(requirements[0].shortfall.into_inner(), 20.0);
        assert_abs_diff_eq!(requirements[1].shortfall.into_inner(), 12.0);
        assert_abs_diff_eq!(requirements[2].shortfall.into_inner(), 4.0);

        // The runway only depends on the load:
        assert_eq!(Runway::new(&battery, daily_load, midnight()), runway);
        assert_abs_diff_eq!(runway.discharge_rate.into_inner(), 20.0 / 24.0, epsilon = 1e-9);
    }
}
