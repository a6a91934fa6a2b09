pub mod requirement;
pub mod runway;

use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use enumset::EnumSet;
use itertools::Itertools;

use crate::{
    core::{
        economy::EconomySelector,
        merge::{InvalidMergeInputError, merge_runs},
        plan::{ChargePlan, Outcome},
        planner::{
            requirement::Requirement,
            runway::{Battery, Runway},
        },
        slot::{PriceSlot, SlotSeries, mean_cost},
        window::{RankedWindows, Window},
    },
    ops::Interval,
    prelude::*,
    quantity::{
        energy::KilowattHours,
        percent::Percent,
        power::Kilowatts,
        rate::KilowattHourRate,
    },
};

/// Stages of the automatic planning, cheapest first.
#[derive(Debug, clap::ValueEnum, enumset::EnumSetType)]
pub enum Tier {
    /// Zero or negative prices.
    Free,

    /// Prices under the gas-equivalent threshold.
    SuperCheap,

    /// Cheapest slots under the cheap threshold.
    Economy,

    /// Cheapest slots of any price before solar production resumes.
    BestEffort,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum PlanningMode {
    /// Walk the enabled tiers until one covers the requirement.
    Auto,

    /// Economy tier only.
    Economy,

    /// Cheapest ranked 2-hour window.
    #[value(name = "fixed-2h")]
    TwoHours,

    /// Cheapest ranked 4-hour window.
    #[value(name = "fixed-4h")]
    FourHours,

    /// Every upcoming free slot, nothing otherwise.
    FreeOnly,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no price data to plan on")]
    MissingPrices,

    #[error("no solar forecast for {0}")]
    MissingForecast(chrono::NaiveDate),

    #[error("charge rate must be positive, got {0}")]
    NonPositiveChargeRate(Kilowatts),

    #[error(transparent)]
    InsufficientSlots(#[from] InsufficientSlotsError),

    #[error(transparent)]
    InvalidMergeInput(#[from] InvalidMergeInputError),
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("only {available} suitable slot(s) while {required} required")]
pub struct InsufficientSlotsError {
    pub required: usize,
    pub available: usize,
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Planner<'a> {
    series: &'a SlotSeries,
    ranked: &'a RankedWindows,
    now: DateTime<Utc>,
    battery: Battery,
    daily_load: KilowattHours,

    /// Tomorrow's solar yield.
    solar_forecast: KilowattHours,

    /// When the solar production is expected to cover the load again.
    next_solar_availability: DateTime<Utc>,

    #[builder(default = PlanningMode::Auto)]
    mode: PlanningMode,

    /// Tiers which the automatic mode may use.
    #[builder(default = EnumSet::all())]
    tiers: EnumSet<Tier>,

    #[builder(default = 0.1)]
    top_up_buffer: f64,

    gas_threshold: KilowattHourRate,

    /// Overrides the threshold derived from the ranked windows.
    cheap_threshold: Option<KilowattHourRate>,

    /// Minimal relative saving of the best-effort slots over the window average.
    #[builder(default = 0.1)]
    defer_margin: f64,
}

impl<S: planner_builder::IsComplete> PlannerBuilder<'_, S> {
    pub fn plan(self) -> Result<ChargePlan, PlanError> {
        self.build().plan()
    }
}

impl Planner<'_> {
    #[instrument(skip_all, fields(mode = ?self.mode, now = %self.now))]
    fn plan(self) -> Result<ChargePlan, PlanError> {
        if self.series.is_empty() {
            return Err(PlanError::MissingPrices);
        }
        if self.battery.charge_rate <= Kilowatts::ZERO {
            return Err(PlanError::NonPositiveChargeRate(self.battery.charge_rate));
        }

        let runway = Runway::new(&self.battery, self.daily_load, self.now);
        info!(
            usable_residual = %runway.usable_residual,
            discharge_rate = %runway.discharge_rate,
            must_charge_before = %runway.must_charge_before,
            "estimated the runway"
        );

        let requirement = Requirement::builder()
            .daily_load(self.daily_load)
            .solar_forecast(self.solar_forecast)
            .top_up_buffer(self.top_up_buffer)
            .usable_residual(runway.usable_residual)
            .charge_rate(self.battery.charge_rate)
            .slot_duration(self.series.slot_duration())
            .build();
        info!(
            shortfall = %requirement.shortfall,
            top_up = %requirement.top_up,
            energy_to_charge = %requirement.energy_to_charge,
            n_slots = requirement.n_slots,
            "estimated the requirement"
        );

        let target = self.target_state_of_charge(&requirement);
        let plan = match self.mode {
            PlanningMode::Auto => self.plan_auto(&runway, &requirement, target)?,
            PlanningMode::Economy => self.plan_economy(&runway, &requirement, target)?,
            PlanningMode::TwoHours => self.plan_fixed(TimeDelta::hours(2), target)?,
            PlanningMode::FourHours => self.plan_fixed(TimeDelta::hours(4), target)?,
            PlanningMode::FreeOnly => self.plan_free_only(target)?,
        };
        info!(
            outcome = %plan.outcome,
            n_windows = plan.windows.len(),
            duration = ?plan.duration_total(),
            target = %plan.target_state_of_charge,
            "planned"
        );
        Ok(plan)
    }

    fn plan_auto(
        &self,
        runway: &Runway,
        requirement: &Requirement,
        target: Percent,
    ) -> Result<ChargePlan, PlanError> {
        if !requirement.is_required() {
            return Ok(ChargePlan::idle(Outcome::NotRequired, target));
        }
        let before_deadline = Interval::from_std(self.now_start()..runway.must_charge_before);
        let mut available = 0;

        for (tier, outcome, ceiling) in [
            (Tier::Free, Outcome::Free, KilowattHourRate::ZERO),
            (Tier::SuperCheap, Outcome::SuperCheap, self.gas_threshold),
        ] {
            if !self.tiers.contains(tier) {
                continue;
            }
            let slots = self.slots_under(before_deadline, ceiling);
            if slots.len() >= requirement.n_slots {
                return Self::finalize(outcome, slots, target);
            }
            debug!(?tier, n_slots = slots.len(), "not enough slots");
            available = available.max(slots.len());
        }

        if self.tiers.contains(Tier::Economy) {
            let slots = self.select_economy(runway, requirement);
            if slots.len() >= requirement.n_slots {
                return Self::finalize(Outcome::Economy, slots, target);
            }
            debug!(tier = ?Tier::Economy, n_slots = slots.len(), "not enough slots");
            available = available.max(slots.len());
        }

        if self.tiers.contains(Tier::BestEffort) {
            return self.plan_best_effort(runway, requirement, target);
        }
        Err(InsufficientSlotsError { required: requirement.n_slots, available }.into())
    }

    fn plan_economy(
        &self,
        runway: &Runway,
        requirement: &Requirement,
        target: Percent,
    ) -> Result<ChargePlan, PlanError> {
        if !requirement.is_required() {
            return Ok(ChargePlan::idle(Outcome::NotRequired, target));
        }
        let slots = self.select_economy(runway, requirement);
        if slots.len() < requirement.n_slots {
            return Err(InsufficientSlotsError {
                required: requirement.n_slots,
                available: slots.len(),
            }
            .into());
        }
        Self::finalize(Outcome::Economy, slots, target)
    }

    /// Select the economy slots starting between now and the deadline, widening the search back
    /// to the slot in progress when the first attempt falls short.
    fn select_economy(&self, runway: &Runway, requirement: &Requirement) -> Vec<PriceSlot> {
        let now_start = self.now_start();
        let deadline = self
            .series
            .end()
            .map_or(runway.must_charge_before, |end| end.min(runway.must_charge_before));
        let cheap_threshold = self.cheap_threshold.unwrap_or(self.ranked.cheap_threshold);

        let select = |start: DateTime<Utc>| {
            EconomySelector::builder()
                .series(self.series)
                .cheap_threshold(cheap_threshold)
                .range(Interval::from_std(start..deadline))
                .max_slots(requirement.n_slots)
                .select()
        };
        let slots = select(self.now);
        if slots.len() >= requirement.n_slots || now_start >= self.now {
            return slots;
        }
        debug!(n_slots = slots.len(), "widening the economy search…");
        select(now_start)
    }

    fn plan_best_effort(
        &self,
        runway: &Runway,
        requirement: &Requirement,
        target: Percent,
    ) -> Result<ChargePlan, PlanError> {
        if runway.must_charge_before >= self.next_solar_availability {
            info!("the battery lasts until the solar production resumes");
            return Ok(ChargePlan::idle(Outcome::Deferred, target));
        }
        let window = Interval::from_std(
            runway.must_charge_before.max(self.now_start())..self.next_solar_availability,
        );
        let candidates = self.series.starting_within(window).copied().collect_vec();
        let best = candidates
            .iter()
            .copied()
            .sorted_by_key(|slot| (slot.unit_cost, slot.interval.start))
            .take(requirement.n_slots)
            .collect_vec();
        let (Some(best_mean), Some(window_mean)) = (
            mean_cost(best.iter().map(|slot| slot.unit_cost)),
            mean_cost(candidates.iter().map(|slot| slot.unit_cost)),
        ) else {
            return Err(InsufficientSlotsError { required: requirement.n_slots, available: 0 }.into());
        };
        if window_mean - best_mean < window_mean.abs() * self.defer_margin {
            info!(%best_mean, %window_mean, "savings are negligible, deferring");
            return Ok(ChargePlan::idle(Outcome::Deferred, target));
        }
        Self::finalize(Outcome::BestEffort, best, target)
    }

    fn plan_fixed(&self, duration: TimeDelta, target: Percent) -> Result<ChargePlan, PlanError> {
        let Some(window) = self.ranked.best_starting_after(duration, self.now) else {
            let required = duration.num_seconds() / self.series.slot_duration().num_seconds().max(1);
            return Err(InsufficientSlotsError {
                required: usize::try_from(required).unwrap_or_default(),
                available: 0,
            }
            .into());
        };
        Ok(ChargePlan {
            outcome: Outcome::FixedWindow,
            windows: merge_runs([window])?,
            target_state_of_charge: target,
        })
    }

    fn plan_free_only(&self, target: Percent) -> Result<ChargePlan, PlanError> {
        let upcoming = Interval::from_std(self.now_start()..DateTime::<Utc>::MAX_UTC);
        let slots = self.slots_under(upcoming, KilowattHourRate::ZERO);
        if slots.is_empty() {
            return Ok(ChargePlan::idle(Outcome::Deferred, target));
        }
        Self::finalize(Outcome::Free, slots, target)
    }

    fn finalize(
        outcome: Outcome,
        slots: Vec<PriceSlot>,
        target_state_of_charge: Percent,
    ) -> Result<ChargePlan, PlanError> {
        let windows = merge_runs(slots.into_iter().map(Window::from))?;
        Ok(ChargePlan { outcome, windows, target_state_of_charge })
    }

    /// Start of the slot in progress, so that it can still be used.
    fn now_start(&self) -> DateTime<Utc> {
        self.series.slot_at(self.now).map_or(self.now, |slot| slot.interval.start)
    }

    fn slots_under(&self, interval: Interval, ceiling: KilowattHourRate) -> Vec<PriceSlot> {
        self.series
            .starting_within(interval)
            .filter(|slot| slot.unit_cost <= ceiling)
            .copied()
            .collect()
    }

    fn target_state_of_charge(&self, requirement: &Requirement) -> Percent {
        Percent::ceil_from_proportion(
            self.battery.reserve.to_proportion() + requirement.top_up / self.battery.capacity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        slot::tests::{midnight, series},
        window::rank,
    };

    struct Fixture {
        series: SlotSeries,
        battery: Battery,
        daily_load: f64,
        solar_forecast: f64,
        mode: PlanningMode,
        tiers: EnumSet<Tier>,
        next_solar_availability: DateTime<Utc>,
        now: DateTime<Utc>,
        cheap_threshold: Option<f64>,
    }

    impl Fixture {
        /// 6.5 kWh usable, lasting for 26 hours.
        fn new(costs: &[f64]) -> Self {
            Self {
                series: series(costs),
                battery: Battery::builder()
                    .state_of_charge(Percent(60))
                    .capacity(KilowattHours::new(13.0))
                    .reserve(Percent(10))
                    .charge_rate(Kilowatts::new(2.7))
                    .discharge_rate(Kilowatts::new(0.25))
                    .build(),
                daily_load: 20.0,
                solar_forecast: 0.0,
                mode: PlanningMode::Auto,
                tiers: EnumSet::all(),
                next_solar_availability: midnight() + TimeDelta::hours(33),
                now: midnight(),
                cheap_threshold: None,
            }
        }

        fn depleted(mut self) -> Self {
            self.battery.state_of_charge = self.battery.reserve;
            self
        }

        fn plan(&self) -> Result<ChargePlan, PlanError> {
            let ranked = rank(&self.series, KilowattHourRate::new(15.0));
            Planner::builder()
                .series(&self.series)
                .ranked(&ranked)
                .now(self.now)
                .battery(self.battery)
                .daily_load(KilowattHours::new(self.daily_load))
                .solar_forecast(KilowattHours::new(self.solar_forecast))
                .next_solar_availability(self.next_solar_availability)
                .mode(self.mode)
                .tiers(self.tiers)
                .top_up_buffer(0.0)
                .maybe_cheap_threshold(self.cheap_threshold.map(KilowattHourRate::new))
                .gas_threshold(KilowattHourRate::new(10.2))
                .plan()
        }
    }

    fn costs_with(base: f64, overrides: &[(std::ops::Range<usize>, f64)]) -> Vec<f64> {
        let mut costs = vec![base; 48];
        for (range, cost) in overrides {
            costs[range.clone()].fill(*cost);
        }
        costs
    }

    fn at(hours: i64, minutes: i64) -> DateTime<Utc> {
        midnight() + TimeDelta::hours(hours) + TimeDelta::minutes(minutes)
    }

    #[test]
    fn test_flat_day_under_threshold_merges_into_one_window() {
        let series = series(&[9.0; 48]);
        let slots = EconomySelector::builder()
            .series(&series)
            .cheap_threshold(KilowattHourRate::new(15.0))
            .max_slots(48)
            .select();
        assert_eq!(slots.len(), 48);
        let windows = merge_runs(slots.into_iter().map(Window::from)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].duration(), TimeDelta::hours(24));
    }

    #[test]
    fn test_free_tier_takes_all_free_slots() {
        let plan = Fixture::new(&costs_with(9.0, &[(16..32, -1.0)])).plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Free);
        assert_eq!(plan.windows.len(), 1);
        assert_eq!(plan.windows[0].interval, Interval::from_std(at(8, 0)..at(16, 0)));
        assert_eq!(plan.duration_total(), TimeDelta::hours(8));
        assert_eq!(plan.target_state_of_charge, Percent::HUNDRED);
    }

    #[test]
    fn test_free_runs_stay_separate() {
        let mut fixture = Fixture::new(&costs_with(9.0, &[(2..5, -1.0), (17..23, -1.0)]));
        fixture.daily_load = 18.0;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Free);
        let starts =
            plan.windows.iter().map(|window| window.interval.start.to_rfc3339()).collect_vec();
        assert_eq!(starts, ["2023-03-28T01:00:00+00:00", "2023-03-28T08:30:00+00:00"]);
        assert_eq!(plan.windows[0].duration(), TimeDelta::minutes(90));
        assert_eq!(plan.windows[1].duration(), TimeDelta::hours(3));
    }

    #[test]
    fn test_same_inputs_same_plan() {
        let fixture = Fixture::new(&costs_with(9.0, &[(2..5, -1.0), (17..23, -1.0)]));
        assert_eq!(fixture.plan().unwrap(), fixture.plan().unwrap());
    }

    #[test]
    fn test_super_cheap_tier() {
        let mut fixture = Fixture::new(&costs_with(9.0, &[(16..32, -1.0)]));
        fixture.tiers = Tier::SuperCheap | Tier::Economy | Tier::BestEffort;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::SuperCheap);
        assert_eq!(plan.windows.len(), 1);
        assert_eq!(plan.duration_total(), TimeDelta::hours(24));
    }

    #[test]
    fn test_economy_tier() {
        let mut fixture = Fixture::new(&costs_with(20.0, &[(4..8, 11.0)]));
        fixture.daily_load = 11.5;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Economy);
        assert_eq!(plan.windows.len(), 1);
        assert_eq!(plan.windows[0].interval, Interval::from_std(at(2, 0)..at(4, 0)));
        assert_eq!(plan.windows[0].mean_cost, KilowattHourRate::new(11.0));
    }

    #[test]
    fn test_economy_prefers_early_cheap_slots_over_late_ones() {
        let mut fixture = Fixture::new(&costs_with(20.0, &[(2..6, 1.0), (36..40, 12.0)]));
        fixture.mode = PlanningMode::Economy;
        fixture.daily_load = 11.5;
        fixture.cheap_threshold = Some(15.0);
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Economy);
        assert_eq!(plan.windows.len(), 1);
        assert_eq!(plan.windows[0].interval, Interval::from_std(at(1, 0)..at(3, 0)));
        assert_eq!(plan.windows[0].mean_cost, KilowattHourRate::new(1.0));
    }

    #[test]
    fn test_economy_widens_the_search_to_the_slot_in_progress() {
        let mut fixture = Fixture::new(&costs_with(20.0, &[(0..1, 1.0), (4..7, 11.0)]));
        fixture.mode = PlanningMode::Economy;
        fixture.daily_load = 11.5;
        fixture.now = at(0, 10);
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Economy);
        let starts =
            plan.windows.iter().map(|window| window.interval.start.to_rfc3339()).collect_vec();
        assert_eq!(starts, ["2023-03-28T00:00:00+00:00", "2023-03-28T02:00:00+00:00"]);
        assert_eq!(plan.duration_total(), TimeDelta::hours(2));
    }

    #[test]
    fn test_economy_mode_insufficient_slots() {
        let mut fixture = Fixture::new(&costs_with(20.0, &[(4..8, 11.0)]));
        fixture.mode = PlanningMode::Economy;
        let error = fixture.plan().unwrap_err();
        assert!(matches!(
            error,
            PlanError::InsufficientSlots(InsufficientSlotsError { required: 10, available: 4 }),
        ));
    }

    #[test]
    fn test_best_effort_on_depleted_battery() {
        let mut fixture = Fixture::new(&costs_with(25.0, &[(6..9, 12.0)])).depleted();
        fixture.solar_forecast = 16.0;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::BestEffort);
        assert_eq!(plan.windows.len(), 1);
        assert_eq!(plan.windows[0].interval, Interval::from_std(at(3, 0)..at(4, 30)));
        assert_eq!(plan.target_state_of_charge, Percent(41));
    }

    #[test]
    fn test_negligible_savings_defer() {
        let plan = Fixture::new(&[20.0; 48]).depleted().plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Deferred);
        assert!(!plan.is_charging());
    }

    #[test]
    fn test_battery_lasting_until_solar_defers() {
        let mut fixture = Fixture::new(&[20.0; 48]);
        fixture.next_solar_availability = at(9, 0);
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::Deferred);
    }

    #[test]
    fn test_sunny_day_requires_nothing() {
        let mut fixture = Fixture::new(&[20.0; 48]);
        fixture.solar_forecast = 30.0;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::NotRequired);
        assert!(plan.windows.is_empty());
    }

    #[test]
    fn test_fixed_window() {
        let mut fixture = Fixture::new(&costs_with(20.0, &[(4..8, 11.0)]));
        fixture.mode = PlanningMode::TwoHours;
        let plan = fixture.plan().unwrap();
        assert_eq!(plan.outcome, Outcome::FixedWindow);
        assert_eq!(plan.windows[0].interval, Interval::from_std(at(2, 0)..at(4, 0)));
    }

    #[test]
    fn test_free_only_without_free_slots() {
        let mut fixture = Fixture::new(&[20.0; 48]);
        fixture.mode = PlanningMode::FreeOnly;
        assert_eq!(fixture.plan().unwrap().outcome, Outcome::Deferred);
    }

    #[test]
    fn test_missing_prices() {
        let fixture = Fixture::new(&[]);
        assert!(matches!(fixture.plan(), Err(PlanError::MissingPrices)));
    }
}
