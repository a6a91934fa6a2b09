use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use clap::Parser;
use enumset::EnumSet;

use crate::{
    core::planner::{PlanningMode, Tier},
    prelude::*,
    quantity::rate::KilowattHourRate,
};

#[derive(Parser)]
pub struct PlannerArgs {
    #[clap(long, env = "PLANNING_MODE", value_enum, default_value = "auto")]
    pub mode: PlanningMode,

    /// Tiers which the automatic mode may walk through.
    #[clap(
        long,
        env = "TIERS",
        value_enum,
        value_delimiter = ',',
        num_args = 1..,
        default_value = "free,super-cheap,economy,best-effort"
    )]
    pub tiers: Vec<Tier>,

    /// Upper bound of the cheap threshold derived from the best 4-hour window, pence per kWh.
    #[clap(long = "cheap-ceiling", env = "CHEAP_CEILING", default_value = "15")]
    pub cheap_ceiling: KilowattHourRate,

    /// Fixed cheap threshold, pence per kWh, used instead of the derived one.
    #[clap(long = "cheap-threshold", env = "CHEAP_THRESHOLD", allow_negative_numbers = true)]
    pub cheap_threshold: Option<KilowattHourRate>,

    /// Gas-equivalent electricity price, pence per kWh.
    #[clap(long = "gas-threshold", env = "GAS_THRESHOLD", default_value = "10.2")]
    pub gas_threshold: KilowattHourRate,

    /// Extra charge on top of the shortfall, as a share of the daily load.
    #[clap(long = "top-up-buffer", env = "TOP_UP_BUFFER", default_value = "0.1")]
    pub top_up_buffer: f64,

    /// Minimal relative saving for the best-effort tier to charge at all.
    #[clap(long = "defer-margin", env = "DEFER_MARGIN", default_value = "0.1")]
    pub defer_margin: f64,

    /// Local time when the solar production starts covering the load.
    #[clap(long = "solar-start", env = "SOLAR_START", default_value = "09:00:00")]
    pub solar_start: NaiveTime,
}

impl PlannerArgs {
    #[must_use]
    pub fn tiers(&self) -> EnumSet<Tier> {
        self.tiers.iter().copied().collect()
    }

    /// The first solar start after the moment.
    pub fn next_solar_availability<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<DateTime<Utc>> {
        let today = now.date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).context("the date is out of range")?;
        let next = [today, tomorrow]
            .into_iter()
            .filter_map(|date| {
                now.timezone().from_local_datetime(&date.and_time(self.solar_start)).earliest()
            })
            .find(|start| start > now)
            .context("failed to find the next solar start")?;
        Ok(next.to_utc())
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn test_defaults() -> Result {
        let args = PlannerArgs::parse_from(["kestrel"]);
        assert_eq!(args.mode, PlanningMode::Auto);
        assert_eq!(args.tiers(), EnumSet::all());
        assert!(args.cheap_threshold.is_none());
        Ok(())
    }

    #[test]
    fn test_fixed_mode_and_tiers() {
        let args =
            PlannerArgs::parse_from(["kestrel", "--mode", "fixed-4h", "--tiers", "free,economy"]);
        assert_eq!(args.mode, PlanningMode::FourHours);
        assert_eq!(args.tiers(), Tier::Free | Tier::Economy);
    }

    #[test]
    fn test_next_solar_availability() -> Result {
        let args = PlannerArgs::parse_from(["kestrel"]);
        let summer_time = FixedOffset::east_opt(3600).unwrap();

        let evening = summer_time.with_ymd_and_hms(2023, 3, 28, 19, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2023, 3, 29, 8, 0, 0).unwrap();
        assert_eq!(args.next_solar_availability(&evening)?, expected);

        let night = summer_time.with_ymd_and_hms(2023, 3, 29, 2, 0, 0).unwrap();
        assert_eq!(args.next_solar_availability(&night)?, expected);
        Ok(())
    }
}
