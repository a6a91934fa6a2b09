use chrono::{DateTime, DurationRound, FixedOffset, TimeDelta, Utc};
use clap::Parser;
use reqwest::Url;

use crate::{api::octopus, ops::Interval, prelude::*};

#[derive(Parser)]
pub struct TariffArgs {
    #[clap(
        long = "octopus-api-url",
        env = "OCTOPUS_API_URL",
        default_value = "https://api.octopus.energy/v1/"
    )]
    pub base_url: Url,

    #[clap(
        long = "product-code",
        env = "OCTOPUS_PRODUCT_CODE",
        default_value = "AGILE-FLEX-22-11-25"
    )]
    pub product_code: String,

    #[clap(
        long = "tariff-code",
        env = "OCTOPUS_TARIFF_CODE",
        default_value = "E-1R-AGILE-FLEX-22-11-25-C"
    )]
    pub tariff_code: String,

    /// Earliest price slot to consider, RFC 3339. Defaults to the current slot.
    #[clap(long = "start", env = "PERIOD_START")]
    pub start: Option<DateTime<FixedOffset>>,

    /// End of the price period, RFC 3339. Defaults to the start plus the horizon.
    #[clap(long = "end", env = "PERIOD_END")]
    pub end: Option<DateTime<FixedOffset>>,

    /// Price period length when the end is not given.
    #[clap(long = "horizon", env = "PERIOD_HORIZON", default_value = "36h")]
    pub horizon: humantime::Duration,
}

impl TariffArgs {
    pub fn api(&self) -> Result<octopus::Api> {
        octopus::Api::new(
            self.base_url.clone(),
            self.product_code.clone(),
            self.tariff_code.clone(),
        )
    }

    pub fn period(&self, now: DateTime<Utc>) -> Result<Interval> {
        let start = match self.start {
            Some(start) => start.to_utc(),
            None => now.duration_trunc(TimeDelta::minutes(30))?,
        };
        let end = match self.end {
            Some(end) => end.to_utc(),
            None => start + TimeDelta::from_std(self.horizon.into())?,
        };
        ensure!(start < end, "the price period is empty: {start} to {end}");
        Ok(Interval::from_std(start..end))
    }
}
