//! Battery-related CLI arguments.

use clap::Parser;

use crate::{
    core::planner::runway::Battery,
    quantity::{energy::KilowattHours, percent::Percent, power::Kilowatts},
};

#[derive(Parser)]
pub struct BatteryArgs {
    #[clap(long = "battery-capacity-kwh", env = "BATTERY_CAPACITY_KWH", default_value = "13")]
    pub capacity: KilowattHours,

    /// Grid charging power in kilowatts.
    #[clap(long = "charge-rate-kw", env = "CHARGE_RATE_KW", default_value = "2.7")]
    pub charge_rate: Kilowatts,

    /// Minimal state-of-charge percent, the battery never discharges below it.
    #[clap(long = "reserve-percent", env = "RESERVE_PERCENT", default_value = "10")]
    pub reserve: Percent,

    /// Start charging this long before the battery would run flat.
    #[clap(long = "safety-margin", env = "SAFETY_MARGIN", default_value = "0s")]
    pub safety_margin: humantime::Duration,

    /// Average discharge power, derived from the daily load when omitted.
    #[clap(long = "discharge-rate-kw", env = "DISCHARGE_RATE_KW")]
    pub discharge_rate: Option<Kilowatts>,

    /// Daily load, read from the inverter counters when omitted.
    #[clap(long = "daily-load-kwh", env = "DAILY_LOAD_KWH")]
    pub daily_load: Option<KilowattHours>,
}

impl BatteryArgs {
    pub fn battery(&self, state_of_charge: Percent) -> crate::prelude::Result<Battery> {
        Ok(Battery::builder()
            .state_of_charge(state_of_charge)
            .capacity(self.capacity)
            .reserve(self.reserve)
            .charge_rate(self.charge_rate)
            .maybe_discharge_rate(self.discharge_rate)
            .safety_margin(chrono::TimeDelta::from_std(self.safety_margin.into())?)
            .build())
    }
}
