use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::{
    cli::{device::DeviceArgs, tariff::TariffArgs},
    core::{slot::SlotSeries, window::rank},
    prelude::*,
    quantity::rate::KilowattHourRate,
    tables::{
        build_device_schedule_table,
        build_price_statistics_table,
        build_prices_table,
        build_ranked_windows_table,
    },
};

#[derive(Parser)]
pub struct PerchArgs {
    #[command(subcommand)]
    command: PerchCommand,
}

impl PerchArgs {
    pub async fn run(self) -> Result {
        match self.command {
            PerchCommand::StateOfCharge(args) => {
                let state_of_charge = args.inverter(true).read_state_of_charge().await?;
                println!("{state_of_charge}");
            }
            PerchCommand::Schedule(args) => {
                let schedule = args.inverter(true).read_schedule().await?;
                println!("{}", build_device_schedule_table(&schedule));
            }
            PerchCommand::Prices(args) => args.run().await?,
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum PerchCommand {
    /// Read the battery state-of-charge.
    StateOfCharge(DeviceArgs),

    /// Read the charging slots programmed into the inverter.
    Schedule(DeviceArgs),

    /// Fetch and rank the prices.
    Prices(PerchPricesArgs),
}

#[derive(Parser)]
struct PerchPricesArgs {
    #[clap(flatten)]
    tariff: TariffArgs,

    #[clap(long = "cheap-ceiling", env = "CHEAP_CEILING", default_value = "15")]
    cheap_ceiling: KilowattHourRate,
}

impl PerchPricesArgs {
    #[instrument(skip_all)]
    async fn run(self) -> Result {
        let records = self.tariff.api()?.get_unit_rates(self.tariff.period(Utc::now())?).await?;
        let series = SlotSeries::try_from_records(records)?;
        let ranked = rank(&series, self.cheap_ceiling);
        info!(cheap_threshold = %ranked.cheap_threshold, "ranked the windows");
        println!("{}", build_prices_table(&series, ranked.cheap_threshold));
        println!("{}", build_price_statistics_table(&series));
        println!("{}", build_ranked_windows_table(&ranked));
        Ok(())
    }
}
