use bon::Builder;
use chrono::{Local, NaiveDateTime, Utc};
use clap::Parser;

use crate::{
    api::{influx::PriceSink, inverter::Inverter},
    cli::{
        battery::BatteryArgs,
        device::DeviceArgs,
        heartbeat::HeartbeatArgs,
        influx::InfluxArgs,
        planner::PlannerArgs,
        solar::SolarArgs,
        tariff::TariffArgs,
    },
    core::{
        plan::ChargePlan,
        planner::{PlanError, Planner},
        schedule::DeviceSchedule,
        slot::SlotSeries,
        window::rank,
    },
    prelude::*,
    tables::{
        build_device_schedule_table,
        build_plan_table,
        build_price_statistics_table,
        build_prices_table,
        build_ranked_windows_table,
    },
};

#[derive(Parser)]
pub struct HuntArgs {
    /// Compute the plan but write nothing to the inverter nor the time-series store.
    #[clap(long, env = "DUMMY")]
    dummy: bool,

    #[clap(flatten)]
    tariff: TariffArgs,

    #[clap(flatten)]
    solar: SolarArgs,

    #[clap(flatten)]
    battery: BatteryArgs,

    #[clap(flatten)]
    device: DeviceArgs,

    #[clap(flatten)]
    planner: PlannerArgs,

    #[clap(flatten)]
    influx: InfluxArgs,

    #[clap(flatten)]
    heartbeat: HeartbeatArgs,
}

impl HuntArgs {
    pub async fn run(self) -> Result {
        let result = self.hunt().await;
        self.heartbeat.send(result.is_ok()).await;
        result
    }

    #[instrument(skip_all, fields(dummy = self.dummy))]
    async fn hunt(&self) -> Result {
        let now = Utc::now();
        let local_now = now.with_timezone(&Local);

        let records = self.tariff.api()?.get_unit_rates(self.tariff.period(now)?).await?;
        let series = SlotSeries::try_from_records(records)?;
        info!(
            n_slots = series.len(),
            min = ?series.cheapest().map(|slot| slot.unit_cost),
            max = ?series.most_expensive().map(|slot| slot.unit_cost),
            mean = ?series.mean_cost(),
            "fetched the prices"
        );
        let ranked = rank(&series, self.planner.cheap_ceiling);
        let cheap_threshold = self.planner.cheap_threshold.unwrap_or(ranked.cheap_threshold);
        println!("{}", build_prices_table(&series, cheap_threshold));
        println!("{}", build_price_statistics_table(&series));
        println!("{}", build_ranked_windows_table(&ranked));

        let tomorrow = local_now.date_naive().succ_opt().context("the date is out of range")?;
        let solar_forecast = *self
            .solar
            .api()?
            .get_daily_yields(&self.solar.plane())
            .await?
            .get(&tomorrow)
            .ok_or(PlanError::MissingForecast(tomorrow))?;
        info!(%tomorrow, %solar_forecast, "fetched the solar forecast");

        let inverter = self.device.inverter(self.dummy);
        let state_of_charge =
            inverter.read_state_of_charge().await.context("failed to read the state of charge")?;
        let daily_load = match self.battery.daily_load {
            Some(daily_load) => daily_load,
            None => {
                inverter.read_average_daily_load().await.context("failed to read the daily load")?
            }
        };

        let plan = Planner::builder()
            .series(&series)
            .ranked(&ranked)
            .now(now)
            .battery(self.battery.battery(state_of_charge)?)
            .daily_load(daily_load)
            .solar_forecast(solar_forecast)
            .next_solar_availability(self.planner.next_solar_availability(&local_now)?)
            .mode(self.planner.mode)
            .tiers(self.planner.tiers())
            .top_up_buffer(self.planner.top_up_buffer)
            .gas_threshold(self.planner.gas_threshold)
            .maybe_cheap_threshold(self.planner.cheap_threshold)
            .defer_margin(self.planner.defer_margin)
            .plan()?;
        println!("{}", build_plan_table(&plan));

        let schedule = DeviceSchedule::from_windows(&plan.windows, &Local);
        println!("{}", build_device_schedule_table(&schedule));

        let sink = self.influx.sink(self.dummy, &self.tariff.tariff_code);
        Commit::builder()
            .series(&series)
            .plan(&plan)
            .schedule(&schedule)
            .inverter(&inverter)
            .maybe_sink(sink.as_ref().map(|sink| sink as &dyn PriceSink))
            .maybe_clock(if self.dummy { None } else { Some(local_now.naive_local()) })
            .run()
            .await
    }
}

/// Side effects of a successful plan, in order: the prices, the device clock, and the schedule.
#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
struct Commit<'a> {
    series: &'a SlotSeries,
    plan: &'a ChargePlan,
    schedule: &'a DeviceSchedule,
    inverter: &'a Inverter,

    /// Prices are not stored when absent.
    sink: Option<&'a dyn PriceSink>,

    /// Host local time to set the device clock to, the clock is left alone when absent.
    clock: Option<NaiveDateTime>,
}

impl<S: commit_builder::IsComplete> CommitBuilder<'_, S> {
    async fn run(self) -> Result {
        self.build().run().await
    }
}

impl Commit<'_> {
    #[instrument(skip_all)]
    async fn run(self) -> Result {
        if let Some(sink) = self.sink {
            sink.write_prices(self.series).await?;
        }
        if let Some(now) = self.clock {
            self.inverter.sync_clock(now).await.context("failed to synchronise the device clock")?;
        }
        self.inverter
            .apply(self.schedule, self.plan.target_state_of_charge, self.plan.is_charging())
            .await
            .context("failed to apply the schedule")?;
        Ok(())
    }
}
