use async_trait::async_trait;
use chrono::{DateTime, Utc};
use influxdb::{Client, InfluxDbWriteable};

use crate::{core::slot::SlotSeries, prelude::*};

/// Receives the full price series once per run.
#[async_trait]
pub trait PriceSink: Send + Sync {
    async fn write_prices(&self, series: &SlotSeries) -> Result;
}

#[derive(InfluxDbWriteable)]
struct UnitRateReading {
    time: DateTime<Utc>,

    /// Pence per kilowatt-hour.
    unit_cost: f64,

    duration_minutes: i64,

    #[influxdb(tag)]
    tariff: String,
}

pub struct InfluxSink {
    client: Client,
    measurement: String,
    tariff: String,
}

impl InfluxSink {
    pub fn new(client: Client, measurement: String, tariff: String) -> Self {
        Self { client, measurement, tariff }
    }
}

#[async_trait]
impl PriceSink for InfluxSink {
    #[instrument(skip_all, fields(measurement = %self.measurement))]
    async fn write_prices(&self, series: &SlotSeries) -> Result {
        info!(n_slots = series.len(), "writing the prices…");
        let readings = series
            .iter()
            .map(|slot| {
                UnitRateReading {
                    time: slot.interval.start,
                    unit_cost: slot.unit_cost.into_inner(),
                    duration_minutes: slot.interval.len().num_minutes(),
                    tariff: self.tariff.clone(),
                }
                .into_query(&self.measurement)
            })
            .collect::<Vec<_>>();
        if readings.is_empty() {
            return Ok(());
        }
        self.client.query(readings).await.context("failed to write the prices")?;
        Ok(())
    }
}
