use clap::Parser;
use reqwest::Url;

use crate::{api::influx::InfluxSink, prelude::*};

#[derive(Parser)]
pub struct InfluxArgs {
    /// Time-series store for the prices, disabled when omitted.
    #[clap(long = "influxdb-url", env = "INFLUXDB_URL")]
    pub url: Option<Url>,

    #[clap(long = "influxdb-database", env = "INFLUXDB_DATABASE", default_value = "energy")]
    pub database: String,

    #[clap(
        long = "influxdb-measurement",
        env = "INFLUXDB_MEASUREMENT",
        default_value = "unit_rates"
    )]
    pub measurement: String,
}

impl InfluxArgs {
    /// Nothing gets written in dummy mode.
    pub fn sink(&self, dummy: bool, tariff_code: &str) -> Option<InfluxSink> {
        if dummy {
            info!("dummy mode, the prices will not be stored");
            return None;
        }
        let url = self.url.as_ref()?;
        let client = influxdb::Client::new(url.as_str(), &self.database);
        Some(InfluxSink::new(client, self.measurement.clone(), tariff_code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_disabled() {
        let args = InfluxArgs::parse_from(["kestrel", "--influxdb-url", "http://localhost:8086"]);
        assert!(args.sink(true, "E-1R-AGILE").is_none());
        assert!(args.sink(false, "E-1R-AGILE").is_some());
        assert!(InfluxArgs::parse_from(["kestrel"]).sink(false, "E-1R-AGILE").is_none());
    }
}
