use clap::Parser;
use reqwest::Url;

use crate::{
    api::forecast_solar::{self, Plane},
    prelude::*,
    quantity::power::Kilowatts,
};

#[derive(Parser)]
pub struct SolarArgs {
    #[clap(
        long = "forecast-solar-url",
        env = "FORECAST_SOLAR_URL",
        default_value = "https://api.forecast.solar/"
    )]
    pub base_url: Url,

    #[clap(long, env = "LATITUDE", allow_negative_numbers = true)]
    pub latitude: f64,

    #[clap(long, env = "LONGITUDE", allow_negative_numbers = true)]
    pub longitude: f64,

    /// Panel tilt in degrees, 0 being horizontal.
    #[clap(long = "declination", env = "PANEL_DECLINATION", default_value = "35")]
    pub declination: u8,

    /// Panel deviation from south in degrees, west being positive.
    #[clap(
        long = "azimuth",
        env = "PANEL_AZIMUTH",
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub azimuth: i16,

    #[clap(long = "peak-power-kw", env = "PEAK_POWER_KW")]
    pub peak_power: Kilowatts,
}

impl SolarArgs {
    pub fn api(&self) -> Result<forecast_solar::Api> {
        forecast_solar::Api::new(self.base_url.clone())
    }

    pub const fn plane(&self) -> Plane {
        Plane {
            latitude: self.latitude,
            longitude: self.longitude,
            declination: self.declination,
            azimuth: self.azimuth,
            peak_power: self.peak_power,
        }
    }
}
