use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::{
    Client,
    Url,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde::Deserialize;

use crate::{
    api::client::{get_json, try_new},
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// PV array as forecast.solar describes it.
#[derive(Copy, Clone, Debug)]
pub struct Plane {
    pub latitude: f64,
    pub longitude: f64,

    /// Tilt, 0 being horizontal.
    pub declination: u8,

    /// Deviation from south, -180 to 180.
    pub azimuth: i16,

    pub peak_power: Kilowatts,
}

pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn new(base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(ACCEPT, HeaderValue::from_static("application/json"))]);
        Ok(Self { client: try_new(headers)?, base_url })
    }

    /// Fetch the estimated daily yields of the plane, keyed by the local date.
    #[instrument(skip_all)]
    pub async fn get_daily_yields(&self, plane: &Plane) -> Result<BTreeMap<NaiveDate, KilowattHours>> {
        info!(?plane, "fetching the solar forecast…");
        let url = self.base_url.join(&format!(
            "estimate/watthours/day/{}/{}/{}/{}/{}",
            plane.latitude,
            plane.longitude,
            plane.declination,
            plane.azimuth,
            plane.peak_power.into_inner(),
        ))?;
        let response: Response = get_json(&self.client, url, &[]).await?;
        Ok(response.into_daily_yields())
    }
}

#[derive(Deserialize)]
struct Response {
    /// Watt-hours per date.
    result: BTreeMap<NaiveDate, f64>,
}

impl Response {
    fn into_daily_yields(self) -> BTreeMap<NaiveDate, KilowattHours> {
        self.result
            .into_iter()
            .map(|(date, watt_hours)| (date, KilowattHours::from_watt_hours(watt_hours)))
            .collect()
    }
}
