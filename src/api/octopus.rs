use chrono::{DateTime, Utc};
use reqwest::{Client, Url, header::HeaderMap};
use serde::Deserialize;

use crate::{
    api::client::{get_json, try_new},
    ops::Interval,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Octopus Energy REST API client for the tariff unit rates.
pub struct Api {
    client: Client,
    base_url: Url,
    product_code: String,
    tariff_code: String,
}

impl Api {
    /// Guards against a misbehaving `next` link.
    const MAX_PAGES: usize = 16;

    pub fn new(base_url: Url, product_code: String, tariff_code: String) -> Result<Self> {
        Ok(Self { client: try_new(HeaderMap::new())?, base_url, product_code, tariff_code })
    }

    /// Fetch the unit rates which are valid within the period, following the pagination.
    ///
    /// The API returns them in reverse-chronological order, the caller is expected to sort them.
    #[instrument(skip_all, fields(product = %self.product_code, tariff = %self.tariff_code))]
    pub async fn get_unit_rates(&self, period: Interval) -> Result<Vec<(Interval, KilowattHourRate)>> {
        info!(?period, "fetching the unit rates…");
        let mut url = self.base_url.join(&format!(
            "products/{}/electricity-tariffs/{}/standard-unit-rates/",
            self.product_code, self.tariff_code,
        ))?;
        let mut query = vec![
            ("period_from", format_timestamp(period.start)),
            ("period_to", format_timestamp(period.end)),
        ];
        let mut rates = Vec::new();
        for _ in 0..Self::MAX_PAGES {
            let page: Page = get_json(&self.client, url, &query).await?;
            rates.extend(page.results.into_iter().map(UnitRate::into_record));
            let Some(next) = page.next else {
                info!(n_rates = rates.len(), "fetched the unit rates");
                return Ok(rates);
            };
            // The link carries the query already:
            url = Url::parse(&next)?;
            query.clear();
        }
        bail!("the unit rates span more than {} pages", Self::MAX_PAGES)
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Deserialize)]
struct Page {
    next: Option<String>,
    results: Vec<UnitRate>,
}

#[derive(Deserialize)]
struct UnitRate {
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,

    /// Pence per kilowatt-hour.
    value_inc_vat: f64,
}

impl UnitRate {
    fn into_record(self) -> (Interval, KilowattHourRate) {
        (Interval::from_std(self.valid_from..self.valid_to), KilowattHourRate::new(self.value_inc_vat))
    }
}
