use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ShippingError, ShippingResult};
use crate::types::RateOption;

#[async_trait]
pub trait ParcelRater: Send + Sync {
    async fn quote(
        &self,
        origin_zip: &str,
        dest_zip: &str,
        weight_lbs: Decimal,
    ) -> ShippingResult<Vec<RateOption>>;
}

/// Thin client for the external parcel-rating API; the JSON shape is the
/// vendor's, treated opaquely.
pub struct ParcelApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ParcelRate {
    carrier: String,
    service: String,
    rate: Decimal,
    delivery_days: Option<i32>,
}

impl ParcelApiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl ParcelRater for ParcelApiClient {
    async fn quote(
        &self,
        origin_zip: &str,
        dest_zip: &str,
        weight_lbs: Decimal,
    ) -> ShippingResult<Vec<RateOption>> {
        let response = self
            .http
            .post(format!("{}/rates", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({
                "origin_zip": origin_zip,
                "dest_zip": dest_zip,
                "weight_lbs": weight_lbs,
            }))
            .send()
            .await
            .map_err(|e| ShippingError::ParcelRater(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ShippingError::ParcelRater(format!(
                "parcel rater returned {}",
                response.status()
            )));
        }
        let rates: Vec<ParcelRate> = response
            .json()
            .await
            .map_err(|e| ShippingError::ParcelRater(e.to_string()))?;

        Ok(rates
            .into_iter()
            .map(|r| RateOption {
                carrier: r.carrier,
                service: r.service,
                cost: r.rate,
                transit_days: r.delivery_days,
                is_cheapest: false,
                is_fallback: false,
            })
            .collect())
    }
}
