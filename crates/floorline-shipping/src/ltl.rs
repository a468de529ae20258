use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ShippingError, ShippingResult};
use crate::types::RateOption;

#[derive(Clone, Debug)]
pub struct LtlLine {
    pub freight_class: String,
    /// rounded up to whole pounds before it reaches the rater
    pub weight_lbs: i64,
}

#[derive(Clone, Debug)]
pub struct LtlRequest {
    pub origin_zip: String,
    pub dest_zip: String,
    pub lines: Vec<LtlLine>,
    pub pickup_date: NaiveDate,
    pub residential: bool,
    pub liftgate: bool,
}

#[async_trait]
pub trait LtlRater: Send + Sync {
    async fn quote(&self, request: &LtlRequest) -> ShippingResult<Vec<RateOption>>;
}

/// Pickup never lands on a weekend.
pub fn next_business_day(from: NaiveDate) -> NaiveDate {
    let mut date = from + Duration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }
    date
}

pub fn default_pickup_date() -> NaiveDate {
    next_business_day(Utc::now().date_naive())
}

/// FreightView-style client: OAuth client credentials, token cached
/// per-process and refreshed well before the hour it lives for.
pub struct FreightViewClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token_cache: moka::future::Cache<&'static str, String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct LtlQuote {
    carrier: String,
    #[serde(default)]
    service: Option<String>,
    total: Decimal,
    transit_days: Option<i32>,
}

impl FreightViewClient {
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        let token_cache = moka::future::Cache::builder()
            .max_capacity(1)
            .time_to_live(std::time::Duration::from_secs(50 * 60))
            .build();
        Self {
            http: reqwest::Client::new(),
            base_url,
            client_id,
            client_secret,
            token_cache,
        }
    }

    async fn token(&self) -> ShippingResult<String> {
        if let Some(token) = self.token_cache.get("token").await {
            return Ok(token);
        }
        let response = self
            .http
            .post(format!("{}/auth/token", self.base_url))
            .json(&serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| ShippingError::LtlRater(format!("token request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ShippingError::LtlRater(format!(
                "token request returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ShippingError::LtlRater(e.to_string()))?;
        self.token_cache
            .insert("token", token.access_token.clone())
            .await;
        Ok(token.access_token)
    }
}

#[async_trait]
impl LtlRater for FreightViewClient {
    async fn quote(&self, request: &LtlRequest) -> ShippingResult<Vec<RateOption>> {
        let token = self.token().await?;
        let items: Vec<_> = request
            .lines
            .iter()
            .map(|line| {
                serde_json::json!({
                    "freight_class": line.freight_class,
                    "weight": line.weight_lbs,
                })
            })
            .collect();

        let response = self
            .http
            .post(format!("{}/rates", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "origin_zip": request.origin_zip,
                "dest_zip": request.dest_zip,
                "pickup_date": request.pickup_date.to_string(),
                "residential": request.residential,
                "liftgate": request.liftgate,
                "items": items,
            }))
            .send()
            .await
            .map_err(|e| ShippingError::LtlRater(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ShippingError::LtlRater(format!(
                "LTL rater returned {}",
                response.status()
            )));
        }
        let quotes: Vec<LtlQuote> = response
            .json()
            .await
            .map_err(|e| ShippingError::LtlRater(e.to_string()))?;

        Ok(quotes
            .into_iter()
            .map(|q| RateOption {
                carrier: q.carrier,
                service: q.service.unwrap_or_else(|| "LTL Standard".to_string()),
                cost: q.total,
                transit_days: q.transit_days,
                is_cheapest: false,
                is_fallback: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friday_pickup_rolls_to_monday() {
        // 2026-07-31 is a Friday
        let friday = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap();
        let pickup = next_business_day(friday);
        assert_eq!(pickup.weekday(), Weekday::Mon);
        assert_eq!(pickup, NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());
    }

    #[test]
    fn midweek_pickup_is_next_day() {
        let tuesday = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert_eq!(
            next_business_day(tuesday),
            NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
        );
    }
}
