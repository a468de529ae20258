use serde::{Deserialize, Serialize};

use floorline_email::SmtpSettings;

/// Typed view of the `settings:` block in the loco YAML config. Every
/// section has a serde default so a bare config still boots in dev mode.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FloorlineSettings {
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub stripe: StripeSettings,
    #[serde(default)]
    pub raters: RaterSettings,
    #[serde(default)]
    pub scraper: ScraperSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_ops_email")]
    pub ops_email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EmailSettings {
    #[serde(default)]
    pub enabled: bool,
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StripeSettings {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RaterSettings {
    #[serde(default = "default_parcel_url")]
    pub parcel_base_url: String,
    #[serde(default)]
    pub parcel_api_key: String,
    #[serde(default = "default_ltl_url")]
    pub ltl_base_url: String,
    #[serde(default)]
    pub ltl_client_id: String,
    #[serde(default)]
    pub ltl_client_secret: String,
    #[serde(default = "default_origin_zip")]
    pub origin_zip: String,
}

impl Default for RaterSettings {
    fn default() -> Self {
        Self {
            parcel_base_url: default_parcel_url(),
            parcel_api_key: String::new(),
            ltl_base_url: default_ltl_url(),
            ltl_client_id: String::new(),
            ltl_client_secret: String::new(),
            origin_zip: default_origin_zip(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperSettings {
    #[serde(default = "default_scraper_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_stale_job_hours")]
    pub stale_job_hours: u64,
    #[serde(default = "default_catalog_slots")]
    pub catalog_slots: usize,
    #[serde(default = "default_enrichment_slots")]
    pub enrichment_slots: usize,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_scraper_timeout_ms(),
            stale_job_hours: default_stale_job_hours(),
            catalog_slots: default_catalog_slots(),
            enrichment_slots: default_enrichment_slots(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub endpoint_url: Option<String>,
}

impl FloorlineSettings {
    pub fn from_settings(settings: &Option<serde_json::Value>) -> Self {
        settings
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Environment variables win over YAML for the two scraper knobs the
    /// ops runbook documents.
    pub fn scraper_timeout(&self) -> std::time::Duration {
        let ms = std::env::var("SCRAPER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.scraper.timeout_ms);
        std::time::Duration::from_millis(ms)
    }

    pub fn stale_job_threshold(&self) -> std::time::Duration {
        let hours = std::env::var("STALE_JOB_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.scraper.stale_job_hours);
        std::time::Duration::from_secs(hours * 3600)
    }
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ops_email() -> String {
    "ops@floorline.example".to_string()
}

fn default_parcel_url() -> String {
    "https://api.parcelrater.example/v1".to_string()
}

fn default_ltl_url() -> String {
    "https://api.freightview.example/v2".to_string()
}

fn default_origin_zip() -> String {
    floorline_shipping::service::DEFAULT_ORIGIN_ZIP.to_string()
}

fn default_scraper_timeout_ms() -> u64 {
    4 * 60 * 60 * 1000
}

fn default_stale_job_hours() -> u64 {
    4
}

fn default_catalog_slots() -> usize {
    floorline_scraper::pools::DEFAULT_CATALOG_SLOTS
}

fn default_enrichment_slots() -> usize {
    floorline_scraper::pools::DEFAULT_ENRICHMENT_SLOTS
}
