use std::sync::Arc;

use axum::extract::State;
use loco_rs::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use floorline_shipping::{FreightViewClient, ParcelApiClient, ShippingService};

use crate::common::{api_error, FloorlineSettings};

#[derive(Deserialize)]
pub struct EstimateRequest {
    /// exactly one of these two identifies the item set
    pub session_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub dest_zip: String,
    #[serde(default = "default_true")]
    pub residential: bool,
    #[serde(default = "default_true")]
    pub liftgate: bool,
}

fn default_true() -> bool {
    true
}

pub fn shipping_service(ctx: &AppContext) -> ShippingService {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let parcel = Arc::new(ParcelApiClient::new(
        settings.raters.parcel_base_url.clone(),
        settings.raters.parcel_api_key.clone(),
    ));
    let ltl = Arc::new(FreightViewClient::new(
        settings.raters.ltl_base_url.clone(),
        settings.raters.ltl_client_id.clone(),
        settings.raters.ltl_client_secret.clone(),
    ));
    ShippingService::new(ctx.db.clone(), parcel, ltl).with_origin_zip(settings.raters.origin_zip)
}

/// Rate options for a cart or an existing order. 150 lbs and under goes
/// parcel; above it, LTL with per-class lines; rater failure answers from
/// the zone table with `is_fallback` set.
#[utoipa::path(post, path = "/api/shipping/estimate", tag = "shipping")]
async fn estimate(
    State(ctx): State<AppContext>,
    Json(body): Json<EstimateRequest>,
) -> Result<Response> {
    let service = shipping_service(&ctx);
    let quote = match (&body.session_id, body.order_id) {
        (Some(session_id), None) => service
            .estimate_for_cart(session_id, &body.dest_zip, body.residential, body.liftgate)
            .await
            .map_err(api_error)?,
        (None, Some(order_id)) => service
            .estimate_for_order(order_id, &body.dest_zip, body.residential, body.liftgate)
            .await
            .map_err(api_error)?,
        _ => {
            return Err(Error::BadRequest(
                "provide exactly one of session_id or order_id".into(),
            ))
        }
    };
    format::json(quote)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/shipping")
        .add("/estimate", post(estimate))
}
