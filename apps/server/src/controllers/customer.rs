use axum::extract::State;
use loco_rs::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

use floorline_auth::{password, AuthService};
use floorline_commerce::entities::{customer, order};

use crate::common::api_error;
use crate::extractors::CustomerAuth;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(State(ctx): State<AppContext>, Json(body): Json<LoginRequest>) -> Result<Response> {
    let account = customer::Entity::find()
        .filter(customer::Column::Email.eq(body.email.to_ascii_lowercase()))
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let valid = account
        .as_ref()
        .and_then(|c| c.password_hash.as_deref())
        .map(|hash| password::verify_password(&body.password, hash))
        .unwrap_or(false);
    if !valid {
        return Err(Error::Unauthorized("invalid email or password".into()));
    }
    let account = account.expect("verified above");
    let (token, expires_at) = AuthService::new(ctx.db.clone())
        .issue_customer_session(account.id)
        .await
        .map_err(api_error)?;
    format::json(serde_json::json!({
        "token": token,
        "expires_at": expires_at,
        "customer": {"id": account.id, "email": account.email, "name": account.name},
    }))
}

async fn my_orders(State(ctx): State<AppContext>, auth: CustomerAuth) -> Result<Response> {
    let orders = order::Entity::find()
        .filter(order::Column::CustomerId.eq(auth.customer_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(orders)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/customer")
        .add("/login", post(login))
        .add("/orders", get(my_orders))
}
