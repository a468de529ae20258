//! Principal extractors. One header per principal kind; optional variants
//! attach identity when a valid token is present but never fail the
//! request.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use loco_rs::app::AppContext;
use sea_orm::EntityTrait;
use uuid::Uuid;

use floorline_auth::entities::staff_user;
use floorline_auth::{AuthService, Principal, StaffRole};
use floorline_commerce::entities::trade_customer;

pub const STAFF_HEADER: &str = "x-staff-token";
pub const REP_HEADER: &str = "x-rep-token";
pub const TRADE_HEADER: &str = "x-trade-token";
pub const CUSTOMER_HEADER: &str = "x-customer-token";

type Rejection = (StatusCode, &'static str);

fn header_token(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Authenticated staff member. Role gating happens per route against
/// `principal()`.
pub struct StaffAuth {
    pub staff: staff_user::Model,
}

impl StaffAuth {
    pub fn principal(&self) -> Principal {
        let role = StaffRole::parse(&self.staff.role).unwrap_or(StaffRole::Manager);
        Principal::Staff {
            staff_id: self.staff.id,
            role,
        }
    }

    pub fn require_role(&self, allowed: &[StaffRole]) -> Result<Uuid, Rejection> {
        self.principal()
            .require_staff_role(allowed)
            .map_err(|_| (StatusCode::FORBIDDEN, "insufficient role"))
    }

    pub fn is_admin(&self) -> bool {
        self.staff.role == StaffRole::Admin.as_str()
    }
}

impl<S> FromRequestParts<S> for StaffAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let token = header_token(parts, STAFF_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "missing staff token"))?;
        let staff = AuthService::new(ctx.db.clone())
            .authenticate_staff(&token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid staff session"))?;
        Ok(Self { staff })
    }
}

pub struct RepAuth {
    pub rep_id: Uuid,
}

impl<S> FromRequestParts<S> for RepAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let token = header_token(parts, REP_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "missing rep token"))?;
        let rep_id = AuthService::new(ctx.db.clone())
            .authenticate_rep(&token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid rep session"))?;
        Ok(Self { rep_id })
    }
}

pub struct TradeAuth {
    pub trade: trade_customer::Model,
}

impl<S> FromRequestParts<S> for TradeAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let token = header_token(parts, TRADE_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "missing trade token"))?;
        let trade_id = AuthService::new(ctx.db.clone())
            .authenticate_trade(&token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid trade session"))?;
        let trade = trade_customer::Entity::find_by_id(trade_id)
            .one(&ctx.db)
            .await
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "database error"))?
            .ok_or((StatusCode::UNAUTHORIZED, "trade account not found"))?;
        if !trade.is_active {
            return Err((StatusCode::FORBIDDEN, "trade account is deactivated"));
        }
        Ok(Self { trade })
    }
}

pub struct CustomerAuth {
    pub customer_id: Uuid,
}

impl<S> FromRequestParts<S> for CustomerAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AppContext::from_ref(state);
        let token = header_token(parts, CUSTOMER_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "missing customer token"))?;
        let customer_id = AuthService::new(ctx.db.clone())
            .authenticate_customer(&token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid customer session"))?;
        Ok(Self { customer_id })
    }
}

/// Attaches the approved trade identity when present; storefront pricing
/// uses it to apply the tier discount at read time.
pub struct OptionalTradeAuth(pub Option<trade_customer::Model>);

impl<S> FromRequestParts<S> for OptionalTradeAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            TradeAuth::from_request_parts(parts, state)
                .await
                .ok()
                .map(|auth| auth.trade),
        ))
    }
}

pub struct OptionalCustomerAuth(pub Option<Uuid>);

impl<S> FromRequestParts<S> for OptionalCustomerAuth
where
    S: Send + Sync,
    AppContext: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            CustomerAuth::from_request_parts(parts, state)
                .await
                .ok()
                .map(|auth| auth.customer_id),
        ))
    }
}
