use std::sync::Arc;

use axum::extract::{Path, State};
use loco_rs::prelude::*;
use once_cell::sync::Lazy;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use uuid::Uuid;

use floorline_auth::entities::staff_user;
use floorline_auth::{AuthService, LoginRateLimiter, StaffLoginOutcome, StaffRole};
use floorline_email::EmailService;

use crate::common::{api_error, FloorlineSettings};
use crate::extractors::StaffAuth;

/// Per-process sliding window, shared by every login attempt.
static LOGIN_LIMITER: Lazy<Arc<LoginRateLimiter>> =
    Lazy::new(|| Arc::new(LoginRateLimiter::default()));

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_fingerprint: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub staff_id: Uuid,
    pub code: String,
    #[serde(default)]
    pub remember_me: bool,
    pub trust_device_fingerprint: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStaffRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

fn email_service(ctx: &AppContext) -> EmailService {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    match (&settings.email.enabled, &settings.email.smtp) {
        (true, Some(smtp)) => {
            EmailService::smtp(smtp).unwrap_or_else(|err| {
                tracing::error!(error = %err, "SMTP misconfigured, email disabled");
                EmailService::disabled()
            })
        }
        _ => EmailService::disabled(),
    }
}

/// Staff login. Trusted devices skip 2FA; with no email transport the code
/// step is skipped entirely and flagged as a dev-mode bypass.
#[utoipa::path(post, path = "/api/admin/auth/login", tag = "admin-auth")]
async fn login(State(ctx): State<AppContext>, Json(body): Json<LoginRequest>) -> Result<Response> {
    let email = email_service(&ctx);
    let outcome = AuthService::new(ctx.db.clone())
        .staff_login(
            &body.email,
            &body.password,
            body.device_fingerprint.as_deref(),
            body.remember_me,
            email.is_enabled(),
            &LOGIN_LIMITER,
        )
        .await
        .map_err(api_error)?;

    match outcome {
        StaffLoginOutcome::SessionIssued {
            token,
            expires_at,
            dev_mode_bypass,
        } => format::json(serde_json::json!({
            "token": token,
            "expires_at": expires_at,
            "two_factor_required": false,
            "dev_mode_bypass": dev_mode_bypass,
        })),
        StaffLoginOutcome::TwoFactorRequired {
            staff_id,
            code,
            expires_at,
        } => {
            if let Err(err) = email.two_factor_code(&body.email, &code).await {
                tracing::error!(error = %err, "2FA code email failed");
            }
            format::json(serde_json::json!({
                "two_factor_required": true,
                "staff_id": staff_id,
                "expires_at": expires_at,
            }))
        }
    }
}

async fn verify_two_factor(
    State(ctx): State<AppContext>,
    Json(body): Json<VerifyRequest>,
) -> Result<Response> {
    let (token, expires_at) = AuthService::new(ctx.db.clone())
        .staff_verify_two_factor(
            body.staff_id,
            &body.code,
            body.remember_me,
            body.trust_device_fingerprint.as_deref(),
        )
        .await
        .map_err(api_error)?;
    format::json(serde_json::json!({"token": token, "expires_at": expires_at}))
}

async fn logout(State(ctx): State<AppContext>, _auth: StaffAuth, parts: axum::http::HeaderMap) -> Result<Response> {
    if let Some(token) = parts
        .get(crate::extractors::auth::STAFF_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        AuthService::new(ctx.db.clone())
            .revoke_staff_session(token)
            .await
            .map_err(api_error)?;
    }
    format::empty_json()
}

/// Staff account maintenance. Managers can never edit, deactivate, or
/// promote an admin account.
async fn update_staff(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStaffRequest>,
) -> Result<Response> {
    let target = staff_user::Entity::find_by_id(id)
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?
        .ok_or(Error::NotFound)?;

    if !auth.is_admin() {
        if target.role == StaffRole::Admin.as_str() {
            return Err(Error::Unauthorized(
                "managers cannot modify admin accounts".into(),
            ));
        }
        if body.role.as_deref() == Some(StaffRole::Admin.as_str()) {
            return Err(Error::Unauthorized(
                "managers cannot promote accounts to admin".into(),
            ));
        }
    }

    let mut active: staff_user::ActiveModel = target.into();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(role) = body.role {
        StaffRole::parse(&role).map_err(api_error)?;
        active.role = Set(role);
    }
    if let Some(is_active) = body.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());
    let updated = active
        .update(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(updated)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/admin")
        .add("/auth/login", post(login))
        .add("/auth/verify-2fa", post(verify_two_factor))
        .add("/auth/logout", post(logout))
        .add("/staff/{id}", put(update_staff))
}
