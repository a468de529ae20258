use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::instrument;
use uuid::Uuid;

use floorline_core::generate_id;

use crate::entities::{
    customer_session, rep_session, staff_session, staff_user, trade_session, trusted_device,
    two_factor_code,
};
use crate::error::{AuthError, AuthResult};
use crate::password;
use crate::rate_limit::LoginRateLimiter;
use crate::token;

/// Session lifetimes. The trust grant is deliberately longer than any
/// session: trusting a device skips 2FA, not authentication.
pub struct SessionTtl;

impl SessionTtl {
    pub const STAFF: Duration = Duration::hours(24);
    pub const STAFF_REMEMBERED: Duration = Duration::days(7);
    pub const DEVICE_TRUST: Duration = Duration::days(30);
    pub const TWO_FACTOR_CODE: Duration = Duration::minutes(10);
    pub const REP: Duration = Duration::days(7);
    pub const TRADE: Duration = Duration::days(7);
    pub const CUSTOMER: Duration = Duration::days(30);
}

#[derive(Debug)]
pub enum StaffLoginOutcome {
    SessionIssued {
        token: String,
        expires_at: DateTime<Utc>,
        /// true when 2FA was skipped because no email transport is configured
        dev_mode_bypass: bool,
    },
    TwoFactorRequired {
        staff_id: Uuid,
        /// delivered to the staff email by the caller
        code: String,
        expires_at: DateTime<Utc>,
    },
}

#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    // ───────────────────────── staff ─────────────────────────

    /// Full staff login pipeline: rate limit, credentials, device trust,
    /// then either a session or a pending 2FA challenge.
    #[instrument(skip(self, password, limiter), fields(email = %email))]
    pub async fn staff_login(
        &self,
        email: &str,
        password: &str,
        fingerprint: Option<&str>,
        remember_me: bool,
        two_factor_available: bool,
        limiter: &LoginRateLimiter,
    ) -> AuthResult<StaffLoginOutcome> {
        if !limiter.check_and_record(email) {
            return Err(AuthError::RateLimited);
        }

        let staff = staff_user::Entity::find()
            .filter(staff_user::Column::Email.eq(email.to_ascii_lowercase()))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(password, &staff.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !staff.is_active {
            return Err(AuthError::AccountDisabled);
        }

        limiter.reset(email);

        if let Some(fp) = fingerprint {
            if self.device_is_trusted(staff.id, fp).await? {
                let (token, expires_at) = self.issue_staff_session(staff.id, remember_me).await?;
                return Ok(StaffLoginOutcome::SessionIssued {
                    token,
                    expires_at,
                    dev_mode_bypass: false,
                });
            }
        }

        if !two_factor_available {
            tracing::warn!(staff_id = %staff.id, "2FA skipped: no email transport configured");
            let (token, expires_at) = self.issue_staff_session(staff.id, remember_me).await?;
            return Ok(StaffLoginOutcome::SessionIssued {
                token,
                expires_at,
                dev_mode_bypass: true,
            });
        }

        let code = token::generate_two_factor_code();
        let expires_at = Utc::now() + SessionTtl::TWO_FACTOR_CODE;
        two_factor_code::ActiveModel {
            id: Set(generate_id()),
            staff_id: Set(staff.id),
            code: Set(code.clone()),
            expires_at: Set(expires_at),
            used_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        Ok(StaffLoginOutcome::TwoFactorRequired {
            staff_id: staff.id,
            code,
            expires_at,
        })
    }

    /// Consumes a 2FA code. On success issues the session and, when a
    /// fingerprint is supplied, grants device trust for 30 days.
    #[instrument(skip(self, code, trust_fingerprint))]
    pub async fn staff_verify_two_factor(
        &self,
        staff_id: Uuid,
        code: &str,
        remember_me: bool,
        trust_fingerprint: Option<&str>,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let row = two_factor_code::Entity::find()
            .filter(two_factor_code::Column::StaffId.eq(staff_id))
            .filter(two_factor_code::Column::Code.eq(code))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidTwoFactorCode)?;

        if !row.is_usable() {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        let mut used: two_factor_code::ActiveModel = row.into();
        used.used_at = Set(Some(Utc::now()));
        used.update(&self.db).await?;

        if let Some(fp) = trust_fingerprint {
            trusted_device::ActiveModel {
                id: Set(generate_id()),
                staff_id: Set(staff_id),
                fingerprint_hash: Set(token::hash_fingerprint(fp)),
                expires_at: Set(Utc::now() + SessionTtl::DEVICE_TRUST),
                created_at: Set(Utc::now()),
            }
            .insert(&self.db)
            .await?;
        }

        self.issue_staff_session(staff_id, remember_me).await
    }

    pub async fn issue_staff_session(
        &self,
        staff_id: Uuid,
        remember_me: bool,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let ttl = if remember_me {
            SessionTtl::STAFF_REMEMBERED
        } else {
            SessionTtl::STAFF
        };
        let token = token::generate_token();
        let expires_at = Utc::now() + ttl;
        staff_session::ActiveModel {
            id: Set(generate_id()),
            staff_id: Set(staff_id),
            token_hash: Set(token::hash_token(&token)),
            remember_me: Set(remember_me),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok((token, expires_at))
    }

    pub async fn authenticate_staff(&self, raw_token: &str) -> AuthResult<staff_user::Model> {
        let session = staff_session::Entity::find()
            .filter(staff_session::Column::TokenHash.eq(token::hash_token(raw_token)))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        if !session.is_active() {
            return Err(AuthError::InvalidSession);
        }
        let staff = staff_user::Entity::find_by_id(session.staff_id)
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        if !staff.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(staff)
    }

    pub async fn revoke_staff_session(&self, raw_token: &str) -> AuthResult<()> {
        staff_session::Entity::delete_many()
            .filter(staff_session::Column::TokenHash.eq(token::hash_token(raw_token)))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn device_is_trusted(&self, staff_id: Uuid, fingerprint: &str) -> AuthResult<bool> {
        let trusted = trusted_device::Entity::find()
            .filter(trusted_device::Column::StaffId.eq(staff_id))
            .filter(trusted_device::Column::FingerprintHash.eq(token::hash_fingerprint(fingerprint)))
            .one(&self.db)
            .await?;
        Ok(trusted.map(|t| t.is_active()).unwrap_or(false))
    }

    // ────────────────── rep / trade / customer ──────────────────
    //
    // Credential lookup for these principals lives beside their account
    // tables; this service owns only session issuance and validation.

    pub async fn issue_rep_session(&self, rep_id: Uuid) -> AuthResult<(String, DateTime<Utc>)> {
        let token = token::generate_token();
        let expires_at = Utc::now() + SessionTtl::REP;
        rep_session::ActiveModel {
            id: Set(generate_id()),
            rep_id: Set(rep_id),
            token_hash: Set(token::hash_token(&token)),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok((token, expires_at))
    }

    pub async fn authenticate_rep(&self, raw_token: &str) -> AuthResult<Uuid> {
        let session = rep_session::Entity::find()
            .filter(rep_session::Column::TokenHash.eq(token::hash_token(raw_token)))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        if !session.is_active() {
            return Err(AuthError::InvalidSession);
        }
        Ok(session.rep_id)
    }

    pub async fn issue_trade_session(
        &self,
        trade_customer_id: Uuid,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let token = token::generate_token();
        let expires_at = Utc::now() + SessionTtl::TRADE;
        trade_session::ActiveModel {
            id: Set(generate_id()),
            trade_customer_id: Set(trade_customer_id),
            token_hash: Set(token::hash_token(&token)),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok((token, expires_at))
    }

    pub async fn authenticate_trade(&self, raw_token: &str) -> AuthResult<Uuid> {
        let session = trade_session::Entity::find()
            .filter(trade_session::Column::TokenHash.eq(token::hash_token(raw_token)))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        if !session.is_active() {
            return Err(AuthError::InvalidSession);
        }
        Ok(session.trade_customer_id)
    }

    pub async fn issue_customer_session(
        &self,
        customer_id: Uuid,
    ) -> AuthResult<(String, DateTime<Utc>)> {
        let token = token::generate_token();
        let expires_at = Utc::now() + SessionTtl::CUSTOMER;
        customer_session::ActiveModel {
            id: Set(generate_id()),
            customer_id: Set(customer_id),
            token_hash: Set(token::hash_token(&token)),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok((token, expires_at))
    }

    pub async fn authenticate_customer(&self, raw_token: &str) -> AuthResult<Uuid> {
        let session = customer_session::Entity::find()
            .filter(customer_session::Column::TokenHash.eq(token::hash_token(raw_token)))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidSession)?;
        if !session.is_active() {
            return Err(AuthError::InvalidSession);
        }
        Ok(session.customer_id)
    }

    // ───────────────────────── cleanup ─────────────────────────

    /// Daily maintenance: drops expired sessions of every kind, spent and
    /// expired 2FA codes, and lapsed device-trust grants.
    #[instrument(skip(self))]
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now = Utc::now();
        let mut deleted = 0;

        deleted += staff_session::Entity::delete_many()
            .filter(staff_session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?
            .rows_affected;
        deleted += rep_session::Entity::delete_many()
            .filter(rep_session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?
            .rows_affected;
        deleted += trade_session::Entity::delete_many()
            .filter(trade_session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?
            .rows_affected;
        deleted += customer_session::Entity::delete_many()
            .filter(customer_session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?
            .rows_affected;
        deleted += two_factor_code::Entity::delete_many()
            .filter(
                sea_orm::Condition::any()
                    .add(two_factor_code::Column::ExpiresAt.lt(now))
                    .add(two_factor_code::Column::UsedAt.is_not_null()),
            )
            .exec(&self.db)
            .await?
            .rows_affected;
        deleted += trusted_device::Entity::delete_many()
            .filter(trusted_device::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?
            .rows_affected;

        tracing::info!(deleted, "auth cleanup complete");
        Ok(deleted)
    }
}
