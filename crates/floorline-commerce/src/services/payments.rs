use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money, DomainEvent};
use floorline_outbox::TransactionalEventBus;

use crate::dto::Actor;
use crate::entities::{order, order_payment, payment_request};
use crate::error::{CommerceError, CommerceResult};
use crate::services::gateway::PaymentGateway;
use crate::services::log_order_activity;
use crate::types::{OrderStatus, PaymentRequestStatus, PaymentType};

/// Appends one ledger row. Every monetary delta on an order goes through
/// here; `orders.amount_paid` is only ever derived from these rows.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_ledger_row<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    payment_type: PaymentType,
    amount: Decimal,
    stripe_payment_intent_id: Option<String>,
    stripe_checkout_session_id: Option<String>,
    stripe_refund_id: Option<String>,
    description: Option<String>,
    status: &str,
    initiated_by: Option<String>,
) -> CommerceResult<Uuid> {
    let id = generate_id();
    order_payment::Entity::insert(order_payment::ActiveModel {
        id: Set(id),
        order_id: Set(order_id),
        payment_type: Set(payment_type.as_str().to_string()),
        amount: Set(amount),
        stripe_payment_intent_id: Set(stripe_payment_intent_id),
        stripe_checkout_session_id: Set(stripe_checkout_session_id),
        stripe_refund_id: Set(stripe_refund_id),
        description: Set(description),
        status: Set(status.to_string()),
        initiated_by: Set(initiated_by),
        created_at: Set(Utc::now()),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(id)
}

#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseConnection,
    event_bus: TransactionalEventBus,
}

impl PaymentService {
    pub fn new(db: DatabaseConnection, event_bus: TransactionalEventBus) -> Self {
        Self { db, event_bus }
    }

    pub async fn ledger(&self, order_id: Uuid) -> CommerceResult<Vec<order_payment::Model>> {
        Ok(order_payment::Entity::find()
            .filter(order_payment::Column::OrderId.eq(order_id))
            .order_by_asc(order_payment::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Refundable remainder: completed intent-backed charges minus completed
    /// refunds. Additional charges collected through checkout sessions are
    /// excluded; those are reversed through their own session.
    fn max_refundable(rows: &[order_payment::Model]) -> (Decimal, Option<String>) {
        let mut charged = Decimal::ZERO;
        let mut refunded = Decimal::ZERO;
        let mut intent = None;
        for row in rows {
            if row.status != "completed" {
                continue;
            }
            match row.payment_type.as_str() {
                "charge" => {
                    if let Some(id) = &row.stripe_payment_intent_id {
                        charged += row.amount;
                        intent.get_or_insert_with(|| id.clone());
                    }
                }
                "refund" => refunded += row.amount.abs(),
                _ => {}
            }
        }
        (charged - refunded, intent)
    }

    // ═══════════════════ refunds ═══════════════════

    /// `amount: None` means "refund the full remainder", which is only legal
    /// on a cancelled order. Partial refunds with an explicit amount are
    /// allowed in any refundable state.
    #[instrument(skip(self, gateway, actor))]
    pub async fn refund(
        &self,
        order_id: Uuid,
        amount: Option<Decimal>,
        gateway: &dyn PaymentGateway,
        actor: Actor,
    ) -> CommerceResult<order::Model> {
        let txn = self.db.begin().await?;
        let order = super::orders::load_order_locked(&txn, order_id).await?;

        let rows = order_payment::Entity::find()
            .filter(order_payment::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let (max_refundable, intent) = Self::max_refundable(&rows);
        let intent = intent.ok_or(CommerceError::NoGatewayReference)?;
        if max_refundable <= Decimal::ZERO {
            return Err(CommerceError::NothingRefundable { max_refundable });
        }

        let amount = match amount {
            Some(a) => {
                if a <= Decimal::ZERO {
                    return Err(CommerceError::Validation("refund amount must be positive".into()));
                }
                if a > max_refundable {
                    return Err(CommerceError::RefundExceedsMax {
                        requested: a,
                        max_refundable,
                    });
                }
                a
            }
            None => {
                if order.status != OrderStatus::Cancelled.as_str() {
                    return Err(CommerceError::Validation(
                        "order must be cancelled before a full refund".into(),
                    ));
                }
                max_refundable
            }
        };

        let handle = gateway.create_refund(&intent, amount).await?;

        let payment_id = insert_ledger_row(
            &txn,
            order_id,
            PaymentType::Refund,
            -amount,
            Some(intent),
            None,
            Some(handle.refund_id.clone()),
            Some("refund".to_string()),
            "completed",
            Some(actor.label.clone()),
        )
        .await?;

        let full = max_refundable - amount == Decimal::ZERO;
        let previous_status = order.status.clone();
        let new_amount_paid = order.amount_paid - amount;
        let new_refund_amount = order.refund_amount + amount;
        let mut active: order::ActiveModel = order.into();
        active.amount_paid = Set(new_amount_paid);
        active.refund_amount = Set(new_refund_amount);
        if full {
            active.status = Set(OrderStatus::Refunded.as_str().to_string());
            active.refunded_at = Set(Some(Utc::now()));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "refunded",
            json!({
                "amount": amount,
                "full": full,
                "from": previous_status,
                "refund_id": handle.refund_id,
            }),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                actor.id,
                DomainEvent::RefundIssued {
                    order_id,
                    amount_cents: money::to_cents(amount),
                    full,
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::PaymentRecorded {
                order_id,
                payment_id,
                payment_type: PaymentType::Refund.as_str().to_string(),
                amount_cents: -money::to_cents(amount),
            })
            .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(updated)
    }

    // ═══════════════════ payment requests ═══════════════════

    const REQUEST_TTL_HOURS: i64 = 24;

    /// Creates a hosted checkout link for the outstanding balance (or an
    /// explicit partial amount) and records the pending request.
    #[instrument(skip(self, gateway, actor))]
    pub async fn create_payment_request(
        &self,
        order_id: Uuid,
        amount: Option<Decimal>,
        gateway: &dyn PaymentGateway,
        actor: Actor,
    ) -> CommerceResult<payment_request::Model> {
        let order = order::Entity::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let balance = order.total - order.amount_paid;
        let amount = amount.unwrap_or(balance);
        if amount <= Decimal::ZERO {
            return Err(CommerceError::Validation("no balance due on this order".into()));
        }
        if amount > balance {
            return Err(CommerceError::Validation(format!(
                "requested amount {amount} exceeds balance due {balance}"
            )));
        }

        let description = format!("Balance payment for order {}", order.order_number);
        let handle = gateway
            .create_checkout_session(&order.order_number, &order.email, amount, &description)
            .await?;

        let txn = self.db.begin().await?;
        let request = payment_request::ActiveModel {
            id: Set(generate_id()),
            order_id: Set(order_id),
            amount: Set(amount),
            email: Set(order.email.clone()),
            checkout_url: Set(handle.url.clone()),
            stripe_checkout_session_id: Set(Some(handle.session_id.clone())),
            status: Set(PaymentRequestStatus::Pending.as_str().to_string()),
            expires_at: Set(handle
                .expires_at
                .min(Utc::now() + Duration::hours(Self::REQUEST_TTL_HOURS))),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "payment_request_sent",
            json!({"amount": amount, "payment_request_id": request.id}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                actor.id,
                DomainEvent::PaymentRequestIssued {
                    payment_request_id: request.id,
                    order_id,
                    checkout_url: handle.url,
                },
            )
            .await?;
        txn.commit().await?;
        Ok(request)
    }

    /// Webhook: checkout session completed. Marks the request paid, appends
    /// the additional charge, and bumps the cached aggregate — all in one
    /// transaction. Idempotent for non-pending requests.
    #[instrument(skip(self))]
    pub async fn complete_checkout_session(
        &self,
        session_id: &str,
    ) -> CommerceResult<Option<payment_request::Model>> {
        let txn = self.db.begin().await?;
        let Some(request) = payment_request::Entity::find()
            .filter(payment_request::Column::StripeCheckoutSessionId.eq(session_id))
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };
        if request.status != PaymentRequestStatus::Pending.as_str() {
            return Ok(Some(request));
        }
        let order = super::orders::load_order_locked(&txn, request.order_id).await?;

        let payment_id = insert_ledger_row(
            &txn,
            order.id,
            PaymentType::AdditionalCharge,
            request.amount,
            None,
            Some(session_id.to_string()),
            None,
            Some("balance payment via checkout session".to_string()),
            "completed",
            Some("gateway:webhook".to_string()),
        )
        .await?;

        let order_id = order.id;
        let new_amount_paid = order.amount_paid + request.amount;
        let mut order_active: order::ActiveModel = order.into();
        order_active.amount_paid = Set(new_amount_paid);
        order_active.updated_at = Set(Utc::now());
        order_active.update(&txn).await?;

        let mut active: payment_request::ActiveModel = request.clone().into();
        active.status = Set(PaymentRequestStatus::Paid.as_str().to_string());
        let updated = active.update(&txn).await?;

        let actor = Actor::system("stripe-webhook");
        log_order_activity(
            &txn,
            order_id,
            &actor,
            "payment_received",
            json!({"amount": request.amount, "payment_request_id": request.id}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                None,
                DomainEvent::PaymentRequestPaid {
                    payment_request_id: request.id,
                    order_id,
                    amount_cents: money::to_cents(request.amount),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, None, DomainEvent::PaymentRecorded {
                order_id,
                payment_id,
                payment_type: PaymentType::AdditionalCharge.as_str().to_string(),
                amount_cents: money::to_cents(request.amount),
            })
            .await?;
        self.event_bus
            .publish_in_tx(&txn, None, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(Some(updated))
    }

    /// Webhook: checkout session expired.
    pub async fn expire_checkout_session(&self, session_id: &str) -> CommerceResult<()> {
        let Some(request) = payment_request::Entity::find()
            .filter(payment_request::Column::StripeCheckoutSessionId.eq(session_id))
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };
        if request.status != PaymentRequestStatus::Pending.as_str() {
            return Ok(());
        }
        let mut active: payment_request::ActiveModel = request.into();
        active.status = Set(PaymentRequestStatus::Expired.as_str().to_string());
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn cancel_payment_request(&self, id: Uuid) -> CommerceResult<()> {
        let request = payment_request::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CommerceError::PaymentRequestNotFound(id))?;
        if request.status != PaymentRequestStatus::Pending.as_str() {
            return Err(CommerceError::Conflict("payment request is not pending".into()));
        }
        let mut active: payment_request::ActiveModel = request.into();
        active.status = Set(PaymentRequestStatus::Cancelled.as_str().to_string());
        active.update(&self.db).await?;
        Ok(())
    }
}
