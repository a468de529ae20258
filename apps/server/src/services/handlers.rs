//! Outbox event handlers: the fire-and-forget side of the commerce spine.
//! Every handler is log-only on failure; the transaction that queued the
//! event has already committed.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use floorline_commerce::entities::{order, payment_request, quote, sales_rep, trade_customer};
use floorline_commerce::CommissionService;
use floorline_core::events::{DomainEvent, EventEnvelope, EventHandler};
use floorline_core::{money, Result};
use floorline_email::EmailService;
use floorline_scraper::FailureNotifier;

/// Recomputes the rep commission after every order mutation.
pub struct CommissionHandler {
    commissions: CommissionService,
}

impl CommissionHandler {
    pub fn new(commissions: CommissionService) -> Self {
        Self { commissions }
    }
}

#[async_trait]
impl EventHandler for CommissionHandler {
    fn name(&self) -> &'static str {
        "commission-recompute"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        if let DomainEvent::OrderMutated { order_id } = &envelope.event {
            self.commissions
                .recompute(*order_id)
                .await
                .map_err(floorline_core::Error::from)?;
        }
        Ok(())
    }
}

/// Sends the customer-facing mail for commerce events.
pub struct EmailHandler {
    db: DatabaseConnection,
    email: EmailService,
    ops_email: String,
}

impl EmailHandler {
    pub fn new(db: DatabaseConnection, email: EmailService, ops_email: String) -> Self {
        Self {
            db,
            email,
            ops_email,
        }
    }

    async fn order(&self, id: Uuid) -> Result<Option<order::Model>> {
        Ok(order::Entity::find_by_id(id).one(&self.db).await?)
    }
}

#[async_trait]
impl EventHandler for EmailHandler {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match &envelope.event {
            DomainEvent::OrderPlaced {
                order_id, email, ..
            } => {
                if let Some(order) = self.order(*order_id).await? {
                    self.email
                        .order_confirmation(email, &order.order_number, &order.total.to_string())
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::PaymentRequestIssued {
                payment_request_id,
                order_id,
                checkout_url,
            } => {
                let request = payment_request::Entity::find_by_id(*payment_request_id)
                    .one(&self.db)
                    .await?;
                if let (Some(request), Some(order)) = (request, self.order(*order_id).await?) {
                    self.email
                        .payment_request(
                            &request.email,
                            &order.order_number,
                            &request.amount.to_string(),
                            checkout_url,
                        )
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::PaymentRequestPaid {
                order_id,
                amount_cents,
                ..
            } => {
                if let Some(order) = self.order(*order_id).await? {
                    self.email
                        .payment_receipt(
                            &order.email,
                            &order.order_number,
                            &money::from_cents(*amount_cents).to_string(),
                        )
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::RefundIssued {
                order_id,
                amount_cents,
                ..
            } => {
                if let Some(order) = self.order(*order_id).await? {
                    self.email
                        .refund_notice(
                            &order.email,
                            &order.order_number,
                            &money::from_cents(*amount_cents).to_string(),
                        )
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::TradeTierPromoted {
                trade_customer_id,
                tier,
            } => {
                if let Some(trade) = trade_customer::Entity::find_by_id(*trade_customer_id)
                    .one(&self.db)
                    .await?
                {
                    self.email
                        .tier_promotion(&trade.email, tier)
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::QuoteSent { quote_id, email } => {
                if let Some(quote) = quote::Entity::find_by_id(*quote_id).one(&self.db).await? {
                    self.email
                        .quote_link(email, &quote.quote_number, &quote.total.to_string())
                        .await
                        .map_err(|e| floorline_core::Error::External(e.to_string()))?;
                }
            }
            DomainEvent::ScrapeJobFailed {
                vendor_source_id,
                reason,
                ..
            } => {
                self.email
                    .scrape_failure(&self.ops_email, &vendor_source_id.to_string(), reason)
                    .await
                    .map_err(|e| floorline_core::Error::External(e.to_string()))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Lets the rep know when one of their orders moves money.
pub struct RepNotificationHandler {
    db: DatabaseConnection,
    email: EmailService,
}

impl RepNotificationHandler {
    pub fn new(db: DatabaseConnection, email: EmailService) -> Self {
        Self { db, email }
    }

    async fn notify_rep(&self, order_id: Uuid) -> Result<()> {
        let Some(order) = order::Entity::find_by_id(order_id).one(&self.db).await? else {
            return Ok(());
        };
        let Some(rep_id) = order.sales_rep_id else {
            return Ok(());
        };
        let Some(rep) = sales_rep::Entity::find_by_id(rep_id).one(&self.db).await? else {
            return Ok(());
        };
        self.email
            .rep_order_notification(&rep.email, &order.order_number, &order.total.to_string())
            .await
            .map_err(|e| floorline_core::Error::External(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for RepNotificationHandler {
    fn name(&self) -> &'static str {
        "rep-notifications"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match &envelope.event {
            DomainEvent::OrderPlaced { order_id, .. }
            | DomainEvent::PaymentRequestPaid { order_id, .. } => {
                self.notify_rep(*order_id).await
            }
            _ => Ok(()),
        }
    }
}

/// Routes orchestrator failures into the same outbox→email pipeline.
pub struct ScrapeFailurePublisher {
    bus: floorline_outbox::TransactionalEventBus,
}

impl ScrapeFailurePublisher {
    pub fn new(bus: floorline_outbox::TransactionalEventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl FailureNotifier for ScrapeFailurePublisher {
    async fn scrape_failed(&self, source_id: Uuid, source_name: &str, job_id: Uuid, reason: &str) {
        let event = DomainEvent::ScrapeJobFailed {
            job_id,
            vendor_source_id: source_id,
            reason: format!("{source_name}: {reason}"),
        };
        if let Err(err) = self.bus.publish(None, event).await {
            tracing::error!(error = %err, "failed to queue scrape-failure notification");
        }
    }
}
