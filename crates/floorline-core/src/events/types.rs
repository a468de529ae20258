use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    /// Event type string for fast filtering and routing
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    /// Staff, rep, or customer id when the change was user-initiated
    pub actor_id: Option<Uuid>,
    pub event: DomainEvent,
    pub retry_count: u32,
}

impl EventEnvelope {
    pub fn new(actor_id: Option<Uuid>, event: DomainEvent) -> Self {
        let id = crate::id::generate_id();
        let event_type = event.event_type().to_string();
        Self {
            id,
            event_type,
            timestamp: Utc::now(),
            actor_id,
            event,
            retry_count: 0,
        }
    }
}

/// Events the commerce spine publishes through the outbox. Handlers run
/// after the owning transaction commits; they are fire-and-forget.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        order_number: String,
        email: String,
        source: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: String,
        to: String,
    },
    /// Totals, items, or payments changed; commission must be recomputed.
    OrderMutated {
        order_id: Uuid,
    },
    PaymentRecorded {
        order_id: Uuid,
        payment_id: Uuid,
        payment_type: String,
        amount_cents: i64,
    },
    RefundIssued {
        order_id: Uuid,
        amount_cents: i64,
        full: bool,
    },
    PaymentRequestIssued {
        payment_request_id: Uuid,
        order_id: Uuid,
        checkout_url: String,
    },
    PaymentRequestPaid {
        payment_request_id: Uuid,
        order_id: Uuid,
        amount_cents: i64,
    },
    PurchaseOrderSent {
        purchase_order_id: Uuid,
        via: String,
        revision: i32,
    },
    TradeTierPromoted {
        trade_customer_id: Uuid,
        tier: String,
    },
    QuoteSent {
        quote_id: Uuid,
        email: String,
    },
    ScrapeJobFailed {
        job_id: Uuid,
        vendor_source_id: Uuid,
        reason: String,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order.placed",
            Self::OrderStatusChanged { .. } => "order.status_changed",
            Self::OrderMutated { .. } => "order.mutated",
            Self::PaymentRecorded { .. } => "payment.recorded",
            Self::RefundIssued { .. } => "payment.refund_issued",
            Self::PaymentRequestIssued { .. } => "payment_request.issued",
            Self::PaymentRequestPaid { .. } => "payment_request.paid",
            Self::PurchaseOrderSent { .. } => "purchase_order.sent",
            Self::TradeTierPromoted { .. } => "trade.tier_promoted",
            Self::QuoteSent { .. } => "quote.sent",
            Self::ScrapeJobFailed { .. } => "scrape_job.failed",
        }
    }

    /// Reject envelopes that would be undeliverable before they reach the
    /// outbox table.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::OrderPlaced {
                order_number,
                email,
                ..
            } => {
                if order_number.is_empty() {
                    return Err("order_number must not be empty".into());
                }
                if email.is_empty() {
                    return Err("email must not be empty".into());
                }
            }
            Self::OrderStatusChanged { from, to, .. } => {
                if from == to {
                    return Err("status transition must change the status".into());
                }
            }
            Self::PaymentRequestIssued { checkout_url, .. } => {
                if checkout_url.is_empty() {
                    return Err("checkout_url must not be empty".into());
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_event_type() {
        let envelope = EventEnvelope::new(
            None,
            DomainEvent::OrderMutated {
                order_id: crate::id::generate_id(),
            },
        );
        assert_eq!(envelope.event_type, "order.mutated");
        assert_eq!(envelope.retry_count, 0);
    }

    #[test]
    fn same_status_transition_is_invalid() {
        let event = DomainEvent::OrderStatusChanged {
            order_id: crate::id::generate_id(),
            from: "pending".into(),
            to: "pending".into(),
        };
        assert!(event.validate().is_err());
    }
}
