use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, DomainEvent};
use floorline_outbox::TransactionalEventBus;

use crate::dto::{NewOrderItem, NewQuoteInput, PromoItem, QuoteUpdate};
use crate::entities::{quote, quote_item};
use crate::error::{CommerceError, CommerceResult};
use crate::services::PromoService;
use crate::types::QuoteStatus;

#[derive(Clone)]
pub struct QuoteService {
    db: DatabaseConnection,
    event_bus: TransactionalEventBus,
    promo: PromoService,
}

fn quote_number() -> String {
    let rand: u16 = rand::thread_rng().gen_range(0..10000);
    format!("QT-{}-{:04}", Utc::now().format("%Y%m%d%H%M%S"), rand)
}

fn product_subtotal(items: &[NewOrderItem]) -> Decimal {
    items
        .iter()
        .filter(|i| !i.is_sample)
        .map(|i| i.subtotal())
        .sum()
}

impl QuoteService {
    pub fn new(db: DatabaseConnection, event_bus: TransactionalEventBus) -> Self {
        let promo = PromoService::new(db.clone());
        Self {
            db,
            event_bus,
            promo,
        }
    }

    pub async fn get(&self, id: Uuid) -> CommerceResult<(quote::Model, Vec<quote_item::Model>)> {
        let quote = quote::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CommerceError::QuoteNotFound(id))?;
        let items = quote_item::Entity::find()
            .filter(quote_item::Column::QuoteId.eq(id))
            .order_by_asc(quote_item::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok((quote, items))
    }

    pub async fn list_for_rep(&self, rep_id: Uuid) -> CommerceResult<Vec<quote::Model>> {
        Ok(quote::Entity::find()
            .filter(quote::Column::SalesRepId.eq(rep_id))
            .order_by_desc(quote::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// A quote usage of a promo code records the discount but does not
    /// consume the global counter; that happens at conversion.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        rep_id: Option<Uuid>,
        input: NewQuoteInput,
    ) -> CommerceResult<quote::Model> {
        if input.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let txn = self.db.begin().await?;

        let subtotal = product_subtotal(&input.items);
        let shipping_cost = input
            .delivery
            .selection
            .as_ref()
            .map(|s| s.cost)
            .unwrap_or(Decimal::ZERO);

        let mut discount = Decimal::ZERO;
        let mut promo_id = None;
        if let Some(code) = &input.promo_code {
            let promo_items: Vec<PromoItem> = input
                .items
                .iter()
                .map(|line| PromoItem {
                    product_id: line.product_id,
                    category_id: None,
                    subtotal: line.subtotal(),
                    is_sample: line.is_sample,
                })
                .collect();
            let eval = self
                .promo
                .calculate_discount(&txn, code, &promo_items, Some(&input.email))
                .await?;
            discount = eval.discount_amount;
            promo_id = Some(eval.promo.id);
        }

        let total = subtotal + shipping_cost - discount;
        let quote_id = generate_id();
        let now = Utc::now();
        let expires_at = input
            .expires_in_days
            .map(|days| now + Duration::days(days));

        let model = quote::ActiveModel {
            id: Set(quote_id),
            quote_number: Set(quote_number()),
            email: Set(input.email.to_ascii_lowercase()),
            customer_id: Set(input.customer_id),
            trade_customer_id: Set(input.trade_customer_id),
            sales_rep_id: Set(rep_id),
            delivery_method: Set(input.delivery.method.as_str().to_string()),
            shipping_address: Set(input.delivery.address.clone()),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            sample_shipping: Set(Decimal::ZERO),
            discount_amount: Set(discount),
            total: Set(total),
            promo_code_id: Set(promo_id),
            status: Set(QuoteStatus::Draft.as_str().to_string()),
            expires_at: Set(expires_at),
            converted_order_id: Set(None),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        Self::insert_items(&txn, quote_id, &input.items).await?;

        if let Some(promo_id) = promo_id {
            self.promo
                .record_usage(&txn, promo_id, None, Some(quote_id), &input.email, discount)
                .await?;
        }

        txn.commit().await?;
        Ok(model)
    }

    /// Partial update of a draft. Replacing the line set recomputes totals;
    /// the carried discount is left as quoted.
    #[instrument(skip(self, update))]
    pub async fn update(&self, quote_id: Uuid, update: QuoteUpdate) -> CommerceResult<quote::Model> {
        let txn = self.db.begin().await?;
        let quote = quote::Entity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or(CommerceError::QuoteNotFound(quote_id))?;
        if quote.status != QuoteStatus::Draft.as_str() {
            return Err(CommerceError::Conflict("only draft quotes can be edited".into()));
        }

        let mut subtotal = quote.subtotal;
        if let Some(items) = &update.items {
            quote_item::Entity::delete_many()
                .filter(quote_item::Column::QuoteId.eq(quote_id))
                .exec(&txn)
                .await?;
            Self::insert_items(&txn, quote_id, items).await?;
            subtotal = product_subtotal(items);
        }

        let shipping = quote.shipping_cost;
        let discount = quote.discount_amount;
        let mut active: quote::ActiveModel = quote.into();
        if let Some(email) = update.email {
            active.email = Set(email.to_ascii_lowercase());
        }
        if let Some(notes) = update.notes {
            active.notes = Set(notes);
        }
        if let Some(days) = update.expires_in_days {
            active.expires_at = Set(Some(Utc::now() + Duration::days(days)));
        }
        active.subtotal = Set(subtotal);
        active.total = Set(subtotal + shipping - discount);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn send(&self, quote_id: Uuid, actor_id: Option<Uuid>) -> CommerceResult<quote::Model> {
        let txn = self.db.begin().await?;
        let quote = quote::Entity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or(CommerceError::QuoteNotFound(quote_id))?;
        if quote.status != QuoteStatus::Draft.as_str() {
            return Err(CommerceError::Conflict(format!(
                "quote in status {} cannot be sent",
                quote.status
            )));
        }
        let email = quote.email.clone();
        let mut active: quote::ActiveModel = quote.into();
        active.status = Set(QuoteStatus::Sent.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        self.event_bus
            .publish_in_tx(
                &txn,
                actor_id,
                DomainEvent::QuoteSent {
                    quote_id,
                    email,
                },
            )
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Timer: draft and sent quotes past their expiry become expired.
    #[instrument(skip(self))]
    pub async fn expire_due(&self) -> CommerceResult<u64> {
        let now = Utc::now();
        let due = quote::Entity::find()
            .filter(
                Condition::all()
                    .add(quote::Column::ExpiresAt.lte(now))
                    .add(
                        Condition::any()
                            .add(quote::Column::Status.eq(QuoteStatus::Draft.as_str()))
                            .add(quote::Column::Status.eq(QuoteStatus::Sent.as_str())),
                    ),
            )
            .all(&self.db)
            .await?;
        let count = due.len() as u64;
        for quote in due {
            let id = quote.id;
            let mut active: quote::ActiveModel = quote.into();
            active.status = Set(QuoteStatus::Expired.as_str().to_string());
            active.updated_at = Set(now);
            active.update(&self.db).await?;
            tracing::debug!(quote_id = %id, "quote expired");
        }
        if count > 0 {
            tracing::info!(count, "expired quotes");
        }
        Ok(count)
    }

    async fn insert_items<C: sea_orm::ConnectionTrait>(
        conn: &C,
        quote_id: Uuid,
        items: &[NewOrderItem],
    ) -> CommerceResult<()> {
        for line in items {
            quote_item::ActiveModel {
                id: Set(generate_id()),
                quote_id: Set(quote_id),
                product_id: Set(line.product_id),
                sku_id: Set(line.sku_id),
                vendor_id: Set(line.vendor_id),
                name: Set(line.name.clone()),
                collection: Set(line.collection.clone()),
                num_boxes: Set(line.num_boxes),
                sqft_needed: Set(line.sqft_needed),
                unit_price: Set(line.unit_price),
                subtotal: Set(line.subtotal()),
                sell_by: Set(line.sell_by.as_str().to_string()),
                price_tier: Set(line.price_tier.map(|t| t.as_str().to_string())),
                is_sample: Set(line.is_sample),
                created_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;
        }
        Ok(())
    }
}
