use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money, DomainEvent};
use floorline_outbox::TransactionalEventBus;

use crate::dto::{
    Actor, DeliveryInput, NewOrderItem, OrderStatusUpdate, PromoItem, RepItemInput, RepOrderInput,
    RepOrderPayment, RetailCheckoutInput, ShippingSelection, TradeBulkItem,
};
use crate::entities::{
    cart_item, customer, order, order_item, order_price_adjustment, product, sales_rep, sku,
    trade_customer, trade_tier,
};
use crate::error::{CommerceError, CommerceResult};
use crate::services::carts::CartService;
use crate::services::purchase_orders::PurchaseOrderService;
use crate::services::{log_order_activity, PromoService};
use crate::types::{DeliveryMethod, OrderSource, OrderStatus, PaymentType, PriceTier, SellBy};

#[derive(Clone)]
pub struct OrderService {
    db: DatabaseConnection,
    event_bus: TransactionalEventBus,
    promo: PromoService,
}

fn order_number() -> String {
    let rand: u16 = rand::thread_rng().gen_range(0..10000);
    format!("FL-{}-{:04}", Utc::now().format("%Y%m%d%H%M%S"), rand)
}

fn total_of(
    subtotal: Decimal,
    shipping: Decimal,
    sample_shipping: Decimal,
    discount: Decimal,
) -> Decimal {
    subtotal + shipping + sample_shipping - discount
}

/// Row-lock the order on Postgres; SQLite (tests) has no FOR UPDATE and
/// serializes writers anyway.
pub(crate) async fn load_order_locked<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> CommerceResult<order::Model> {
    let mut query = order::Entity::find_by_id(id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query.one(conn).await?.ok_or(CommerceError::OrderNotFound(id))
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: &[NewOrderItem],
) -> CommerceResult<Vec<order_item::Model>> {
    let mut inserted = Vec::with_capacity(items.len());
    for line in items {
        let model = order_item::ActiveModel {
            id: Set(generate_id()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            sku_id: Set(line.sku_id),
            vendor_id: Set(line.vendor_id),
            name: Set(line.name.clone()),
            collection: Set(line.collection.clone()),
            description: Set(line.description.clone()),
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
        inserted.push(model);
    }
    Ok(inserted)
}

fn product_subtotal(items: &[NewOrderItem]) -> Decimal {
    items
        .iter()
        .filter(|i| !i.is_sample)
        .map(|i| i.subtotal())
        .sum()
}

fn shipping_fields(
    delivery: &DeliveryInput,
) -> CommerceResult<(Decimal, Option<ShippingSelection>)> {
    match delivery.method {
        DeliveryMethod::Pickup => Ok((Decimal::ZERO, None)),
        DeliveryMethod::Shipping => {
            let selection = delivery
                .selection
                .clone()
                .ok_or_else(|| CommerceError::Validation("a shipping rate must be selected".into()))?;
            Ok((selection.cost, Some(selection)))
        }
    }
}

impl OrderService {
    pub fn new(db: DatabaseConnection, event_bus: TransactionalEventBus) -> Self {
        let promo = PromoService::new(db.clone());
        Self {
            db,
            event_bus,
            promo,
        }
    }

    pub async fn get(&self, id: Uuid) -> CommerceResult<order::Model> {
        order::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(CommerceError::OrderNotFound(id))
    }

    pub async fn items(&self, order_id: Uuid) -> CommerceResult<Vec<order_item::Model>> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&self.db)
            .await?)
    }

    // ═══════════════════ creation flow 1: retail checkout ═══════════════════

    /// Drains the cart into a confirmed order. The promo code is re-validated
    /// inside this transaction; a concurrent checkout that consumed the last
    /// use rolls this one back entirely.
    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    pub async fn place_retail_order(
        &self,
        input: RetailCheckoutInput,
    ) -> CommerceResult<order::Model> {
        use validator::Validate;
        input
            .validate()
            .map_err(|e| CommerceError::Validation(e.to_string()))?;

        let actor = Actor::customer(&input.email);
        let txn = self.db.begin().await?;

        let cart = cart_item::Entity::find()
            .filter(cart_item::Column::SessionId.eq(input.session_id.clone()))
            .all(&txn)
            .await?;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        if input.delivery.method == DeliveryMethod::Shipping {
            self.reject_pickup_only_lines(&txn, &cart).await?;
        }
        let lines = self.resolve_cart_lines(&txn, &cart).await?;

        let subtotal = product_subtotal(&lines);
        let (shipping_cost, selection) = shipping_fields(&input.delivery)?;

        // commit-time promo revalidation (race guard)
        let mut discount = Decimal::ZERO;
        let mut promo_id = None;
        let mut promo_eval = None;
        if let Some(code) = &input.promo_code {
            let promo_items = self.promo_items(&txn, &lines).await?;
            let eval = self
                .promo
                .calculate_discount(&txn, code, &promo_items, Some(&input.email))
                .await?;
            discount = eval.discount_amount;
            promo_id = Some(eval.promo.id);
            promo_eval = Some(eval);
        }

        let total = total_of(subtotal, shipping_cost, input.sample_shipping, discount);
        if (total - input.intent_amount).abs() > Decimal::new(1, 2) {
            return Err(CommerceError::Validation(format!(
                "payment intent amount {} does not match order total {total}",
                input.intent_amount
            )));
        }

        let customer_id = self
            .ensure_customer(&txn, &input.email, input.name.as_deref(), input.customer_id, input.account_password_hash.as_deref())
            .await?;

        let order_id = generate_id();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number()),
            email: Set(input.email.to_ascii_lowercase()),
            customer_id: Set(customer_id),
            trade_customer_id: Set(input.trade_customer_id),
            sales_rep_id: Set(None),
            project_id: Set(None),
            source: Set(OrderSource::Retail.as_str().to_string()),
            delivery_method: Set(input.delivery.method.as_str().to_string()),
            shipping_address: Set(input.delivery.address.clone()),
            shipping_carrier: Set(selection.as_ref().map(|s| s.carrier.clone())),
            shipping_service: Set(selection.as_ref().map(|s| s.service.clone())),
            transit_days: Set(selection.as_ref().and_then(|s| s.transit_days)),
            residential: Set(selection.as_ref().map(|s| s.residential).unwrap_or(true)),
            liftgate: Set(selection.as_ref().map(|s| s.liftgate).unwrap_or(true)),
            is_fallback_rate: Set(selection.as_ref().map(|s| s.is_fallback).unwrap_or(false)),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            sample_shipping: Set(input.sample_shipping),
            discount_amount: Set(discount),
            total: Set(total),
            amount_paid: Set(total),
            refund_amount: Set(Decimal::ZERO),
            promo_code_id: Set(promo_id),
            status: Set(OrderStatus::Confirmed.as_str().to_string()),
            tracking_number: Set(None),
            tracking_carrier: Set(None),
            cancel_reason: Set(None),
            confirmed_at: Set(Some(now)),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_items(&txn, order_id, &lines).await?;

        let payment_id = crate::services::payments::insert_ledger_row(
            &txn,
            order_id,
            PaymentType::Charge,
            total,
            Some(input.payment_intent_id.clone()),
            None,
            None,
            Some("checkout charge".to_string()),
            "completed",
            Some(actor.label.clone()),
        )
        .await?;

        if let (Some(promo_id), Some(eval)) = (promo_id, &promo_eval) {
            self.promo
                .record_usage(
                    &txn,
                    promo_id,
                    Some(order_id),
                    None,
                    &input.email,
                    eval.discount_amount,
                )
                .await?;
        }

        if let Some(trade_id) = input.trade_customer_id {
            self.bump_trade_spend(&txn, trade_id, total, &actor).await?;
        }

        PurchaseOrderService::generate_for_order(&txn, &order, &actor).await?;
        CartService::clear_in_tx(&txn, &input.session_id).await?;

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "created",
            json!({"source": "retail", "total": total, "order_number": order.order_number}),
        )
        .await?;

        self.event_bus
            .publish_in_tx(
                &txn,
                None,
                DomainEvent::OrderPlaced {
                    order_id,
                    order_number: order.order_number.clone(),
                    email: order.email.clone(),
                    source: OrderSource::Retail.as_str().to_string(),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                None,
                DomainEvent::PaymentRecorded {
                    order_id,
                    payment_id,
                    payment_type: PaymentType::Charge.as_str().to_string(),
                    amount_cents: money::to_cents(total),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, None, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(order)
    }

    // ═══════════════════ creation flow 2: trade bulk ═══════════════════

    #[instrument(skip(self, items))]
    pub async fn place_trade_order(
        &self,
        trade_customer_id: Uuid,
        items: Vec<TradeBulkItem>,
        delivery: DeliveryInput,
    ) -> CommerceResult<order::Model> {
        if items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let txn = self.db.begin().await?;

        let trade = trade_customer::Entity::find_by_id(trade_customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CommerceError::Validation("trade customer not found".into()))?;
        let actor = Actor::customer(&trade.email);

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let mut line = self
                .resolve_sku_line(&txn, &item.vendor_sku, item.num_boxes, item.sqft_needed)
                .await?;
            if trade.discount_percent > Decimal::ZERO {
                line.unit_price = money::floor_to_cents(
                    line.unit_price * (Decimal::ONE_HUNDRED - trade.discount_percent)
                        / Decimal::ONE_HUNDRED,
                );
            }
            lines.push(line);
        }

        let subtotal = product_subtotal(&lines);
        let (shipping_cost, selection) = shipping_fields(&delivery)?;
        let total = total_of(subtotal, shipping_cost, Decimal::ZERO, Decimal::ZERO);

        let order_id = generate_id();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number()),
            email: Set(trade.email.clone()),
            customer_id: Set(None),
            trade_customer_id: Set(Some(trade_customer_id)),
            sales_rep_id: Set(trade.assigned_rep_id),
            project_id: Set(None),
            source: Set(OrderSource::Trade.as_str().to_string()),
            delivery_method: Set(delivery.method.as_str().to_string()),
            shipping_address: Set(delivery.address.clone()),
            shipping_carrier: Set(selection.as_ref().map(|s| s.carrier.clone())),
            shipping_service: Set(selection.as_ref().map(|s| s.service.clone())),
            transit_days: Set(selection.as_ref().and_then(|s| s.transit_days)),
            residential: Set(selection.as_ref().map(|s| s.residential).unwrap_or(true)),
            liftgate: Set(selection.as_ref().map(|s| s.liftgate).unwrap_or(true)),
            is_fallback_rate: Set(selection.as_ref().map(|s| s.is_fallback).unwrap_or(false)),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            sample_shipping: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            total: Set(total),
            amount_paid: Set(Decimal::ZERO),
            refund_amount: Set(Decimal::ZERO),
            promo_code_id: Set(None),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            tracking_number: Set(None),
            tracking_carrier: Set(None),
            cancel_reason: Set(None),
            confirmed_at: Set(None),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_items(&txn, order_id, &lines).await?;
        let assigned_rep = self
            .bump_trade_spend(&txn, trade_customer_id, total, &actor)
            .await?;
        if order.sales_rep_id.is_none() {
            if let Some(rep_id) = assigned_rep {
                let mut active: order::ActiveModel = order.clone().into();
                active.sales_rep_id = Set(Some(rep_id));
                active.update(&txn).await?;
            }
        }

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "created",
            json!({"source": "trade", "total": total}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                None,
                DomainEvent::OrderPlaced {
                    order_id,
                    order_number: order.order_number.clone(),
                    email: order.email.clone(),
                    source: OrderSource::Trade.as_str().to_string(),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, None, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(order)
    }

    // ═══════════════════ creation flow 3: rep quick-create ═══════════════════

    #[instrument(skip(self, input))]
    pub async fn rep_create_order(
        &self,
        rep_id: Uuid,
        input: RepOrderInput,
    ) -> CommerceResult<order::Model> {
        if input.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let actor = Actor::rep(rep_id);
        let txn = self.db.begin().await?;

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let line = match item {
                RepItemInput::Sku {
                    vendor_sku,
                    num_boxes,
                    sqft_needed,
                } => {
                    self.resolve_sku_line(&txn, vendor_sku, *num_boxes, *sqft_needed)
                        .await?
                }
                RepItemInput::Custom {
                    product_name,
                    unit_price,
                    vendor_id,
                    num_boxes,
                    description,
                } => NewOrderItem {
                    product_id: None,
                    sku_id: None,
                    vendor_id: Some(*vendor_id),
                    name: product_name.clone(),
                    collection: None,
                    description: description.clone(),
                    num_boxes: *num_boxes,
                    sqft_needed: None,
                    unit_price: *unit_price,
                    sell_by: SellBy::Unit,
                    price_tier: None,
                    is_sample: false,
                },
            };
            lines.push(line);
        }

        let subtotal = product_subtotal(&lines);
        let (shipping_cost, selection) = shipping_fields(&input.delivery)?;
        let total = total_of(subtotal, shipping_cost, Decimal::ZERO, Decimal::ZERO);

        let offline = matches!(input.payment, RepOrderPayment::Offline);
        let (status, confirmed_at, amount_paid) = if offline {
            (OrderStatus::Confirmed, Some(Utc::now()), total)
        } else {
            (OrderStatus::Pending, None, Decimal::ZERO)
        };

        let order_id = generate_id();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number()),
            email: Set(input.email.to_ascii_lowercase()),
            customer_id: Set(input.customer_id),
            trade_customer_id: Set(input.trade_customer_id),
            sales_rep_id: Set(Some(rep_id)),
            project_id: Set(input.project_id),
            source: Set(OrderSource::Rep.as_str().to_string()),
            delivery_method: Set(input.delivery.method.as_str().to_string()),
            shipping_address: Set(input.delivery.address.clone()),
            shipping_carrier: Set(selection.as_ref().map(|s| s.carrier.clone())),
            shipping_service: Set(selection.as_ref().map(|s| s.service.clone())),
            transit_days: Set(selection.as_ref().and_then(|s| s.transit_days)),
            residential: Set(selection.as_ref().map(|s| s.residential).unwrap_or(true)),
            liftgate: Set(selection.as_ref().map(|s| s.liftgate).unwrap_or(true)),
            is_fallback_rate: Set(selection.as_ref().map(|s| s.is_fallback).unwrap_or(false)),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            sample_shipping: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            total: Set(total),
            amount_paid: Set(amount_paid),
            refund_amount: Set(Decimal::ZERO),
            promo_code_id: Set(None),
            status: Set(status.as_str().to_string()),
            tracking_number: Set(None),
            tracking_carrier: Set(None),
            cancel_reason: Set(None),
            confirmed_at: Set(confirmed_at),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_items(&txn, order_id, &lines).await?;

        match &input.payment {
            RepOrderPayment::Offline => {
                crate::services::payments::insert_ledger_row(
                    &txn,
                    order_id,
                    PaymentType::Charge,
                    total,
                    None,
                    None,
                    None,
                    Some("offline payment recorded at creation".to_string()),
                    "completed",
                    Some(actor.label.clone()),
                )
                .await?;
                PurchaseOrderService::generate_for_order(&txn, &order, &actor).await?;
            }
            RepOrderPayment::Stripe { payment_intent_id } => {
                crate::services::payments::insert_ledger_row(
                    &txn,
                    order_id,
                    PaymentType::Charge,
                    total,
                    Some(payment_intent_id.clone()),
                    None,
                    None,
                    Some("awaiting gateway confirmation".to_string()),
                    "pending",
                    Some(actor.label.clone()),
                )
                .await?;
            }
        }

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "created",
            json!({"source": "rep", "total": total, "offline": offline}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                Some(rep_id),
                DomainEvent::OrderPlaced {
                    order_id,
                    order_number: order.order_number.clone(),
                    email: order.email.clone(),
                    source: OrderSource::Rep.as_str().to_string(),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, Some(rep_id), DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(order)
    }

    // ═══════════════════ creation flow 4: quote conversion ═══════════════════

    /// Copies the quote into a new order, carrying promo code and discount
    /// forward, and freezes the quote as converted.
    #[instrument(skip(self))]
    pub async fn convert_quote(
        &self,
        quote_id: Uuid,
        payment: RepOrderPayment,
        actor: Actor,
    ) -> CommerceResult<order::Model> {
        use crate::entities::{quote, quote_item};
        use crate::types::QuoteStatus;

        let txn = self.db.begin().await?;

        let quote = quote::Entity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or(CommerceError::QuoteNotFound(quote_id))?;
        match QuoteStatus::parse(&quote.status)? {
            QuoteStatus::Converted => return Err(CommerceError::QuoteAlreadyConverted),
            QuoteStatus::Expired => {
                return Err(CommerceError::Validation("quote has expired".into()))
            }
            QuoteStatus::Draft | QuoteStatus::Sent => {}
        }

        let quote_lines = quote_item::Entity::find()
            .filter(quote_item::Column::QuoteId.eq(quote_id))
            .all(&txn)
            .await?;

        let offline = matches!(payment, RepOrderPayment::Offline);
        let (status, confirmed_at, amount_paid) = if offline {
            (OrderStatus::Confirmed, Some(Utc::now()), quote.total)
        } else {
            (OrderStatus::Pending, None, Decimal::ZERO)
        };

        let order_id = generate_id();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number()),
            email: Set(quote.email.clone()),
            customer_id: Set(quote.customer_id),
            trade_customer_id: Set(quote.trade_customer_id),
            sales_rep_id: Set(quote.sales_rep_id),
            project_id: Set(None),
            source: Set(OrderSource::Quote.as_str().to_string()),
            delivery_method: Set(quote.delivery_method.clone()),
            shipping_address: Set(quote.shipping_address.clone()),
            shipping_carrier: Set(None),
            shipping_service: Set(None),
            transit_days: Set(None),
            residential: Set(true),
            liftgate: Set(true),
            is_fallback_rate: Set(false),
            subtotal: Set(quote.subtotal),
            shipping_cost: Set(quote.shipping_cost),
            sample_shipping: Set(quote.sample_shipping),
            discount_amount: Set(quote.discount_amount),
            total: Set(quote.total),
            amount_paid: Set(amount_paid),
            refund_amount: Set(Decimal::ZERO),
            promo_code_id: Set(quote.promo_code_id),
            status: Set(status.as_str().to_string()),
            tracking_number: Set(None),
            tracking_carrier: Set(None),
            cancel_reason: Set(None),
            confirmed_at: Set(confirmed_at),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in &quote_lines {
            order_item::ActiveModel {
                id: Set(generate_id()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                sku_id: Set(line.sku_id),
                vendor_id: Set(line.vendor_id),
                name: Set(line.name.clone()),
                collection: Set(line.collection.clone()),
                description: Set(None),
                num_boxes: Set(line.num_boxes),
                sqft_needed: Set(line.sqft_needed),
                unit_price: Set(line.unit_price),
                subtotal: Set(line.subtotal),
                sell_by: Set(line.sell_by.clone()),
                price_tier: Set(line.price_tier.clone()),
                is_sample: Set(line.is_sample),
                created_at: Set(Utc::now()),
            }
            .insert(&txn)
            .await?;
        }

        if let Some(promo_code_id) = quote.promo_code_id {
            self.promo
                .record_usage(
                    &txn,
                    promo_code_id,
                    Some(order_id),
                    None,
                    &quote.email,
                    quote.discount_amount,
                )
                .await?;
        }

        if offline {
            crate::services::payments::insert_ledger_row(
                &txn,
                order_id,
                PaymentType::Charge,
                quote.total,
                None,
                None,
                None,
                Some(format!("offline payment, converted from quote {}", quote.quote_number)),
                "completed",
                Some(actor.label.clone()),
            )
            .await?;
            PurchaseOrderService::generate_for_order(&txn, &order, &actor).await?;
        }

        let mut quote_active: quote::ActiveModel = quote.clone().into();
        quote_active.status = Set(QuoteStatus::Converted.as_str().to_string());
        quote_active.converted_order_id = Set(Some(order_id));
        quote_active.updated_at = Set(Utc::now());
        quote_active.update(&txn).await?;

        log_order_activity(
            &txn,
            order_id,
            &actor,
            "created",
            json!({"source": "quote", "quote_id": quote_id, "total": quote.total}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(
                &txn,
                actor.id,
                DomainEvent::OrderPlaced {
                    order_id,
                    order_number: order.order_number.clone(),
                    email: order.email.clone(),
                    source: OrderSource::Quote.as_str().to_string(),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(order)
    }

    // ═══════════════════ status state machine ═══════════════════

    #[instrument(skip(self, update, actor))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        update: OrderStatusUpdate,
        actor: Actor,
    ) -> CommerceResult<order::Model> {
        let target = update.target()?;
        if target == OrderStatus::Refunded {
            return Err(CommerceError::RefundViaEndpointOnly);
        }

        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        let current = OrderStatus::parse(&order.status)?;
        if current == target {
            return Err(CommerceError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }
        if current == OrderStatus::Refunded {
            return Err(CommerceError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        // forward moves advance exactly one stage; backward moves may rewind
        // further; cancel is reachable from any non-refunded state and
        // un-cancel resumes at a staged status
        let allowed = match (current.stage(), target.stage()) {
            (_, None) => target == OrderStatus::Cancelled,
            (None, Some(_)) => current == OrderStatus::Cancelled,
            (Some(from), Some(to)) => to == from + 1 || to < from,
        };
        if !allowed {
            return Err(CommerceError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        let mut active: order::ActiveModel = order.clone().into();
        let now = Utc::now();

        // leaving cancelled is an un-cancel: forbidden once refunded, and the
        // cancelled PO set is deleted so confirmation regenerates it
        if current == OrderStatus::Cancelled {
            if order.refund_amount > Decimal::ZERO {
                return Err(CommerceError::RefundedOrderUncancel);
            }
            PurchaseOrderService::delete_cancelled_for_order(&txn, order_id).await?;
            active.cancelled_at = Set(None);
            active.cancel_reason = Set(None);
        }

        match target {
            OrderStatus::Cancelled => {
                active.cancelled_at = Set(Some(now));
                active.cancel_reason = Set(update.cancel_reason.clone());
                PurchaseOrderService::cancel_for_order(&txn, order_id, &actor).await?;
            }
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Shipped
            | OrderStatus::Delivered => {
                let stage = target.stage().expect("staged status");
                if target == OrderStatus::Shipped {
                    let is_shipping = order.delivery_method == DeliveryMethod::Shipping.as_str();
                    let tracking = update
                        .tracking_number
                        .clone()
                        .or_else(|| order.tracking_number.clone());
                    if is_shipping && tracking.as_deref().unwrap_or("").is_empty() {
                        return Err(CommerceError::TrackingNumberRequired);
                    }
                    active.tracking_number = Set(tracking);
                    if let Some(carrier) = update.tracking_carrier.clone() {
                        active.tracking_carrier = Set(Some(carrier));
                    }
                }

                // set the mark for the stage being entered, clear downstream
                if stage >= 1 && order.confirmed_at.is_none() {
                    active.confirmed_at = Set(Some(now));
                }
                if stage >= 2 && order.shipped_at.is_none() {
                    active.shipped_at = Set(Some(now));
                }
                if stage >= 3 {
                    active.delivered_at = Set(Some(now));
                }
                if stage < 3 {
                    active.delivered_at = Set(None);
                }
                if stage < 2 {
                    active.shipped_at = Set(None);
                    active.tracking_number = Set(None);
                    active.tracking_carrier = Set(None);
                }
                if stage < 1 {
                    active.confirmed_at = Set(None);
                }

                if target == OrderStatus::Confirmed {
                    PurchaseOrderService::generate_for_order(&txn, &order, &actor).await?;
                }
            }
            OrderStatus::Refunded => unreachable!("rejected above"),
        }

        active.status = Set(target.as_str().to_string());
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let mut detail = json!({"from": current.as_str(), "to": target.as_str()});
        if let Some(tracking) = &update.tracking_number {
            detail["tracking_number"] = json!(tracking);
        }
        if let Some(reason) = &update.cancel_reason {
            detail["reason"] = json!(reason);
        }
        log_order_activity(&txn, order_id, &actor, "status_changed", detail).await?;

        self.event_bus
            .publish_in_tx(
                &txn,
                actor.id,
                DomainEvent::OrderStatusChanged {
                    order_id,
                    from: current.as_str().to_string(),
                    to: target.as_str().to_string(),
                },
            )
            .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;

        txn.commit().await?;
        Ok(updated)
    }

    // ═══════════════════ item mutation ═══════════════════

    #[instrument(skip(self, line, actor))]
    pub async fn add_item(
        &self,
        order_id: Uuid,
        line: NewOrderItem,
        actor: Actor,
    ) -> CommerceResult<order_item::Model> {
        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        Self::require_mutable(&order)?;

        let inserted = insert_items(&txn, order_id, std::slice::from_ref(&line)).await?;
        let item = inserted.into_iter().next().expect("one line inserted");

        // pending orders have no PO set yet; confirmation will pick this up
        if order.status == OrderStatus::Confirmed.as_str() {
            PurchaseOrderService::attach_item(&txn, &order, &item, &actor).await?;
        }

        Self::recompute_totals(&txn, order_id).await?;
        log_order_activity(
            &txn,
            order_id,
            &actor,
            "item_added",
            json!({"item_id": item.id, "name": item.name, "subtotal": item.subtotal}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;
        txn.commit().await?;
        Ok(item)
    }

    #[instrument(skip(self, actor))]
    pub async fn remove_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        actor: Actor,
    ) -> CommerceResult<()> {
        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        Self::require_mutable(&order)?;

        let item = order_item::Entity::find_by_id(item_id)
            .filter(order_item::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?
            .ok_or(CommerceError::OrderItemNotFound(item_id))?;

        // PO items reference the line; delete them first
        PurchaseOrderService::detach_item(&txn, item_id, &actor).await?;
        order_item::Entity::delete_by_id(item_id).exec(&txn).await?;

        Self::recompute_totals(&txn, order_id).await?;
        log_order_activity(
            &txn,
            order_id,
            &actor,
            "item_removed",
            json!({"item_id": item_id, "name": item.name}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// Rep-only: reprice a line, leaving an audit row.
    #[instrument(skip(self))]
    pub async fn adjust_item_price(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        new_unit_price: Decimal,
        reason: Option<String>,
        rep_id: Uuid,
    ) -> CommerceResult<order_item::Model> {
        if new_unit_price < Decimal::ZERO {
            return Err(CommerceError::Validation("price cannot be negative".into()));
        }
        let actor = Actor::rep(rep_id);
        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        Self::require_mutable(&order)?;

        let item = order_item::Entity::find_by_id(item_id)
            .filter(order_item::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?
            .ok_or(CommerceError::OrderItemNotFound(item_id))?;
        let old_price = item.unit_price;
        let num_boxes = item.num_boxes;

        let mut active: order_item::ActiveModel = item.into();
        active.unit_price = Set(new_unit_price);
        active.subtotal = Set(money::floor_to_cents(
            new_unit_price * Decimal::from(num_boxes),
        ));
        let updated = active.update(&txn).await?;

        order_price_adjustment::Entity::insert(order_price_adjustment::ActiveModel {
            id: Set(generate_id()),
            order_id: Set(order_id),
            order_item_id: Set(item_id),
            old_unit_price: Set(old_price),
            new_unit_price: Set(new_unit_price),
            reason: Set(reason.clone()),
            adjusted_by: Set(rep_id),
            created_at: Set(Utc::now()),
        })
        .exec_without_returning(&txn)
        .await?;

        Self::recompute_totals(&txn, order_id).await?;
        log_order_activity(
            &txn,
            order_id,
            &actor,
            "price_adjusted",
            json!({"item_id": item_id, "old": old_price, "new": new_unit_price, "reason": reason}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(&txn, Some(rep_id), DomainEvent::OrderMutated { order_id })
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    // ═══════════════════ delivery-method change ═══════════════════

    #[instrument(skip(self, actor))]
    pub async fn set_delivery_pickup(&self, order_id: Uuid, actor: Actor) -> CommerceResult<order::Model> {
        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        Self::require_mutable(&order)?;

        let mut active: order::ActiveModel = order.into();
        active.delivery_method = Set(DeliveryMethod::Pickup.as_str().to_string());
        active.shipping_address = Set(None);
        active.shipping_carrier = Set(None);
        active.shipping_service = Set(None);
        active.transit_days = Set(None);
        active.shipping_cost = Set(Decimal::ZERO);
        active.is_fallback_rate = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let updated = Self::recompute_totals(&txn, order_id).await?;
        log_order_activity(&txn, order_id, &actor, "delivery_changed", json!({"method": "pickup"}))
            .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Second phase of the switch-to-shipping flow: the caller already chose
    /// a rate from the live options.
    #[instrument(skip(self, address, selection, actor))]
    pub async fn set_delivery_shipping(
        &self,
        order_id: Uuid,
        address: serde_json::Value,
        selection: ShippingSelection,
        actor: Actor,
    ) -> CommerceResult<order::Model> {
        let txn = self.db.begin().await?;
        let order = load_order_locked(&txn, order_id).await?;
        Self::require_mutable(&order)?;

        let mut active: order::ActiveModel = order.into();
        active.delivery_method = Set(DeliveryMethod::Shipping.as_str().to_string());
        active.shipping_address = Set(Some(address));
        active.shipping_carrier = Set(Some(selection.carrier.clone()));
        active.shipping_service = Set(Some(selection.service.clone()));
        active.transit_days = Set(selection.transit_days);
        active.residential = Set(selection.residential);
        active.liftgate = Set(selection.liftgate);
        active.shipping_cost = Set(selection.cost);
        active.is_fallback_rate = Set(selection.is_fallback);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let updated = Self::recompute_totals(&txn, order_id).await?;
        log_order_activity(
            &txn,
            order_id,
            &actor,
            "delivery_changed",
            json!({"method": "shipping", "carrier": selection.carrier, "cost": selection.cost}),
        )
        .await?;
        self.event_bus
            .publish_in_tx(&txn, actor.id, DomainEvent::OrderMutated { order_id })
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    // ═══════════════════ shared helpers ═══════════════════

    fn require_mutable(order: &order::Model) -> CommerceResult<()> {
        let status = OrderStatus::parse(&order.status)?;
        if !matches!(status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return Err(CommerceError::Validation(format!(
                "order in status {status} cannot be modified"
            )));
        }
        Ok(())
    }

    /// Recomputes `subtotal` from the line set and restores the totals
    /// identity. Returns the updated order.
    pub(crate) async fn recompute_totals<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> CommerceResult<order::Model> {
        let order = order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(conn)
            .await?;
        let subtotal: Decimal = items
            .iter()
            .filter(|i| !i.is_sample)
            .map(|i| i.subtotal)
            .sum();
        let total = total_of(
            subtotal,
            order.shipping_cost,
            order.sample_shipping,
            order.discount_amount,
        );
        let mut active: order::ActiveModel = order.into();
        active.subtotal = Set(subtotal);
        active.total = Set(total);
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }

    async fn resolve_sku_line<C: ConnectionTrait>(
        &self,
        conn: &C,
        vendor_sku: &str,
        num_boxes: i32,
        sqft_needed: Option<Decimal>,
    ) -> CommerceResult<NewOrderItem> {
        if num_boxes <= 0 {
            return Err(CommerceError::Validation("num_boxes must be positive".into()));
        }
        let sku = sku::Entity::find()
            .filter(sku::Column::VendorSku.eq(vendor_sku))
            .filter(sku::Column::IsActive.eq(true))
            .one(conn)
            .await?
            .ok_or_else(|| CommerceError::SkuNotFound(vendor_sku.to_string()))?;
        let product = product::Entity::find_by_id(sku.product_id)
            .one(conn)
            .await?
            .ok_or_else(|| CommerceError::SkuNotFound(vendor_sku.to_string()))?;
        Ok(NewOrderItem {
            product_id: Some(product.id),
            sku_id: Some(sku.id),
            vendor_id: Some(product.vendor_id),
            name: product.name.clone(),
            collection: product.collection.clone(),
            description: None,
            num_boxes,
            sqft_needed,
            unit_price: sku.retail_price,
            sell_by: SellBy::parse(&sku.sell_by).unwrap_or(SellBy::Unit),
            price_tier: None,
            is_sample: sku.is_sample,
        })
    }

    /// Slab variants never ship; they stay pickup-only.
    async fn reject_pickup_only_lines<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: &[cart_item::Model],
    ) -> CommerceResult<()> {
        for row in cart {
            let Some(sku_id) = row.sku_id else { continue };
            let Some(sku) = sku::Entity::find_by_id(sku_id).one(conn).await? else {
                continue;
            };
            if sku.variant_type.as_deref() == Some("slab") {
                return Err(CommerceError::Validation(format!(
                    "{} is pickup-only and cannot be shipped",
                    row.name
                )));
            }
        }
        Ok(())
    }

    /// Cart rows → resolved lines (vendor and collection come from the
    /// catalog; price was fixed at add-to-cart time).
    async fn resolve_cart_lines<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: &[cart_item::Model],
    ) -> CommerceResult<Vec<NewOrderItem>> {
        let mut lines = Vec::with_capacity(cart.len());
        for row in cart {
            let (vendor_id, collection) = match row.product_id {
                Some(product_id) => {
                    let product = product::Entity::find_by_id(product_id).one(conn).await?;
                    (
                        product.as_ref().map(|p| p.vendor_id),
                        product.and_then(|p| p.collection),
                    )
                }
                None => (None, None),
            };
            lines.push(NewOrderItem {
                product_id: row.product_id,
                sku_id: row.sku_id,
                vendor_id,
                name: row.name.clone(),
                collection,
                description: None,
                num_boxes: row.num_boxes,
                sqft_needed: row.sqft_needed,
                unit_price: row.unit_price,
                sell_by: SellBy::parse(&row.sell_by).unwrap_or(SellBy::Unit),
                price_tier: row
                    .price_tier
                    .as_deref()
                    .and_then(|t| PriceTier::parse(t).ok()),
                is_sample: row.is_sample,
            });
        }
        Ok(lines)
    }

    async fn promo_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        lines: &[NewOrderItem],
    ) -> CommerceResult<Vec<PromoItem>> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let category_id = match line.product_id {
                Some(product_id) => product::Entity::find_by_id(product_id)
                    .one(conn)
                    .await?
                    .and_then(|p| p.category_id),
                None => None,
            };
            items.push(PromoItem {
                product_id: line.product_id,
                category_id,
                subtotal: line.subtotal(),
                is_sample: line.is_sample,
            });
        }
        Ok(items)
    }

    async fn ensure_customer<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
        name: Option<&str>,
        existing_id: Option<Uuid>,
        password_hash: Option<&str>,
    ) -> CommerceResult<Option<Uuid>> {
        if let Some(id) = existing_id {
            return Ok(Some(id));
        }
        let email = email.to_ascii_lowercase();
        if let Some(existing) = customer::Entity::find()
            .filter(customer::Column::Email.eq(email.clone()))
            .one(conn)
            .await?
        {
            if existing.password_hash.is_none() {
                if let Some(hash) = password_hash {
                    let mut active: customer::ActiveModel = existing.clone().into();
                    active.password_hash = Set(Some(hash.to_string()));
                    active.update(conn).await?;
                }
            }
            return Ok(Some(existing.id));
        }
        if password_hash.is_none() && name.is_none() {
            return Ok(None);
        }
        let model = customer::ActiveModel {
            id: Set(generate_id()),
            email: Set(email),
            name: Set(name.map(str::to_string)),
            password_hash: Set(password_hash.map(str::to_string)),
            phone: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        Ok(Some(model.id))
    }

    /// Adds to the trade account's lifetime spend, promotes it to any tier
    /// it now qualifies for (never downward), and round-robins a rep onto
    /// unassigned accounts. Returns the rep now assigned, if any.
    async fn bump_trade_spend<C: ConnectionTrait>(
        &self,
        conn: &C,
        trade_customer_id: Uuid,
        amount: Decimal,
        actor: &Actor,
    ) -> CommerceResult<Option<Uuid>> {
        let trade = trade_customer::Entity::find_by_id(trade_customer_id)
            .one(conn)
            .await?
            .ok_or_else(|| CommerceError::Validation("trade customer not found".into()))?;

        let new_spend = trade.lifetime_spend + amount;
        let current_rank = match trade.tier_id {
            Some(tier_id) => trade_tier::Entity::find_by_id(tier_id)
                .one(conn)
                .await?
                .map(|t| t.rank)
                .unwrap_or(0),
            None => 0,
        };
        let tiers = trade_tier::Entity::find().all(conn).await?;
        let promoted = tiers
            .iter()
            .filter(|t| t.spend_threshold <= new_spend && t.rank > current_rank)
            .max_by_key(|t| t.rank)
            .cloned();

        let assigned_rep = match trade.assigned_rep_id {
            Some(id) => Some(id),
            None => self.next_rep_round_robin(conn).await?,
        };

        let mut active: trade_customer::ActiveModel = trade.clone().into();
        active.lifetime_spend = Set(new_spend);
        if let Some(tier) = &promoted {
            active.tier_id = Set(Some(tier.id));
            active.discount_percent = Set(tier.discount_percent);
        }
        if trade.assigned_rep_id.is_none() {
            active.assigned_rep_id = Set(assigned_rep);
        }
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;

        if let Some(tier) = promoted {
            self.event_bus
                .publish_in_tx(
                    conn,
                    actor.id,
                    DomainEvent::TradeTierPromoted {
                        trade_customer_id,
                        tier: tier.name.clone(),
                    },
                )
                .await?;
        }
        Ok(assigned_rep)
    }

    /// The active rep with the fewest assigned trade accounts gets the next
    /// one; ties break on seniority.
    async fn next_rep_round_robin<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> CommerceResult<Option<Uuid>> {
        let reps = sales_rep::Entity::find()
            .filter(sales_rep::Column::IsActive.eq(true))
            .all(conn)
            .await?;
        let mut best: Option<(u64, chrono::DateTime<chrono::Utc>, Uuid)> = None;
        for rep in reps {
            let assigned = trade_customer::Entity::find()
                .filter(trade_customer::Column::AssignedRepId.eq(rep.id))
                .count(conn)
                .await?;
            let candidate = (assigned, rep.created_at, rep.id);
            if best.as_ref().map(|b| candidate < *b).unwrap_or(true) {
                best = Some(candidate);
            }
        }
        Ok(best.map(|(_, _, id)| id))
    }
}
