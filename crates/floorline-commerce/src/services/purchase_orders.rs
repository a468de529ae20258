use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money, DomainEvent};
use floorline_outbox::TransactionalEventBus;

use crate::dto::Actor;
use crate::entities::{
    edi_transaction, order, order_item, po_activity_log, product, purchase_order,
    purchase_order_item, sku, vendor,
};
use crate::error::{CommerceError, CommerceResult};
use crate::services::log_po_activity;
use crate::types::{PoItemStatus, PoStatus, PriceBasis, PriceTier};

/// Receipt from an EDI 850 upload.
#[derive(Clone, Debug)]
pub struct EdiDispatchReceipt {
    pub interchange_control_number: i64,
    pub file_name: String,
}

/// How a PO physically reaches the vendor. Implemented in the server where
/// the EDI writer, SFTP transport, PDF renderer, and mailer live.
#[async_trait]
pub trait PoDispatch: Send + Sync {
    async fn send_edi(
        &self,
        po: &purchase_order::Model,
        items: &[purchase_order_item::Model],
        vendor: &vendor::Model,
    ) -> CommerceResult<EdiDispatchReceipt>;

    async fn send_email(
        &self,
        po: &purchase_order::Model,
        items: &[purchase_order_item::Model],
        vendor_email: &str,
    ) -> CommerceResult<()>;
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: DatabaseConnection,
    event_bus: TransactionalEventBus,
}

fn po_number(vendor_code: &str) -> String {
    let rand: u16 = rand::thread_rng().gen_range(0..10000);
    format!(
        "PO-{}-{}-{:04}",
        vendor_code,
        Utc::now().format("%Y%m%d%H%M%S"),
        rand
    )
}

/// Per-box cost for an order line, from its pricing row. `per_sqft` costs
/// are multiplied out by the product's coverage; carpet tiers use their
/// tier cost.
fn normalized_cost(
    item: &order_item::Model,
    sku: Option<&sku::Model>,
    product: Option<&product::Model>,
) -> (Decimal, Option<Decimal>, Option<String>) {
    let Some(sku) = sku else {
        // custom line: the rep quoted the price directly
        return (item.unit_price, None, None);
    };

    let tier = item
        .price_tier
        .as_deref()
        .and_then(|t| PriceTier::parse(t).ok());
    let raw_cost = match tier {
        Some(PriceTier::Cut) => sku.cut_cost.unwrap_or(sku.cost),
        Some(PriceTier::Roll) => sku.roll_cost.unwrap_or(sku.cost),
        None => sku.cost,
    };

    let per_box = match PriceBasis::parse(&sku.price_basis) {
        Ok(PriceBasis::PerSqft) => {
            let sqft_per_box = product
                .and_then(|p| p.sqft_per_box)
                .unwrap_or(Decimal::ONE);
            money::floor_to_cents(raw_cost * sqft_per_box)
        }
        _ => raw_cost,
    };
    (per_box, Some(raw_cost), Some(sku.vendor_sku.clone()))
}

impl PurchaseOrderService {
    pub fn new(db: DatabaseConnection, event_bus: TransactionalEventBus) -> Self {
        Self { db, event_bus }
    }

    // ────────────────── generation (inside the confirming txn) ──────────────────

    /// Groups non-sample vendor-backed lines by vendor and creates one draft
    /// PO per vendor. Idempotent: a no-op when the order already has POs.
    pub async fn generate_for_order<C: ConnectionTrait>(
        conn: &C,
        order: &order::Model,
        actor: &Actor,
    ) -> CommerceResult<Vec<purchase_order::Model>> {
        let existing = purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order.id))
            .all(conn)
            .await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(conn)
            .await?;

        let mut by_vendor: std::collections::BTreeMap<Uuid, Vec<&order_item::Model>> =
            std::collections::BTreeMap::new();
        for item in &items {
            if item.is_sample {
                continue;
            }
            if let Some(vendor_id) = item.vendor_id {
                by_vendor.entry(vendor_id).or_default().push(item);
            }
        }

        let mut created = Vec::with_capacity(by_vendor.len());
        for (vendor_id, lines) in by_vendor {
            let vendor = vendor::Entity::find_by_id(vendor_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    CommerceError::Validation(format!("vendor {vendor_id} not found"))
                })?;

            let po_id = generate_id();
            let mut subtotal = Decimal::ZERO;
            let mut po_items = Vec::with_capacity(lines.len());
            for line in lines {
                let sku = match line.sku_id {
                    Some(id) => sku::Entity::find_by_id(id).one(conn).await?,
                    None => None,
                };
                let product = match line.product_id {
                    Some(id) => product::Entity::find_by_id(id).one(conn).await?,
                    None => None,
                };
                let (cost_per_box, original_cost, vendor_sku) =
                    normalized_cost(line, sku.as_ref(), product.as_ref());
                let line_subtotal =
                    money::floor_to_cents(cost_per_box * Decimal::from(line.num_boxes));
                subtotal += line_subtotal;
                po_items.push(purchase_order_item::ActiveModel {
                    id: Set(generate_id()),
                    purchase_order_id: Set(po_id),
                    order_item_id: Set(Some(line.id)),
                    product_name: Set(line.name.clone()),
                    vendor_sku: Set(vendor_sku),
                    qty: Set(line.num_boxes),
                    cost_per_box: Set(cost_per_box),
                    original_cost: Set(original_cost),
                    retail_price: Set(Some(line.unit_price)),
                    subtotal: Set(line_subtotal),
                    sell_by: Set(line.sell_by.clone()),
                    status: Set(PoItemStatus::Pending.as_str().to_string()),
                    created_at: Set(Utc::now()),
                });
            }

            let po = purchase_order::ActiveModel {
                id: Set(po_id),
                order_id: Set(order.id),
                vendor_id: Set(vendor_id),
                po_number: Set(po_number(&vendor.code)),
                status: Set(PoStatus::Draft.as_str().to_string()),
                revision: Set(0),
                is_revised: Set(false),
                subtotal: Set(subtotal),
                approved_by: Set(None),
                approved_at: Set(None),
                edi_interchange_id: Set(None),
                notes: Set(None),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;

            purchase_order_item::Entity::insert_many(po_items)
                .exec_without_returning(conn)
                .await?;
            log_po_activity(
                conn,
                po.id,
                actor,
                "created",
                json!({"order_id": order.id, "po_number": po.po_number}),
            )
            .await?;
            created.push(po);
        }

        Ok(created)
    }

    /// Cascade when the parent order is cancelled: every PO that is not
    /// already fulfilled or cancelled becomes cancelled.
    pub async fn cancel_for_order<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
        actor: &Actor,
    ) -> CommerceResult<()> {
        let pos = purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .all(conn)
            .await?;
        for po in pos {
            let status = PoStatus::parse(&po.status)?;
            if matches!(status, PoStatus::Fulfilled | PoStatus::Cancelled) {
                continue;
            }
            let from = po.status.clone();
            let po_id = po.id;
            let mut active: purchase_order::ActiveModel = po.into();
            active.status = Set(PoStatus::Cancelled.as_str().to_string());
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
            log_po_activity(
                conn,
                po_id,
                actor,
                "cancelled",
                json!({"from": from, "to": "cancelled", "cascade": "order_cancelled"}),
            )
            .await?;
        }
        Ok(())
    }

    /// Un-cancelling an order deletes its cancelled POs entirely so the next
    /// confirmed transition regenerates a fresh set.
    pub async fn delete_cancelled_for_order<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> CommerceResult<()> {
        let pos = purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order_id))
            .filter(purchase_order::Column::Status.eq(PoStatus::Cancelled.as_str()))
            .all(conn)
            .await?;
        for po in pos {
            purchase_order_item::Entity::delete_many()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
                .exec(conn)
                .await?;
            po_activity_log::Entity::delete_many()
                .filter(po_activity_log::Column::PurchaseOrderId.eq(po.id))
                .exec(conn)
                .await?;
            edi_transaction::Entity::delete_many()
                .filter(edi_transaction::Column::PurchaseOrderId.eq(po.id))
                .exec(conn)
                .await?;
            purchase_order::Entity::delete_by_id(po.id).exec(conn).await?;
        }
        Ok(())
    }

    // ────────────────── item mutation hooks (order add/remove) ──────────────────

    /// Find-or-create the draft PO for the line's vendor and attach a PO item.
    pub async fn attach_item<C: ConnectionTrait>(
        conn: &C,
        order: &order::Model,
        item: &order_item::Model,
        actor: &Actor,
    ) -> CommerceResult<()> {
        if item.is_sample {
            return Ok(());
        }
        let Some(vendor_id) = item.vendor_id else {
            return Ok(());
        };

        let po = match purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order.id))
            .filter(purchase_order::Column::VendorId.eq(vendor_id))
            .filter(purchase_order::Column::Status.eq(PoStatus::Draft.as_str()))
            .one(conn)
            .await?
        {
            Some(po) => po,
            None => {
                let vendor = vendor::Entity::find_by_id(vendor_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        CommerceError::Validation(format!("vendor {vendor_id} not found"))
                    })?;
                let po = purchase_order::ActiveModel {
                    id: Set(generate_id()),
                    order_id: Set(order.id),
                    vendor_id: Set(vendor_id),
                    po_number: Set(po_number(&vendor.code)),
                    status: Set(PoStatus::Draft.as_str().to_string()),
                    revision: Set(0),
                    is_revised: Set(false),
                    subtotal: Set(Decimal::ZERO),
                    approved_by: Set(None),
                    approved_at: Set(None),
                    edi_interchange_id: Set(None),
                    notes: Set(None),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(conn)
                .await?;
                log_po_activity(
                    conn,
                    po.id,
                    actor,
                    "created",
                    json!({"order_id": order.id, "po_number": po.po_number}),
                )
                .await?;
                po
            }
        };

        let sku = match item.sku_id {
            Some(id) => sku::Entity::find_by_id(id).one(conn).await?,
            None => None,
        };
        let product = match item.product_id {
            Some(id) => product::Entity::find_by_id(id).one(conn).await?,
            None => None,
        };
        let (cost_per_box, original_cost, vendor_sku) =
            normalized_cost(item, sku.as_ref(), product.as_ref());
        let line_subtotal = money::floor_to_cents(cost_per_box * Decimal::from(item.num_boxes));

        purchase_order_item::Entity::insert(purchase_order_item::ActiveModel {
            id: Set(generate_id()),
            purchase_order_id: Set(po.id),
            order_item_id: Set(Some(item.id)),
            product_name: Set(item.name.clone()),
            vendor_sku: Set(vendor_sku),
            qty: Set(item.num_boxes),
            cost_per_box: Set(cost_per_box),
            original_cost: Set(original_cost),
            retail_price: Set(Some(item.unit_price)),
            subtotal: Set(line_subtotal),
            sell_by: Set(item.sell_by.clone()),
            status: Set(PoItemStatus::Pending.as_str().to_string()),
            created_at: Set(Utc::now()),
        })
        .exec_without_returning(conn)
        .await?;

        Self::recompute_subtotal(conn, po.id).await?;
        log_po_activity(
            conn,
            po.id,
            actor,
            "item_added",
            json!({"order_item_id": item.id, "name": item.name}),
        )
        .await?;
        Ok(())
    }

    /// Removes the PO items backing a removed order line; deletes any PO
    /// left without items.
    pub async fn detach_item<C: ConnectionTrait>(
        conn: &C,
        order_item_id: Uuid,
        actor: &Actor,
    ) -> CommerceResult<()> {
        let po_items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::OrderItemId.eq(order_item_id))
            .all(conn)
            .await?;
        for po_item in po_items {
            let po_id = po_item.purchase_order_id;
            purchase_order_item::Entity::delete_by_id(po_item.id)
                .exec(conn)
                .await?;
            let remaining = purchase_order_item::Entity::find()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(po_id))
                .all(conn)
                .await?;
            if remaining.is_empty() {
                po_activity_log::Entity::delete_many()
                    .filter(po_activity_log::Column::PurchaseOrderId.eq(po_id))
                    .exec(conn)
                    .await?;
                purchase_order::Entity::delete_by_id(po_id).exec(conn).await?;
            } else {
                Self::recompute_subtotal(conn, po_id).await?;
                log_po_activity(
                    conn,
                    po_id,
                    actor,
                    "item_removed",
                    json!({"order_item_id": order_item_id}),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn recompute_subtotal<C: ConnectionTrait>(conn: &C, po_id: Uuid) -> CommerceResult<()> {
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po_id))
            .all(conn)
            .await?;
        let subtotal: Decimal = items.iter().map(|i| i.subtotal).sum();
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(conn)
            .await?
            .ok_or(CommerceError::PurchaseOrderNotFound(po_id))?;
        let mut active: purchase_order::ActiveModel = po.into();
        active.subtotal = Set(subtotal);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;
        Ok(())
    }

    // ────────────────── explicit status machine ──────────────────

    #[instrument(skip(self, actor))]
    pub async fn update_status(
        &self,
        po_id: Uuid,
        target: PoStatus,
        actor: &Actor,
    ) -> CommerceResult<purchase_order::Model> {
        let txn = self.db.begin().await?;

        let po = purchase_order::Entity::find_by_id(po_id)
            .one(&txn)
            .await?
            .ok_or(CommerceError::PurchaseOrderNotFound(po_id))?;
        let current = PoStatus::parse(&po.status)?;

        let allowed = matches!(
            (current, target),
            (PoStatus::Draft, PoStatus::Sent)
                | (PoStatus::Sent, PoStatus::Draft)
                | (PoStatus::Sent, PoStatus::Acknowledged)
                | (PoStatus::Acknowledged, PoStatus::Fulfilled)
                | (PoStatus::Draft, PoStatus::Cancelled)
                | (PoStatus::Sent, PoStatus::Cancelled)
        );
        if !allowed {
            return Err(CommerceError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        let mut active: purchase_order::ActiveModel = po.clone().into();
        let action;
        match (current, target) {
            (PoStatus::Draft, PoStatus::Sent) => {
                let revision = po.revision + 1;
                active.revision = Set(revision);
                active.is_revised = Set(revision > 1);
                active.approved_by = Set(actor.id);
                active.approved_at = Set(Some(Utc::now()));
                action = if revision > 1 { "revised_and_sent" } else { "sent" };
            }
            (PoStatus::Sent, PoStatus::Draft) => {
                active.approved_by = Set(None);
                active.approved_at = Set(None);
                action = "reverted";
            }
            (_, PoStatus::Cancelled) => action = "cancelled",
            (_, PoStatus::Acknowledged) => action = "acknowledged",
            (_, PoStatus::Fulfilled) => action = "fulfilled",
            _ => action = "status_changed",
        }
        active.status = Set(target.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        log_po_activity(
            &txn,
            po_id,
            actor,
            action,
            json!({"from": current.as_str(), "to": target.as_str()}),
        )
        .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Advances one item and derives the PO-level roll-up: all received →
    /// fulfilled, all cancelled → cancelled.
    #[instrument(skip(self, actor))]
    pub async fn update_item_status(
        &self,
        po_item_id: Uuid,
        target: PoItemStatus,
        actor: &Actor,
    ) -> CommerceResult<()> {
        let txn = self.db.begin().await?;

        let item = purchase_order_item::Entity::find_by_id(po_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| CommerceError::Validation(format!("PO item {po_item_id} not found")))?;
        let po_id = item.purchase_order_id;
        let mut active: purchase_order_item::ActiveModel = item.into();
        active.status = Set(target.as_str().to_string());
        active.update(&txn).await?;

        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po_id))
            .all(&txn)
            .await?;
        let derived = if items
            .iter()
            .all(|i| i.status == PoItemStatus::Received.as_str())
        {
            Some(PoStatus::Fulfilled)
        } else if items
            .iter()
            .all(|i| i.status == PoItemStatus::Cancelled.as_str())
        {
            Some(PoStatus::Cancelled)
        } else {
            None
        };

        if let Some(derived) = derived {
            let po = purchase_order::Entity::find_by_id(po_id)
                .one(&txn)
                .await?
                .ok_or(CommerceError::PurchaseOrderNotFound(po_id))?;
            if po.status != derived.as_str() {
                let from = po.status.clone();
                let mut active: purchase_order::ActiveModel = po.into();
                active.status = Set(derived.as_str().to_string());
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
                log_po_activity(
                    &txn,
                    po_id,
                    actor,
                    "derived_status",
                    json!({"from": from, "to": derived.as_str()}),
                )
                .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    // ────────────────── draft editing ──────────────────

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        po_id: Uuid,
        po_item_id: Uuid,
        qty: Option<i32>,
        cost_per_box: Option<Decimal>,
    ) -> CommerceResult<()> {
        let txn = self.db.begin().await?;
        self.require_draft(&txn, po_id).await?;

        let item = purchase_order_item::Entity::find_by_id(po_item_id)
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po_id))
            .one(&txn)
            .await?
            .ok_or_else(|| CommerceError::Validation(format!("PO item {po_item_id} not found")))?;
        let new_qty = qty.unwrap_or(item.qty);
        let new_cost = cost_per_box.unwrap_or(item.cost_per_box);
        if new_qty <= 0 {
            return Err(CommerceError::Validation("qty must be positive".into()));
        }
        let mut active: purchase_order_item::ActiveModel = item.into();
        active.qty = Set(new_qty);
        active.cost_per_box = Set(new_cost);
        active.subtotal = Set(money::floor_to_cents(new_cost * Decimal::from(new_qty)));
        active.update(&txn).await?;

        Self::recompute_subtotal(&txn, po_id).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn remove_po_item(&self, po_id: Uuid, po_item_id: Uuid, actor: &Actor) -> CommerceResult<()> {
        let txn = self.db.begin().await?;
        self.require_draft(&txn, po_id).await?;
        purchase_order_item::Entity::delete_many()
            .filter(purchase_order_item::Column::Id.eq(po_item_id))
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po_id))
            .exec(&txn)
            .await?;
        Self::recompute_subtotal(&txn, po_id).await?;
        log_po_activity(&txn, po_id, actor, "item_removed", json!({"po_item_id": po_item_id}))
            .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn require_draft<C: ConnectionTrait>(
        &self,
        conn: &C,
        po_id: Uuid,
    ) -> CommerceResult<purchase_order::Model> {
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(conn)
            .await?
            .ok_or(CommerceError::PurchaseOrderNotFound(po_id))?;
        if po.status != PoStatus::Draft.as_str() {
            return Err(CommerceError::PurchaseOrderNotEditable);
        }
        Ok(po)
    }

    // ────────────────── dispatch ──────────────────

    /// EDI when the vendor has it enabled, email otherwise; EDI failure
    /// falls back to email when an address exists. Both failing is the
    /// caller's error.
    #[instrument(skip(self, dispatch, actor))]
    pub async fn send_po(
        &self,
        po_id: Uuid,
        dispatch: &dyn PoDispatch,
        actor: &Actor,
    ) -> CommerceResult<purchase_order::Model> {
        let po = purchase_order::Entity::find_by_id(po_id)
            .one(&self.db)
            .await?
            .ok_or(CommerceError::PurchaseOrderNotFound(po_id))?;
        if po.status != PoStatus::Draft.as_str() {
            return Err(CommerceError::Conflict(
                "purchase order has already been sent; revert to draft to resend".into(),
            ));
        }
        let vendor = vendor::Entity::find_by_id(po.vendor_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CommerceError::Validation("vendor missing".into()))?;
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
            .all(&self.db)
            .await?;

        let mut via = "email";
        let mut receipt: Option<EdiDispatchReceipt> = None;
        if vendor.edi_enabled() {
            match dispatch.send_edi(&po, &items, &vendor).await {
                Ok(r) => {
                    via = "edi";
                    receipt = Some(r);
                }
                Err(err) => {
                    tracing::warn!(po_id = %po.id, error = %err, "EDI dispatch failed, trying email");
                    let email = vendor.email.as_deref().ok_or_else(|| {
                        CommerceError::Gateway(format!(
                            "EDI dispatch failed and vendor has no email address: {err}"
                        ))
                    })?;
                    dispatch.send_email(&po, &items, email).await?;
                }
            }
        } else {
            let email = vendor.email.as_deref().ok_or_else(|| {
                CommerceError::Validation("vendor has neither EDI nor an email address".into())
            })?;
            dispatch.send_email(&po, &items, email).await?;
        }

        let txn = self.db.begin().await?;

        if let Some(receipt) = &receipt {
            edi_transaction::Entity::insert(edi_transaction::ActiveModel {
                id: Set(generate_id()),
                purchase_order_id: Set(po.id),
                transaction_type: Set("850".to_string()),
                interchange_control_number: Set(receipt.interchange_control_number),
                status: Set("sent".to_string()),
                file_name: Set(Some(receipt.file_name.clone())),
                created_at: Set(Utc::now()),
                sent_at: Set(Some(Utc::now())),
            })
            .exec_without_returning(&txn)
            .await?;
        }

        let revision = po.revision + 1;
        let mut active: purchase_order::ActiveModel = po.clone().into();
        active.status = Set(PoStatus::Sent.as_str().to_string());
        active.revision = Set(revision);
        active.is_revised = Set(revision > 1);
        active.approved_by = Set(actor.id);
        active.approved_at = Set(Some(Utc::now()));
        if let Some(receipt) = &receipt {
            active.edi_interchange_id = Set(Some(receipt.interchange_control_number.to_string()));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        log_po_activity(
            &txn,
            po.id,
            actor,
            if revision > 1 { "revised_and_sent" } else { "sent" },
            json!({"from": "draft", "to": "sent", "via": via, "revision": revision}),
        )
        .await?;

        self.event_bus
            .publish_in_tx(
                &txn,
                actor.id,
                DomainEvent::PurchaseOrderSent {
                    purchase_order_id: po.id,
                    via: via.to_string(),
                    revision,
                },
            )
            .await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Inbound 855 acknowledgment matched by interchange control number.
    pub async fn acknowledge_by_interchange(&self, interchange: i64) -> CommerceResult<Option<Uuid>> {
        let txn = purchase_order::Entity::find()
            .filter(purchase_order::Column::EdiInterchangeId.eq(interchange.to_string()))
            .one(&self.db)
            .await?;
        let Some(po) = txn else { return Ok(None) };
        if po.status != PoStatus::Sent.as_str() {
            return Ok(Some(po.id));
        }
        let po_id = po.id;
        self.update_status(po_id, PoStatus::Acknowledged, &Actor::system("edi-855"))
            .await?;
        Ok(Some(po_id))
    }
}
