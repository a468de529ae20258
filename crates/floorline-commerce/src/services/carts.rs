use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money};

use crate::entities::{cart_item, product, sku};
use crate::error::{CommerceError, CommerceResult};

/// Anonymous carts: rows keyed by the storefront `session_id`, priced at
/// add time. An approved trade caller's tier discount is applied to the
/// unit price here so checkout and promo evaluation see the same numbers.
#[derive(Clone)]
pub struct CartService {
    db: DatabaseConnection,
}

impl CartService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        session_id: &str,
        vendor_sku: &str,
        num_boxes: i32,
        sqft_needed: Option<Decimal>,
        is_sample: bool,
        trade_discount_percent: Option<Decimal>,
    ) -> CommerceResult<cart_item::Model> {
        if num_boxes <= 0 {
            return Err(CommerceError::Validation("num_boxes must be positive".into()));
        }

        let sku = sku::Entity::find()
            .filter(sku::Column::VendorSku.eq(vendor_sku))
            .filter(sku::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or_else(|| CommerceError::SkuNotFound(vendor_sku.to_string()))?;
        let product = product::Entity::find_by_id(sku.product_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CommerceError::SkuNotFound(vendor_sku.to_string()))?;

        let mut unit_price = sku.retail_price;
        if let Some(discount) = trade_discount_percent {
            if discount > Decimal::ZERO {
                unit_price = money::floor_to_cents(
                    unit_price * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED,
                );
            }
        }

        let item = cart_item::ActiveModel {
            id: Set(generate_id()),
            session_id: Set(session_id.to_string()),
            product_id: Set(Some(product.id)),
            sku_id: Set(Some(sku.id)),
            name: Set(product.name.clone()),
            num_boxes: Set(num_boxes),
            sqft_needed: Set(sqft_needed),
            unit_price: Set(unit_price),
            sell_by: Set(sku.sell_by.clone()),
            price_tier: Set(None),
            is_sample: Set(is_sample),
            created_at: Set(chrono::Utc::now()),
        };
        Ok(item.insert(&self.db).await?)
    }

    pub async fn items(&self, session_id: &str) -> CommerceResult<Vec<cart_item::Model>> {
        Ok(cart_item::Entity::find()
            .filter(cart_item::Column::SessionId.eq(session_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn update_quantity(
        &self,
        session_id: &str,
        item_id: Uuid,
        num_boxes: i32,
    ) -> CommerceResult<cart_item::Model> {
        if num_boxes <= 0 {
            return Err(CommerceError::Validation("num_boxes must be positive".into()));
        }
        let item = cart_item::Entity::find_by_id(item_id)
            .filter(cart_item::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await?
            .ok_or(CommerceError::OrderItemNotFound(item_id))?;
        let mut active: cart_item::ActiveModel = item.into();
        active.num_boxes = Set(num_boxes);
        Ok(active.update(&self.db).await?)
    }

    pub async fn remove_item(&self, session_id: &str, item_id: Uuid) -> CommerceResult<()> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Checkout drains the cart inside the order transaction.
    pub(crate) async fn clear_in_tx<C: ConnectionTrait>(
        conn: &C,
        session_id: &str,
    ) -> CommerceResult<u64> {
        let res = cart_item::Entity::delete_many()
            .filter(cart_item::Column::SessionId.eq(session_id))
            .exec(conn)
            .await?;
        Ok(res.rows_affected)
    }
}
