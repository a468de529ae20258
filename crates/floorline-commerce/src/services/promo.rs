use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tracing::instrument;
use uuid::Uuid;

use floorline_core::{generate_id, money};

use crate::dto::{PromoEvaluation, PromoItem};
use crate::entities::{promo_code, promo_code_usage};
use crate::error::{CommerceError, CommerceResult};
use crate::types::PromoType;

/// Promo validation runs twice per checkout: a dry run when the intent is
/// created and again inside the placing transaction. Both calls go through
/// [`PromoService::calculate_discount`] so they cannot disagree on logic,
/// only on data — and the second run is the one that counts.
#[derive(Clone)]
pub struct PromoService {
    db: DatabaseConnection,
}

impl PromoService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    #[instrument(skip(self, conn, items))]
    pub async fn calculate_discount<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        items: &[PromoItem],
        email: Option<&str>,
    ) -> CommerceResult<PromoEvaluation> {
        let promo = promo_code::Entity::find()
            .filter(promo_code::Column::Code.eq(code.to_uppercase()))
            .one(conn)
            .await?
            .ok_or_else(|| CommerceError::Promo("Invalid promo code".into()))?;

        if !promo.is_active {
            return Err(CommerceError::Promo("This promo code is no longer active".into()));
        }
        if let Some(expires_at) = promo.expires_at {
            if expires_at < chrono::Utc::now() {
                return Err(CommerceError::Promo("This promo code has expired".into()));
            }
        }

        if let Some(max_uses) = promo.max_uses {
            // quote-only usages never consume the global counter
            let used = promo_code_usage::Entity::find()
                .filter(promo_code_usage::Column::PromoCodeId.eq(promo.id))
                .filter(promo_code_usage::Column::OrderId.is_not_null())
                .count(conn)
                .await?;
            if used >= max_uses as u64 {
                return Err(CommerceError::Promo("This promo code has reached its usage limit".into()));
            }
        }

        if let (Some(per_customer), Some(email)) = (promo.max_uses_per_customer, email) {
            let used = promo_code_usage::Entity::find()
                .filter(promo_code_usage::Column::PromoCodeId.eq(promo.id))
                .filter(promo_code_usage::Column::OrderId.is_not_null())
                .filter(promo_code_usage::Column::CustomerEmail.eq(email.to_ascii_lowercase()))
                .count(conn)
                .await?;
            if used >= per_customer as u64 {
                return Err(CommerceError::Promo(
                    "You have already used this promo code the maximum number of times".into(),
                ));
            }
        }

        let restricted_categories = id_set(promo.restricted_category_ids.as_ref());
        let restricted_products = id_set(promo.restricted_product_ids.as_ref());
        let restricted = !restricted_categories.is_empty() || !restricted_products.is_empty();

        let mut eligible_subtotal = Decimal::ZERO;
        let mut full_product_subtotal = Decimal::ZERO;
        for item in items {
            if item.is_sample {
                continue;
            }
            full_product_subtotal += item.subtotal;
            let eligible = if restricted {
                item.product_id
                    .map(|id| restricted_products.contains(&id))
                    .unwrap_or(false)
                    || item
                        .category_id
                        .map(|id| restricted_categories.contains(&id))
                        .unwrap_or(false)
            } else {
                true
            };
            if eligible {
                eligible_subtotal += item.subtotal;
            }
        }

        if let Some(min_order) = promo.min_order_amount {
            if full_product_subtotal < min_order {
                return Err(CommerceError::Promo(format!(
                    "Order must be at least ${min_order} to use this code"
                )));
            }
        }
        if eligible_subtotal <= Decimal::ZERO {
            return Err(CommerceError::Promo(
                "No items in this order are eligible for this code".into(),
            ));
        }

        let discount_amount = match PromoType::parse(&promo.promo_type)? {
            PromoType::Percent => {
                money::floor_to_cents(eligible_subtotal * promo.value / Decimal::ONE_HUNDRED)
            }
            PromoType::Fixed => money::floor_to_cents(promo.value.min(eligible_subtotal)),
        };

        Ok(PromoEvaluation {
            promo,
            discount_amount,
            eligible_subtotal,
        })
    }

    /// Writes the usage row inside the caller's transaction so it is only
    /// visible if the order commits.
    pub async fn record_usage<C: ConnectionTrait>(
        &self,
        conn: &C,
        promo_code_id: Uuid,
        order_id: Option<Uuid>,
        quote_id: Option<Uuid>,
        email: &str,
        discount_amount: Decimal,
    ) -> CommerceResult<()> {
        promo_code_usage::Entity::insert(promo_code_usage::ActiveModel {
            id: Set(generate_id()),
            promo_code_id: Set(promo_code_id),
            order_id: Set(order_id),
            quote_id: Set(quote_id),
            customer_email: Set(email.to_ascii_lowercase()),
            discount_amount: Set(discount_amount),
            created_at: Set(chrono::Utc::now()),
        })
        .exec_without_returning(conn)
        .await?;
        Ok(())
    }
}

fn id_set(value: Option<&sea_orm::JsonValue>) -> std::collections::HashSet<Uuid> {
    value
        .and_then(|v| v.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse::<Uuid>().ok())
                .collect()
        })
        .unwrap_or_default()
}
