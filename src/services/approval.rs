use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::entities::{
    buy_order::Entity as BuyOrderEntity,
    expense::{self, Entity as ExpenseEntity},
    product::{self, Entity as ProductEntity},
    purchase::Entity as PurchaseEntity,
    retaceo_header::{self, Entity as RetaceoHeaderEntity, STATUS_APPROVED},
    retaceo_line::{self, Entity as RetaceoLineEntity},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Fixed markup applied to the landed unit cost to derive the resale price.
const RESALE_MARKUP: Decimal = dec!(1.30);

/// Persisted money values are rounded to the store's currency precision;
/// the proration factor and intermediate products are not.
const MONEY_SCALE: u32 = 4;

/// Header read with an exclusive row lock (SELECT ... FOR UPDATE on
/// Postgres). Concurrent approvals of the same draft queue up here, so the
/// second one sees the approved status instead of double-applying stock.
fn header_for_update(retaceo_id: i64) -> Select<RetaceoHeaderEntity> {
    RetaceoHeaderEntity::find_by_id(retaceo_id).lock_exclusive()
}

/// Product read with an exclusive row lock, so `amount` increments computed
/// from it cannot be lost to a concurrent writer.
fn product_for_update(product_id: i64) -> Select<ProductEntity> {
    ProductEntity::find_by_id(product_id).lock_exclusive()
}

/// Commits approved allocations into product master data.
///
/// This is the engine's only atomic boundary: every product update and the
/// draft's status flip become visible together, or none do.
#[derive(Clone)]
pub struct ApprovalService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl ApprovalService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Approves a pending draft: recomputes the blended proration factor
    /// from the buy order's expenses and the draft's recorded landed
    /// prices, rewrites each affected product's stock, cost basis and
    /// resale price, and flips the draft to approved, all in one
    /// transaction. The header and product reads take exclusive row locks,
    /// so concurrent approvals touching the same rows serialize instead of
    /// losing updates.
    ///
    /// Note the formula here is the blended factor
    /// `total_expenses / total_invoice_value` applied uniformly to every
    /// line's recorded price, not the per-type split used at draft time.
    /// Returns the updated products in detail-line order.
    #[instrument(skip(self))]
    pub async fn approve(&self, retaceo_id: i64) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin approval transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let header = header_for_update(retaceo_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Allocation {} not found", retaceo_id))
            })?;

        if header.is_approved() {
            return Err(ServiceError::AlreadyApproved(retaceo_id));
        }

        let lines = RetaceoLineEntity::find()
            .filter(retaceo_line::Column::RetaceoId.eq(retaceo_id))
            .order_by_asc(retaceo_line::Column::Id)
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::NoDetails(format!(
                "allocation {} has no detail lines",
                retaceo_id
            )));
        }

        let purchase = PurchaseEntity::find_by_id(header.purchase_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::IncompleteData(format!(
                    "purchase {} behind allocation {} is missing",
                    header.purchase_id, retaceo_id
                ))
            })?;

        let buy_order_id = purchase.buy_order_id.ok_or_else(|| {
            ServiceError::IncompleteData(format!(
                "purchase {} behind allocation {} has no buy order",
                purchase.id, retaceo_id
            ))
        })?;

        BuyOrderEntity::find_by_id(buy_order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::IncompleteData(format!(
                    "buy order {} behind allocation {} is missing",
                    buy_order_id, retaceo_id
                ))
            })?;

        let expenses = ExpenseEntity::find()
            .filter(expense::Column::BuyOrderId.eq(buy_order_id))
            .all(&txn)
            .await?;

        // Flat sum; expense types are irrelevant at this stage.
        let total_expenses: Decimal = expenses.iter().map(|e| e.value).sum();

        // Invoice value from the draft's recorded landed prices, not the
        // original purchase prices.
        let total_invoice_value: Decimal =
            lines.iter().map(|l| l.quantity * l.price).sum();

        if total_invoice_value.is_zero() {
            return Err(ServiceError::ZeroInvoiceValue(format!(
                "allocation {}: detail lines sum to 0 against expenses of {}",
                retaceo_id, total_expenses
            )));
        }

        let proration_factor = total_expenses / total_invoice_value;

        let mut updated_products = Vec::with_capacity(lines.len());
        for line in &lines {
            let prorated_expense = line.price * proration_factor;
            let landed_raw = line.price + prorated_expense;
            // Round only at the persistence boundary, never mid-calculation.
            let landed_unit_cost = landed_raw.round_dp(MONEY_SCALE);
            let resale_price = (landed_raw * RESALE_MARKUP).round_dp(MONEY_SCALE);

            let product = product_for_update(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ProductNotFound(format!(
                        "product {} referenced by allocation {} does not exist",
                        line.product_id, retaceo_id
                    ))
                })?;

            let new_amount = product.amount + line.quantity;

            let mut active: product::ActiveModel = product.into();
            active.amount = Set(new_amount);
            active.price = Set(resale_price);
            active.bill_cost = Set(line.price);
            active.final_bill_retaceo = Set(landed_unit_cost);
            // Derived from the rounded persisted values so the invariant
            // utility == price - final_bill_retaceo holds exactly.
            active.utility = Set(resale_price - landed_unit_cost);
            active.updated_at = Set(Some(Utc::now()));

            let updated = active.update(&txn).await.map_err(|e| {
                error!("Failed to update product {}: {}", line.product_id, e);
                ServiceError::DatabaseError(e)
            })?;
            updated_products.push(updated);
        }

        let mut header_active: retaceo_header::ActiveModel = header.into();
        header_active.status = Set(STATUS_APPROVED.to_string());
        header_active.updated_at = Set(Some(Utc::now()));
        header_active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit approval transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(
            "Allocation {} approved: factor {} across {} products",
            retaceo_id,
            proration_factor,
            updated_products.len()
        );

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::AllocationApproved {
                    retaceo_id,
                    proration_factor,
                    products_updated: updated_products.iter().map(|p| p.id).collect(),
                })
                .await;

            for product in &updated_products {
                sender
                    .send_or_log(Event::ProductCostUpdated {
                        product_id: product.id,
                        bill_cost: product.bill_cost,
                        landed_unit_cost: product.final_bill_retaceo,
                        price: product.price,
                    })
                    .await;
            }
        }

        Ok(updated_products)
    }
}
