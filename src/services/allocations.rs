use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::entities::{
    purchase::{self, Entity as PurchaseEntity},
    purchase_line::{self, Entity as PurchaseLineEntity},
    retaceo_header::{self, Entity as RetaceoHeaderEntity, STATUS_PENDING},
    retaceo_line::{self, Entity as RetaceoLineEntity},
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::expenses::ExpenseService;
use crate::services::proration::{self, AllocationCalculation, LineInput};

/// Persisted money values are rounded to the store's currency precision;
/// calculations run at full precision up to this point.
const MONEY_SCALE: u32 = 4;

/// Input for `create_with_calculation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAllocation {
    pub purchase_id: i64,
    pub code: Option<String>,
    pub invoice_ref: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Mutable header fields of a pending draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAllocation {
    pub code: Option<String>,
    pub invoice_ref: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Mutable fields of a detail line. Exposed but not exercised by the
/// happy-path workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAllocationLine {
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub status: Option<String>,
}

/// A draft header together with its detail lines, in line order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationWithLines {
    pub header: retaceo_header::Model,
    pub lines: Vec<retaceo_line::Model>,
}

/// Result of `create_with_calculation`: the stored draft plus the
/// calculation payload it was built from, so callers can display what was
/// computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCreation {
    pub allocation: AllocationWithLines,
    pub calculation: AllocationCalculation,
}

/// Manages allocation drafts and their detail lines.
#[derive(Clone)]
pub struct AllocationService {
    db: Arc<DatabaseConnection>,
    expenses: ExpenseService,
    event_sender: Option<EventSender>,
}

impl AllocationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        let expenses = ExpenseService::new(db.clone());
        Self {
            db,
            expenses,
            event_sender,
        }
    }

    /// Recomputes the proration for a purchase and persists it as a pending
    /// draft: one header row, then one detail row per line item.
    ///
    /// The calculation always runs against the purchase's current line items
    /// and the buy order's current expense entries; a previously returned
    /// preview is never trusted. Detail rows are inserted sequentially and
    /// NOT under one transaction; a failure partway leaves a partial draft.
    /// This mirrors the draft stage's weaker contract; approval is the
    /// atomic boundary.
    #[instrument(skip(self))]
    pub async fn create_with_calculation(
        &self,
        input: NewAllocation,
    ) -> Result<DraftCreation, ServiceError> {
        let db = &*self.db;

        let purchase = PurchaseEntity::find_by_id(input.purchase_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase {} not found", input.purchase_id))
            })?;

        let purchase_lines = PurchaseLineEntity::find()
            .filter(purchase_line::Column::PurchaseId.eq(purchase.id))
            .order_by_asc(purchase_line::Column::Id)
            .all(db)
            .await?;

        if purchase_lines.is_empty() {
            return Err(ServiceError::NoDetails(format!(
                "purchase {} has no line items",
                purchase.id
            )));
        }

        let buy_order_id = purchase
            .buy_order_id
            .ok_or(ServiceError::NoBuyOrder(purchase.id))?;

        let summary = self.expenses.summarize(buy_order_id).await?;

        let line_inputs: Vec<LineInput> = purchase_lines.iter().map(LineInput::from).collect();
        let calculation = proration::allocate(&line_inputs, &summary).map_err(|e| match e {
            ServiceError::ZeroFob(_) => ServiceError::ZeroFob(format!(
                "purchase {} has no FOB value to prorate against",
                purchase.id
            )),
            other => other,
        })?;

        let header = retaceo_header::ActiveModel {
            purchase_id: Set(purchase.id),
            code: Set(input.code),
            invoice_ref: Set(input.invoice_ref),
            date: Set(input.date),
            status: Set(STATUS_PENDING.to_string()),
            created_at: Set(Some(Utc::now())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };

        let header = header.insert(db).await.map_err(|e| {
            error!("Failed to create allocation header: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut lines = Vec::with_capacity(calculation.items.len());
        for item in &calculation.items {
            let line = retaceo_line::ActiveModel {
                retaceo_id: Set(header.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.unit_cost.round_dp(MONEY_SCALE)),
                status: Set(STATUS_PENDING.to_string()),
                created_at: Set(Some(Utc::now())),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            };

            let line = line.insert(db).await.map_err(|e| {
                error!(
                    "Failed to create allocation line for product {}: {}",
                    item.product_id, e
                );
                ServiceError::DatabaseError(e)
            })?;
            lines.push(line);
        }

        info!(
            "Allocation draft {} created for purchase {} with {} lines",
            header.id,
            purchase.id,
            lines.len()
        );

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::AllocationDraftCreated {
                    retaceo_id: header.id,
                    purchase_id: purchase.id,
                    total_fob: calculation.total_fob,
                    total_expenses: calculation.total_expenses,
                    line_count: lines.len(),
                })
                .await;
        }

        Ok(DraftCreation {
            allocation: AllocationWithLines { header, lines },
            calculation,
        })
    }

    /// Gets a draft with its detail lines.
    #[instrument(skip(self))]
    pub async fn get(&self, retaceo_id: i64) -> Result<AllocationWithLines, ServiceError> {
        let db = &*self.db;

        let header = RetaceoHeaderEntity::find_by_id(retaceo_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Allocation {} not found", retaceo_id))
            })?;

        let lines = RetaceoLineEntity::find()
            .filter(retaceo_line::Column::RetaceoId.eq(retaceo_id))
            .order_by_asc(retaceo_line::Column::Id)
            .all(db)
            .await?;

        Ok(AllocationWithLines { header, lines })
    }

    /// Lists all allocation headers.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<retaceo_header::Model>, ServiceError> {
        let db = &*self.db;
        let headers = RetaceoHeaderEntity::find()
            .order_by_asc(retaceo_header::Column::Id)
            .all(db)
            .await?;
        Ok(headers)
    }

    /// Lists allocation headers for one purchase. Uniqueness per purchase
    /// is not enforced; multiple drafts are the caller's responsibility.
    #[instrument(skip(self))]
    pub async fn list_for_purchase(
        &self,
        purchase_id: i64,
    ) -> Result<Vec<retaceo_header::Model>, ServiceError> {
        let db = &*self.db;
        let headers = RetaceoHeaderEntity::find()
            .filter(retaceo_header::Column::PurchaseId.eq(purchase_id))
            .order_by_asc(retaceo_header::Column::Id)
            .all(db)
            .await?;
        Ok(headers)
    }

    /// Updates a pending draft's header fields.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        retaceo_id: i64,
        update: UpdateAllocation,
    ) -> Result<retaceo_header::Model, ServiceError> {
        let db = &*self.db;

        let header = self.pending_header(retaceo_id).await?;

        let mut active: retaceo_header::ActiveModel = header.into();
        if let Some(code) = update.code {
            active.code = Set(Some(code));
        }
        if let Some(invoice_ref) = update.invoice_ref {
            active.invoice_ref = Set(Some(invoice_ref));
        }
        if let Some(date) = update.date {
            active.date = Set(Some(date));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;
        Ok(updated)
    }

    /// Deletes a pending draft together with its detail lines.
    #[instrument(skip(self))]
    pub async fn delete(&self, retaceo_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db;

        self.pending_header(retaceo_id).await?;

        let txn = db.begin().await?;

        RetaceoLineEntity::delete_many()
            .filter(retaceo_line::Column::RetaceoId.eq(retaceo_id))
            .exec(&txn)
            .await?;

        RetaceoHeaderEntity::delete_by_id(retaceo_id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!("Allocation draft {} deleted", retaceo_id);

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::AllocationDraftDeleted { retaceo_id })
                .await;
        }

        Ok(())
    }

    /// Gets a single detail line.
    #[instrument(skip(self))]
    pub async fn get_line(&self, line_id: i64) -> Result<retaceo_line::Model, ServiceError> {
        let db = &*self.db;
        RetaceoLineEntity::find_by_id(line_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Allocation line {} not found", line_id))
            })
    }

    /// Updates a detail line of a pending draft.
    #[instrument(skip(self))]
    pub async fn update_line(
        &self,
        line_id: i64,
        update: UpdateAllocationLine,
    ) -> Result<retaceo_line::Model, ServiceError> {
        let db = &*self.db;

        let line = self.get_line(line_id).await?;
        self.pending_header(line.retaceo_id).await?;

        let mut active: retaceo_line::ActiveModel = line.into();
        if let Some(quantity) = update.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(price) = update.price {
            active.price = Set(price.round_dp(MONEY_SCALE));
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;
        Ok(updated)
    }

    /// Deletes a detail line of a pending draft.
    #[instrument(skip(self))]
    pub async fn delete_line(&self, line_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db;

        let line = self.get_line(line_id).await?;
        self.pending_header(line.retaceo_id).await?;

        RetaceoLineEntity::delete_by_id(line_id).exec(db).await?;
        Ok(())
    }

    /// Loads a header and rejects mutation once approved.
    async fn pending_header(
        &self,
        retaceo_id: i64,
    ) -> Result<retaceo_header::Model, ServiceError> {
        let db = &*self.db;

        let header = RetaceoHeaderEntity::find_by_id(retaceo_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Allocation {} not found", retaceo_id))
            })?;

        if header.is_approved() {
            return Err(ServiceError::AlreadyApproved(retaceo_id));
        }

        Ok(header)
    }
}
