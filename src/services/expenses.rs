use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::entities::expense::{self, Entity as ExpenseEntity};
use crate::errors::ServiceError;

/// Per-type expense totals for one buy order. Derived on demand, never
/// persisted. `total` always equals the sum of `by_type` values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub by_type: BTreeMap<String, Decimal>,
    pub total: Decimal,
}

impl ExpenseSummary {
    /// Folds expense rows into per-type totals. Labels are grouped
    /// verbatim; case or whitespace variants form distinct groups.
    pub fn from_entries(entries: &[expense::Model]) -> Self {
        let mut by_type: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut total = Decimal::ZERO;

        for entry in entries {
            *by_type.entry(entry.expense_type.clone()).or_default() += entry.value;
            total += entry.value;
        }

        Self { by_type, total }
    }
}

/// Read-side aggregator over a buy order's recorded expenses.
#[derive(Clone)]
pub struct ExpenseService {
    db: Arc<DatabaseConnection>,
}

impl ExpenseService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists a buy order's expense entries in insertion order.
    #[instrument(skip(self))]
    pub async fn list_for_buy_order(
        &self,
        buy_order_id: i64,
    ) -> Result<Vec<expense::Model>, ServiceError> {
        let db = &*self.db;
        let entries = ExpenseEntity::find()
            .filter(expense::Column::BuyOrderId.eq(buy_order_id))
            .order_by_asc(expense::Column::Id)
            .all(db)
            .await?;

        Ok(entries)
    }

    /// Summarizes a buy order's expenses by type. A buy order with no
    /// recorded expenses yields an empty map and a zero total.
    #[instrument(skip(self))]
    pub async fn summarize(&self, buy_order_id: i64) -> Result<ExpenseSummary, ServiceError> {
        let entries = self.list_for_buy_order(buy_order_id).await?;
        Ok(ExpenseSummary::from_entries(&entries))
    }
}
