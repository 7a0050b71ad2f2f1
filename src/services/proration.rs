//! Proration calculator: distributes a buy order's shared expenses across
//! purchase line items in proportion to each item's share of total FOB
//! value. Pure functions; persistence-free and deterministic.
//!
//! The approval committer applies a different, blended formula (a single
//! `total_expenses / total_invoice_value` factor, see
//! `services::approval`). The two are intentionally not unified.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::entities::purchase_line;
use crate::errors::ServiceError;
use crate::services::expenses::ExpenseSummary;

/// One purchased line item as the calculator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: i64,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl From<&purchase_line::Model> for LineInput {
    fn from(line: &purchase_line::Model) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.price,
        }
    }
}

/// Per-line allocation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub product_id: i64,
    pub quantity: Decimal,
    /// quantity * price
    pub fob_cost: Decimal,
    /// Share of total FOB, as a percentage.
    pub proportion_percent: Decimal,
    /// Prorated amount per expense-type label, in label order.
    pub prorated_by_type: BTreeMap<String, Decimal>,
    pub total_prorated: Decimal,
    /// fob_cost + total_prorated
    pub final_cost: Decimal,
    /// final_cost / quantity; degenerates to final_cost when quantity is 0.
    pub unit_cost: Decimal,
}

/// Full calculation payload, returned to callers for preview and used to
/// build draft detail rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationCalculation {
    pub items: Vec<AllocationResult>,
    pub total_fob: Decimal,
    pub total_expenses: Decimal,
}

/// Allocates an expense summary across line items by FOB proportion.
///
/// Line items are processed in the order given; expense types in ascending
/// label order. Calling twice with the same inputs yields identical output.
/// Fails with `ZeroFob` when the line items carry no FOB value at all,
/// including the empty-set case; proration is undefined when nothing was
/// spent.
pub fn allocate(
    lines: &[LineInput],
    expenses: &ExpenseSummary,
) -> Result<AllocationCalculation, ServiceError> {
    let total_fob: Decimal = lines.iter().map(|l| l.quantity * l.price).sum();

    if total_fob.is_zero() {
        return Err(ServiceError::ZeroFob(
            "every line item has zero quantity or zero price".to_string(),
        ));
    }

    let items = lines
        .iter()
        .map(|line| {
            let fob_cost = line.quantity * line.price;
            let proportion = fob_cost / total_fob;

            let mut prorated_by_type = BTreeMap::new();
            let mut total_prorated = Decimal::ZERO;
            for (expense_type, amount) in &expenses.by_type {
                let prorated = *amount * proportion;
                total_prorated += prorated;
                prorated_by_type.insert(expense_type.clone(), prorated);
            }

            let final_cost = fob_cost + total_prorated;
            let unit_cost = if line.quantity.is_zero() {
                final_cost
            } else {
                final_cost / line.quantity
            };

            AllocationResult {
                product_id: line.product_id,
                quantity: line.quantity,
                fob_cost,
                proportion_percent: proportion * dec!(100),
                prorated_by_type,
                total_prorated,
                final_cost,
                unit_cost,
            }
        })
        .collect();

    Ok(AllocationCalculation {
        items,
        total_fob,
        total_expenses: expenses.total,
    })
}
