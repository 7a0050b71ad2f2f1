use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product master data. Mutated by the engine only during allocation
/// approval, which rewrites stock, cost basis and resale price together.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Stock on hand.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    /// Resale price.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    /// Raw (FOB) unit cost from the last approved allocation.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub bill_cost: Decimal,
    /// Landed unit cost from the last approved allocation.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub final_bill_retaceo: Decimal,
    /// price - final_bill_retaceo, maintained by the approval committer.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub utility: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_line::Entity")]
    PurchaseLines,
    #[sea_orm(has_many = "super::retaceo_line::Entity")]
    RetaceoLines,
}

impl Related<super::purchase_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseLines.def()
    }
}

impl Related<super::retaceo_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RetaceoLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
