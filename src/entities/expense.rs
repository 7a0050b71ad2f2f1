use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Incidental expense recorded against a buy order (freight, duty,
/// insurance, ...). Grouped by the verbatim `expense_type` label when
/// summarized; never mutated by the engine.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub buy_order_id: i64,
    pub expense_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub value: Decimal,
    pub date: Option<Date>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::buy_order::Entity",
        from = "Column::BuyOrderId",
        to = "super::buy_order::Column::Id"
    )]
    BuyOrder,
}

impl Related<super::buy_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuyOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
