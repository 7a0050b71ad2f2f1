use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A completed purchase against a buy order. `buy_order_id` is nullable;
/// draft creation rejects purchases without the linkage.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub buy_order_id: Option<i64>,
    pub invoice_number: Option<String>,
    pub date: Option<Date>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::buy_order::Entity",
        from = "Column::BuyOrderId",
        to = "super::buy_order::Column::Id"
    )]
    BuyOrder,
    #[sea_orm(has_many = "super::purchase_line::Entity")]
    PurchaseLines,
    #[sea_orm(has_many = "super::retaceo_header::Entity")]
    RetaceoHeaders,
}

impl Related<super::buy_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuyOrder.def()
    }
}

impl Related<super::purchase_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseLines.def()
    }
}

impl Related<super::retaceo_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RetaceoHeaders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
