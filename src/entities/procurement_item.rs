use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

use super::procurement_order::ResolutionAction;

/// Per-line discrepancy state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemDiscrepancyStatus {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ProcurementItem)]
#[sea_orm(table_name = "procurement_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub procurement_order_id: Uuid,
    pub item_name: String,
    pub description: Option<String>,
    pub specifications: Option<String>,
    pub unit: Option<String>,
    pub quantity: i32,
    /// Cumulative across receipts, capped at `quantity`.
    pub quantity_received: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub category_id: Option<Uuid>,
    pub delivery_complete: bool,
    pub quality_notes: Option<String>,
    pub excess_quantity: i32,
    pub discrepancy_status: ItemDiscrepancyStatus,
    pub discrepancy_resolution_notes: Option<String>,
    pub discrepancy_resolution_action: Option<ResolutionAction>,
    pub discrepancy_resolved_by: Option<Uuid>,
    pub discrepancy_resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn outstanding_quantity(&self) -> i32 {
        (self.quantity - self.quantity_received).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::procurement_order::Entity",
        from = "Column::ProcurementOrderId",
        to = "super::procurement_order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::procurement_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
