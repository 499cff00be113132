use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Approval and fulfilment stage of a procurement order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Draft")]
    #[serde(rename = "Draft")]
    #[strum(serialize = "Draft")]
    Draft,
    #[sea_orm(string_value = "Pending")]
    #[serde(rename = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[sea_orm(string_value = "Reviewed")]
    #[serde(rename = "Reviewed")]
    #[strum(serialize = "Reviewed")]
    Reviewed,
    #[sea_orm(string_value = "Approved")]
    #[serde(rename = "Approved")]
    #[strum(serialize = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    #[serde(rename = "Rejected")]
    #[strum(serialize = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "For Revision")]
    #[serde(rename = "For Revision")]
    #[strum(serialize = "For Revision")]
    ForRevision,
    #[sea_orm(string_value = "Scheduled for Delivery")]
    #[serde(rename = "Scheduled for Delivery")]
    #[strum(serialize = "Scheduled for Delivery")]
    ScheduledForDelivery,
    #[sea_orm(string_value = "In Transit")]
    #[serde(rename = "In Transit")]
    #[strum(serialize = "In Transit")]
    InTransit,
    #[sea_orm(string_value = "Delivered")]
    #[serde(rename = "Delivered")]
    #[strum(serialize = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Received")]
    #[serde(rename = "Received")]
    #[strum(serialize = "Received")]
    Received,
    #[sea_orm(string_value = "Canceled")]
    #[serde(rename = "Canceled")]
    #[strum(serialize = "Canceled")]
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Received | Self::Rejected | Self::Canceled)
    }
}

/// Physical delivery progress, tracked separately from the approval stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "Pending")]
    #[serde(rename = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[sea_orm(string_value = "Scheduled")]
    #[serde(rename = "Scheduled")]
    #[strum(serialize = "Scheduled")]
    Scheduled,
    #[sea_orm(string_value = "In Transit")]
    #[serde(rename = "In Transit")]
    #[strum(serialize = "In Transit")]
    InTransit,
    #[sea_orm(string_value = "Delivered")]
    #[serde(rename = "Delivered")]
    #[strum(serialize = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Delayed")]
    #[serde(rename = "Delayed")]
    #[strum(serialize = "Delayed")]
    Delayed,
    #[sea_orm(string_value = "Failed Delivery")]
    #[serde(rename = "Failed Delivery")]
    #[strum(serialize = "Failed Delivery")]
    FailedDelivery,
}

/// Delivery channel chosen when scheduling.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DeliveryMethod {
    #[sea_orm(string_value = "Pickup")]
    #[serde(rename = "Pickup")]
    #[strum(serialize = "Pickup")]
    Pickup,
    #[sea_orm(string_value = "Direct Delivery")]
    #[serde(rename = "Direct Delivery")]
    #[strum(serialize = "Direct Delivery")]
    DirectDelivery,
    #[sea_orm(string_value = "Batch Delivery")]
    #[serde(rename = "Batch Delivery")]
    #[strum(serialize = "Batch Delivery")]
    BatchDelivery,
    #[sea_orm(string_value = "Airfreight")]
    #[serde(rename = "Airfreight")]
    #[strum(serialize = "Airfreight")]
    Airfreight,
    #[sea_orm(string_value = "Bus Cargo")]
    #[serde(rename = "Bus Cargo")]
    #[strum(serialize = "Bus Cargo")]
    BusCargo,
    #[sea_orm(string_value = "Courier")]
    #[serde(rename = "Courier")]
    #[strum(serialize = "Courier")]
    Courier,
    #[sea_orm(string_value = "On-site Service")]
    #[serde(rename = "On-site Service")]
    #[strum(serialize = "On-site Service")]
    OnSiteService,
    #[sea_orm(string_value = "Remote Service")]
    #[serde(rename = "Remote Service")]
    #[strum(serialize = "Remote Service")]
    RemoteService,
    #[sea_orm(string_value = "Digital Delivery")]
    #[serde(rename = "Digital Delivery")]
    #[strum(serialize = "Digital Delivery")]
    DigitalDelivery,
    #[sea_orm(string_value = "Email")]
    #[serde(rename = "Email")]
    #[strum(serialize = "Email")]
    Email,
    #[sea_orm(string_value = "Other")]
    #[serde(rename = "Other")]
    #[strum(serialize = "Other")]
    Other,
}

impl DeliveryMethod {
    /// Methods that move physical goods.
    pub fn is_physical(self) -> bool {
        matches!(
            self,
            Self::Pickup
                | Self::DirectDelivery
                | Self::BatchDelivery
                | Self::Airfreight
                | Self::BusCargo
                | Self::Courier
                | Self::Other
        )
    }

    /// Methods that deliver a service or intangible goods.
    pub fn is_service(self) -> bool {
        matches!(
            self,
            Self::OnSiteService
                | Self::RemoteService
                | Self::DigitalDelivery
                | Self::Email
                | Self::Other
        )
    }
}

/// Kind of mismatch reported at receipt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DiscrepancyType {
    #[sea_orm(string_value = "Quantity Shortage")]
    #[serde(rename = "Quantity Shortage")]
    #[strum(serialize = "Quantity Shortage")]
    QuantityShortage,
    #[sea_orm(string_value = "Over Delivery")]
    #[serde(rename = "Over Delivery")]
    #[strum(serialize = "Over Delivery")]
    OverDelivery,
    #[sea_orm(string_value = "Damaged Items")]
    #[serde(rename = "Damaged Items")]
    #[strum(serialize = "Damaged Items")]
    DamagedItems,
    #[sea_orm(string_value = "Wrong Items")]
    #[serde(rename = "Wrong Items")]
    #[strum(serialize = "Wrong Items")]
    WrongItems,
    #[sea_orm(string_value = "Quality Issues")]
    #[serde(rename = "Quality Issues")]
    #[strum(serialize = "Quality Issues")]
    QualityIssues,
    #[sea_orm(string_value = "Other")]
    #[serde(rename = "Other")]
    #[strum(serialize = "Other")]
    Other,
}

/// How a discrepancy was settled.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionAction {
    #[sea_orm(string_value = "document_only")]
    DocumentOnly,
    #[sea_orm(string_value = "redelivery")]
    Redelivery,
    #[sea_orm(string_value = "vendor_credit")]
    VendorCredit,
    #[sea_orm(string_value = "return_to_vendor")]
    ReturnToVendor,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ProcurementOrder)]
#[sea_orm(table_name = "procurement_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub title: String,
    pub vendor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub ewt_amount: Decimal,
    pub discount: Decimal,
    pub net_total: Decimal,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub is_retroactive: bool,
    pub retroactive_reason: Option<String>,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub quote_file: Option<String>,
    pub receipt_file: Option<String>,
    pub evidence_file: Option<String>,
    pub scheduled_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_location: Option<String>,
    pub tracking_number: Option<String>,
    pub delivery_notes: Option<String>,
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub discrepancy_details: Option<String>,
    pub discrepancy_resolved_at: Option<DateTime<Utc>>,
    pub discrepancy_resolved_by: Option<Uuid>,
    pub discrepancy_resolution_notes: Option<String>,
    pub discrepancy_resolution_action: Option<ResolutionAction>,
    pub cancellation_reason: Option<String>,
    pub canceled_by: Option<Uuid>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Discrepancy reported and not yet settled.
    pub fn has_open_discrepancy(&self) -> bool {
        self.has_discrepancy && self.discrepancy_resolved_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::procurement_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::procurement_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_labels_match_stored_values() {
        assert_eq!(OrderStatus::ForRevision.to_string(), "For Revision");
        assert_eq!(
            OrderStatus::from_str("Scheduled for Delivery").unwrap(),
            OrderStatus::ScheduledForDelivery
        );
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::FailedDelivery).unwrap(),
            "\"Failed Delivery\""
        );
        assert_eq!(ResolutionAction::ReturnToVendor.to_string(), "return_to_vendor");
    }

    #[test]
    fn other_method_counts_as_both_kinds() {
        assert!(DeliveryMethod::Other.is_physical());
        assert!(DeliveryMethod::Other.is_service());
        assert!(DeliveryMethod::Courier.is_physical());
        assert!(!DeliveryMethod::Courier.is_service());
        assert!(DeliveryMethod::Email.is_service());
        assert!(!DeliveryMethod::Email.is_physical());
    }
}
