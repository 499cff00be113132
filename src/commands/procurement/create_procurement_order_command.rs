use crate::{
    auth::{gate, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{
        category, procurement_item, procurement_order, project, DeliveryStatus,
        ItemDiscrepancyStatus, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDER_TRANSITIONS,
    services::{
        audit::{log_procurement_activity, ProcurementActivity},
        pricing::{line_subtotal, OrderTotals},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{non_blank, record_failure};
use crate::auth::gate::ProcurementAction;

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// One line of a new order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewProcurementItem {
    #[validate(length(min = 1, max = 255, message = "Item name is required"))]
    pub item_name: String,
    pub description: Option<String>,
    pub specifications: Option<String>,
    #[validate(length(max = 32))]
    pub unit: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "1250.00")]
    pub unit_price: Decimal,
    pub category_id: Option<Uuid>,
}

/// Raises a Draft order with its items and computed money fields.
#[derive(Debug, Clone, Validate)]
pub struct CreateProcurementOrderCommand {
    pub ctx: RequestContext,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub vendor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[validate(custom = "validate_non_negative")]
    pub discount: Decimal,
    pub is_retroactive: bool,
    pub retroactive_reason: Option<String>,
    pub quote_file: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<NewProcurementItem>,
    pub vat_rate: Decimal,
    pub ewt_rate: Decimal,
}

/// `PO-20240510-3F2A9C`
fn po_number(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("PO-{}-{}", Utc::now().format("%Y%m%d"), &simple[..6])
}

#[async_trait::async_trait]
impl Command for CreateProcurementOrderCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(user_id = %self.ctx.user_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let order = self
            .create(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::Edit, e))?;

        info!(order_id = %order.id, po_number = %order.po_number, "procurement order created");
        ORDER_TRANSITIONS.with_label_values(&["create"]).inc();
        event_sender
            .send_or_log(Event::ProcurementOrderCreated {
                order_id: order.id,
                po_number: order.po_number.clone(),
            })
            .await;

        Ok(order)
    }
}

impl CreateProcurementOrderCommand {
    fn check_input(&self) -> Result<(), ServiceError> {
        self.validate()?;
        if self.is_retroactive && non_blank(&self.retroactive_reason).is_none() {
            return Err(ServiceError::ValidationErrors(vec![
                "retroactive_reason: A reason is required for retroactive purchase orders"
                    .to_string(),
            ]));
        }
        Ok(())
    }

    async fn create(&self, db: &DbPool) -> Result<procurement_order::Model, ServiceError> {
        self.check_input()?;
        gate::can_create(self.project_id, &self.ctx).into_result("create")?;

        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        if let Some(project_id) = self.project_id {
            project::Entity::find_by_id(project_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::ValidationErrors(vec![format!(
                        "project_id: Project {} does not exist",
                        project_id
                    )])
                })?;
        }

        let category_ids: HashSet<Uuid> =
            self.items.iter().filter_map(|i| i.category_id).collect();
        if !category_ids.is_empty() {
            let found: HashSet<Uuid> = category::Entity::find()
                .filter(category::Column::Id.is_in(category_ids.iter().copied()))
                .all(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|c| c.id)
                .collect();
            let mut missing: Vec<String> = category_ids
                .difference(&found)
                .map(|id| format!("items.category_id: Category {} does not exist", id))
                .collect();
            if !missing.is_empty() {
                missing.sort();
                return Err(ServiceError::ValidationErrors(missing));
            }
        }

        let line_totals: Vec<Decimal> = self
            .items
            .iter()
            .map(|i| line_subtotal(i.quantity, i.unit_price))
            .collect::<Result<_, _>>()?;
        let totals = OrderTotals::compute(
            line_totals.iter().copied(),
            self.discount,
            self.vat_rate,
            self.ewt_rate,
        )?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order = procurement_order::ActiveModel {
            id: Set(order_id),
            po_number: Set(po_number(order_id)),
            title: Set(self.title.trim().to_string()),
            vendor_id: Set(self.vendor_id),
            project_id: Set(self.project_id),
            subtotal: Set(totals.subtotal),
            vat_amount: Set(totals.vat_amount),
            ewt_amount: Set(totals.ewt_amount),
            discount: Set(totals.discount),
            net_total: Set(totals.net_total),
            status: Set(OrderStatus::Draft),
            delivery_status: Set(DeliveryStatus::Pending),
            is_retroactive: Set(self.is_retroactive),
            retroactive_reason: Set(if self.is_retroactive {
                non_blank(&self.retroactive_reason)
            } else {
                None
            }),
            requested_by: Set(self.ctx.user_id),
            approved_by: Set(None),
            approved_at: Set(None),
            received_by: Set(None),
            received_at: Set(None),
            quote_file: Set(non_blank(&self.quote_file)),
            receipt_file: Set(None),
            evidence_file: Set(None),
            scheduled_delivery_date: Set(None),
            actual_delivery_date: Set(None),
            delivery_method: Set(None),
            delivery_location: Set(None),
            tracking_number: Set(None),
            delivery_notes: Set(None),
            has_discrepancy: Set(false),
            discrepancy_type: Set(None),
            discrepancy_details: Set(None),
            discrepancy_resolved_at: Set(None),
            discrepancy_resolved_by: Set(None),
            discrepancy_resolution_notes: Set(None),
            discrepancy_resolution_action: Set(None),
            cancellation_reason: Set(None),
            canceled_by: Set(None),
            canceled_at: Set(None),
            notes: Set(non_blank(&self.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        for (item, subtotal) in self.items.iter().zip(line_totals) {
            procurement_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                procurement_order_id: Set(order_id),
                item_name: Set(item.item_name.trim().to_string()),
                description: Set(non_blank(&item.description)),
                specifications: Set(non_blank(&item.specifications)),
                unit: Set(non_blank(&item.unit)),
                quantity: Set(item.quantity),
                quantity_received: Set(0),
                unit_price: Set(item.unit_price),
                subtotal: Set(subtotal),
                category_id: Set(item.category_id),
                delivery_complete: Set(false),
                quality_notes: Set(None),
                excess_quantity: Set(0),
                discrepancy_status: Set(ItemDiscrepancyStatus::None),
                discrepancy_resolution_notes: Set(None),
                discrepancy_resolution_action: Set(None),
                discrepancy_resolved_by: Set(None),
                discrepancy_resolved_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        }

        log_procurement_activity(
            &txn,
            order_id,
            self.ctx.user_id,
            ProcurementActivity::new("created")
                .to_value(OrderStatus::Draft)
                .notes(Some(format!(
                    "{} item(s), net total {}",
                    self.items.len(),
                    totals.net_total
                ))),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn command(items: Vec<NewProcurementItem>) -> CreateProcurementOrderCommand {
        CreateProcurementOrderCommand {
            ctx: RequestContext::new(Uuid::new_v4(), Role::ProcurementOfficer),
            title: "Formworks for Level 2".into(),
            vendor_id: None,
            project_id: None,
            discount: dec!(0),
            is_retroactive: false,
            retroactive_reason: None,
            quote_file: None,
            notes: None,
            items,
            vat_rate: dec!(0.12),
            ewt_rate: dec!(0.01),
        }
    }

    fn item(quantity: i32) -> NewProcurementItem {
        NewProcurementItem {
            item_name: "Plywood 3/4".into(),
            description: None,
            specifications: None,
            unit: Some("sheet".into()),
            quantity,
            unit_price: dec!(850),
            category_id: None,
        }
    }

    #[test]
    fn orders_need_items() {
        assert_matches!(
            command(vec![]).check_input(),
            Err(ServiceError::ValidationErrors(errors)) if errors[0].starts_with("items:")
        );
    }

    #[test]
    fn item_errors_carry_their_index() {
        assert_matches!(
            command(vec![item(2), item(0)]).check_input(),
            Err(ServiceError::ValidationErrors(errors)) if errors[0].starts_with("items[1].quantity")
        );
    }

    #[test]
    fn retroactive_orders_need_a_reason() {
        let mut cmd = command(vec![item(1)]);
        cmd.is_retroactive = true;
        cmd.retroactive_reason = Some("   ".into());
        assert!(cmd.check_input().is_err());
        cmd.retroactive_reason = Some("Emergency purchase during typhoon".into());
        assert!(cmd.check_input().is_ok());
    }

    #[test]
    fn po_numbers_are_prefixed() {
        assert!(po_number(Uuid::new_v4()).starts_with("PO-"));
    }
}
