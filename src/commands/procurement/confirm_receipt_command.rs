use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{
        procurement_item, procurement_order, DeliveryStatus, DiscrepancyType,
        ItemDiscrepancyStatus, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{ORDER_TRANSITIONS, RECEIPTS_CONFIRMED},
    services::{
        audit::{log_procurement_activity, ProcurementActivity},
        receipt::{self, DiscrepancyReport, ItemLedger, ReceiptLine},
        state_machine,
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{authorize, find_items, find_order_for_update, non_blank, record_failure};

/// Quantity counted for one line in this receipt.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiptItemInput {
    pub item_id: Uuid,
    #[validate(range(min = 0, message = "Received quantity cannot be negative"))]
    pub quantity_received: i32,
    #[serde(default)]
    pub delivery_complete: bool,
    pub quality_notes: Option<String>,
}

/// Records what physically arrived and moves the order to Delivered or
/// Received in one transaction.
#[derive(Debug, Clone, Validate)]
pub struct ConfirmReceiptCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    #[validate]
    pub items: Vec<ReceiptItemInput>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub has_discrepancy: bool,
    pub discrepancy_type: Option<DiscrepancyType>,
    pub discrepancy_details: Option<String>,
    pub receipt_file: Option<String>,
    pub evidence_file: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceiptConfirmation {
    pub order: procurement_order::Model,
    pub items: Vec<procurement_item::Model>,
    pub fully_received: bool,
}

#[async_trait::async_trait]
impl Command for ConfirmReceiptCommand {
    type Result = ReceiptConfirmation;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, has_discrepancy = self.has_discrepancy))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (old_status, confirmation) = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::Receive, e))?;
        let order = &confirmation.order;

        let outcome = if self.has_discrepancy {
            "discrepancy"
        } else if confirmation.fully_received {
            "received"
        } else {
            "partial"
        };
        info!(
            outcome,
            new_status = %order.status,
            user_id = %self.ctx.user_id,
            "receipt confirmed"
        );
        RECEIPTS_CONFIRMED.with_label_values(&[outcome]).inc();
        ORDER_TRANSITIONS.with_label_values(&["receive"]).inc();

        if old_status != order.status {
            event_sender
                .send_or_log(Event::ProcurementOrderStatusChanged {
                    order_id: order.id,
                    old_status: old_status.to_string(),
                    new_status: order.status.to_string(),
                })
                .await;
        }
        event_sender
            .send_or_log(Event::ReceiptConfirmed {
                order_id: order.id,
                fully_received: confirmation.fully_received,
                has_discrepancy: self.has_discrepancy,
            })
            .await;

        Ok(confirmation)
    }
}

impl ConfirmReceiptCommand {
    /// Input lines keyed by item; repeated lines for the same item add up.
    fn receipt_lines(&self) -> Result<BTreeMap<Uuid, ReceiptLine>, ServiceError> {
        let mut lines: BTreeMap<Uuid, ReceiptLine> = BTreeMap::new();
        for input in &self.items {
            let line = lines.entry(input.item_id).or_default();
            line.quantity_received = line
                .quantity_received
                .checked_add(input.quantity_received)
                .ok_or_else(|| {
                    ServiceError::ValidationErrors(vec![format!(
                        "items: Received quantity for item {} is too large",
                        input.item_id
                    )])
                })?;
            line.delivery_complete |= input.delivery_complete;
            if let Some(notes) = non_blank(&input.quality_notes) {
                line.quality_notes = Some(match line.quality_notes.take() {
                    Some(existing) => format!("{}; {}", existing, notes),
                    None => notes,
                });
            }
        }
        Ok(lines)
    }

    async fn apply(
        &self,
        db: &DbPool,
    ) -> Result<(OrderStatus, ReceiptConfirmation), ServiceError> {
        self.validate()?;
        let lines = self.receipt_lines()?;

        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::Receive, &order).await?;
        state_machine::ensure_receivable(order.status, order.delivery_status)?;

        let items = find_items(&txn, order.id).await?;
        let ledger: Vec<ItemLedger> = items
            .iter()
            .map(|i| ItemLedger {
                item_id: i.id,
                item_name: i.item_name.clone(),
                quantity: i.quantity,
                quantity_received: i.quantity_received,
                excess_quantity: i.excess_quantity,
            })
            .collect();
        let report = DiscrepancyReport {
            has_discrepancy: self.has_discrepancy,
            discrepancy_type: self.discrepancy_type,
            discrepancy_details: non_blank(&self.discrepancy_details),
        };
        let outcome = receipt::reconcile(&ledger, &lines, &report)?;

        let now = Utc::now();
        let mut by_id: HashMap<Uuid, procurement_item::Model> =
            items.into_iter().map(|i| (i.id, i)).collect();
        let mut updated_items = Vec::with_capacity(outcome.items.len());
        let mut summary = Vec::new();
        for reconciled in &outcome.items {
            let Some(item) = by_id.remove(&reconciled.item_id) else {
                continue;
            };
            let added = lines
                .get(&item.id)
                .map(|l| l.quantity_received)
                .unwrap_or_default();
            if added > 0 || reconciled.excess_quantity > item.excess_quantity {
                summary.push(format!(
                    "{}: +{} ({}/{})",
                    item.item_name, added, reconciled.quantity_received, item.quantity
                ));
            }
            if reconciled.excess_quantity > item.excess_quantity {
                warn!(
                    item_id = %item.id,
                    excess = reconciled.excess_quantity,
                    "over-delivery recorded as discrepancy"
                );
            }

            let quality_notes = reconciled
                .quality_notes
                .clone()
                .or_else(|| item.quality_notes.clone());
            let mut active: procurement_item::ActiveModel = item.into();
            active.quantity_received = Set(reconciled.quantity_received);
            active.excess_quantity = Set(reconciled.excess_quantity);
            active.delivery_complete = Set(reconciled.delivery_complete);
            active.quality_notes = Set(quality_notes);
            if reconciled.opens_discrepancy {
                active.discrepancy_status = Set(ItemDiscrepancyStatus::Open);
            }
            active.updated_at = Set(now);
            updated_items.push(active.update(&txn).await.map_err(ServiceError::db_error)?);
        }

        let old_status = order.status;
        let actual_date = self
            .actual_delivery_date
            .or(order.actual_delivery_date)
            .unwrap_or_else(|| now.date_naive());
        let mut active: procurement_order::ActiveModel = order.into();
        active.status = Set(outcome.new_status);
        active.delivery_status = Set(DeliveryStatus::Delivered);
        active.actual_delivery_date = Set(Some(actual_date));
        active.received_by = Set(Some(self.ctx.user_id));
        active.received_at = Set(Some(now));
        if let Some(file) = non_blank(&self.receipt_file) {
            active.receipt_file = Set(Some(file));
        }
        if let Some(file) = non_blank(&self.evidence_file) {
            active.evidence_file = Set(Some(file));
        }
        if report.has_discrepancy {
            active.has_discrepancy = Set(true);
            active.discrepancy_type = Set(report.discrepancy_type);
            active.discrepancy_details = Set(report.discrepancy_details.clone());
            active.discrepancy_resolved_at = Set(None);
            active.discrepancy_resolved_by = Set(None);
            active.discrepancy_resolution_notes = Set(None);
            active.discrepancy_resolution_action = Set(None);
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut notes = summary.join("; ");
        if let Some(extra) = non_blank(&self.notes) {
            if !notes.is_empty() {
                notes.push_str(" - ");
            }
            notes.push_str(&extra);
        }
        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new("receive")
                .change(old_status, updated.status)
                .notes(Some(notes).filter(|n| !n.is_empty())),
        )
        .await?;
        if let (true, Some(kind)) = (report.has_discrepancy, report.discrepancy_type) {
            log_procurement_activity(
                &txn,
                updated.id,
                self.ctx.user_id,
                ProcurementActivity::new("discrepancy_reported")
                    .to_value(kind)
                    .notes(report.discrepancy_details),
            )
            .await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok((
            old_status,
            ReceiptConfirmation {
                order: updated,
                items: updated_items,
                fully_received: outcome.fully_received,
            },
        ))
    }
}
