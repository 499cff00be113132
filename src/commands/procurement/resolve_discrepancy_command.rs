use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{procurement_item, procurement_order, ItemDiscrepancyStatus, ResolutionAction},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDER_TRANSITIONS,
    services::audit::{log_procurement_activity, ProcurementActivity},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{authorize, find_items, find_order_for_update, non_blank, record_failure};

fn required_notes(notes: &Option<String>) -> Result<String, ServiceError> {
    non_blank(notes).ok_or_else(|| {
        ServiceError::ValidationErrors(vec![
            "resolution_notes: Resolution notes are required".to_string()
        ])
    })
}

struct Resolution<'a> {
    user_id: Uuid,
    notes: &'a str,
    action: ResolutionAction,
    at: DateTime<Utc>,
}

async fn resolve_item<C: ConnectionTrait>(
    conn: &C,
    item: procurement_item::Model,
    resolution: &Resolution<'_>,
) -> Result<procurement_item::Model, ServiceError> {
    let mut active: procurement_item::ActiveModel = item.into();
    active.discrepancy_status = Set(ItemDiscrepancyStatus::Resolved);
    active.discrepancy_resolution_notes = Set(Some(resolution.notes.to_string()));
    active.discrepancy_resolution_action = Set(Some(resolution.action));
    active.discrepancy_resolved_by = Set(Some(resolution.user_id));
    active.discrepancy_resolved_at = Set(Some(resolution.at));
    active.updated_at = Set(resolution.at);
    active.update(conn).await.map_err(ServiceError::db_error)
}

async fn resolve_order<C: ConnectionTrait>(
    conn: &C,
    order: procurement_order::Model,
    resolution: &Resolution<'_>,
) -> Result<procurement_order::Model, ServiceError> {
    let mut active: procurement_order::ActiveModel = order.into();
    active.discrepancy_resolved_at = Set(Some(resolution.at));
    active.discrepancy_resolved_by = Set(Some(resolution.user_id));
    active.discrepancy_resolution_notes = Set(Some(resolution.notes.to_string()));
    active.discrepancy_resolution_action = Set(Some(resolution.action));
    active.updated_at = Set(resolution.at);
    active.update(conn).await.map_err(ServiceError::db_error)
}

fn ensure_open(order: &procurement_order::Model) -> Result<(), ServiceError> {
    if order.has_open_discrepancy() {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(
            "Purchase order has no open discrepancy to resolve".to_string(),
        ))
    }
}

/// Settles the order-level discrepancy and every item still open under it.
/// The receipt itself stays as recorded.
#[derive(Debug, Clone)]
pub struct ResolveDiscrepancyCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub resolution_action: ResolutionAction,
    pub resolution_notes: Option<String>,
}

#[async_trait::async_trait]
impl Command for ResolveDiscrepancyCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, action = %self.resolution_action))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let order = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::ResolveDiscrepancy, e))?;

        info!(user_id = %self.ctx.user_id, "order discrepancy resolved");
        ORDER_TRANSITIONS
            .with_label_values(&["resolve_discrepancy"])
            .inc();
        event_sender
            .send_or_log(Event::DiscrepancyResolved {
                order_id: order.id,
                item_id: None,
            })
            .await;

        Ok(order)
    }
}

impl ResolveDiscrepancyCommand {
    async fn apply(&self, db: &DbPool) -> Result<procurement_order::Model, ServiceError> {
        let notes = required_notes(&self.resolution_notes)?;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::ResolveDiscrepancy, &order).await?;
        ensure_open(&order)?;

        let resolution = Resolution {
            user_id: self.ctx.user_id,
            notes: &notes,
            action: self.resolution_action,
            at: Utc::now(),
        };
        for item in find_items(&txn, order.id).await? {
            if item.discrepancy_status == ItemDiscrepancyStatus::Open {
                resolve_item(&txn, item, &resolution).await?;
            }
        }
        let discrepancy_type = order.discrepancy_type;
        let updated = resolve_order(&txn, order, &resolution).await?;

        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new("discrepancy_resolved")
                .change(
                    discrepancy_type.map(|t| t.to_string()).unwrap_or_default(),
                    self.resolution_action,
                )
                .notes(Some(notes.clone())),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }
}

/// Settles one item's discrepancy. Resolving the last open item also closes
/// the order-level discrepancy.
#[derive(Debug, Clone)]
pub struct ResolveItemDiscrepancyCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub resolution_action: ResolutionAction,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemDiscrepancyResolved {
    pub item: procurement_item::Model,
    pub order: procurement_order::Model,
    pub order_resolved: bool,
}

#[async_trait::async_trait]
impl Command for ResolveItemDiscrepancyCommand {
    type Result = ItemDiscrepancyResolved;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, item_id = %self.item_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let resolved = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::ResolveDiscrepancy, e))?;

        info!(
            order_resolved = resolved.order_resolved,
            "item discrepancy resolved"
        );
        ORDER_TRANSITIONS
            .with_label_values(&["resolve_item_discrepancy"])
            .inc();
        event_sender
            .send_or_log(Event::DiscrepancyResolved {
                order_id: self.order_id,
                item_id: Some(self.item_id),
            })
            .await;
        if resolved.order_resolved {
            event_sender
                .send_or_log(Event::DiscrepancyResolved {
                    order_id: self.order_id,
                    item_id: None,
                })
                .await;
        }

        Ok(resolved)
    }
}

impl ResolveItemDiscrepancyCommand {
    async fn apply(&self, db: &DbPool) -> Result<ItemDiscrepancyResolved, ServiceError> {
        let notes = required_notes(&self.resolution_notes)?;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::ResolveDiscrepancy, &order).await?;

        let items = find_items(&txn, order.id).await?;
        let item = items
            .iter()
            .find(|i| i.id == self.item_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Item {} not found on purchase order {}",
                    self.item_id, self.order_id
                ))
            })?;
        if item.discrepancy_status != ItemDiscrepancyStatus::Open {
            return Err(ServiceError::InvalidOperation(format!(
                "Item '{}' has no open discrepancy to resolve",
                item.item_name
            )));
        }

        let resolution = Resolution {
            user_id: self.ctx.user_id,
            notes: &notes,
            action: self.resolution_action,
            at: Utc::now(),
        };
        let item_name = item.item_name.clone();
        let item = resolve_item(&txn, item, &resolution).await?;

        log_procurement_activity(
            &txn,
            order.id,
            self.ctx.user_id,
            ProcurementActivity::new("item_discrepancy_resolved")
                .change(ItemDiscrepancyStatus::Open, ItemDiscrepancyStatus::Resolved)
                .notes(Some(format!(
                    "{}: {} - {}",
                    item_name, self.resolution_action, notes
                ))),
        )
        .await?;

        let others_open = items.iter().any(|i| {
            i.id != self.item_id && i.discrepancy_status == ItemDiscrepancyStatus::Open
        });
        let (order, order_resolved) = if !others_open && order.has_open_discrepancy() {
            let closing = Resolution {
                notes: "All item discrepancies resolved",
                ..resolution
            };
            let order = resolve_order(&txn, order, &closing).await?;
            log_procurement_activity(
                &txn,
                order.id,
                self.ctx.user_id,
                ProcurementActivity::new("discrepancy_resolved")
                    .to_value(self.resolution_action)
                    .notes(Some(closing.notes)),
            )
            .await?;
            (order, true)
        } else {
            (order, false)
        };

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(ItemDiscrepancyResolved {
            item,
            order,
            order_resolved,
        })
    }
}
