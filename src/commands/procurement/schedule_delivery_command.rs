use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{category, procurement_order, DeliveryMethod, DeliveryStatus, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDER_TRANSITIONS,
    services::{
        audit::{log_procurement_activity, ProcurementActivity},
        state_machine::{self, ScheduleRequest},
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{authorize, find_items, find_order_for_update, non_blank, record_failure};

/// Sets the delivery method, place and date of an approved order.
#[derive(Debug, Clone)]
pub struct ScheduleDeliveryCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_location: Option<String>,
    pub scheduled_delivery_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub delivery_notes: Option<String>,
}

/// An order is physical when any item's category generates assets or the item
/// has no category at all.
pub(crate) async fn order_has_physical_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<bool, ServiceError> {
    let items = find_items(conn, order_id).await?;
    let category_ids: Vec<Uuid> = items.iter().filter_map(|i| i.category_id).collect();
    let generates: HashMap<Uuid, bool> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|c| (c.id, c.generates_assets))
            .collect()
    };

    Ok(items.iter().any(|item| match item.category_id {
        None => true,
        Some(id) => generates.get(&id).copied().unwrap_or(true),
    }))
}

#[async_trait::async_trait]
impl Command for ScheduleDeliveryCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (old_status, old_delivery, order) = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::ScheduleDelivery, e))?;

        info!(
            method = ?order.delivery_method,
            date = ?order.scheduled_delivery_date,
            "delivery scheduled"
        );
        ORDER_TRANSITIONS
            .with_label_values(&["schedule_delivery"])
            .inc();
        event_sender
            .send_or_log(Event::DeliveryStatusChanged {
                order_id: order.id,
                old_status: old_delivery.to_string(),
                new_status: order.delivery_status.to_string(),
            })
            .await;
        if old_status != order.status {
            event_sender
                .send_or_log(Event::ProcurementOrderStatusChanged {
                    order_id: order.id,
                    old_status: old_status.to_string(),
                    new_status: order.status.to_string(),
                })
                .await;
        }

        Ok(order)
    }
}

impl ScheduleDeliveryCommand {
    /// Returns the order and delivery statuses held before scheduling.
    async fn apply(
        &self,
        db: &DbPool,
    ) -> Result<(OrderStatus, DeliveryStatus, procurement_order::Model), ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::ScheduleDelivery, &order).await?;

        let physical = order_has_physical_items(&txn, order.id).await?;
        let request = ScheduleRequest {
            delivery_method: self.delivery_method,
            delivery_location: non_blank(&self.delivery_location),
            scheduled_delivery_date: self.scheduled_delivery_date,
        };
        state_machine::validate_schedule(
            order.status,
            physical,
            &request,
            Utc::now().date_naive(),
        )?;
        state_machine::validate_delivery_transition(
            order.delivery_status,
            DeliveryStatus::Scheduled,
        )?;

        let old_status = order.status;
        let old_delivery = order.delivery_status;
        let mut active: procurement_order::ActiveModel = order.into();
        active.status = Set(OrderStatus::ScheduledForDelivery);
        active.delivery_status = Set(DeliveryStatus::Scheduled);
        active.delivery_method = Set(request.delivery_method);
        active.delivery_location = Set(request.delivery_location.clone());
        active.scheduled_delivery_date = Set(request.scheduled_delivery_date);
        active.tracking_number = Set(non_blank(&self.tracking_number));
        active.delivery_notes = Set(non_blank(&self.delivery_notes));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new("schedule_delivery")
                .change(old_status, updated.status)
                .notes(Some(format!(
                    "Delivery {} -> {} via {} to {} on {}",
                    old_delivery,
                    updated.delivery_status,
                    request
                        .delivery_method
                        .map(|m| m.to_string())
                        .unwrap_or_default(),
                    request.delivery_location.unwrap_or_default(),
                    request
                        .scheduled_delivery_date
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                ))),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok((old_status, old_delivery, updated))
    }
}
