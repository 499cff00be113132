use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{procurement_order, DeliveryStatus, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDER_TRANSITIONS,
    services::{
        audit::{log_procurement_activity, ProcurementActivity},
        state_machine::{self, DeliveryUpdate},
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{authorize, find_order_for_update, non_blank, record_failure};

#[derive(Debug, Clone)]
pub struct UpdateDeliveryStatusCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub delivery_status: DeliveryStatus,
    pub actual_delivery_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

/// Delivery move and the order status it dragged along, if any.
#[derive(Debug, Clone)]
pub struct DeliveryStatusUpdated {
    pub order: procurement_order::Model,
    pub old_delivery_status: DeliveryStatus,
    pub old_status: OrderStatus,
}

#[async_trait::async_trait]
impl Command for UpdateDeliveryStatusCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, to = %self.delivery_status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let updated = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::UpdateDeliveryStatus, e))?;
        let order = updated.order;

        info!(
            from = %updated.old_delivery_status,
            to = %order.delivery_status,
            "delivery status updated"
        );
        ORDER_TRANSITIONS
            .with_label_values(&["update_delivery_status"])
            .inc();
        event_sender
            .send_or_log(Event::DeliveryStatusChanged {
                order_id: order.id,
                old_status: updated.old_delivery_status.to_string(),
                new_status: order.delivery_status.to_string(),
            })
            .await;
        if updated.old_status != order.status {
            event_sender
                .send_or_log(Event::ProcurementOrderStatusChanged {
                    order_id: order.id,
                    old_status: updated.old_status.to_string(),
                    new_status: order.status.to_string(),
                })
                .await;
        }

        Ok(order)
    }
}

impl UpdateDeliveryStatusCommand {
    async fn apply(&self, db: &DbPool) -> Result<DeliveryStatusUpdated, ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::UpdateDeliveryStatus, &order).await?;

        let update = DeliveryUpdate {
            from: order.delivery_status,
            to: self.delivery_status,
            actual_delivery_date: self.actual_delivery_date,
        };
        let mirrored = state_machine::plan_delivery_update(order.status, &update)?;

        let old_status = order.status;
        let old_delivery_status = order.delivery_status;
        let mut active: procurement_order::ActiveModel = order.into();
        active.delivery_status = Set(self.delivery_status);
        if let Some(status) = mirrored {
            active.status = Set(status);
        }
        if self.delivery_status == DeliveryStatus::Delivered {
            active.actual_delivery_date = Set(self.actual_delivery_date);
        }
        if let Some(tracking) = non_blank(&self.tracking_number) {
            active.tracking_number = Set(Some(tracking));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new("update_delivery_status")
                .change(old_delivery_status, updated.delivery_status)
                .notes(non_blank(&self.notes)),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(DeliveryStatusUpdated {
            order: updated,
            old_delivery_status,
            old_status,
        })
    }
}
