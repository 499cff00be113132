use crate::{
    auth::{gate::ProcurementAction, RequestContext},
    commands::Command,
    db::DbPool,
    entities::{procurement_order, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ORDER_TRANSITIONS,
    services::{
        audit::{log_procurement_activity, ProcurementActivity},
        state_machine::{self, CancellationReason},
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{authorize, find_order_for_update, record_failure};

#[derive(Debug, Clone)]
pub struct CancelProcurementOrderCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub reason: CancellationReason,
    pub custom_reason: Option<String>,
    pub notes: Option<String>,
}

#[async_trait::async_trait]
impl Command for CancelProcurementOrderCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, reason = %self.reason))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (old_status, order) = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(ProcurementAction::Cancel, e))?;

        info!(user_id = %self.ctx.user_id, "procurement order canceled");
        ORDER_TRANSITIONS.with_label_values(&["cancel"]).inc();
        event_sender
            .send_or_log(Event::ProcurementOrderStatusChanged {
                order_id: order.id,
                old_status: old_status.to_string(),
                new_status: order.status.to_string(),
            })
            .await;
        event_sender
            .send_or_log(Event::ProcurementOrderCanceled {
                order_id: order.id,
                reason: order.cancellation_reason.clone().unwrap_or_default(),
            })
            .await;

        Ok(order)
    }
}

impl CancelProcurementOrderCommand {
    async fn apply(
        &self,
        db: &DbPool,
    ) -> Result<(OrderStatus, procurement_order::Model), ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, ProcurementAction::Cancel, &order).await?;
        let summary = state_machine::cancellation_summary(
            order.status,
            self.reason,
            self.custom_reason.as_deref(),
            self.notes.as_deref(),
        )?;

        let now = Utc::now();
        let old_status = order.status;
        let mut active: procurement_order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Canceled);
        active.cancellation_reason = Set(Some(summary.clone()));
        active.canceled_by = Set(Some(self.ctx.user_id));
        active.canceled_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new("cancel")
                .change(old_status, OrderStatus::Canceled)
                .notes(Some(summary)),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok((old_status, updated))
    }
}
