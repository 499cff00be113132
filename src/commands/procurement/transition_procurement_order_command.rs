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
        state_machine::{self, ApprovalAction},
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{authorize, find_order_for_update, non_blank, record_failure};

/// Moves an order through the approval loop: submit, review, approve,
/// reject or return for revision.
#[derive(Debug, Clone)]
pub struct TransitionProcurementOrderCommand {
    pub ctx: RequestContext,
    pub order_id: Uuid,
    pub action: ApprovalAction,
    /// Required for reject and revise.
    pub notes: Option<String>,
}

fn gate_action(action: ApprovalAction) -> ProcurementAction {
    match action {
        ApprovalAction::Submit => ProcurementAction::Submit,
        ApprovalAction::Review => ProcurementAction::Review,
        ApprovalAction::Approve => ProcurementAction::Approve,
        ApprovalAction::Reject => ProcurementAction::Reject,
        ApprovalAction::Revise => ProcurementAction::Revise,
    }
}

#[async_trait::async_trait]
impl Command for TransitionProcurementOrderCommand {
    type Result = procurement_order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, action = %self.action))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (old_status, order) = self
            .apply(db_pool.as_ref())
            .await
            .inspect_err(|e| record_failure(gate_action(self.action), e))?;

        info!(
            old_status = %old_status,
            new_status = %order.status,
            user_id = %self.ctx.user_id,
            "procurement order transitioned"
        );
        ORDER_TRANSITIONS
            .with_label_values(&[self.action.to_string().as_str()])
            .inc();
        event_sender
            .send_or_log(Event::ProcurementOrderStatusChanged {
                order_id: order.id,
                old_status: old_status.to_string(),
                new_status: order.status.to_string(),
            })
            .await;

        Ok(order)
    }
}

impl TransitionProcurementOrderCommand {
    fn required_notes(&self) -> Result<Option<String>, ServiceError> {
        let notes = non_blank(&self.notes);
        let message = match self.action {
            ApprovalAction::Reject => "notes: A reason is required when rejecting a purchase order",
            ApprovalAction::Revise => {
                "notes: Revision notes are required when returning a purchase order"
            }
            _ => return Ok(notes),
        };
        notes
            .map(Some)
            .ok_or_else(|| ServiceError::ValidationErrors(vec![message.to_string()]))
    }

    async fn apply(
        &self,
        db: &DbPool,
    ) -> Result<(OrderStatus, procurement_order::Model), ServiceError> {
        let notes = self.required_notes()?;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order_for_update(&txn, self.order_id).await?;
        authorize(&txn, &self.ctx, gate_action(self.action), &order).await?;
        let old_status = order.status;
        let new_status = state_machine::approval_transition(self.action, old_status)?;

        let now = Utc::now();
        let mut active: procurement_order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(now);
        if self.action == ApprovalAction::Approve {
            active.approved_by = Set(Some(self.ctx.user_id));
            active.approved_at = Set(Some(now));
        }
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        log_procurement_activity(
            &txn,
            updated.id,
            self.ctx.user_id,
            ProcurementActivity::new(self.action.to_string())
                .change(old_status, new_status)
                .notes(notes),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok((old_status, updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use assert_matches::assert_matches;

    fn command(action: ApprovalAction, notes: Option<&str>) -> TransitionProcurementOrderCommand {
        TransitionProcurementOrderCommand {
            ctx: RequestContext::new(Uuid::new_v4(), Role::FinanceDirector),
            order_id: Uuid::new_v4(),
            action,
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn reject_and_revise_need_notes() {
        assert_matches!(
            command(ApprovalAction::Reject, None).required_notes(),
            Err(ServiceError::ValidationErrors(_))
        );
        assert_matches!(
            command(ApprovalAction::Revise, Some(" ")).required_notes(),
            Err(ServiceError::ValidationErrors(_))
        );
        assert_eq!(
            command(ApprovalAction::Revise, Some("fix unit prices"))
                .required_notes()
                .unwrap()
                .as_deref(),
            Some("fix unit prices")
        );
    }

    #[test]
    fn approve_notes_are_optional() {
        assert_eq!(command(ApprovalAction::Approve, None).required_notes().unwrap(), None);
    }
}
