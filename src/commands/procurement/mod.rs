pub mod cancel_procurement_order_command;
pub mod confirm_receipt_command;
pub mod create_procurement_order_command;
pub mod resolve_discrepancy_command;
pub mod schedule_delivery_command;
pub mod transition_procurement_order_command;
pub mod update_delivery_status_command;

pub use cancel_procurement_order_command::CancelProcurementOrderCommand;
pub use confirm_receipt_command::{ConfirmReceiptCommand, ReceiptConfirmation, ReceiptItemInput};
pub use create_procurement_order_command::{CreateProcurementOrderCommand, NewProcurementItem};
pub use resolve_discrepancy_command::{
    ItemDiscrepancyResolved, ResolveDiscrepancyCommand, ResolveItemDiscrepancyCommand,
};
pub use schedule_delivery_command::ScheduleDeliveryCommand;
pub use transition_procurement_order_command::TransitionProcurementOrderCommand;
pub use update_delivery_status_command::UpdateDeliveryStatusCommand;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{
        gate::{self, OrderScope, ProcurementAction},
        RequestContext,
    },
    entities::{procurement_item, procurement_order, project},
    errors::ServiceError,
    metrics::ORDER_TRANSITION_FAILURES,
};

/// Loads an order, holding a row lock until the surrounding transaction ends.
pub(crate) async fn find_order_for_update<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<procurement_order::Model, ServiceError> {
    procurement_order::Entity::find_by_id(order_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", order_id)))
}

pub(crate) async fn find_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<procurement_item::Model>, ServiceError> {
    procurement_item::Entity::find()
        .filter(procurement_item::Column::ProcurementOrderId.eq(order_id))
        .order_by_asc(procurement_item::Column::CreatedAt)
        .order_by_asc(procurement_item::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Builds what the gate needs to know about `order`.
pub(crate) async fn order_scope<C: ConnectionTrait>(
    conn: &C,
    order: &procurement_order::Model,
) -> Result<OrderScope, ServiceError> {
    let project_manager_id = match order.project_id {
        Some(project_id) => project::Entity::find_by_id(project_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .and_then(|p| p.project_manager_id),
        None => None,
    };

    Ok(OrderScope {
        status: order.status,
        delivery_status: order.delivery_status,
        project_id: order.project_id,
        project_manager_id,
        requested_by: order.requested_by,
        has_open_discrepancy: order.has_open_discrepancy(),
    })
}

/// Runs the gate for `action`, turning a denial into `Forbidden`.
pub(crate) async fn authorize<C: ConnectionTrait>(
    conn: &C,
    ctx: &RequestContext,
    action: ProcurementAction,
    order: &procurement_order::Model,
) -> Result<OrderScope, ServiceError> {
    let scope = order_scope(conn, order).await?;
    let decision = gate::can_perform(action, &scope, ctx);
    if !decision.allowed {
        warn!(
            user_id = %ctx.user_id,
            role = %ctx.role,
            order_id = %order.id,
            %action,
            "procurement action denied"
        );
    }
    decision.into_result(&action.to_string())?;
    Ok(scope)
}

/// Counts a failed operation under its error kind.
pub(crate) fn record_failure(action: ProcurementAction, err: &ServiceError) {
    ORDER_TRANSITION_FAILURES
        .with_label_values(&[action.to_string().as_str(), err.kind()])
        .inc();
}

/// Treats blank optional text as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_dropped() {
        assert_eq!(non_blank(&Some("  ".into())), None);
        assert_eq!(non_blank(&Some(" ok ".into())), Some("ok".into()));
        assert_eq!(non_blank(&None), None);
    }
}
