//! Legal moves for procurement order `status` and `delivery_status`.
//!
//! Everything here is pure: callers load the order, ask whether a move is
//! legal, and persist the result themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::entities::{DeliveryMethod, DeliveryStatus, OrderStatus};
use crate::errors::ServiceError;

/// Steps of the approval loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalAction {
    Submit,
    Review,
    Approve,
    Reject,
    Revise,
}

/// Order statuses in which delivery may progress.
pub const DELIVERY_PROGRESS_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Approved,
    OrderStatus::ScheduledForDelivery,
    OrderStatus::InTransit,
    OrderStatus::Delivered,
];

/// Order statuses from which cancellation is allowed.
pub const CANCELABLE_STATUSES: [OrderStatus; 3] =
    [OrderStatus::Draft, OrderStatus::Pending, OrderStatus::Reviewed];

/// Order statuses in which the order content may be edited.
pub const EDITABLE_STATUSES: [OrderStatus; 2] = [OrderStatus::Draft, OrderStatus::ForRevision];

fn approval_sources(action: ApprovalAction) -> &'static [OrderStatus] {
    match action {
        ApprovalAction::Submit => &[OrderStatus::Draft, OrderStatus::ForRevision],
        ApprovalAction::Review => &[OrderStatus::Pending],
        ApprovalAction::Approve | ApprovalAction::Reject | ApprovalAction::Revise => {
            &[OrderStatus::Pending, OrderStatus::Reviewed]
        }
    }
}

fn approval_target(action: ApprovalAction) -> OrderStatus {
    match action {
        ApprovalAction::Submit => OrderStatus::Pending,
        ApprovalAction::Review => OrderStatus::Reviewed,
        ApprovalAction::Approve => OrderStatus::Approved,
        ApprovalAction::Reject => OrderStatus::Rejected,
        ApprovalAction::Revise => OrderStatus::ForRevision,
    }
}

pub fn approval_allowed_from(action: ApprovalAction, from: OrderStatus) -> bool {
    approval_sources(action).contains(&from)
}

/// Resolves the status an approval step leads to, or why it cannot happen.
pub fn approval_transition(
    action: ApprovalAction,
    from: OrderStatus,
) -> Result<OrderStatus, ServiceError> {
    let to = approval_target(action);
    if approval_allowed_from(action, from) {
        Ok(to)
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Invalid status transition from {} to {}",
            from, to
        )))
    }
}

/// Delivery adjacency table.
pub fn allowed_delivery_targets(from: DeliveryStatus) -> &'static [DeliveryStatus] {
    use DeliveryStatus::*;
    match from {
        Pending => &[Scheduled, InTransit, Delivered],
        Scheduled => &[InTransit, Delivered, Delayed],
        InTransit => &[Delivered, Delayed, FailedDelivery],
        Delivered => &[Delivered],
        Delayed => &[InTransit, Delivered, FailedDelivery],
        FailedDelivery => &[Scheduled, InTransit],
    }
}

pub fn can_transition_delivery(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    allowed_delivery_targets(from).contains(&to)
}

pub fn validate_delivery_transition(
    from: DeliveryStatus,
    to: DeliveryStatus,
) -> Result<(), ServiceError> {
    if can_transition_delivery(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Invalid status transition from {} to {}",
            from, to
        )))
    }
}

/// Order status that follows a delivery move, if any.
pub fn mirrored_order_status(delivery: DeliveryStatus) -> Option<OrderStatus> {
    match delivery {
        DeliveryStatus::Scheduled => Some(OrderStatus::ScheduledForDelivery),
        DeliveryStatus::InTransit => Some(OrderStatus::InTransit),
        DeliveryStatus::Delivered => Some(OrderStatus::Delivered),
        DeliveryStatus::Pending | DeliveryStatus::Delayed | DeliveryStatus::FailedDelivery => None,
    }
}

pub fn ensure_delivery_progressable(status: OrderStatus) -> Result<(), ServiceError> {
    if DELIVERY_PROGRESS_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "Delivery status cannot be updated while the purchase order is {}",
            status
        )))
    }
}

/// A requested delivery status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryUpdate {
    pub from: DeliveryStatus,
    pub to: DeliveryStatus,
    pub actual_delivery_date: Option<NaiveDate>,
}

/// Checks a delivery status change and returns the order status to mirror.
/// `None` means the order status stays as it is.
pub fn plan_delivery_update(
    status: OrderStatus,
    update: &DeliveryUpdate,
) -> Result<Option<OrderStatus>, ServiceError> {
    ensure_delivery_progressable(status)?;
    validate_delivery_transition(update.from, update.to)?;
    if update.to == DeliveryStatus::Delivered && update.actual_delivery_date.is_none() {
        return Err(ServiceError::ValidationErrors(vec![
            "actual_delivery_date: Actual delivery date is required when marking as delivered"
                .to_string(),
        ]));
    }
    Ok(mirrored_order_status(update.to))
}

/// Delivery details submitted when scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_location: Option<String>,
    pub scheduled_delivery_date: Option<NaiveDate>,
}

/// Validates scheduling for an order. `physical` is true when any item is a
/// physical good (its category generates assets, or it has no category).
pub fn validate_schedule(
    status: OrderStatus,
    physical: bool,
    request: &ScheduleRequest,
    today: NaiveDate,
) -> Result<(), ServiceError> {
    if status != OrderStatus::Approved {
        return Err(ServiceError::InvalidOperation(format!(
            "Only approved purchase orders can be scheduled for delivery (current status: {})",
            status
        )));
    }

    let mut errors = Vec::new();
    match request.delivery_method {
        None => errors.push("delivery_method: Delivery method is required".to_string()),
        Some(method) if physical && !method.is_physical() => errors.push(format!(
            "delivery_method: {} is not a valid shipping method for physical items",
            method
        )),
        Some(method) if !physical && !method.is_service() => errors.push(format!(
            "delivery_method: {} is not a valid delivery method for services",
            method
        )),
        Some(_) => {}
    }

    let location_missing = request
        .delivery_location
        .as_deref()
        .map(|l| l.trim().is_empty())
        .unwrap_or(true);
    if location_missing {
        errors.push("delivery_location: Delivery location is required".to_string());
    }

    match request.scheduled_delivery_date {
        None => {
            errors.push("scheduled_delivery_date: Scheduled delivery date is required".to_string())
        }
        Some(date) if date < today => errors.push(
            "scheduled_delivery_date: Scheduled delivery date cannot be in the past".to_string(),
        ),
        Some(_) => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationErrors(errors))
    }
}

/// Why an order was canceled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CancellationReason {
    BudgetConstraints,
    VendorUnavailable,
    RequirementsChanged,
    DuplicateOrder,
    Other,
}

impl CancellationReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::BudgetConstraints => "Budget Constraints",
            Self::VendorUnavailable => "Vendor Unavailable",
            Self::RequirementsChanged => "Requirements Changed",
            Self::DuplicateOrder => "Duplicate Order",
            Self::Other => "Other",
        }
    }
}

/// Checks cancellation and builds the audit string stored on the order.
pub fn cancellation_summary(
    status: OrderStatus,
    reason: CancellationReason,
    custom_reason: Option<&str>,
    notes: Option<&str>,
) -> Result<String, ServiceError> {
    if !CANCELABLE_STATUSES.contains(&status) {
        return Err(ServiceError::InvalidOperation(
            "Purchase order cannot be canceled in its current status".to_string(),
        ));
    }

    let label = match reason {
        CancellationReason::Other => {
            let custom = custom_reason.map(str::trim).unwrap_or_default();
            if custom.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Please specify the custom cancellation reason".to_string(),
                ));
            }
            custom.to_string()
        }
        other => other.label().to_string(),
    };

    let mut summary = format!("Reason: {}", label);
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        summary.push_str(" - Notes: ");
        summary.push_str(notes);
    }
    Ok(summary)
}

/// Receipt preconditions on the order.
pub fn ensure_receivable(
    status: OrderStatus,
    delivery_status: DeliveryStatus,
) -> Result<(), ServiceError> {
    if status == OrderStatus::Received {
        return Err(ServiceError::InvalidOperation(
            "Purchase order has already been received".to_string(),
        ));
    }
    if !DELIVERY_PROGRESS_STATUSES.contains(&status) {
        return Err(ServiceError::InvalidOperation(format!(
            "Purchase order cannot be received while {}",
            status
        )));
    }
    validate_delivery_transition(delivery_status, DeliveryStatus::Delivered)
}

pub fn can_generate_assets(status: OrderStatus, delivery_status: DeliveryStatus) -> bool {
    status == OrderStatus::Received || delivery_status == DeliveryStatus::Delivered
}
