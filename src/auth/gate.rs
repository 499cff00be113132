//! Role-scoped authorization for procurement orders and assets.
//!
//! The gate is a pure function of the caller's role, their project
//! assignments and the record being touched. Order-state legality is kept
//! separate (see [`crate::services::state_machine`]) so state errors surface
//! with their own messages; [`allowed_actions`] combines both for UI use.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{RequestContext, Role};
use crate::entities::{AssetWorkflowStatus, DeliveryStatus, OrderStatus};
use crate::errors::ServiceError;
use crate::services::state_machine::{self, ApprovalAction};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcurementAction {
    View,
    Edit,
    Submit,
    Review,
    Approve,
    Reject,
    Revise,
    ScheduleDelivery,
    UpdateDeliveryStatus,
    Receive,
    ResolveDiscrepancy,
    GenerateAssets,
    Cancel,
}

impl ProcurementAction {
    fn verb(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Submit => "submit",
            Self::Review => "review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Revise => "return for revision",
            Self::ScheduleDelivery => "schedule delivery of",
            Self::UpdateDeliveryStatus => "update delivery status of",
            Self::Receive => "receive",
            Self::ResolveDiscrepancy => "resolve discrepancies on",
            Self::GenerateAssets => "generate assets from",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssetAction {
    View,
    Edit,
    SubmitForVerification,
    Verify,
    Authorize,
}

use Role::*;

const ALL_ROLES: &[Role] = &[
    SystemAdmin,
    FinanceDirector,
    AssetDirector,
    ProcurementOfficer,
    Warehouseman,
    ProjectManager,
    SiteInventoryClerk,
];

/// Who may attempt each order action.
fn allowed_roles(action: ProcurementAction) -> &'static [Role] {
    match action {
        ProcurementAction::View => ALL_ROLES,
        ProcurementAction::Edit | ProcurementAction::Submit => {
            &[SystemAdmin, AssetDirector, ProcurementOfficer]
        }
        ProcurementAction::Review => &[SystemAdmin, AssetDirector, ProjectManager],
        ProcurementAction::Approve | ProcurementAction::Reject | ProcurementAction::Revise => {
            &[SystemAdmin, FinanceDirector, AssetDirector, ProjectManager]
        }
        ProcurementAction::ScheduleDelivery => &[SystemAdmin, AssetDirector, ProcurementOfficer],
        ProcurementAction::UpdateDeliveryStatus => {
            &[SystemAdmin, AssetDirector, ProcurementOfficer, Warehouseman]
        }
        ProcurementAction::Receive => &[
            SystemAdmin,
            AssetDirector,
            Warehouseman,
            SiteInventoryClerk,
            ProjectManager,
            ProcurementOfficer,
        ],
        ProcurementAction::ResolveDiscrepancy => {
            &[SystemAdmin, AssetDirector, ProcurementOfficer, FinanceDirector]
        }
        ProcurementAction::GenerateAssets => {
            &[SystemAdmin, AssetDirector, ProcurementOfficer, Warehouseman]
        }
        ProcurementAction::Cancel => {
            &[SystemAdmin, AssetDirector, ProcurementOfficer, FinanceDirector]
        }
    }
}

fn allowed_asset_roles(action: AssetAction) -> &'static [Role] {
    match action {
        AssetAction::View => ALL_ROLES,
        AssetAction::Edit => ALL_ROLES,
        AssetAction::SubmitForVerification => &[
            SystemAdmin,
            AssetDirector,
            ProcurementOfficer,
            Warehouseman,
            SiteInventoryClerk,
        ],
        AssetAction::Verify => &[SystemAdmin, AssetDirector, ProjectManager],
        AssetAction::Authorize => &[SystemAdmin, AssetDirector, FinanceDirector],
    }
}

/// The parts of an order the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderScope {
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub project_id: Option<Uuid>,
    pub project_manager_id: Option<Uuid>,
    pub requested_by: Uuid,
    pub has_open_discrepancy: bool,
}

/// The parts of an asset the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetScope {
    pub workflow_status: AssetWorkflowStatus,
    pub project_id: Option<Uuid>,
    pub made_by: Option<Uuid>,
    pub verified_by: Option<Uuid>,
}

/// Outcome of a gate check. Denials always carry a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Turns a denial into `ServiceError::Forbidden`, counting it under `label`.
    pub fn into_result(self, label: &str) -> Result<(), ServiceError> {
        if self.allowed {
            return Ok(());
        }
        crate::metrics::GATE_DENIALS.with_label_values(&[label]).inc();
        Err(ServiceError::Forbidden(
            self.reason
                .unwrap_or_else(|| "Action not permitted".to_string()),
        ))
    }
}

fn in_project_scope(
    ctx: &RequestContext,
    project_id: Option<Uuid>,
    project_manager_id: Option<Uuid>,
) -> bool {
    if !ctx.role.is_project_scoped() {
        return true;
    }
    if project_manager_id.is_some_and(|pm| pm == ctx.user_id) {
        return true;
    }
    project_id.is_some_and(|id| ctx.is_assigned_to(id))
}

const OUT_OF_SCOPE: &str = "You are not assigned to the project of this procurement order";

/// Decides whether the caller may raise a new order for `project_id`.
pub fn can_create(project_id: Option<Uuid>, ctx: &RequestContext) -> Decision {
    if !allowed_roles(ProcurementAction::Edit).contains(&ctx.role) {
        return Decision::deny(format!(
            "Role '{}' is not permitted to create procurement orders",
            ctx.role
        ));
    }
    if !in_project_scope(ctx, project_id, None) {
        return Decision::deny("You are not assigned to this project");
    }
    Decision::allow()
}

/// Decides whether the caller may attempt `action` on the order.
pub fn can_perform(
    action: ProcurementAction,
    order: &OrderScope,
    ctx: &RequestContext,
) -> Decision {
    if !allowed_roles(action).contains(&ctx.role) {
        return Decision::deny(format!(
            "Role '{}' is not permitted to {} procurement orders",
            ctx.role,
            action.verb()
        ));
    }

    if !in_project_scope(ctx, order.project_id, order.project_manager_id) {
        return Decision::deny(OUT_OF_SCOPE);
    }

    if action == ProcurementAction::Edit && !state_machine::EDITABLE_STATUSES.contains(&order.status)
    {
        return Decision::deny(format!(
            "Purchase orders can only be edited while in Draft or For Revision (current status: {})",
            order.status
        ));
    }

    Decision::allow()
}

/// Whether `action` is legal for the order's current state, ignoring who asks.
pub fn is_action_legal(action: ProcurementAction, order: &OrderScope) -> bool {
    let status = order.status;
    match action {
        ProcurementAction::View => true,
        ProcurementAction::Edit => state_machine::EDITABLE_STATUSES.contains(&status),
        ProcurementAction::Submit => {
            state_machine::approval_allowed_from(ApprovalAction::Submit, status)
        }
        ProcurementAction::Review => {
            state_machine::approval_allowed_from(ApprovalAction::Review, status)
        }
        ProcurementAction::Approve => {
            state_machine::approval_allowed_from(ApprovalAction::Approve, status)
        }
        ProcurementAction::Reject => {
            state_machine::approval_allowed_from(ApprovalAction::Reject, status)
        }
        ProcurementAction::Revise => {
            state_machine::approval_allowed_from(ApprovalAction::Revise, status)
        }
        ProcurementAction::ScheduleDelivery => status == OrderStatus::Approved,
        ProcurementAction::UpdateDeliveryStatus => {
            state_machine::DELIVERY_PROGRESS_STATUSES.contains(&status)
        }
        ProcurementAction::Receive => {
            state_machine::ensure_receivable(status, order.delivery_status).is_ok()
        }
        ProcurementAction::ResolveDiscrepancy => order.has_open_discrepancy,
        ProcurementAction::GenerateAssets => {
            state_machine::can_generate_assets(status, order.delivery_status)
        }
        ProcurementAction::Cancel => state_machine::CANCELABLE_STATUSES.contains(&status),
    }
}

/// Actions both permitted to the caller and legal right now.
pub fn allowed_actions(order: &OrderScope, ctx: &RequestContext) -> Vec<ProcurementAction> {
    ProcurementAction::iter()
        .filter(|action| is_action_legal(*action, order) && can_perform(*action, order, ctx).allowed)
        .collect()
}

/// Whether the caller may change an asset record at its current stage.
pub fn can_edit_asset(asset: &AssetScope, ctx: &RequestContext) -> Decision {
    if ctx.role == SystemAdmin {
        return Decision::allow();
    }
    if !in_project_scope(ctx, asset.project_id, None) {
        return Decision::deny("You are not assigned to the project of this asset");
    }

    match asset.workflow_status {
        AssetWorkflowStatus::Draft | AssetWorkflowStatus::PendingVerification => {
            if asset.made_by == Some(ctx.user_id) {
                Decision::allow()
            } else {
                Decision::deny("Only the maker can edit this asset before verification")
            }
        }
        AssetWorkflowStatus::PendingAuthorization => {
            if allowed_asset_roles(AssetAction::Authorize).contains(&ctx.role) {
                Decision::allow()
            } else {
                Decision::deny("Only an authorizer can correct an asset pending authorization")
            }
        }
        AssetWorkflowStatus::Approved => {
            if ctx.role == AssetDirector {
                Decision::allow()
            } else {
                Decision::deny("Approved assets can only be edited by a System Admin or Asset Director")
            }
        }
    }
}

/// Decides whether the caller may take an asset workflow step.
pub fn can_perform_asset(action: AssetAction, asset: &AssetScope, ctx: &RequestContext) -> Decision {
    if action == AssetAction::Edit {
        return can_edit_asset(asset, ctx);
    }

    if !allowed_asset_roles(action).contains(&ctx.role) {
        return Decision::deny(format!(
            "Role '{}' is not permitted to {} assets",
            ctx.role,
            match action {
                AssetAction::View => "view",
                AssetAction::Edit => "edit",
                AssetAction::SubmitForVerification => "submit for verification",
                AssetAction::Verify => "verify",
                AssetAction::Authorize => "authorize",
            }
        ));
    }

    if !in_project_scope(ctx, asset.project_id, None) {
        return Decision::deny("You are not assigned to the project of this asset");
    }

    let bypass = ctx.role == SystemAdmin;
    match action {
        AssetAction::SubmitForVerification
            if !bypass && !ctx.role.bypasses_project_scope() && asset.made_by != Some(ctx.user_id) =>
        {
            Decision::deny("Only the maker can submit this asset for verification")
        }
        AssetAction::Verify if !bypass && asset.made_by == Some(ctx.user_id) => {
            Decision::deny("The maker of an asset cannot also verify it")
        }
        AssetAction::Authorize if !bypass && asset.verified_by == Some(ctx.user_id) => {
            Decision::deny("The verifier of an asset cannot also authorize it")
        }
        _ => Decision::allow(),
    }
}
