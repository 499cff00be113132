use crate::{
    auth::{
        gate::{self, AssetAction},
        RequestContext,
    },
    commands::Command,
    db::DbPool,
    entities::{asset, AssetWorkflowStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::ASSET_WORKFLOW_TRANSITIONS,
    services::audit::log_activity,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{asset_scope, find_asset_for_update};

/// Maker-Verifier-Authorizer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStep {
    SubmitForVerification,
    Verify,
    Authorize,
}

impl WorkflowStep {
    fn action(self) -> AssetAction {
        match self {
            Self::SubmitForVerification => AssetAction::SubmitForVerification,
            Self::Verify => AssetAction::Verify,
            Self::Authorize => AssetAction::Authorize,
        }
    }

    fn source(self) -> AssetWorkflowStatus {
        match self {
            Self::SubmitForVerification => AssetWorkflowStatus::Draft,
            Self::Verify => AssetWorkflowStatus::PendingVerification,
            Self::Authorize => AssetWorkflowStatus::PendingAuthorization,
        }
    }

    pub fn target(self) -> AssetWorkflowStatus {
        match self {
            Self::SubmitForVerification => AssetWorkflowStatus::PendingVerification,
            Self::Verify => AssetWorkflowStatus::PendingAuthorization,
            Self::Authorize => AssetWorkflowStatus::Approved,
        }
    }

    /// Checks that the step applies to an asset in `current`.
    pub fn transition(self, current: AssetWorkflowStatus) -> Result<AssetWorkflowStatus, ServiceError> {
        if current == self.source() {
            Ok(self.target())
        } else {
            Err(ServiceError::InvalidStatus(format!(
                "Invalid status transition from {} to {}",
                current,
                self.target()
            )))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdvanceAssetWorkflowCommand {
    pub ctx: RequestContext,
    pub asset_id: Uuid,
    pub step: WorkflowStep,
    pub notes: Option<String>,
}

#[async_trait::async_trait]
impl Command for AdvanceAssetWorkflowCommand {
    type Result = asset::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(asset_id = %self.asset_id, step = %self.step))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let asset = self.apply(db_pool.as_ref()).await?;

        info!(
            new_status = %asset.workflow_status,
            user_id = %self.ctx.user_id,
            "asset workflow advanced"
        );
        ASSET_WORKFLOW_TRANSITIONS
            .with_label_values(&[asset.workflow_status.to_string().as_str()])
            .inc();
        event_sender
            .send_or_log(Event::AssetWorkflowChanged {
                asset_id: asset.id,
                new_status: asset.workflow_status.to_string(),
            })
            .await;

        Ok(asset)
    }
}

impl AdvanceAssetWorkflowCommand {
    async fn apply(&self, db: &DbPool) -> Result<asset::Model, ServiceError> {
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let asset = find_asset_for_update(&txn, self.asset_id).await?;
        gate::can_perform_asset(self.step.action(), &asset_scope(&asset), &self.ctx)
            .into_result(&self.step.to_string())?;
        let old_status = asset.workflow_status;
        let new_status = self.step.transition(old_status)?;

        let now = Utc::now();
        let reference = asset.reference.clone();
        let mut active: asset::ActiveModel = asset.into();
        active.workflow_status = Set(new_status);
        match self.step {
            WorkflowStep::SubmitForVerification => {}
            WorkflowStep::Verify => {
                active.verified_by = Set(Some(self.ctx.user_id));
                active.verified_at = Set(Some(now));
            }
            WorkflowStep::Authorize => {
                active.authorized_by = Set(Some(self.ctx.user_id));
                active.authorized_at = Set(Some(now));
            }
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        let mut description = format!(
            "Asset {} moved from {} to {}",
            reference, old_status, new_status
        );
        if let Some(notes) = self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            description.push_str(": ");
            description.push_str(notes);
        }
        log_activity(
            &txn,
            Some(self.ctx.user_id),
            &format!("asset_{}", self.step),
            description,
            "assets",
            Some(updated.id),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }
}
