use crate::{
    auth::{
        gate::{self, AssetAction},
        RequestContext,
    },
    commands::{
        assets::{asset_scope, AdvanceAssetWorkflowCommand, UpdateAssetCommand, WorkflowStep},
        Command,
    },
    db::DbPool,
    entities::asset,
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::EntityTrait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchFailure {
    pub asset_id: Uuid,
    pub error: String,
}

/// Per-asset outcome of a batch workflow step. One failure never rolls
/// back the others.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Clone)]
pub struct AssetService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AssetService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn get(&self, ctx: &RequestContext, asset_id: Uuid) -> Result<asset::Model, ServiceError> {
        let asset = asset::Entity::find_by_id(asset_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Asset {} not found", asset_id)))?;
        gate::can_perform_asset(AssetAction::View, &asset_scope(&asset), ctx)
            .into_result("view_asset")?;
        Ok(asset)
    }

    #[instrument(skip(self, command), fields(asset_id = %command.asset_id))]
    pub async fn update(&self, command: UpdateAssetCommand) -> Result<asset::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Applies one Maker-Verifier-Authorizer step.
    #[instrument(skip(self, ctx, notes), fields(user_id = %ctx.user_id))]
    pub async fn advance(
        &self,
        ctx: RequestContext,
        asset_id: Uuid,
        step: WorkflowStep,
        notes: Option<String>,
    ) -> Result<asset::Model, ServiceError> {
        AdvanceAssetWorkflowCommand {
            ctx,
            asset_id,
            step,
            notes,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    pub async fn submit_for_verification(
        &self,
        ctx: RequestContext,
        asset_id: Uuid,
        notes: Option<String>,
    ) -> Result<asset::Model, ServiceError> {
        self.advance(ctx, asset_id, WorkflowStep::SubmitForVerification, notes)
            .await
    }

    pub async fn verify(
        &self,
        ctx: RequestContext,
        asset_id: Uuid,
        notes: Option<String>,
    ) -> Result<asset::Model, ServiceError> {
        self.advance(ctx, asset_id, WorkflowStep::Verify, notes).await
    }

    pub async fn authorize(
        &self,
        ctx: RequestContext,
        asset_id: Uuid,
        notes: Option<String>,
    ) -> Result<asset::Model, ServiceError> {
        self.advance(ctx, asset_id, WorkflowStep::Authorize, notes)
            .await
    }

    /// Runs `step` for every id in its own transaction.
    #[instrument(skip(self, ctx, asset_ids, notes), fields(user_id = %ctx.user_id, count = asset_ids.len()))]
    pub async fn batch(
        &self,
        ctx: &RequestContext,
        asset_ids: &[Uuid],
        step: WorkflowStep,
        notes: Option<String>,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        for &asset_id in asset_ids {
            if result.succeeded.contains(&asset_id) {
                continue;
            }
            match self
                .advance(ctx.clone(), asset_id, step, notes.clone())
                .await
            {
                Ok(asset) => result.succeeded.push(asset.id),
                Err(e) => {
                    warn!(%asset_id, error = %e, "batch step failed");
                    result.failed.push(BatchFailure {
                        asset_id,
                        error: e.response_message(),
                    });
                }
            }
        }
        result.success_count = result.succeeded.len();
        result.failure_count = result.failed.len();
        info!(
            step = %step,
            succeeded = result.success_count,
            failed = result.failure_count,
            "batch workflow step finished"
        );
        result
    }
}
