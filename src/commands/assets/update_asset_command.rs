use crate::{
    auth::{gate, RequestContext},
    commands::Command,
    db::DbPool,
    entities::asset,
    errors::ServiceError,
    events::EventSender,
    services::audit::log_activity,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{asset_scope, find_asset_for_update};

/// Corrects descriptive fields of an asset. Who may do so depends on the
/// asset's workflow stage.
#[derive(Debug, Clone, Validate)]
pub struct UpdateAssetCommand {
    pub ctx: RequestContext,
    pub asset_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 32))]
    pub unit: Option<String>,
}

#[async_trait::async_trait]
impl Command for UpdateAssetCommand {
    type Result = asset::Model;

    #[instrument(skip(self, db_pool, _event_sender), fields(asset_id = %self.asset_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        _event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let txn = db_pool.begin().await.map_err(ServiceError::db_error)?;

        let asset = find_asset_for_update(&txn, self.asset_id).await?;
        gate::can_edit_asset(&asset_scope(&asset), &self.ctx).into_result("edit_asset")?;

        let mut changed = Vec::new();
        let mut active: asset::ActiveModel = asset.clone().into();
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if name != asset.name {
                active.name = Set(name.to_string());
                changed.push("name");
            }
        }
        if let Some(description) = &self.description {
            active.description = Set(Some(description.trim().to_string()).filter(|d| !d.is_empty()));
            changed.push("description");
        }
        if let Some(unit) = &self.unit {
            active.unit = Set(Some(unit.trim().to_string()).filter(|u| !u.is_empty()));
            changed.push("unit");
        }
        if changed.is_empty() {
            return Ok(asset);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        log_activity(
            &txn,
            Some(self.ctx.user_id),
            "asset_updated",
            format!(
                "Updated {} on asset {} ({})",
                changed.join(", "),
                updated.reference,
                updated.workflow_status
            ),
            "assets",
            Some(updated.id),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(fields = ?changed, "asset updated");
        Ok(updated)
    }
}
