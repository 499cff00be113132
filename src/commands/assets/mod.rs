pub mod advance_asset_workflow_command;
pub mod generate_assets_command;
pub mod update_asset_command;

pub use advance_asset_workflow_command::{AdvanceAssetWorkflowCommand, WorkflowStep};
pub use generate_assets_command::GenerateAssetsCommand;
pub use update_asset_command::UpdateAssetCommand;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::gate::AssetScope,
    entities::{asset, procurement_asset},
    errors::ServiceError,
};

/// Quantity already converted into assets, per procurement item of an order.
pub(crate) async fn generated_by_item<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<HashMap<Uuid, i32>, ServiceError> {
    let links = procurement_asset::Entity::find()
        .filter(procurement_asset::Column::ProcurementOrderId.eq(order_id))
        .find_also_related(asset::Entity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let mut totals = HashMap::new();
    for (link, asset) in links {
        let quantity = asset.map(|a| a.quantity).unwrap_or_default();
        *totals.entry(link.procurement_item_id).or_insert(0) += quantity;
    }
    Ok(totals)
}

/// Quantity already converted for a single item.
pub(crate) async fn generated_for_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<i32, ServiceError> {
    let links = procurement_asset::Entity::find()
        .filter(procurement_asset::Column::ProcurementItemId.eq(item_id))
        .find_also_related(asset::Entity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(links
        .into_iter()
        .filter_map(|(_, asset)| asset.map(|a| a.quantity))
        .sum())
}

pub(crate) async fn find_asset_for_update<C: ConnectionTrait>(
    conn: &C,
    asset_id: Uuid,
) -> Result<asset::Model, ServiceError> {
    asset::Entity::find_by_id(asset_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Asset {} not found", asset_id)))
}

pub(crate) fn asset_scope(asset: &asset::Model) -> AssetScope {
    AssetScope {
        workflow_status: asset.workflow_status,
        project_id: asset.project_id,
        made_by: asset.made_by,
        verified_by: asset.verified_by,
    }
}
