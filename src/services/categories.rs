use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use crate::entities::category;
use crate::errors::ServiceError;
use crate::services::audit::log_activity;

/// Finds the fallback category by name, creating it when missing.
///
/// The fallback is non-consumable and generates assets. Returns the category
/// and whether it was created by this call.
pub async fn resolve_or_create_default_category<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    user_id: Option<Uuid>,
) -> Result<(category::Model, bool), ServiceError> {
    if let Some(existing) = category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
    {
        return Ok((existing, false));
    }

    let created = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        is_consumable: Set(false),
        generates_assets: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)?;

    info!(category_id = %created.id, name, "created fallback asset category");
    log_activity(
        conn,
        user_id,
        "category_created",
        format!("Created default category '{}' for asset generation", name),
        "categories",
        Some(created.id),
    )
    .await?;

    Ok((created, true))
}
