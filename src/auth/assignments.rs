use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{project, project_assignment},
    errors::ServiceError,
};

/// Source of a user's project assignments.
#[async_trait]
pub trait ProjectAssignments: Send + Sync {
    async fn assigned_project_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, ServiceError>;
}

/// Reads assignments from `project_assignments` and projects the user manages.
#[derive(Debug, Clone)]
pub struct DbProjectAssignments {
    db: Arc<DbPool>,
}

impl DbProjectAssignments {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectAssignments for DbProjectAssignments {
    async fn assigned_project_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>, ServiceError> {
        let db = self.db.as_ref();

        let assigned: Vec<Uuid> = project_assignment::Entity::find()
            .select_only()
            .column(project_assignment::Column::ProjectId)
            .filter(project_assignment::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let managed: Vec<Uuid> = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::ProjectManagerId.eq(user_id))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(assigned.into_iter().chain(managed).collect())
    }
}
