use std::collections::HashSet;
use uuid::Uuid;

use super::Role;

/// Who is acting, handed explicitly to every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub role: Role,
    pub assigned_project_ids: HashSet<Uuid>,
}

impl RequestContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            name: None,
            role,
            assigned_project_ids: HashSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_projects(mut self, project_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.assigned_project_ids.extend(project_ids);
        self
    }

    pub fn is_assigned_to(&self, project_id: Uuid) -> bool {
        self.assigned_project_ids.contains(&project_id)
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.user_id.to_string())
    }
}
