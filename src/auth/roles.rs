use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Roles carried in the `role` claim of bearer tokens.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum Role {
    #[serde(rename = "System Admin")]
    #[strum(serialize = "System Admin")]
    SystemAdmin,
    #[serde(rename = "Finance Director")]
    #[strum(serialize = "Finance Director")]
    FinanceDirector,
    #[serde(rename = "Asset Director")]
    #[strum(serialize = "Asset Director")]
    AssetDirector,
    #[serde(rename = "Procurement Officer")]
    #[strum(serialize = "Procurement Officer")]
    ProcurementOfficer,
    #[serde(rename = "Warehouseman")]
    #[strum(serialize = "Warehouseman")]
    Warehouseman,
    #[serde(rename = "Project Manager")]
    #[strum(serialize = "Project Manager")]
    ProjectManager,
    #[serde(rename = "Site Inventory Clerk")]
    #[strum(serialize = "Site Inventory Clerk")]
    SiteInventoryClerk,
}

impl Role {
    /// Roles whose reach is limited to the projects they are assigned to.
    pub fn is_project_scoped(self) -> bool {
        matches!(
            self,
            Role::ProjectManager | Role::SiteInventoryClerk | Role::Warehouseman
        )
    }

    /// Roles that see every project regardless of assignment.
    pub fn bypasses_project_scope(self) -> bool {
        matches!(self, Role::SystemAdmin | Role::AssetDirector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn role_names_round_trip_through_claim_strings() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn scoped_and_bypass_roles_are_disjoint() {
        for role in Role::iter() {
            assert!(!(role.is_project_scoped() && role.bypasses_project_scope()));
        }
        assert!(Role::Warehouseman.is_project_scoped());
        assert!(!Role::FinanceDirector.is_project_scoped());
        assert!(!Role::FinanceDirector.bypasses_project_scope());
    }
}
