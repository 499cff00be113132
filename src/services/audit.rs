//! Audit trail writers.
//!
//! Both functions take any connection so they run inside the caller's
//! transaction and roll back with it.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::entities::{activity_log, procurement_activity_log};
use crate::errors::ServiceError;

/// Writes a general `activity_logs` row.
pub async fn log_activity<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    action: &str,
    description: impl Into<String>,
    table_name: &str,
    record_id: Option<Uuid>,
) -> Result<activity_log::Model, ServiceError> {
    activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        description: Set(description.into()),
        table_name: Set(table_name.to_string()),
        record_id: Set(record_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// One row of an order's transition history.
#[derive(Debug, Clone, Default)]
pub struct ProcurementActivity {
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub notes: Option<String>,
}

impl ProcurementActivity {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn change(mut self, old: impl ToString, new: impl ToString) -> Self {
        self.old_value = Some(old.to_string());
        self.new_value = Some(new.to_string());
        self
    }

    pub fn to_value(mut self, new: impl ToString) -> Self {
        self.new_value = Some(new.to_string());
        self
    }

    pub fn notes(mut self, notes: Option<impl Into<String>>) -> Self {
        self.notes = notes.map(Into::into);
        self
    }
}

/// Writes a `procurement_activity_logs` row for `order_id`.
pub async fn log_procurement_activity<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    user_id: Uuid,
    activity: ProcurementActivity,
) -> Result<procurement_activity_log::Model, ServiceError> {
    procurement_activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        procurement_order_id: Set(order_id),
        user_id: Set(user_id),
        action: Set(activity.action),
        old_value: Set(activity.old_value),
        new_value: Set(activity.new_value),
        notes: Set(activity.notes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}
