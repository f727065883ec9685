//! Append-only audit trail.
//!
//! One entry per row write, holding JSON snapshots of the row before and after
//! the change. Entries are never updated or deleted.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(EngineError::Validation(format!(
                "invalid audit action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Monotonic, assigned by the store.
    pub id: i64,
    pub table_name: String,
    pub record_id: String,
    pub action: AuditAction,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub actor: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub table_name: String,
    pub record_id: String,
    pub action: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub old_values: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub new_values: Option<String>,
    pub actor: Option<String>,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Builds the insert model for a new entry. The id is left to the store.
pub(crate) fn new_entry(
    table_name: &str,
    record_id: String,
    action: AuditAction,
    old_values: Option<String>,
    new_values: Option<String>,
    actor: Option<String>,
    recorded_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        table_name: ActiveValue::Set(table_name.to_string()),
        record_id: ActiveValue::Set(record_id),
        action: ActiveValue::Set(action.as_str().to_string()),
        old_values: ActiveValue::Set(old_values),
        new_values: ActiveValue::Set(new_values),
        actor: ActiveValue::Set(actor),
        recorded_at: ActiveValue::Set(recorded_at),
    }
}

fn parse_snapshot(value: Option<String>) -> Result<Option<serde_json::Value>, EngineError> {
    value
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|_| EngineError::Validation("invalid audit snapshot".to_string()))
        })
        .transpose()
}

impl TryFrom<Model> for AuditLogEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: i64::from(model.id),
            table_name: model.table_name,
            record_id: model.record_id,
            action: AuditAction::try_from(model.action.as_str())?,
            old_values: parse_snapshot(model.old_values)?,
            new_values: parse_snapshot(model.new_values)?,
            actor: model.actor,
            recorded_at: model.recorded_at,
        })
    }
}
