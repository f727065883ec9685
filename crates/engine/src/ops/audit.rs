use std::time::Duration;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    AuditAction, AuditLogEntry, EngineError, ResultEngine, audit_log, executor::WriteSet,
};

use super::{Engine, with_tx};

const AUDIT_ATTEMPTS: u32 = 3;
const AUDIT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Filters for listing audit entries.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct AuditLogFilter {
    pub table_name: Option<String>,
    pub action: Option<AuditAction>,
    pub record_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_filter(filter: &AuditLogFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AuditCursor {
    id: i32,
}

impl AuditCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid audit cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid audit cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid audit cursor".to_string()))
    }
}

impl Engine {
    /// Appends one audit entry per write of `writes`.
    ///
    /// Entries go through a savepoint so a failed attempt leaves the ledger
    /// writes of `db_tx` intact. After the last attempt the failure is logged
    /// and dropped.
    pub(super) async fn record_audit(
        &self,
        db_tx: &DatabaseTransaction,
        writes: &WriteSet,
        actor: Option<&str>,
    ) {
        let recorded_at = self.clock.now();
        let entries = match writes
            .writes()
            .iter()
            .map(|write| write.audit_entry(actor, recorded_at))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(op = writes.op(), error = %err, "audit snapshot failed");
                return;
            }
        };
        if entries.is_empty() {
            return;
        }

        for attempt in 1..=AUDIT_ATTEMPTS {
            match append_entries(db_tx, entries.clone()).await {
                Ok(()) => return,
                Err(err) if attempt < AUDIT_ATTEMPTS => {
                    tracing::warn!(op = writes.op(), attempt, error = %err, "audit write failed, retrying");
                    tokio::time::sleep(AUDIT_RETRY_BACKOFF * attempt).await;
                }
                Err(err) => {
                    tracing::error!(
                        op = writes.op(),
                        attempts = AUDIT_ATTEMPTS,
                        entries = entries.len(),
                        error = %err,
                        "audit write abandoned"
                    );
                }
            }
        }
    }

    /// Lists audit entries, newest first, with cursor-based pagination.
    ///
    /// Returns the page and the cursor of the next one, if any.
    pub async fn list_audit_log(
        &self,
        filter: &AuditLogFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<AuditLogEntry>, Option<String>)> {
        validate_filter(filter)?;
        with_tx!(self, |db_tx| {
            let limit_plus_one = limit.saturating_add(1);
            let mut query = audit_log::Entity::find()
                .order_by_desc(audit_log::Column::Id)
                .limit(limit_plus_one);

            if let Some(table_name) = &filter.table_name {
                query = query.filter(audit_log::Column::TableName.eq(table_name.as_str()));
            }
            if let Some(action) = filter.action {
                query = query.filter(audit_log::Column::Action.eq(action.as_str()));
            }
            if let Some(record_id) = &filter.record_id {
                query = query.filter(audit_log::Column::RecordId.eq(record_id.as_str()));
            }
            if let Some(from) = filter.from {
                query = query.filter(audit_log::Column::RecordedAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(audit_log::Column::RecordedAt.lt(to));
            }
            if let Some(cursor) = cursor {
                let cursor = AuditCursor::decode(cursor)?;
                query = query.filter(audit_log::Column::Id.lt(cursor.id));
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;
            let mut last_id = None;
            let mut out = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                last_id = Some(model.id);
                out.push(AuditLogEntry::try_from(model)?);
            }

            let next_cursor = if has_more {
                last_id.map(|id| AuditCursor { id }.encode()).transpose()?
            } else {
                None
            };
            Ok((out, next_cursor))
        })
    }
}

async fn append_entries(
    db_tx: &DatabaseTransaction,
    entries: Vec<audit_log::ActiveModel>,
) -> Result<(), DbErr> {
    let savepoint = db_tx.begin().await?;
    match audit_log::Entity::insert_many(entries).exec(&savepoint).await {
        Ok(_) => savepoint.commit().await,
        Err(err) => {
            savepoint.rollback().await?;
            Err(err)
        }
    }
}
