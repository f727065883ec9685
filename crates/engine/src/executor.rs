//! Write-sets: the declarative unit every ledger operation commits.
//!
//! An operation validates against the current store state, then describes its
//! effect as an ordered list of [`Write`]s. [`WriteSet::apply`] runs them on a
//! single database transaction; the caller commits or drops that transaction,
//! so either every write lands or none does.
//!
//! Because each write carries full row snapshots, the audit entry of a write
//! is derived from the write itself.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Account, EngineError, Expense, Investment, InvestmentReturn, ResultEngine, Transaction,
    accounts, audit_log::{self, AuditAction}, expenses, investment_returns, investments,
    transactions,
};

/// A row of one of the ledger tables.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum LedgerRow {
    Account(Account),
    Investment(Investment),
    InvestmentReturn(InvestmentReturn),
    Expense(Expense),
    Transaction(Transaction),
}

/// Identifies a row touched by a committed write-set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct RowRef {
    pub(crate) table_name: &'static str,
    pub(crate) record_id: Uuid,
}

impl LedgerRow {
    pub(crate) fn table_name(&self) -> &'static str {
        match self {
            Self::Account(_) => "accounts",
            Self::Investment(_) => "investments",
            Self::InvestmentReturn(_) => "investment_returns",
            Self::Expense(_) => "expenses",
            Self::Transaction(_) => "transactions",
        }
    }

    pub(crate) fn record_id(&self) -> Uuid {
        match self {
            Self::Account(row) => row.id,
            Self::Investment(row) => row.id,
            Self::InvestmentReturn(row) => row.id,
            Self::Expense(row) => row.id,
            Self::Transaction(row) => row.id,
        }
    }

    fn snapshot(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Account(row) => serde_json::to_string(row),
            Self::Investment(row) => serde_json::to_string(row),
            Self::InvestmentReturn(row) => serde_json::to_string(row),
            Self::Expense(row) => serde_json::to_string(row),
            Self::Transaction(row) => serde_json::to_string(row),
        }
    }

    async fn insert(&self, db: &DatabaseTransaction) -> ResultEngine<()> {
        match self {
            Self::Account(row) => {
                accounts::ActiveModel::from(row).insert(db).await?;
            }
            Self::Investment(row) => {
                investments::ActiveModel::from(row).insert(db).await?;
            }
            Self::InvestmentReturn(row) => {
                investment_returns::ActiveModel::from(row).insert(db).await?;
            }
            Self::Expense(row) => {
                expenses::ActiveModel::from(row).insert(db).await?;
            }
            Self::Transaction(row) => {
                transactions::ActiveModel::from(row).insert(db).await?;
            }
        }
        Ok(())
    }

    async fn update(&self, db: &DatabaseTransaction) -> ResultEngine<()> {
        match self {
            Self::Account(row) => {
                accounts::ActiveModel::from(row).update(db).await?;
            }
            Self::Investment(row) => {
                investments::ActiveModel::from(row).update(db).await?;
            }
            Self::InvestmentReturn(row) => {
                investment_returns::ActiveModel::from(row).update(db).await?;
            }
            Self::Expense(row) => {
                expenses::ActiveModel::from(row).update(db).await?;
            }
            Self::Transaction(row) => {
                transactions::ActiveModel::from(row).update(db).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, db: &DatabaseTransaction) -> ResultEngine<()> {
        let id = self.record_id().to_string();
        let result = match self {
            Self::Account(_) => accounts::Entity::delete_by_id(id).exec(db).await?,
            Self::Investment(_) => investments::Entity::delete_by_id(id).exec(db).await?,
            Self::InvestmentReturn(_) => {
                investment_returns::Entity::delete_by_id(id).exec(db).await?
            }
            Self::Expense(_) => expenses::Entity::delete_by_id(id).exec(db).await?,
            Self::Transaction(_) => transactions::Entity::delete_by_id(id).exec(db).await?,
        };
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!(
                "{} {}",
                self.table_name(),
                self.record_id()
            )));
        }
        Ok(())
    }
}

macro_rules! impl_into_row {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for LedgerRow {
                fn from(row: $ty) -> Self {
                    Self::$variant(row)
                }
            }
        )*
    };
}

impl_into_row!(
    Account => Account,
    Investment => Investment,
    InvestmentReturn => InvestmentReturn,
    Expense => Expense,
    Transaction => Transaction,
);

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Write {
    Insert(LedgerRow),
    Update { before: LedgerRow, after: LedgerRow },
    Delete(LedgerRow),
}

impl Write {
    fn row(&self) -> &LedgerRow {
        match self {
            Self::Insert(row) | Self::Delete(row) => row,
            Self::Update { after, .. } => after,
        }
    }

    fn action(&self) -> AuditAction {
        match self {
            Self::Insert(_) => AuditAction::Create,
            Self::Update { .. } => AuditAction::Update,
            Self::Delete(_) => AuditAction::Delete,
        }
    }

    async fn apply(&self, db: &DatabaseTransaction) -> ResultEngine<()> {
        match self {
            Self::Insert(row) => row.insert(db).await,
            Self::Update { after, .. } => after.update(db).await,
            Self::Delete(row) => row.delete(db).await,
        }
    }

    /// The audit entry describing this write.
    pub(crate) fn audit_entry(
        &self,
        actor: Option<&str>,
        recorded_at: DateTime<Utc>,
    ) -> Result<audit_log::ActiveModel, serde_json::Error> {
        let (old_values, new_values) = match self {
            Self::Insert(row) => (None, Some(row.snapshot()?)),
            Self::Update { before, after } => (Some(before.snapshot()?), Some(after.snapshot()?)),
            Self::Delete(row) => (Some(row.snapshot()?), None),
        };
        let row = self.row();
        Ok(audit_log::new_entry(
            row.table_name(),
            row.record_id().to_string(),
            self.action(),
            old_values,
            new_values,
            actor.map(ToString::to_string),
            recorded_at,
        ))
    }
}

/// Ordered writes of one operation.
#[derive(Clone, Debug)]
pub(crate) struct WriteSet {
    op: &'static str,
    writes: Vec<Write>,
}

impl WriteSet {
    pub(crate) fn new(op: &'static str) -> Self {
        Self {
            op,
            writes: Vec::new(),
        }
    }

    pub(crate) fn op(&self) -> &'static str {
        self.op
    }

    pub(crate) fn insert(&mut self, row: impl Into<LedgerRow>) -> &mut Self {
        self.writes.push(Write::Insert(row.into()));
        self
    }

    pub(crate) fn update(
        &mut self,
        before: impl Into<LedgerRow>,
        after: impl Into<LedgerRow>,
    ) -> &mut Self {
        self.writes.push(Write::Update {
            before: before.into(),
            after: after.into(),
        });
        self
    }

    pub(crate) fn delete(&mut self, row: impl Into<LedgerRow>) -> &mut Self {
        self.writes.push(Write::Delete(row.into()));
        self
    }

    pub(crate) fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Runs every write in order on `db`.
    ///
    /// A failure of the first write is reported as is. A failure of any later
    /// write is reported as [`EngineError::AtomicityFailure`]: earlier writes
    /// already ran and the caller must drop the transaction.
    pub(crate) async fn apply(&self, db: &DatabaseTransaction) -> ResultEngine<Vec<RowRef>> {
        let total = self.writes.len();
        let mut affected = Vec::with_capacity(total);
        for (index, write) in self.writes.iter().enumerate() {
            let row = write.row();
            if let Err(err) = write.apply(db).await {
                if index == 0 {
                    return Err(err);
                }
                return Err(EngineError::AtomicityFailure(format!(
                    "{}: write {} of {total} on {} {} failed: {err}",
                    self.op,
                    index + 1,
                    row.table_name(),
                    row.record_id()
                )));
            }
            affected.push(RowRef {
                table_name: row.table_name(),
                record_id: row.record_id(),
            });
        }
        Ok(affected)
    }
}
