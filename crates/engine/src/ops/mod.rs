use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction};

use crate::{
    Account, Clock, Money, ResultEngine, SystemClock,
    executor::{RowRef, WriteSet},
    locks::AccountLocks,
    util::with_balance_delta,
};

mod access;
mod accounts;
mod amounts;
mod audit;
mod balances;
mod expenses;
mod investments;
mod metrics;
mod movements;
mod transactions;

pub use amounts::UpdatedRow;
pub use audit::AuditLogFilter;
pub use balances::AccountSummary;
pub use expenses::ExpenseListFilter;

/// Default time an operation waits for its account locks.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Every money-moving operation follows the same path: take the locks of the
/// accounts it touches, open a database transaction, validate against the
/// current rows, build a [`WriteSet`] and hand it to [`Engine::commit`].
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Applies `writes` on `db_tx`, appends their audit entries and commits.
    ///
    /// On a write failure `db_tx` is dropped, which rolls every write back.
    /// Audit failures never abort the commit.
    async fn commit(
        &self,
        db_tx: DatabaseTransaction,
        writes: WriteSet,
        actor: Option<&str>,
    ) -> ResultEngine<Vec<RowRef>> {
        let affected = match writes.apply(&db_tx).await {
            Ok(affected) => affected,
            Err(err) => {
                tracing::debug!(op = writes.op(), error = %err, "write-set rolled back");
                return Err(err);
            }
        };
        self.record_audit(&db_tx, &writes, actor).await;
        db_tx.commit().await?;
        tracing::debug!(op = writes.op(), rows = affected.len(), "write-set committed");
        Ok(affected)
    }
}

/// Copy of `account` with `delta` applied and the update time refreshed.
fn rebalanced(account: &Account, delta: Money, now: DateTime<Utc>) -> ResultEngine<Account> {
    let mut updated = with_balance_delta(account, delta)?;
    updated.updated_at = now;
    Ok(updated)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    clock: Option<Arc<dyn Clock>>,
    lock_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Time source for default dates and timestamps. Defaults to the system
    /// clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = Some(clock);
        self
    }

    /// How long an operation waits for its account locks before failing with
    /// a retryable `LockTimeout`.
    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            locks: AccountLocks::new(self.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT)),
        })
    }
}
