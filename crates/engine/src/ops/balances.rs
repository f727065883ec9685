use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Account, EngineError, Money, ResultEngine, Transaction, TransactionKind, accounts,
    executor::WriteSet,
    locks::AccountGuards,
    transactions,
    util::sum_amounts,
};

use super::{Engine, rebalanced, with_tx};

/// Net balance deltas of one write-set, folded per account.
///
/// Deltas are validated against the account's balance only once all of them
/// are known, so a reversal and a restore in the same operation never trip
/// the non-negative rule on an intermediate value.
#[derive(Debug, Default)]
pub(super) struct BalanceChanges {
    deltas: BTreeMap<Uuid, Money>,
}

impl BalanceChanges {
    pub(super) fn add(&mut self, account_id: Uuid, delta: Money) -> ResultEngine<()> {
        let net = self.deltas.entry(account_id).or_default();
        *net = sum_amounts([*net, delta])?;
        Ok(())
    }

    /// Fails with a retryable `LockTimeout` when an account to touch is not
    /// among the held locks. Happens when a row gained a link to another
    /// account between the pre-read and the lock.
    pub(super) fn ensure_locked(&self, guards: &AccountGuards) -> ResultEngine<()> {
        if !guards.covers(self.deltas.keys()) {
            return Err(EngineError::LockTimeout(
                "linked accounts changed while waiting for locks".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads every touched account and pushes its balance update onto
    /// `writes`. Accounts whose net delta is zero are left alone.
    pub(super) async fn stage(
        self,
        engine: &Engine,
        db_tx: &DatabaseTransaction,
        writes: &mut WriteSet,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        for (account_id, delta) in self.deltas {
            if delta.is_zero() {
                continue;
            }
            let account = engine.require_account(db_tx, account_id).await?;
            let updated = rebalanced(&account, delta, now)?;
            writes.update(account, updated);
        }
        Ok(())
    }
}

/// An account's balance rebuilt from its transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account: Account,
    pub deposits: Money,
    pub withdrawals: Money,
    pub expenses: Money,
    pub investments: Money,
    pub revenue: Money,
    pub transfers: Money,
    pub transaction_count: u64,
    /// `starting_amount` plus the signed sum of every transaction.
    pub replayed_balance: Money,
    /// `true` when the cached balance equals the replayed one.
    pub is_consistent: bool,
}

impl AccountSummary {
    fn replay(account: Account, txs: &[Transaction]) -> ResultEngine<Self> {
        let mut summary = Self {
            replayed_balance: account.starting_amount,
            account,
            deposits: Money::ZERO,
            withdrawals: Money::ZERO,
            expenses: Money::ZERO,
            investments: Money::ZERO,
            revenue: Money::ZERO,
            transfers: Money::ZERO,
            transaction_count: 0,
            is_consistent: false,
        };
        for tx in txs {
            let bucket = match tx.kind {
                TransactionKind::Deposit => &mut summary.deposits,
                TransactionKind::Withdrawal => &mut summary.withdrawals,
                TransactionKind::Expense => &mut summary.expenses,
                TransactionKind::Investment => &mut summary.investments,
                TransactionKind::Revenue => &mut summary.revenue,
                TransactionKind::Transfer => &mut summary.transfers,
            };
            *bucket = sum_amounts([*bucket, tx.amount])?;
            summary.replayed_balance =
                sum_amounts([summary.replayed_balance, tx.signed_amount()])?;
            summary.transaction_count += 1;
        }
        summary.is_consistent = summary.replayed_balance == summary.account.balance;
        Ok(summary)
    }
}

impl Engine {
    async fn account_transactions<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id.to_string()))
            .order_by_asc(transactions::Column::Date)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// Totals per transaction kind and the balance replayed from them.
    pub async fn account_summary(&self, account_id: Uuid) -> ResultEngine<AccountSummary> {
        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, account_id).await?;
            let txs = self.account_transactions(&db_tx, account_id).await?;
            AccountSummary::replay(account, &txs)
        })
    }

    /// Rewrites every cached balance that drifted from its transactions.
    ///
    /// Returns the corrected accounts. Each correction is audited as an
    /// `UPDATE` of the account row.
    pub async fn recompute_balances(&self, actor: Option<&str>) -> ResultEngine<Vec<Account>> {
        let ids: Vec<Uuid> = accounts::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .map(|account| account.map(|a| a.id))
            .collect::<ResultEngine<_>>()?;
        let _locks = self.locks.acquire(ids.iter().copied()).await?;

        let db_tx = self.database.begin().await?;
        let now = self.clock.now();
        let mut writes = WriteSet::new("recompute_balances");
        let mut corrected = Vec::new();
        for account_id in ids {
            let account = self.require_account(&db_tx, account_id).await?;
            let txs = self.account_transactions(&db_tx, account_id).await?;
            let summary = AccountSummary::replay(account.clone(), &txs)?;
            if summary.is_consistent {
                continue;
            }
            tracing::warn!(
                %account_id,
                cached = %account.balance,
                replayed = %summary.replayed_balance,
                "account balance drifted"
            );
            let mut fixed = account.clone();
            fixed.balance = summary.replayed_balance;
            fixed.updated_at = now;
            writes.update(account, fixed.clone());
            corrected.push(fixed);
        }

        if writes.is_empty() {
            return Ok(corrected);
        }
        self.commit(db_tx, writes, actor).await?;
        Ok(corrected)
    }
}
