use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AmountTarget, Expense, Investment, InvestmentReturn, RelatedKind, ResultEngine, Transaction,
    UpdateAmountCmd,
    executor::{LedgerRow, WriteSet},
    util::ensure_positive,
};

use super::{Engine, balances::BalanceChanges, transactions::ensure_manual};

/// The row an amount correction was applied to, after the change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum UpdatedRow {
    Investment(Investment),
    InvestmentReturn(InvestmentReturn),
    Expense(Expense),
    Transaction(Transaction),
}

impl Engine {
    /// The system-generated transaction mirroring `target`, if any.
    async fn own_mirror<C: ConnectionTrait>(
        &self,
        db: &C,
        target: AmountTarget,
    ) -> ResultEngine<Option<Transaction>> {
        match target {
            AmountTarget::Investment(id) => self.mirror_of(db, RelatedKind::Investment, id).await,
            AmountTarget::InvestmentReturn(id) => self.return_mirror_of(db, id).await,
            AmountTarget::Expense(id) => self.mirror_of(db, RelatedKind::Expense, id).await,
            AmountTarget::Transaction(_) => Ok(None),
        }
    }

    /// Account whose balance an amount correction may move.
    async fn amount_target_account<C: ConnectionTrait>(
        &self,
        db: &C,
        target: AmountTarget,
    ) -> ResultEngine<Option<Uuid>> {
        match target {
            AmountTarget::Transaction(id) => {
                let tx = self.require_transaction(db, id).await?;
                ensure_manual(&tx)?;
                Ok(Some(tx.account_id))
            }
            other => Ok(self.own_mirror(db, other).await?.map(|m| m.account_id)),
        }
    }

    /// Corrects the amount of an investment, a return, an expense or a manual
    /// transaction.
    ///
    /// When the row moved money on an account, the difference is applied to
    /// that account and the mirrored transaction is patched to the new amount.
    pub async fn update_amount(&self, cmd: UpdateAmountCmd) -> ResultEngine<UpdatedRow> {
        ensure_positive(cmd.amount, "amount")?;

        let linked = self
            .amount_target_account(&self.database, cmd.target)
            .await?;
        let guards = self.locks.acquire(linked).await?;
        let db_tx = self.database.begin().await?;
        let now = self.clock.now();
        let mut changes = BalanceChanges::default();

        let (before, after, updated): (LedgerRow, LedgerRow, UpdatedRow) = match cmd.target {
            AmountTarget::Investment(id) => {
                let before = self.require_investment(&db_tx, id).await?;
                let mut after = before.clone();
                after.amount = cmd.amount;
                after.updated_at = now;
                (before.into(), after.clone().into(), UpdatedRow::Investment(after))
            }
            AmountTarget::InvestmentReturn(id) => {
                let before = self.require_investment_return(&db_tx, id).await?;
                let mut after = before.clone();
                after.amount = cmd.amount;
                after.updated_at = now;
                (
                    before.into(),
                    after.clone().into(),
                    UpdatedRow::InvestmentReturn(after),
                )
            }
            AmountTarget::Expense(id) => {
                let before = self.require_expense(&db_tx, id).await?;
                let mut after = before.clone();
                after.amount = cmd.amount;
                after.updated_at = now;
                (before.into(), after.clone().into(), UpdatedRow::Expense(after))
            }
            AmountTarget::Transaction(id) => {
                let before = self.require_transaction(&db_tx, id).await?;
                ensure_manual(&before)?;
                let mut after = before.clone();
                after.amount = cmd.amount;
                after.updated_at = now;
                changes.add(
                    before.account_id,
                    after.signed_amount() - before.signed_amount(),
                )?;
                (before.into(), after.clone().into(), UpdatedRow::Transaction(after))
            }
        };

        let mirror = match self.own_mirror(&db_tx, cmd.target).await? {
            Some(mirror) => {
                let mut patched = mirror.clone();
                patched.amount = cmd.amount;
                patched.updated_at = now;
                changes.add(
                    mirror.account_id,
                    patched.signed_amount() - mirror.signed_amount(),
                )?;
                Some((mirror, patched))
            }
            None => None,
        };
        changes.ensure_locked(&guards)?;

        let mut writes = WriteSet::new("update_amount");
        changes.stage(self, &db_tx, &mut writes, now).await?;
        writes.update(before, after);
        if let Some((mirror, patched)) = mirror {
            writes.update(mirror, patched);
        }

        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(updated)
    }
}
