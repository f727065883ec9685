use chrono::NaiveDate;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    Account, DepositCmd, Money, ResultEngine, Transaction, TransactionKind, WithdrawCmd,
    executor::WriteSet,
    util::{ensure_positive, normalize_optional_text},
};

use super::{Engine, rebalanced};

impl Engine {
    /// Moves money into an account by hand.
    pub async fn deposit(&self, cmd: DepositCmd) -> ResultEngine<Account> {
        ensure_positive(cmd.amount, "deposit amount")?;
        self.manual_movement(
            "deposit",
            TransactionKind::Deposit,
            cmd.account_id,
            cmd.amount,
            cmd.description.as_deref(),
            cmd.date,
            cmd.actor.as_deref(),
        )
        .await
    }

    /// Moves money out of an account by hand.
    ///
    /// Fails with `InsufficientFunds`, leaving the account untouched, when the
    /// balance does not cover `amount`.
    pub async fn withdraw(&self, cmd: WithdrawCmd) -> ResultEngine<Account> {
        ensure_positive(cmd.amount, "withdrawal amount")?;
        self.manual_movement(
            "withdraw",
            TransactionKind::Withdrawal,
            cmd.account_id,
            cmd.amount,
            cmd.description.as_deref(),
            cmd.date,
            cmd.actor.as_deref(),
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn manual_movement(
        &self,
        op: &'static str,
        kind: TransactionKind,
        account_id: Uuid,
        amount: Money,
        description: Option<&str>,
        date: Option<NaiveDate>,
        actor: Option<&str>,
    ) -> ResultEngine<Account> {
        let _locks = self.locks.acquire([account_id]).await?;
        let db_tx = self.database.begin().await?;
        let account = self.require_account(&db_tx, account_id).await?;

        let now = self.clock.now();
        let updated = rebalanced(&account, kind.signed(amount), now)?;
        let tx = Transaction::manual(
            account_id,
            kind,
            amount,
            normalize_optional_text(description),
            date.unwrap_or_else(|| self.clock.today()),
            now,
        );

        let mut writes = WriteSet::new(op);
        writes.update(account, updated.clone()).insert(tx);
        self.commit(db_tx, writes, actor).await?;
        Ok(updated)
    }
}
