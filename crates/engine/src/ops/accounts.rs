use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Account, EngineError, NewAccountCmd, ResultEngine, UpdateAccountCmd, accounts,
    executor::WriteSet,
    expenses, investment_returns, investments, transactions,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Opens an account. Its balance starts at `starting_amount`.
    pub async fn create_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_text(&cmd.name, "account name")?;
        let kind = normalize_required_text(&cmd.kind, "account type")?;
        if cmd.starting_amount.is_negative() {
            return Err(EngineError::Validation(
                "starting amount must be >= 0".to_string(),
            ));
        }

        let account = Account::new(
            name,
            kind,
            normalize_optional_text(cmd.bank_name.as_deref()),
            cmd.starting_amount,
            self.clock.now(),
        );
        let db_tx = self.database.begin().await?;
        let mut writes = WriteSet::new("create_account");
        writes.insert(account.clone());
        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(account)
    }

    /// Changes the descriptive fields of an account.
    pub async fn update_account(&self, cmd: UpdateAccountCmd) -> ResultEngine<Account> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_text(n, "account name"))
            .transpose()?;
        let kind = cmd
            .kind
            .as_deref()
            .map(|k| normalize_required_text(k, "account type"))
            .transpose()?;

        let _locks = self.locks.acquire([cmd.account_id]).await?;
        let db_tx = self.database.begin().await?;
        let account = self.require_account(&db_tx, cmd.account_id).await?;

        let mut updated = account.clone();
        if let Some(name) = name {
            updated.name = name;
        }
        if let Some(kind) = kind {
            updated.kind = kind;
        }
        if let Some(bank_name) = cmd.bank_name.as_deref() {
            updated.bank_name = normalize_optional_text(Some(bank_name));
        }
        updated.updated_at = self.clock.now();

        let mut writes = WriteSet::new("update_account");
        writes.update(account, updated.clone());
        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(updated)
    }

    /// Deletes an account nothing refers to.
    ///
    /// Fails with `ReferentialConflict` while any investment, investment
    /// return, expense or transaction still points at it.
    pub async fn delete_account(&self, account_id: Uuid, actor: Option<&str>) -> ResultEngine<()> {
        let _locks = self.locks.acquire([account_id]).await?;
        let db_tx = self.database.begin().await?;
        let account = self.require_account(&db_tx, account_id).await?;
        let id = account_id.to_string();

        let references = [
            (
                "investments",
                investments::Entity::find()
                    .filter(investments::Column::AccountId.eq(id.as_str()))
                    .count(&db_tx)
                    .await?,
            ),
            (
                "investment returns",
                investment_returns::Entity::find()
                    .filter(investment_returns::Column::AccountId.eq(id.as_str()))
                    .count(&db_tx)
                    .await?,
            ),
            (
                "expenses",
                expenses::Entity::find()
                    .filter(expenses::Column::AccountId.eq(id.as_str()))
                    .count(&db_tx)
                    .await?,
            ),
            (
                "transactions",
                transactions::Entity::find()
                    .filter(transactions::Column::AccountId.eq(id.as_str()))
                    .count(&db_tx)
                    .await?,
            ),
        ];
        let held: Vec<String> = references
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| format!("{count} {label}"))
            .collect();
        if !held.is_empty() {
            return Err(EngineError::ReferentialConflict(format!(
                "account '{}' is referenced by {}",
                account.name,
                held.join(", ")
            )));
        }

        let mut writes = WriteSet::new("delete_account");
        writes.delete(account);
        self.commit(db_tx, writes, actor).await?;
        Ok(())
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        self.require_account(&self.database, account_id).await
    }

    /// All accounts, by name.
    pub async fn list_accounts(&self) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            accounts::Entity::find()
                .order_by_asc(accounts::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Account::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
