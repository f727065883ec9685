use chrono::NaiveDate;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, PayExpenseCmd, RelatedKind, ResultEngine, Transaction, TransactionKind,
    executor::WriteSet,
    expenses,
    util::{ensure_positive, normalize_required_text},
};

use super::{Engine, balances::BalanceChanges, rebalanced, with_tx};

/// Filters for listing expenses. Date bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
    pub investment_id: Option<Uuid>,
}

impl Engine {
    /// Records an expense. When paid from an account, the money leaves it
    /// through a mirrored `expense` transaction.
    pub async fn pay_expense(&self, cmd: PayExpenseCmd) -> ResultEngine<Expense> {
        ensure_positive(cmd.amount, "expense amount")?;
        let description = normalize_required_text(&cmd.description, "expense description")?;
        let category = normalize_required_text(&cmd.category, "expense category")?;

        let _locks = self.locks.acquire(cmd.account_id).await?;
        let db_tx = self.database.begin().await?;
        if let Some(investment_id) = cmd.investment_id {
            self.require_investment(&db_tx, investment_id).await?;
        }
        let now = self.clock.now();
        let date = cmd.date.unwrap_or_else(|| self.clock.today());

        let expense = Expense {
            id: Uuid::new_v4(),
            description,
            category,
            amount: cmd.amount,
            date,
            account_id: cmd.account_id,
            investment_id: cmd.investment_id,
            created_at: now,
            updated_at: now,
        };

        let mut writes = WriteSet::new("pay_expense");
        if let Some(account_id) = cmd.account_id {
            let account = self.require_account(&db_tx, account_id).await?;
            let updated = rebalanced(&account, TransactionKind::Expense.signed(cmd.amount), now)?;
            writes.update(account, updated);
        }
        writes.insert(expense.clone());
        if let Some(account_id) = cmd.account_id {
            writes.insert(Transaction::mirror(
                account_id,
                TransactionKind::Expense,
                cmd.amount,
                Some(format!("Expense: {}", expense.description)),
                date,
                (RelatedKind::Expense, expense.id),
                now,
            ));
        }

        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(expense)
    }

    /// Deletes an expense and its mirrored transaction, giving the money back
    /// to the paying account.
    pub async fn delete_expense(&self, expense_id: Uuid, actor: Option<&str>) -> ResultEngine<()> {
        let linked = self
            .mirror_of(&self.database, RelatedKind::Expense, expense_id)
            .await?
            .map(|m| m.account_id);
        let guards = self.locks.acquire(linked).await?;
        let db_tx = self.database.begin().await?;

        let expense = self.require_expense(&db_tx, expense_id).await?;
        let mirror = self
            .mirror_of(&db_tx, RelatedKind::Expense, expense_id)
            .await?;

        let mut changes = BalanceChanges::default();
        if let Some(mirror) = &mirror {
            changes.add(mirror.account_id, -mirror.signed_amount())?;
        }
        changes.ensure_locked(&guards)?;

        let mut writes = WriteSet::new("delete_expense");
        changes
            .stage(self, &db_tx, &mut writes, self.clock.now())
            .await?;
        if let Some(mirror) = mirror {
            writes.delete(mirror);
        }
        writes.delete(expense);

        self.commit(db_tx, writes, actor).await?;
        Ok(())
    }

    pub async fn expense(&self, expense_id: Uuid) -> ResultEngine<Expense> {
        self.require_expense(&self.database, expense_id).await
    }

    /// Expenses matching `filter`, newest first.
    pub async fn list_expenses(&self, filter: &ExpenseListFilter) -> ResultEngine<Vec<Expense>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(EngineError::Validation(
                "invalid range: from must be <= to".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let mut query = expenses::Entity::find()
                .order_by_desc(expenses::Column::Date)
                .order_by_desc(expenses::Column::CreatedAt);
            if let Some(from) = filter.from {
                query = query.filter(expenses::Column::Date.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(expenses::Column::Date.lte(to));
            }
            if let Some(category) = &filter.category {
                query = query.filter(expenses::Column::Category.eq(category.as_str()));
            }
            if let Some(investment_id) = filter.investment_id {
                query = query.filter(expenses::Column::InvestmentId.eq(investment_id.to_string()));
            }
            query
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Expense::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
