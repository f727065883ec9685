use sea_orm::{ConnectionTrait, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CaptureRevenueCmd, FundInvestmentCmd, Investment, InvestmentReturn, InvestmentSummary, Money,
    RelatedKind, ResultEngine, Transaction, TransactionKind,
    executor::WriteSet,
    investments,
    util::{ensure_positive, normalize_optional_text, normalize_required_text, sum_amounts},
};

use super::{Engine, balances::BalanceChanges, rebalanced, with_tx};

impl Engine {
    /// Records an investment. When paid from an account, the capital leaves
    /// that account through a mirrored `investment` transaction.
    pub async fn fund_investment(&self, cmd: FundInvestmentCmd) -> ResultEngine<InvestmentSummary> {
        ensure_positive(cmd.amount, "investment amount")?;
        let name = normalize_required_text(&cmd.name, "investment name")?;
        let kind = normalize_required_text(&cmd.kind, "investment type")?;

        let _locks = self.locks.acquire(cmd.account_id).await?;
        let db_tx = self.database.begin().await?;
        let now = self.clock.now();
        let purchase_date = cmd.date.unwrap_or_else(|| self.clock.today());

        let investment = Investment {
            id: Uuid::new_v4(),
            name,
            kind,
            amount: cmd.amount,
            purchase_date,
            account_id: cmd.account_id,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let mut writes = WriteSet::new("fund_investment");
        if let Some(account_id) = cmd.account_id {
            let account = self.require_account(&db_tx, account_id).await?;
            let updated = rebalanced(&account, TransactionKind::Investment.signed(cmd.amount), now)?;
            writes.update(account, updated);
        }
        writes.insert(investment.clone());
        if let Some(account_id) = cmd.account_id {
            writes.insert(Transaction::mirror(
                account_id,
                TransactionKind::Investment,
                cmd.amount,
                Some(format!("Investment: {}", investment.name)),
                purchase_date,
                (RelatedKind::Investment, investment.id),
                now,
            ));
        }

        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(InvestmentSummary {
            investment,
            total_returns: Money::ZERO,
            returns_count: 0,
        })
    }

    /// Records a return of an investment. When credited to an account, the
    /// money enters it through a `revenue` transaction linked to the
    /// investment and tagged with the return it comes from.
    ///
    /// Fails with a validation error when the investment's total returns
    /// would no longer fit a [`Money`].
    pub async fn capture_revenue(&self, cmd: CaptureRevenueCmd) -> ResultEngine<InvestmentSummary> {
        ensure_positive(cmd.amount, "revenue amount")?;

        let _locks = self.locks.acquire(cmd.account_id).await?;
        let db_tx = self.database.begin().await?;
        let investment = self.require_investment(&db_tx, cmd.investment_id).await?;
        let existing = self.returns_of(&db_tx, investment.id).await?;
        let now = self.clock.now();
        let return_date = cmd.date.unwrap_or_else(|| self.clock.today());

        let ret = InvestmentReturn {
            id: Uuid::new_v4(),
            investment_id: investment.id,
            amount: cmd.amount,
            return_date,
            period_type: cmd.period_type,
            comment: normalize_optional_text(cmd.comment.as_deref()),
            account_id: cmd.account_id,
            created_at: now,
            updated_at: now,
        };
        let summary = InvestmentSummary {
            total_returns: sum_amounts(existing.iter().map(|r| r.amount).chain([ret.amount]))?,
            returns_count: existing.len() as u64 + 1,
            investment: investment.clone(),
        };

        let mut writes = WriteSet::new("capture_revenue");
        if let Some(account_id) = cmd.account_id {
            let account = self.require_account(&db_tx, account_id).await?;
            let updated = rebalanced(&account, TransactionKind::Revenue.signed(cmd.amount), now)?;
            writes.update(account, updated);
        }
        writes.insert(ret.clone());
        if let Some(account_id) = cmd.account_id {
            writes.insert(
                Transaction::mirror(
                    account_id,
                    TransactionKind::Revenue,
                    cmd.amount,
                    Some(format!("Revenue: {}", investment.name)),
                    return_date,
                    (RelatedKind::Investment, investment.id),
                    now,
                )
                .with_source_return(ret.id),
            );
        }

        self.commit(db_tx, writes, cmd.actor.as_deref()).await?;
        Ok(summary)
    }

    /// Accounts touched by the mirrors of an investment, revenue included.
    async fn investment_accounts<C: ConnectionTrait>(
        &self,
        db: &C,
        investment_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        Ok(self
            .mirrors_of(db, RelatedKind::Investment, &[investment_id])
            .await?
            .iter()
            .map(|m| m.account_id)
            .collect())
    }

    /// Deletes an investment with its returns and every mirrored transaction,
    /// restoring the balances those transactions moved.
    ///
    /// Expenses attributed to the investment are kept.
    pub async fn delete_investment(
        &self,
        investment_id: Uuid,
        actor: Option<&str>,
    ) -> ResultEngine<()> {
        let linked = self.investment_accounts(&self.database, investment_id).await?;
        let guards = self.locks.acquire(linked).await?;
        let db_tx = self.database.begin().await?;

        let investment = self.require_investment(&db_tx, investment_id).await?;
        let returns = self.returns_of(&db_tx, investment_id).await?;
        let mirrors = self
            .mirrors_of(&db_tx, RelatedKind::Investment, &[investment_id])
            .await?;

        let mut changes = BalanceChanges::default();
        for mirror in &mirrors {
            changes.add(mirror.account_id, -mirror.signed_amount())?;
        }
        changes.ensure_locked(&guards)?;

        let mut writes = WriteSet::new("delete_investment");
        changes
            .stage(self, &db_tx, &mut writes, self.clock.now())
            .await?;
        for mirror in mirrors {
            writes.delete(mirror);
        }
        for ret in returns {
            writes.delete(ret);
        }
        writes.delete(investment);

        self.commit(db_tx, writes, actor).await?;
        Ok(())
    }

    /// Deletes one return and its mirrored `revenue` transaction.
    pub async fn delete_investment_return(
        &self,
        return_id: Uuid,
        actor: Option<&str>,
    ) -> ResultEngine<()> {
        let linked = self
            .return_mirror_of(&self.database, return_id)
            .await?
            .map(|m| m.account_id);
        let guards = self.locks.acquire(linked).await?;
        let db_tx = self.database.begin().await?;

        let ret = self.require_investment_return(&db_tx, return_id).await?;
        let mirror = self.return_mirror_of(&db_tx, return_id).await?;

        let mut changes = BalanceChanges::default();
        if let Some(mirror) = &mirror {
            changes.add(mirror.account_id, -mirror.signed_amount())?;
        }
        changes.ensure_locked(&guards)?;

        let mut writes = WriteSet::new("delete_investment_return");
        changes
            .stage(self, &db_tx, &mut writes, self.clock.now())
            .await?;
        if let Some(mirror) = mirror {
            writes.delete(mirror);
        }
        writes.delete(ret);

        self.commit(db_tx, writes, actor).await?;
        Ok(())
    }

    async fn summarize<C: ConnectionTrait>(
        &self,
        db: &C,
        investment: Investment,
    ) -> ResultEngine<InvestmentSummary> {
        let returns = self.returns_of(db, investment.id).await?;
        Ok(InvestmentSummary {
            total_returns: sum_amounts(returns.iter().map(|r| r.amount))?,
            returns_count: returns.len() as u64,
            investment,
        })
    }

    pub async fn investment(&self, investment_id: Uuid) -> ResultEngine<InvestmentSummary> {
        with_tx!(self, |db_tx| {
            let investment = self.require_investment(&db_tx, investment_id).await?;
            self.summarize(&db_tx, investment).await
        })
    }

    /// All investments with their return totals, newest purchase first.
    pub async fn list_investments(&self) -> ResultEngine<Vec<InvestmentSummary>> {
        with_tx!(self, |db_tx| {
            let models = investments::Entity::find()
                .order_by_desc(investments::Column::PurchaseDate)
                .order_by_asc(investments::Column::Name)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let investment = Investment::try_from(model)?;
                out.push(self.summarize(&db_tx, investment).await?);
            }
            Ok(out)
        })
    }

    /// Returns of an investment, oldest first.
    pub async fn investment_returns(
        &self,
        investment_id: Uuid,
    ) -> ResultEngine<Vec<InvestmentReturn>> {
        with_tx!(self, |db_tx| {
            self.require_investment(&db_tx, investment_id).await?;
            self.returns_of(&db_tx, investment_id).await
        })
    }
}
