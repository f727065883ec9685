use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Account, EngineError, Expense, Investment, InvestmentReturn, RelatedKind, ResultEngine,
    Transaction, accounts, expenses, investment_returns, investments, transactions,
};

use super::Engine;

/// Generates a `require_*` method loading one row by id or failing with
/// `NotFound`.
macro_rules! impl_require {
    ($fn_name:ident, $entity:path, $domain:ty, $label:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            &self,
            db: &C,
            id: Uuid,
        ) -> ResultEngine<$domain> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!(concat!($label, " {}"), id)))?;
            <$domain>::try_from(model)
        }
    };
}

impl Engine {
    impl_require!(require_account, accounts::Entity, Account, "account");
    impl_require!(require_investment, investments::Entity, Investment, "investment");
    impl_require!(
        require_investment_return,
        investment_returns::Entity,
        InvestmentReturn,
        "investment return"
    );
    impl_require!(require_expense, expenses::Entity, Expense, "expense");
    impl_require!(require_transaction, transactions::Entity, Transaction, "transaction");

    /// Returns of an investment, oldest first.
    pub(super) async fn returns_of<C: ConnectionTrait>(
        &self,
        db: &C,
        investment_id: Uuid,
    ) -> ResultEngine<Vec<InvestmentReturn>> {
        investment_returns::Entity::find()
            .filter(investment_returns::Column::InvestmentId.eq(investment_id.to_string()))
            .order_by_asc(investment_returns::Column::ReturnDate)
            .order_by_asc(investment_returns::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(InvestmentReturn::try_from)
            .collect()
    }

    /// Expenses attributed to an investment, oldest first.
    pub(super) async fn expenses_of<C: ConnectionTrait>(
        &self,
        db: &C,
        investment_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        expenses::Entity::find()
            .filter(expenses::Column::InvestmentId.eq(investment_id.to_string()))
            .order_by_asc(expenses::Column::Date)
            .all(db)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    /// System-generated transactions mirroring the given rows of one table,
    /// including the revenue mirrors of an investment's returns.
    pub(super) async fn mirrors_of<C: ConnectionTrait>(
        &self,
        db: &C,
        related_type: RelatedKind,
        related_ids: &[Uuid],
    ) -> ResultEngine<Vec<Transaction>> {
        if related_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = related_ids.iter().map(ToString::to_string).collect();
        transactions::Entity::find()
            .filter(transactions::Column::RelatedType.eq(related_type.as_str()))
            .filter(transactions::Column::RelatedId.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// The mirror of a single row, if the row moved money on an account.
    ///
    /// For an investment this is the funding mirror; revenue mirrors of its
    /// returns share the link and are skipped.
    pub(super) async fn mirror_of<C: ConnectionTrait>(
        &self,
        db: &C,
        related_type: RelatedKind,
        related_id: Uuid,
    ) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::RelatedType.eq(related_type.as_str()))
            .filter(transactions::Column::RelatedId.eq(related_id.to_string()))
            .filter(transactions::Column::SourceReturnId.is_null())
            .one(db)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    /// The revenue mirror of one investment return.
    pub(super) async fn return_mirror_of<C: ConnectionTrait>(
        &self,
        db: &C,
        return_id: Uuid,
    ) -> ResultEngine<Option<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::SourceReturnId.eq(return_id.to_string()))
            .one(db)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }
}
