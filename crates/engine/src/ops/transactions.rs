use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    EngineError, ResultEngine, Transaction, executor::WriteSet, transactions,
};

use super::{Engine, balances::BalanceChanges, with_tx};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    date: NaiveDate,
    transaction_id: String,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        self.require_transaction(&self.database, transaction_id)
            .await
    }

    /// Lists the transactions of an account, with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(date DESC, transaction_id DESC)`.
    pub async fn list_transactions_for_account_page(
        &self,
        account_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, account_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(account_id.to_string()))
                .order_by_desc(transactions::Column::Date)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::Date.lt(cursor.date))
                        .add(
                            Condition::all()
                                .add(transactions::Column::Date.eq(cursor.date))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let out = rows
                .into_iter()
                .take(limit as usize)
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let next_cursor = if has_more {
                out.last()
                    .map(|tx| {
                        TransactionsCursor {
                            date: tx.date,
                            transaction_id: tx.id.to_string(),
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Deletes a manual transaction and reverses its effect on the balance.
    ///
    /// System-generated transactions follow the row they mirror and are
    /// rejected with `SystemGeneratedTransaction`.
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        actor: Option<&str>,
    ) -> ResultEngine<()> {
        let pre = self
            .require_transaction(&self.database, transaction_id)
            .await?;
        ensure_manual(&pre)?;

        let guards = self.locks.acquire([pre.account_id]).await?;
        let db_tx = self.database.begin().await?;
        let tx = self.require_transaction(&db_tx, transaction_id).await?;
        ensure_manual(&tx)?;

        let mut changes = BalanceChanges::default();
        changes.add(tx.account_id, -tx.signed_amount())?;
        changes.ensure_locked(&guards)?;

        let mut writes = WriteSet::new("delete_transaction");
        changes
            .stage(self, &db_tx, &mut writes, self.clock.now())
            .await?;
        writes.delete(tx);

        self.commit(db_tx, writes, actor).await?;
        Ok(())
    }
}

pub(super) fn ensure_manual(tx: &Transaction) -> ResultEngine<()> {
    if tx.is_system_generated() {
        let related = tx
            .related_type
            .map(|k| k.as_str())
            .unwrap_or("another row");
        return Err(EngineError::SystemGeneratedTransaction(format!(
            "transaction {} mirrors {related}; change that row instead",
            tx.id
        )));
    }
    Ok(())
}
