use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{EngineError, InvestmentMetrics, ResultEngine, metrics::investment_metrics};

use super::{Engine, with_tx};

impl Engine {
    /// ROI, monthly series and break-even analysis of an investment.
    ///
    /// All rows are read in one transaction, so the result reflects a single
    /// consistent state of the ledger. Nothing is written.
    pub async fn compute_metrics(&self, investment_id: Uuid) -> ResultEngine<InvestmentMetrics> {
        let (investment, returns, expenses) = with_tx!(self, |db_tx| {
            let investment = self.require_investment(&db_tx, investment_id).await?;
            let returns = self.returns_of(&db_tx, investment_id).await?;
            let expenses = self.expenses_of(&db_tx, investment_id).await?;
            Ok::<_, EngineError>((investment, returns, expenses))
        })?;

        investment_metrics(&investment, &returns, &expenses, self.clock.today())
    }
}
