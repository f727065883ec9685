//! Ledger and audit consistency engine for a small business tracker.
//!
//! The engine keeps account balances, transactions, investment cost bases and
//! an append-only audit trail consistent whenever money moves. Every
//! money-moving operation is one write-set committed atomically under the
//! locks of the accounts it touches; the metrics are computed read-only from
//! the same store.

pub use accounts::Account;
pub use audit_log::{AuditAction, AuditLogEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{
    AmountTarget, CaptureRevenueCmd, DepositCmd, FundInvestmentCmd, NewAccountCmd, PayExpenseCmd,
    UpdateAccountCmd, UpdateAmountCmd, WithdrawCmd,
};
pub use error::EngineError;
pub use expenses::Expense;
pub use investment_returns::{InvestmentReturn, PeriodType};
pub use investments::{Investment, InvestmentSummary};
pub use metrics::{
    BreakEvenAnalysis, BreakEvenPoint, InvestmentMetrics, Month, MonthlyPoint,
};
pub use money::Money;
pub use ops::{
    AccountSummary, AuditLogFilter, DEFAULT_LOCK_TIMEOUT, Engine, EngineBuilder,
    ExpenseListFilter, UpdatedRow,
};
pub use transactions::{RelatedKind, Transaction, TransactionKind};

mod accounts;
mod audit_log;
mod clock;
mod commands;
mod error;
mod executor;
mod expenses;
mod investment_returns;
mod investments;
mod locks;
pub mod metrics;
mod money;
mod ops;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
