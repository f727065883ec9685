//! Command structs for engine operations.
//!
//! These types group the parameters of write operations so call sites stay
//! readable. Optional fields have `#[must_use]` setters; a missing date means
//! "today" according to the engine clock.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Money, PeriodType};

macro_rules! optional_setters {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            #[must_use]
            pub fn $field(mut self, $field: impl Into<$ty>) -> Self {
                self.$field = Some($field.into());
                self
            }
        )*
    };
}

/// Open a new account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub name: String,
    pub kind: String,
    pub bank_name: Option<String>,
    pub starting_amount: Money,
    pub actor: Option<String>,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>, starting_amount: Money) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            bank_name: None,
            starting_amount,
            actor: None,
        }
    }

    optional_setters!(bank_name: String, actor: String);
}

/// Change the descriptive fields of an account. The balance is never touched.
#[derive(Clone, Debug)]
pub struct UpdateAccountCmd {
    pub account_id: Uuid,
    pub name: Option<String>,
    pub kind: Option<String>,
    /// `Some("")` clears the bank name.
    pub bank_name: Option<String>,
    pub actor: Option<String>,
}

impl UpdateAccountCmd {
    #[must_use]
    pub fn new(account_id: Uuid) -> Self {
        Self {
            account_id,
            name: None,
            kind: None,
            bank_name: None,
            actor: None,
        }
    }

    optional_setters!(name: String, kind: String, bank_name: String, actor: String);
}

/// Put money into an account.
#[derive(Clone, Debug)]
pub struct DepositCmd {
    pub account_id: Uuid,
    pub amount: Money,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub actor: Option<String>,
}

impl DepositCmd {
    #[must_use]
    pub fn new(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            amount,
            description: None,
            date: None,
            actor: None,
        }
    }

    optional_setters!(description: String, date: NaiveDate, actor: String);
}

/// Take money out of an account.
#[derive(Clone, Debug)]
pub struct WithdrawCmd {
    pub account_id: Uuid,
    pub amount: Money,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub actor: Option<String>,
}

impl WithdrawCmd {
    #[must_use]
    pub fn new(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            amount,
            description: None,
            date: None,
            actor: None,
        }
    }

    optional_setters!(description: String, date: NaiveDate, actor: String);
}

/// Record a new investment, optionally paid from an account.
#[derive(Clone, Debug)]
pub struct FundInvestmentCmd {
    pub name: String,
    pub kind: String,
    pub amount: Money,
    pub date: Option<NaiveDate>,
    pub account_id: Option<Uuid>,
    pub notes: Option<String>,
    pub actor: Option<String>,
}

impl FundInvestmentCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>, amount: Money) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            amount,
            date: None,
            account_id: None,
            notes: None,
            actor: None,
        }
    }

    optional_setters!(date: NaiveDate, account_id: Uuid, notes: String, actor: String);
}

/// Record revenue produced by an investment.
#[derive(Clone, Debug)]
pub struct CaptureRevenueCmd {
    pub investment_id: Uuid,
    pub amount: Money,
    pub date: Option<NaiveDate>,
    pub period_type: PeriodType,
    pub account_id: Option<Uuid>,
    pub comment: Option<String>,
    pub actor: Option<String>,
}

impl CaptureRevenueCmd {
    #[must_use]
    pub fn new(investment_id: Uuid, amount: Money) -> Self {
        Self {
            investment_id,
            amount,
            date: None,
            period_type: PeriodType::Day,
            account_id: None,
            comment: None,
            actor: None,
        }
    }

    #[must_use]
    pub fn period_type(mut self, period_type: PeriodType) -> Self {
        self.period_type = period_type;
        self
    }

    optional_setters!(date: NaiveDate, account_id: Uuid, comment: String, actor: String);
}

/// Pay an expense, optionally from an account and attributed to an
/// investment.
#[derive(Clone, Debug)]
pub struct PayExpenseCmd {
    pub description: String,
    pub category: String,
    pub amount: Money,
    pub date: Option<NaiveDate>,
    pub account_id: Option<Uuid>,
    pub investment_id: Option<Uuid>,
    pub actor: Option<String>,
}

impl PayExpenseCmd {
    #[must_use]
    pub fn new(description: impl Into<String>, category: impl Into<String>, amount: Money) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
            amount,
            date: None,
            account_id: None,
            investment_id: None,
            actor: None,
        }
    }

    optional_setters!(
        date: NaiveDate,
        account_id: Uuid,
        investment_id: Uuid,
        actor: String,
    );
}

/// Row whose amount is being corrected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountTarget {
    Investment(Uuid),
    InvestmentReturn(Uuid),
    Expense(Uuid),
    /// Only manual transactions; mirrors follow their domain row.
    Transaction(Uuid),
}

/// Correct the amount of an existing row.
#[derive(Clone, Debug)]
pub struct UpdateAmountCmd {
    pub target: AmountTarget,
    pub amount: Money,
    pub actor: Option<String>,
}

impl UpdateAmountCmd {
    #[must_use]
    pub fn new(target: AmountTarget, amount: Money) -> Self {
        Self {
            target,
            amount,
            actor: None,
        }
    }

    optional_setters!(actor: String);
}
