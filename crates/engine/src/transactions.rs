//! Transaction primitives.
//!
//! A `Transaction` is one movement of money on one account. The stored amount
//! is always positive; the direction comes from the kind.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Expense,
    Investment,
    Revenue,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Expense => "expense",
            Self::Investment => "investment",
            Self::Revenue => "revenue",
            Self::Transfer => "transfer",
        }
    }

    /// `true` for kinds that add money to the account.
    pub fn is_inflow(self) -> bool {
        matches!(self, Self::Deposit | Self::Revenue | Self::Transfer)
    }

    /// Balance delta produced by a transaction of this kind.
    pub fn signed(self, amount: Money) -> Money {
        if self.is_inflow() { amount } else { -amount }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "expense" => Ok(Self::Expense),
            "investment" => Ok(Self::Investment),
            "revenue" => Ok(Self::Revenue),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Table a system-generated transaction mirrors.
///
/// Revenue mirrors point at their investment too; the return they come from
/// is kept in [`Transaction::source_return_id`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedKind {
    Investment,
    Expense,
}

impl RelatedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Investment => "investment",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for RelatedKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "investment" => Ok(Self::Investment),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid related type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub related_type: Option<RelatedKind>,
    pub related_id: Option<Uuid>,
    pub source_return_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// A transaction entered by hand (deposit, withdrawal).
    pub fn manual(
        account_id: Uuid,
        kind: TransactionKind,
        amount: Money,
        description: Option<String>,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            description,
            date,
            related_type: None,
            related_id: None,
            source_return_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A transaction mirroring a domain row. It lives and dies with that row.
    pub fn mirror(
        account_id: Uuid,
        kind: TransactionKind,
        amount: Money,
        description: Option<String>,
        date: NaiveDate,
        related: (RelatedKind, Uuid),
        now: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self::manual(account_id, kind, amount, description, date, now);
        tx.related_type = Some(related.0);
        tx.related_id = Some(related.1);
        tx
    }

    /// Marks a revenue mirror as the one of `return_id`.
    #[must_use]
    pub fn with_source_return(mut self, return_id: Uuid) -> Self {
        self.source_return_id = Some(return_id);
        self
    }

    pub fn is_system_generated(&self) -> bool {
        self.related_id.is_some()
    }

    pub fn signed_amount(&self) -> Money {
        self.kind.signed(self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub date: Date,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
    pub source_return_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            description: ActiveValue::Set(tx.description.clone()),
            date: ActiveValue::Set(tx.date),
            related_type: ActiveValue::Set(tx.related_type.map(|k| k.as_str().to_string())),
            related_id: ActiveValue::Set(tx.related_id.map(|id| id.to_string())),
            source_return_id: ActiveValue::Set(tx.source_return_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            description: model.description,
            date: model.date,
            related_type: model
                .related_type
                .as_deref()
                .map(RelatedKind::try_from)
                .transpose()?,
            related_id: parse_optional_uuid(model.related_id.as_deref(), "related")?,
            source_return_id: parse_optional_uuid(
                model.source_return_id.as_deref(),
                "investment return",
            )?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
