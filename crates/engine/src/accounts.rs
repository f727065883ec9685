//! The module contains the `Account` struct and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// A bank account or cash box where money is kept.
///
/// `balance` is a cached projection: it always equals `starting_amount` plus
/// the signed sum of the account's transactions, and only ledger operations
/// change it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    /// Free-form account type (`checking`, `savings`, `cash`, ...).
    pub kind: String,
    pub bank_name: Option<String>,
    pub balance: Money,
    pub starting_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        name: String,
        kind: String,
        bank_name: Option<String>,
        starting_amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            bank_name,
            balance: starting_amount,
            starting_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub bank_name: Option<String>,
    pub balance_minor: i64,
    pub starting_amount_minor: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            name: ActiveValue::Set(account.name.clone()),
            kind: ActiveValue::Set(account.kind.clone()),
            bank_name: ActiveValue::Set(account.bank_name.clone()),
            balance_minor: ActiveValue::Set(account.balance.cents()),
            starting_amount_minor: ActiveValue::Set(account.starting_amount.cents()),
            created_at: ActiveValue::Set(account.created_at),
            updated_at: ActiveValue::Set(account.updated_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            name: model.name,
            kind: model.kind,
            bank_name: model.bank_name,
            balance: Money::new(model.balance_minor),
            starting_amount: Money::new(model.starting_amount_minor),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
