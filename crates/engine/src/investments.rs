//! Investments and their storage model.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

/// Capital put into something expected to produce returns.
///
/// `amount` is the original capital and the cost basis used by the metrics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub amount: Money,
    pub purchase_date: NaiveDate,
    /// Account the capital was taken from, if any.
    pub account_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An investment together with the aggregate of its returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    pub investment: Investment,
    pub total_returns: Money,
    pub returns_count: u64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub amount_minor: i64,
    pub purchase_date: Date,
    pub account_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::investment_returns::Entity")]
    Returns,
}

impl Related<super::investment_returns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Returns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Investment> for ActiveModel {
    fn from(investment: &Investment) -> Self {
        Self {
            id: ActiveValue::Set(investment.id.to_string()),
            name: ActiveValue::Set(investment.name.clone()),
            kind: ActiveValue::Set(investment.kind.clone()),
            amount_minor: ActiveValue::Set(investment.amount.cents()),
            purchase_date: ActiveValue::Set(investment.purchase_date),
            account_id: ActiveValue::Set(investment.account_id.map(|id| id.to_string())),
            notes: ActiveValue::Set(investment.notes.clone()),
            created_at: ActiveValue::Set(investment.created_at),
            updated_at: ActiveValue::Set(investment.updated_at),
        }
    }
}

impl TryFrom<Model> for Investment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "investment")?,
            name: model.name,
            kind: model.kind,
            amount: Money::new(model.amount_minor),
            purchase_date: model.purchase_date,
            account_id: parse_optional_uuid(model.account_id.as_deref(), "account")?,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
