use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

/// Money spent by the business.
///
/// `investment_id` is a weak attribution used by the metrics: it adds the
/// expense to the investment's total cost, nothing more.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub account_id: Option<Uuid>,
    pub investment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount_minor: i64,
    pub date: Date,
    pub account_id: Option<String>,
    pub investment_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            category: ActiveValue::Set(expense.category.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            date: ActiveValue::Set(expense.date),
            account_id: ActiveValue::Set(expense.account_id.map(|id| id.to_string())),
            investment_id: ActiveValue::Set(expense.investment_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            description: model.description,
            category: model.category,
            amount: Money::new(model.amount_minor),
            date: model.date,
            account_id: parse_optional_uuid(model.account_id.as_deref(), "account")?,
            investment_id: parse_optional_uuid(model.investment_id.as_deref(), "investment")?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
