//! Revenue captured for an investment.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money,
    util::{parse_optional_uuid, parse_uuid},
};

/// Granularity the captured amount refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    #[default]
    Day,
    Week,
}

impl PeriodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl TryFrom<&str> for PeriodType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            other => Err(EngineError::Validation(format!(
                "invalid period type: {other}"
            ))),
        }
    }
}

/// A single return of an investment. Owned exclusively by its investment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentReturn {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub amount: Money,
    pub return_date: NaiveDate,
    pub period_type: PeriodType,
    pub comment: Option<String>,
    /// Account that received the money, if any.
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investment_returns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub investment_id: String,
    pub amount_minor: i64,
    pub return_date: Date,
    pub period_type: String,
    pub comment: Option<String>,
    pub account_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::investments::Entity",
        from = "Column::InvestmentId",
        to = "super::investments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Investment,
}

impl Related<super::investments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Investment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InvestmentReturn> for ActiveModel {
    fn from(ret: &InvestmentReturn) -> Self {
        Self {
            id: ActiveValue::Set(ret.id.to_string()),
            investment_id: ActiveValue::Set(ret.investment_id.to_string()),
            amount_minor: ActiveValue::Set(ret.amount.cents()),
            return_date: ActiveValue::Set(ret.return_date),
            period_type: ActiveValue::Set(ret.period_type.as_str().to_string()),
            comment: ActiveValue::Set(ret.comment.clone()),
            account_id: ActiveValue::Set(ret.account_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(ret.created_at),
            updated_at: ActiveValue::Set(ret.updated_at),
        }
    }
}

impl TryFrom<Model> for InvestmentReturn {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "investment return")?,
            investment_id: parse_uuid(&model.investment_id, "investment")?,
            amount: Money::new(model.amount_minor),
            return_date: model.return_date,
            period_type: PeriodType::try_from(model.period_type.as_str())?,
            comment: model.comment,
            account_id: parse_optional_uuid(model.account_id.as_deref(), "account")?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
