//! Derived investment metrics.
//!
//! Everything here is pure: the inputs are rows already read from the store
//! and the current date, so the same inputs always yield the same output.
//! Totals that no longer fit a [`Money`] are reported as validation errors.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Expense, Investment, InvestmentReturn, Money, ResultEngine, util::sum_amounts};

/// A calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day().and_then(|d| d.pred_opt())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: Month,
    pub expenses: Money,
    pub revenue: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenPoint {
    pub month: Month,
    pub cumulative_returns: Money,
    /// `0..=100`, two decimals.
    pub percentage_to_break_even: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEvenAnalysis {
    pub progression: Vec<BreakEvenPoint>,
    pub break_even_month: Option<Month>,
    /// 1-based position of `break_even_month` in the series.
    pub break_even_month_number: Option<u32>,
    /// Calendar days from the purchase date through the last day of the
    /// break-even month, both ends included.
    pub break_even_days: Option<i64>,
    pub is_profitable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentMetrics {
    pub investment_id: Uuid,
    pub total_cost: Money,
    pub total_returns: Money,
    pub net_profit: Money,
    /// Percent, two decimals. Zero when there is no cost.
    pub roi: Decimal,
    pub monthly_series: Vec<MonthlyPoint>,
    pub break_even: BreakEvenAnalysis,
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// `part / whole * 100`, rounded to two decimals. Zero for a non-positive
/// `whole`.
fn percentage(part: Money, whole: Money) -> Decimal {
    if !whole.is_positive() {
        return Decimal::ZERO;
    }
    (part.to_decimal() / whole.to_decimal() * HUNDRED).round_dp(2)
}

/// Months from `start` through `end`, inclusive. A single month when `end`
/// is not after `start`.
fn months_between(start: Month, end: Month) -> Vec<Month> {
    let mut months = vec![start];
    let mut current = start;
    while current < end {
        current = current.next();
        months.push(current);
    }
    months
}

/// Buckets amounts into the series. Dates outside the series range are
/// clamped into its first or last month, so the series always sums to the
/// totals.
fn bucket_index(months: &[Month], date: NaiveDate) -> usize {
    let month = Month::of(date);
    match months.binary_search(&month) {
        Ok(index) => index,
        Err(0) => 0,
        Err(_) => months.len() - 1,
    }
}

/// Builds the monthly series from the purchase month through `today`'s month.
pub fn monthly_series(
    purchase_date: NaiveDate,
    returns: &[InvestmentReturn],
    expenses: &[Expense],
    today: NaiveDate,
) -> ResultEngine<Vec<MonthlyPoint>> {
    let months = months_between(Month::of(purchase_date), Month::of(today));
    let mut series: Vec<MonthlyPoint> = months
        .iter()
        .map(|month| MonthlyPoint {
            month: *month,
            expenses: Money::ZERO,
            revenue: Money::ZERO,
        })
        .collect();
    for ret in returns {
        let point = &mut series[bucket_index(&months, ret.return_date)];
        point.revenue = sum_amounts([point.revenue, ret.amount])?;
    }
    for expense in expenses {
        let point = &mut series[bucket_index(&months, expense.date)];
        point.expenses = sum_amounts([point.expenses, expense.amount])?;
    }
    Ok(series)
}

/// Walks the series accumulating returns until they cover `total_cost`.
pub fn break_even(
    purchase_date: NaiveDate,
    series: &[MonthlyPoint],
    total_cost: Money,
    total_returns: Money,
) -> ResultEngine<BreakEvenAnalysis> {
    let mut cumulative = Money::ZERO;
    let mut progression = Vec::with_capacity(series.len());
    let mut reached: Option<(usize, Month)> = None;

    for (index, point) in series.iter().enumerate() {
        cumulative = sum_amounts([cumulative, point.revenue])?;
        progression.push(BreakEvenPoint {
            month: point.month,
            cumulative_returns: cumulative,
            percentage_to_break_even: percentage(cumulative, total_cost).min(HUNDRED),
        });
        if reached.is_none() && total_cost.is_positive() && cumulative >= total_cost {
            reached = Some((index, point.month));
        }
    }

    let break_even_days = reached
        .and_then(|(_, month)| month.last_day())
        .map(|end| (end - purchase_date).num_days() + 1);

    Ok(BreakEvenAnalysis {
        progression,
        break_even_month: reached.map(|(_, month)| month),
        break_even_month_number: reached.and_then(|(index, _)| u32::try_from(index + 1).ok()),
        break_even_days,
        is_profitable: total_returns >= total_cost,
    })
}

/// Computes every metric of an investment.
pub fn investment_metrics(
    investment: &Investment,
    returns: &[InvestmentReturn],
    expenses: &[Expense],
    today: NaiveDate,
) -> ResultEngine<InvestmentMetrics> {
    let total_cost =
        sum_amounts(std::iter::once(investment.amount).chain(expenses.iter().map(|e| e.amount)))?;
    let total_returns = sum_amounts(returns.iter().map(|r| r.amount))?;
    let series = monthly_series(investment.purchase_date, returns, expenses, today)?;
    let break_even = break_even(investment.purchase_date, &series, total_cost, total_returns)?;

    Ok(InvestmentMetrics {
        investment_id: investment.id,
        total_cost,
        total_returns,
        net_profit: total_returns - total_cost,
        roi: percentage(total_returns, total_cost),
        monthly_series: series,
        break_even,
    })
}
