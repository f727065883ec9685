//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so every operation enforces the same rules.

use uuid::Uuid;

use crate::{Account, EngineError, Money, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Amounts supplied by callers must be strictly positive.
pub(crate) fn ensure_positive(amount: Money, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Returns a copy of `account` with `delta` applied to its balance.
///
/// A cached balance never goes below zero: any delta that would make it
/// negative, including the reversal of an earlier inflow, is rejected.
pub(crate) fn with_balance_delta(account: &Account, delta: Money) -> ResultEngine<Account> {
    let balance = account
        .balance
        .checked_add(delta)
        .ok_or_else(|| EngineError::Validation("balance overflow".to_string()))?;
    if balance.is_negative() {
        return Err(EngineError::InsufficientFunds(format!(
            "account '{}' has {}, needs {}",
            account.name,
            account.balance,
            -delta
        )));
    }
    let mut updated = account.clone();
    updated.balance = balance;
    Ok(updated)
}

/// Sum of `amounts`, rejected once it no longer fits a [`Money`].
pub(crate) fn sum_amounts<I>(amounts: I) -> ResultEngine<Money>
where
    I: IntoIterator<Item = Money>,
{
    Money::checked_sum(amounts)
        .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
}
