// Input validation for the expense form
// Pure checks: required fields, then date format, then amount

use crate::error::{LedgerError, Result};
use crate::model::NewExpense;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate raw form input into a `NewExpense`.
///
/// Checks run in a fixed order and only the first failure is reported:
/// 1. date, category and amount must be non-blank
/// 2. date must be a real calendar date written as `YYYY-MM-DD`
/// 3. amount must parse as a finite number greater than zero
///
/// Date, category and amount are trimmed before checking, so a whitespace-only
/// category counts as missing and ` 2024-03-01 ` is stored as `2024-03-01`.
/// Notes are kept exactly as typed.
pub fn validate_expense(date: &str, category: &str, amount: &str, notes: &str) -> Result<NewExpense> {
    let date = date.trim();
    let category = category.trim();
    let amount_str = amount.trim();

    for (field, value) in [("date", date), ("category", category), ("amount", amount_str)] {
        if value.is_empty() {
            return Err(LedgerError::MissingRequiredField { field });
        }
    }

    validate_date(date)?;
    let amount = parse_amount(amount_str)?;

    Ok(NewExpense::from_checked(
        date.to_string(),
        category.to_string(),
        amount,
        notes.to_string(),
    ))
}

/// Accept only zero-padded `YYYY-MM-DD` strings naming a real date.
///
/// chrono alone would also take `2024-3-1`; stored dates must stay fixed-width
/// so that text ordering is date ordering.
pub fn validate_date(value: &str) -> Result<NaiveDate> {
    let invalid = || LedgerError::InvalidDateFormat {
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

/// Parse a positive, finite amount.
pub fn parse_amount(value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(LedgerError::InvalidAmount {
            value: value.to_string(),
        }),
    }
}
