//! Placement fee arithmetic. Everything here is pure: the fee percentage comes from the offer,
//! never from a live client lookup, and the accounting period follows the joining date.
//! Arithmetic is checked; amounts too large for `Decimal` come back as validation errors.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Month/year bucket the revenue is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub month: u32,
    pub year: i32,
}

impl AccountingPeriod {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRecognition {
    pub billable_ctc: Decimal,
    pub recognized_revenue: Decimal,
    pub period: AccountingPeriod,
}

/// Fee percentages live in `(0, 100]`.
pub fn validate_fee_percentage(fee_percentage: Decimal) -> Result<(), ValidationError> {
    if fee_percentage <= Decimal::ZERO || fee_percentage > Decimal::ONE_HUNDRED {
        return Err(ValidationError::InvalidFeePercentage(fee_percentage));
    }
    Ok(())
}

pub fn offered_ctc(fixed_ctc: Decimal, variable_ctc: Decimal) -> Result<Decimal, ValidationError> {
    fixed_ctc
        .checked_add(variable_ctc)
        .ok_or(ValidationError::InvalidCompensation {
            field: "variable_ctc",
            requirement: "small enough to add to fixed_ctc",
            value: variable_ctc,
        })
}

/// Variable pay is never billed.
pub fn billable_ctc(fixed_ctc: Decimal) -> Decimal {
    fixed_ctc
}

pub fn recognized_revenue(
    fixed_ctc: Decimal,
    fee_percentage: Decimal,
) -> Result<Decimal, ValidationError> {
    fixed_ctc
        .checked_mul(fee_percentage)
        .and_then(|gross| gross.checked_div(Decimal::ONE_HUNDRED))
        .map(|revenue| revenue.round_dp(2).normalize())
        .ok_or(ValidationError::InvalidCompensation {
            field: "fixed_ctc",
            requirement: "small enough to apply the fee percentage to",
            value: fixed_ctc,
        })
}

pub fn recognize(
    fixed_ctc: Decimal,
    fee_percentage: Decimal,
    joining_date: NaiveDate,
) -> Result<RevenueRecognition, ValidationError> {
    Ok(RevenueRecognition {
        billable_ctc: billable_ctc(fixed_ctc),
        recognized_revenue: recognized_revenue(fixed_ctc, fee_percentage)?,
        period: AccountingPeriod::of(joining_date),
    })
}
