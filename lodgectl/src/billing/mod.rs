//! Accounting rules for payments and metered utilities.
//!
//! Everything in here is pure: functions take rows already loaded by the repositories plus an
//! explicit `today`, so results are reproducible in tests and do not depend on the wall clock.
//!
//! - [`payments`]: overdue classification, receipt numbers, totals, filtering and grouping
//! - [`utilities`]: consumption and cost arithmetic and per-room summaries
//! - [`stats`]: room, boarder and dashboard aggregates

pub mod payments;
pub mod stats;
pub mod utilities;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Input that breaks an accounting rule. Always the caller's fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("OVERDUE is derived from the due date and cannot be stored")]
    OverdueNotStorable,

    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    #[error("Billing period start {start} is after its end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

pub type Result<T> = std::result::Result<T, BillingError>;

pub(crate) fn ensure_non_negative(field: &'static str, value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(BillingError::Negative { field, value });
    }
    Ok(())
}
