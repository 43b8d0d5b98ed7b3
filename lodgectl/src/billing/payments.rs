//! Payment classification and aggregation.

use super::{BillingError, Result};
use crate::access::random_code;
use crate::db::models::payments::{Payment, PaymentStatus, PaymentType};
use crate::types::BoarderId;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const DEFAULT_RECEIPT_PREFIX: &str = "RCP";
const RECEIPT_SUFFIX_LENGTH: usize = 6;

/// The status a payment is shown with.
///
/// A pending payment whose due date has passed reads as `Overdue`. Stored `Paid` and `Cancelled`
/// are terminal and returned as-is.
pub fn display_status(stored: PaymentStatus, due_date: NaiveDate, today: NaiveDate) -> PaymentStatus {
    match stored {
        PaymentStatus::Pending if due_date < today => PaymentStatus::Overdue,
        other => other,
    }
}

pub fn is_overdue(stored: PaymentStatus, due_date: NaiveDate, today: NaiveDate) -> bool {
    display_status(stored, due_date, today) == PaymentStatus::Overdue
}

/// Whole days past the due date, or 0 when the payment is not overdue
pub fn days_overdue(stored: PaymentStatus, due_date: NaiveDate, today: NaiveDate) -> i64 {
    if is_overdue(stored, due_date, today) {
        (today - due_date).num_days()
    } else {
        0
    }
}

/// Rejects statuses that may not be written to the database
pub fn ensure_storable(status: PaymentStatus) -> Result<()> {
    if status.is_storable() {
        Ok(())
    } else {
        Err(BillingError::OverdueNotStorable)
    }
}

pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositiveAmount(amount));
    }
    Ok(())
}

/// Builds a receipt number such as `RCP-20240115-K7QW2M`.
pub fn generate_receipt_number(prefix: &str, paid_on: NaiveDate) -> String {
    format!(
        "{prefix}-{}-{}",
        paid_on.format("%Y%m%d"),
        random_code(RECEIPT_SUFFIX_LENGTH)
    )
}

/// Rent plus utilities plus other fees, less a discount. Never below zero.
pub fn calculate_total_payment(rent: Decimal, utilities: Decimal, other_fees: Decimal, discount: Decimal) -> Decimal {
    (rent + utilities + other_fees - discount).max(Decimal::ZERO)
}

/// `YYYY-MM` bucket for a due date
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// In-memory payment filter. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    /// Compared against the display status, so `Overdue` works here
    pub status: Option<PaymentStatus>,
    pub payment_type: Option<PaymentType>,
    pub boarder_id: Option<BoarderId>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Case-insensitive match on description and receipt number
    pub search: Option<String>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment, today: NaiveDate) -> bool {
        if let Some(status) = self.status
            && display_status(payment.status, payment.due_date, today) != status
        {
            return false;
        }
        if self.payment_type.is_some_and(|t| t != payment.payment_type) {
            return false;
        }
        if self.boarder_id.is_some_and(|b| b != payment.boarder_id) {
            return false;
        }
        if self.due_from.is_some_and(|from| payment.due_date < from) {
            return false;
        }
        if self.due_to.is_some_and(|to| payment.due_date > to) {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [payment.description.as_deref(), payment.receipt_number.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

pub fn filter_payments<'a>(payments: &'a [Payment], filter: &PaymentFilter, today: NaiveDate) -> Vec<&'a Payment> {
    payments.iter().filter(|p| filter.matches(p, today)).collect()
}

/// Partitions payments by the month of their due date
pub fn group_payments_by_month(payments: &[Payment]) -> BTreeMap<String, Vec<Payment>> {
    let mut groups: BTreeMap<String, Vec<Payment>> = BTreeMap::new();
    for payment in payments {
        groups.entry(month_key(payment.due_date)).or_default().push(payment.clone());
    }
    groups
}

/// Partitions payments by display status
pub fn group_payments_by_status(payments: &[Payment], today: NaiveDate) -> BTreeMap<PaymentStatus, Vec<Payment>> {
    let mut groups: BTreeMap<PaymentStatus, Vec<Payment>> = BTreeMap::new();
    for payment in payments {
        groups
            .entry(display_status(payment.status, payment.due_date, today))
            .or_default()
            .push(payment.clone());
    }
    groups
}

/// Count and sum for one display status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusTotal {
    pub count: u64,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

impl StatusTotal {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentStats {
    pub total_count: u64,
    /// Everything billed, cancelled payments excluded
    #[schema(value_type = String)]
    pub total_billed: Decimal,
    pub pending: StatusTotal,
    pub paid: StatusTotal,
    pub overdue: StatusTotal,
    pub cancelled: StatusTotal,
    /// Pending plus overdue
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    /// Paid as a percentage of billed, two decimal places
    #[schema(value_type = String)]
    pub collection_rate: Decimal,
}

pub fn summarize_payments(payments: &[Payment], today: NaiveDate) -> PaymentStats {
    let mut stats = PaymentStats::default();
    for payment in payments {
        stats.total_count += 1;
        match display_status(payment.status, payment.due_date, today) {
            PaymentStatus::Pending => stats.pending.add(payment.amount),
            PaymentStatus::Paid => stats.paid.add(payment.amount),
            PaymentStatus::Overdue => stats.overdue.add(payment.amount),
            PaymentStatus::Cancelled => stats.cancelled.add(payment.amount),
        }
    }
    stats.outstanding = stats.pending.amount + stats.overdue.amount;
    stats.total_billed = stats.outstanding + stats.paid.amount;
    stats.collection_rate = percentage(stats.paid.amount, stats.total_billed);
    stats
}

/// Billed, collected and outstanding amounts for one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub payment_count: u64,
    #[schema(value_type = String)]
    pub billed: Decimal,
    #[schema(value_type = String)]
    pub collected: Decimal,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
}

/// Per-month totals in ascending month order. Cancelled payments are not billed.
pub fn monthly_totals(payments: &[Payment]) -> Vec<MonthlyTotal> {
    group_payments_by_month(payments)
        .into_iter()
        .map(|(month, group)| {
            let mut total = MonthlyTotal {
                month,
                payment_count: group.len() as u64,
                billed: Decimal::ZERO,
                collected: Decimal::ZERO,
                outstanding: Decimal::ZERO,
            };
            for payment in &group {
                match payment.status {
                    PaymentStatus::Paid => {
                        total.billed += payment.amount;
                        total.collected += payment.amount;
                    }
                    PaymentStatus::Pending | PaymentStatus::Overdue => {
                        total.billed += payment.amount;
                        total.outstanding += payment.amount;
                    }
                    PaymentStatus::Cancelled => {}
                }
            }
            total
        })
        .collect()
}

/// Money collected in the month containing `today`, by paid date
pub fn collected_in_month(payments: &[Payment], today: NaiveDate) -> Decimal {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .filter_map(|p| p.paid_date.map(|d| (d, p.amount)))
        .filter(|(d, _)| d.year() == today.year() && d.month() == today.month())
        .map(|(_, amount)| amount)
        .sum()
}

pub(crate) fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp(2)
}
