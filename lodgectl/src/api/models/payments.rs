//! API request/response models for payments.

use super::pagination::Pagination;
use crate::billing::payments::{self as billing, MonthlyTotal, PaymentFilter};
use crate::db::models::payments::{PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus, PaymentType, PaymentUpdateDBRequest};
use crate::errors::Result;
use crate::format::{format_currency, format_month_key};
use crate::types::{BoarderId, PaymentId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing payments
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListPaymentsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Display status; OVERDUE selects pending payments past their due date
    pub status: Option<PaymentStatus>,

    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,

    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub boarder_id: Option<BoarderId>,

    /// Earliest due date, inclusive
    pub due_from: Option<NaiveDate>,

    /// Latest due date, inclusive
    pub due_to: Option<NaiveDate>,

    /// Case-insensitive substring match on description or receipt number
    pub search: Option<String>,
}

impl ListPaymentsQuery {
    pub fn criteria(&self) -> PaymentFilter {
        PaymentFilter {
            status: self.status,
            payment_type: self.payment_type,
            boarder_id: self.boarder_id,
            due_from: self.due_from,
            due_to: self.due_to,
            search: self.search.clone(),
        }
    }
}

/// Query parameters for a boarder's own payments on the portal
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PortalPaymentsQuery {
    /// Display status; OVERDUE selects pending payments past their due date
    pub status: Option<PaymentStatus>,
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
}

impl PortalPaymentsQuery {
    pub fn criteria(&self, boarder_id: BoarderId) -> PaymentFilter {
        PaymentFilter {
            status: self.status,
            payment_type: self.payment_type,
            boarder_id: Some(boarder_id),
            ..Default::default()
        }
    }
}

/// Request body for recording a charge
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentCreate {
    #[schema(value_type = String, format = "uuid")]
    pub boarder_id: BoarderId,
    #[schema(value_type = String, example = "5000.00")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// PENDING (default), PAID or CANCELLED. OVERDUE is derived and rejected here.
    pub status: Option<PaymentStatus>,
    pub due_date: NaiveDate,
    /// For payments recorded as already paid; defaults to today
    pub paid_date: Option<NaiveDate>,
    /// For payments recorded as already paid; generated when absent
    pub receipt_number: Option<String>,
    pub description: Option<String>,
}

impl PaymentCreate {
    pub fn validate(&self) -> Result<()> {
        billing::validate_amount(self.amount)?;
        if let Some(status) = self.status {
            billing::ensure_storable(status)?;
        }
        Ok(())
    }

    /// Builds the insert. Payments recorded as PAID get a paid date and receipt number.
    pub fn into_db_request(self, today: NaiveDate, receipt_prefix: &str) -> PaymentCreateDBRequest {
        let status = self.status.unwrap_or(PaymentStatus::Pending);
        let (paid_date, receipt_number) = if status == PaymentStatus::Paid {
            let paid_date = self.paid_date.unwrap_or(today);
            let receipt = self
                .receipt_number
                .unwrap_or_else(|| billing::generate_receipt_number(receipt_prefix, paid_date));
            (Some(paid_date), Some(receipt))
        } else {
            (None, None)
        };

        PaymentCreateDBRequest::builder()
            .boarder_id(self.boarder_id)
            .amount(self.amount)
            .payment_type(self.payment_type)
            .status(status)
            .due_date(self.due_date)
            .maybe_paid_date(paid_date)
            .maybe_receipt_number(receipt_number)
            .maybe_description(self.description)
            .build()
    }
}

/// Request body for editing a pending payment. Only provided fields change; a `null` description
/// clears it.
///
/// Status is not editable here: use `mark-paid` and `cancel`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PaymentUpdate {
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub payment_type: Option<PaymentType>,
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl PaymentUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            billing::validate_amount(amount)?;
        }
        Ok(())
    }
}

impl From<PaymentUpdate> for PaymentUpdateDBRequest {
    fn from(update: PaymentUpdate) -> Self {
        Self {
            amount: update.amount,
            payment_type: update.payment_type,
            due_date: update.due_date,
            description: update.description,
        }
    }
}

/// Request body for settling a payment
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MarkPaidRequest {
    /// Defaults to today
    pub paid_date: Option<NaiveDate>,
}

/// Query parameters for payment statistics
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentStatsQuery {
    /// Restrict to one boarder
    #[param(value_type = Option<String>, format = "uuid")]
    pub boarder_id: Option<BoarderId>,
}

/// Inputs for the total payment calculator. Missing components count as zero.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculateTotalRequest {
    #[schema(value_type = String, example = "5000")]
    pub rent: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "850")]
    pub utilities: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "0")]
    pub other_fees: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "200")]
    pub discount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalculateTotalResponse {
    /// Rent + utilities + other fees - discount, never below zero
    #[schema(value_type = String)]
    pub total: Decimal,
    pub total_display: String,
}

impl CalculateTotalRequest {
    pub fn calculate(&self, currency: &str) -> CalculateTotalResponse {
        let total = billing::calculate_total_payment(self.rent, self.utilities, self.other_fees, self.discount);
        CalculateTotalResponse {
            total,
            total_display: format_currency(total, currency),
        }
    }
}

/// Payment details returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String, format = "uuid")]
    pub boarder_id: BoarderId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub amount_display: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    /// Status as stored: PENDING, PAID or CANCELLED
    pub status: PaymentStatus,
    /// Status to show: a pending payment past its due date reads OVERDUE
    pub display_status: PaymentStatus,
    pub days_overdue: i64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub receipt_number: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentResponse {
    pub fn from_db(db: PaymentDBResponse, today: NaiveDate, currency: &str) -> Self {
        Self {
            id: db.id,
            boarder_id: db.boarder_id,
            amount_display: format_currency(db.amount, currency),
            amount: db.amount,
            payment_type: db.payment_type,
            display_status: billing::display_status(db.status, db.due_date, today),
            days_overdue: billing::days_overdue(db.status, db.due_date, today),
            status: db.status,
            due_date: db.due_date,
            paid_date: db.paid_date,
            receipt_number: db.receipt_number,
            description: db.description,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Totals for one calendar month
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTotalResponse {
    /// `YYYY-MM`
    pub month: String,
    /// e.g. `January 2024`
    pub label: String,
    pub payment_count: u64,
    #[schema(value_type = String)]
    pub billed: Decimal,
    #[schema(value_type = String)]
    pub collected: Decimal,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
}

impl From<MonthlyTotal> for MonthlyTotalResponse {
    fn from(total: MonthlyTotal) -> Self {
        Self {
            label: format_month_key(&total.month),
            month: total.month,
            payment_count: total.payment_count,
            billed: total.billed,
            collected: total.collected,
            outstanding: total.outstanding,
        }
    }
}
