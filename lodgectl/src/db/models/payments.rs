//! Database models for payments.

use crate::types::{BoarderId, PaymentId};
use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What a payment is for, stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Rent,
    Utility,
    Deposit,
    Other,
}

/// Payment status.
///
/// Only `Pending`, `Paid` and `Cancelled` are ever written to the database. `Overdue` is a display
/// state computed from the due date of a pending payment (see [`crate::billing::payments::display_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    /// Paid and cancelled payments are never reclassified
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Cancelled)
    }

    pub fn is_storable(self) -> bool {
        self != PaymentStatus::Overdue
    }
}

/// Database representation of a payment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub boarder_id: BoarderId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub receipt_number: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new payment
#[derive(Debug, Clone, Builder)]
pub struct PaymentCreateDBRequest {
    pub boarder_id: BoarderId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    #[builder(default = PaymentStatus::Pending)]
    pub status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub receipt_number: Option<String>,
    pub description: Option<String>,
}

/// Request to edit a pending payment.
///
/// Status changes go through [`mark_paid`](crate::db::handlers::Payments::mark_paid) and
/// [`cancel`](crate::db::handlers::Payments::cancel). `description` is tri-state: `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdateDBRequest {
    pub amount: Option<Decimal>,
    pub payment_type: Option<PaymentType>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
}

/// Response from database after creating or updating a payment
pub type PaymentDBResponse = Payment;
