//! Database models for utility meter readings.

use crate::billing::utilities;
use crate::types::{RoomId, UtilityReadingId};
use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metered utility, stored as TEXT in database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UtilityType {
    Electricity,
    Water,
    Internet,
}

/// Database representation of a meter snapshot for one room and utility
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UtilityReading {
    pub id: UtilityReadingId,
    pub room_id: RoomId,
    pub utility_type: UtilityType,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub rate_per_unit: Decimal,
    pub reading_date: NaiveDate,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UtilityReading {
    pub fn consumption(&self) -> Decimal {
        utilities::calculate_consumption(self.previous_reading, self.current_reading)
    }

    pub fn cost(&self) -> Decimal {
        utilities::calculate_utility_bill(self.previous_reading, self.current_reading, self.rate_per_unit)
    }
}

/// Request to record a new reading
#[derive(Debug, Clone, Builder)]
pub struct UtilityReadingCreateDBRequest {
    pub room_id: RoomId,
    pub utility_type: UtilityType,
    pub previous_reading: Decimal,
    pub current_reading: Decimal,
    pub rate_per_unit: Decimal,
    pub reading_date: NaiveDate,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub notes: Option<String>,
}

/// Request to correct an existing reading. `notes` is tri-state: `Some(None)` clears them.
#[derive(Debug, Clone, Default)]
pub struct UtilityReadingUpdateDBRequest {
    pub previous_reading: Option<Decimal>,
    pub current_reading: Option<Decimal>,
    pub rate_per_unit: Option<Decimal>,
    pub reading_date: Option<NaiveDate>,
    pub billing_period_start: Option<NaiveDate>,
    pub billing_period_end: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

pub type UtilityReadingDBResponse = UtilityReading;
