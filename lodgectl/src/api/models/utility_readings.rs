//! API request/response models for utility meter readings.

use super::pagination::Pagination;
use crate::billing::utilities::validate_reading;
use crate::db::handlers::utility_readings::UtilityReadingFilter;
use crate::db::models::utility_readings::{
    UtilityReadingCreateDBRequest, UtilityReadingDBResponse, UtilityReadingUpdateDBRequest, UtilityType,
};
use crate::errors::Result;
use crate::format::format_currency;
use crate::types::{RoomId, UtilityReadingId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing readings
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUtilityReadingsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,

    pub utility_type: Option<UtilityType>,

    /// Earliest reading date, inclusive
    pub from: Option<NaiveDate>,

    /// Latest reading date, inclusive
    pub to: Option<NaiveDate>,
}

impl ListUtilityReadingsQuery {
    pub fn filter(&self) -> UtilityReadingFilter {
        UtilityReadingFilter {
            room_id: self.room_id,
            utility_type: self.utility_type,
            from: self.from,
            to: self.to,
            ..UtilityReadingFilter::new(self.pagination.skip(), self.pagination.limit())
        }
    }
}

/// Query parameters for the consumption summary. Without filters every reading is summarised.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ConsumptionQuery {
    #[param(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,
    pub utility_type: Option<UtilityType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ConsumptionQuery {
    pub fn filter(&self) -> UtilityReadingFilter {
        UtilityReadingFilter {
            room_id: self.room_id,
            utility_type: self.utility_type,
            from: self.from,
            to: self.to,
            ..Default::default()
        }
    }
}

/// Request body for recording a reading
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UtilityReadingCreate {
    #[schema(value_type = String, format = "uuid")]
    pub room_id: RoomId,
    pub utility_type: UtilityType,
    /// Defaults to the latest current reading for this room and utility (zero for a new meter)
    #[schema(value_type = Option<String>, example = "100")]
    pub previous_reading: Option<Decimal>,
    #[schema(value_type = String, example = "150")]
    pub current_reading: Decimal,
    #[schema(value_type = String, example = "12.50")]
    pub rate_per_unit: Decimal,
    /// Defaults to today
    pub reading_date: Option<NaiveDate>,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub notes: Option<String>,
}

impl UtilityReadingCreate {
    /// Validates against the resolved previous reading and builds the insert
    pub fn into_db_request(self, previous_reading: Decimal, today: NaiveDate) -> Result<UtilityReadingCreateDBRequest> {
        validate_reading(
            previous_reading,
            self.current_reading,
            self.rate_per_unit,
            self.billing_period_start,
            self.billing_period_end,
        )?;

        Ok(UtilityReadingCreateDBRequest::builder()
            .room_id(self.room_id)
            .utility_type(self.utility_type)
            .previous_reading(previous_reading)
            .current_reading(self.current_reading)
            .rate_per_unit(self.rate_per_unit)
            .reading_date(self.reading_date.unwrap_or(today))
            .billing_period_start(self.billing_period_start)
            .billing_period_end(self.billing_period_end)
            .maybe_notes(self.notes)
            .build())
    }
}

/// Request body for correcting a reading. Only provided fields change; `null` notes are cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UtilityReadingUpdate {
    #[schema(value_type = Option<String>)]
    pub previous_reading: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub current_reading: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub rate_per_unit: Option<Decimal>,
    pub reading_date: Option<NaiveDate>,
    pub billing_period_start: Option<NaiveDate>,
    pub billing_period_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

impl UtilityReadingUpdate {
    /// Validates the update merged over the stored reading
    pub fn validate_against(&self, existing: &UtilityReadingDBResponse) -> Result<()> {
        validate_reading(
            self.previous_reading.unwrap_or(existing.previous_reading),
            self.current_reading.unwrap_or(existing.current_reading),
            self.rate_per_unit.unwrap_or(existing.rate_per_unit),
            self.billing_period_start.unwrap_or(existing.billing_period_start),
            self.billing_period_end.unwrap_or(existing.billing_period_end),
        )?;
        Ok(())
    }
}

impl From<UtilityReadingUpdate> for UtilityReadingUpdateDBRequest {
    fn from(update: UtilityReadingUpdate) -> Self {
        Self {
            previous_reading: update.previous_reading,
            current_reading: update.current_reading,
            rate_per_unit: update.rate_per_unit,
            reading_date: update.reading_date,
            billing_period_start: update.billing_period_start,
            billing_period_end: update.billing_period_end,
            notes: update.notes,
        }
    }
}

/// Reading details with the derived consumption and cost
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UtilityReadingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UtilityReadingId,
    #[schema(value_type = String, format = "uuid")]
    pub room_id: RoomId,
    pub utility_type: UtilityType,
    #[schema(value_type = String)]
    pub previous_reading: Decimal,
    #[schema(value_type = String)]
    pub current_reading: Decimal,
    #[schema(value_type = String)]
    pub rate_per_unit: Decimal,
    /// Units used, never negative
    #[schema(value_type = String)]
    pub consumption: Decimal,
    #[schema(value_type = String)]
    pub cost: Decimal,
    pub cost_display: String,
    pub reading_date: NaiveDate,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UtilityReadingResponse {
    pub fn from_db(db: UtilityReadingDBResponse, currency: &str) -> Self {
        let consumption = db.consumption();
        let cost = db.cost();
        Self {
            id: db.id,
            room_id: db.room_id,
            utility_type: db.utility_type,
            previous_reading: db.previous_reading,
            current_reading: db.current_reading,
            rate_per_unit: db.rate_per_unit,
            consumption,
            cost,
            cost_display: format_currency(cost, currency),
            reading_date: db.reading_date,
            billing_period_start: db.billing_period_start,
            billing_period_end: db.billing_period_end,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
