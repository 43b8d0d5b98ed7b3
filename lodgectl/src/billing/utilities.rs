//! Metered utility arithmetic.

use super::{BillingError, Result, ensure_non_negative};
use crate::db::models::utility_readings::{UtilityReading, UtilityType};
use crate::types::RoomId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Units used between two meter readings. A meter that went backwards (replaced or misread)
/// counts as zero.
pub fn calculate_consumption(previous: Decimal, current: Decimal) -> Decimal {
    (current - previous).max(Decimal::ZERO)
}

pub fn calculate_utility_bill(previous: Decimal, current: Decimal, rate_per_unit: Decimal) -> Decimal {
    calculate_consumption(previous, current) * rate_per_unit
}

/// Checks a reading before it is written
pub fn validate_reading(
    previous: Decimal,
    current: Decimal,
    rate_per_unit: Decimal,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<()> {
    ensure_non_negative("previous_reading", previous)?;
    ensure_non_negative("current_reading", current)?;
    ensure_non_negative("rate_per_unit", rate_per_unit)?;
    if period_start > period_end {
        return Err(BillingError::InvalidPeriod {
            start: period_start,
            end: period_end,
        });
    }
    Ok(())
}

/// Consumption totals for one room and utility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConsumptionSummary {
    #[schema(value_type = String, format = "uuid")]
    pub room_id: RoomId,
    pub utility_type: UtilityType,
    pub reading_count: u64,
    #[schema(value_type = String)]
    pub total_consumption: Decimal,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
    /// Mean consumption per reading, three decimal places
    #[schema(value_type = String)]
    pub average_consumption: Decimal,
    pub latest_reading_date: NaiveDate,
}

/// Groups readings by room and utility, ordered by room id then utility type
pub fn summarize_consumption(readings: &[UtilityReading]) -> Vec<ConsumptionSummary> {
    let mut groups: BTreeMap<(RoomId, UtilityType), Vec<&UtilityReading>> = BTreeMap::new();
    for reading in readings {
        groups.entry((reading.room_id, reading.utility_type)).or_default().push(reading);
    }

    groups
        .into_iter()
        .filter_map(|((room_id, utility_type), group)| {
            let latest_reading_date = group.iter().map(|r| r.reading_date).max()?;
            let total_consumption: Decimal = group.iter().map(|r| r.consumption()).sum();
            let total_cost: Decimal = group.iter().map(|r| r.cost()).sum();
            let reading_count = group.len() as u64;
            Some(ConsumptionSummary {
                room_id,
                utility_type,
                reading_count,
                total_consumption,
                total_cost,
                average_consumption: (total_consumption / Decimal::from(reading_count)).round_dp(3),
                latest_reading_date,
            })
        })
        .collect()
}
