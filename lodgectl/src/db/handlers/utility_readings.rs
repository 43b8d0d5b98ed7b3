//! Database repository for utility meter readings.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::utility_readings::{
            UtilityReading, UtilityReadingCreateDBRequest, UtilityReadingDBResponse, UtilityReadingUpdateDBRequest, UtilityType,
        },
    },
    types::{RoomId, UtilityReadingId, abbrev_uuid},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing readings. Dates bound the reading date, inclusive.
#[derive(Debug, Clone, Default)]
pub struct UtilityReadingFilter {
    pub skip: i64,
    pub limit: i64,
    pub room_id: Option<RoomId>,
    pub utility_type: Option<UtilityType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl UtilityReadingFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(room_id) = self.room_id {
            query.push(" AND room_id = ");
            query.push_bind(room_id);
        }
        if let Some(utility_type) = self.utility_type {
            query.push(" AND utility_type = ");
            query.push_bind(utility_type);
        }
        if let Some(from) = self.from {
            query.push(" AND reading_date >= ");
            query.push_bind(from);
        }
        if let Some(to) = self.to {
            query.push(" AND reading_date <= ");
            query.push_bind(to);
        }
    }
}

pub struct UtilityReadings<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for UtilityReadings<'c> {
    type CreateRequest = UtilityReadingCreateDBRequest;
    type UpdateRequest = UtilityReadingUpdateDBRequest;
    type Response = UtilityReadingDBResponse;
    type Id = UtilityReadingId;
    type Filter = UtilityReadingFilter;

    #[instrument(skip(self, request), fields(room_id = %abbrev_uuid(&request.room_id), utility_type = ?request.utility_type), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let reading = sqlx::query_as::<_, UtilityReading>(
            r#"
            INSERT INTO utility_readings (
                id, room_id, utility_type, previous_reading, current_reading, rate_per_unit,
                reading_date, billing_period_start, billing_period_end, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.room_id)
        .bind(request.utility_type)
        .bind(request.previous_reading)
        .bind(request.current_reading)
        .bind(request.rate_per_unit)
        .bind(request.reading_date)
        .bind(request.billing_period_start)
        .bind(request.billing_period_end)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        if reading.current_reading < reading.previous_reading {
            tracing::warn!(
                reading_id = %abbrev_uuid(&reading.id),
                previous = %reading.previous_reading,
                current = %reading.current_reading,
                "Meter reading went backwards, consumption clamped to zero"
            );
        }

        Ok(reading)
    }

    #[instrument(skip(self), fields(reading_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let reading = sqlx::query_as::<_, UtilityReading>("SELECT * FROM utility_readings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(reading)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UtilityReadingId>) -> Result<HashMap<Self::Id, UtilityReadingDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let readings = sqlx::query_as::<_, UtilityReading>("SELECT * FROM utility_readings WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(readings.into_iter().map(|r| (r.id, r)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM utility_readings WHERE 1=1");
        filter.push_conditions(&mut query);

        query.push(" ORDER BY reading_date DESC, created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let readings = query.build_query_as::<UtilityReading>().fetch_all(&mut *self.db).await?;
        Ok(readings)
    }

    #[instrument(skip(self), fields(reading_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM utility_readings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(reading_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let reading = sqlx::query_as::<_, UtilityReading>(
            r#"
            UPDATE utility_readings SET
                previous_reading = COALESCE($2, previous_reading),
                current_reading = COALESCE($3, current_reading),
                rate_per_unit = COALESCE($4, rate_per_unit),
                reading_date = COALESCE($5, reading_date),
                billing_period_start = COALESCE($6, billing_period_start),
                billing_period_end = COALESCE($7, billing_period_end),
                notes = CASE WHEN $8 THEN $9 ELSE notes END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.previous_reading)
        .bind(request.current_reading)
        .bind(request.rate_per_unit)
        .bind(request.reading_date)
        .bind(request.billing_period_start)
        .bind(request.billing_period_end)
        .bind(request.notes.is_some())
        .bind(request.notes.clone().flatten())
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(reading)
    }
}

impl<'c> UtilityReadings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count readings matching the filter
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &UtilityReadingFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM utility_readings WHERE 1=1");
        filter.push_conditions(&mut query);

        let count: (i64,) = query.build_query_as().fetch_one(&mut *self.db).await?;
        Ok(count.0)
    }

    /// Every reading matching the filter, ignoring pagination
    #[instrument(skip(self, filter), err)]
    pub async fn list_unpaginated(&mut self, filter: &UtilityReadingFilter) -> Result<Vec<UtilityReading>> {
        let mut query = QueryBuilder::new("SELECT * FROM utility_readings WHERE 1=1");
        filter.push_conditions(&mut query);
        query.push(" ORDER BY reading_date ASC");

        let readings = query.build_query_as::<UtilityReading>().fetch_all(&mut *self.db).await?;
        Ok(readings)
    }

    /// The meter value a new reading continues from: the latest stored current reading for the
    /// same room and utility, or zero for a fresh meter
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&room_id)), err)]
    pub async fn latest_meter_value(&mut self, room_id: RoomId, utility_type: UtilityType) -> Result<Decimal> {
        let latest: Option<(Decimal,)> = sqlx::query_as(
            r#"
            SELECT current_reading FROM utility_readings
            WHERE room_id = $1 AND utility_type = $2
            ORDER BY reading_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(room_id)
        .bind(utility_type)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(latest.map_or(Decimal::ZERO, |(value,)| value))
    }
}
