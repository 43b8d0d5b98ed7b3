use crate::{
    AppState,
    api::{
        handlers::today,
        models::{
            pagination::PaginatedResponse,
            utility_readings::{
                ConsumptionQuery, ListUtilityReadingsQuery, UtilityReadingCreate, UtilityReadingResponse, UtilityReadingUpdate,
            },
        },
    },
    billing::utilities::{ConsumptionSummary, summarize_consumption},
    db::handlers::{Repository, Rooms, UtilityReadings},
    errors::{Error, Result},
    types::UtilityReadingId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

fn not_found(id: UtilityReadingId) -> Error {
    Error::NotFound {
        resource: "Utility reading".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/utility-readings",
    tag = "utility-readings",
    summary = "List utility readings",
    params(ListUtilityReadingsQuery),
    responses(
        (status = 200, description = "Paginated list of readings, newest first", body = PaginatedResponse<UtilityReadingResponse>),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn list_utility_readings(
    State(state): State<AppState>,
    Query(query): Query<ListUtilityReadingsQuery>,
) -> Result<Json<PaginatedResponse<UtilityReadingResponse>>> {
    let filter = query.filter();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = UtilityReadings::new(&mut conn);
    let readings = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = readings
        .into_iter()
        .map(|r| UtilityReadingResponse::from_db(r, &state.config.currency))
        .collect();
    Ok(Json(PaginatedResponse::new(data, total_count, filter.skip, filter.limit)))
}

/// Record a meter reading.
///
/// Without a previous reading the meter continues from the latest reading for the same room and
/// utility, or from zero for a fresh meter.
#[utoipa::path(
    post,
    path = "/utility-readings",
    tag = "utility-readings",
    summary = "Create utility reading",
    request_body = UtilityReadingCreate,
    responses(
        (status = 201, description = "Reading recorded", body = UtilityReadingResponse),
        (status = 400, description = "Negative values or reversed billing period"),
        (status = 404, description = "Room not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn create_utility_reading(
    State(state): State<AppState>,
    Json(request): Json<UtilityReadingCreate>,
) -> Result<(StatusCode, Json<UtilityReadingResponse>)> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Rooms::new(&mut tx).get_by_id(request.room_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "Room".to_string(),
            id: request.room_id.to_string(),
        });
    }

    let mut repo = UtilityReadings::new(&mut tx);
    let previous = match request.previous_reading {
        Some(previous) => previous,
        None => repo.latest_meter_value(request.room_id, request.utility_type).await?,
    };
    let db_request = request.into_db_request(previous, today())?;
    let reading = repo.create(&db_request).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((
        StatusCode::CREATED,
        Json(UtilityReadingResponse::from_db(reading, &state.config.currency)),
    ))
}

#[utoipa::path(
    get,
    path = "/utility-readings/{id}",
    tag = "utility-readings",
    summary = "Get utility reading",
    params(("id" = uuid::Uuid, Path, description = "Reading ID")),
    responses(
        (status = 200, description = "Reading details", body = UtilityReadingResponse),
        (status = 404, description = "Reading not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_utility_reading(State(state): State<AppState>, Path(id): Path<UtilityReadingId>) -> Result<Json<UtilityReadingResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reading = UtilityReadings::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(UtilityReadingResponse::from_db(reading, &state.config.currency)))
}

/// Correct a reading. The merged values are validated before anything is written.
#[utoipa::path(
    patch,
    path = "/utility-readings/{id}",
    tag = "utility-readings",
    summary = "Update utility reading",
    params(("id" = uuid::Uuid, Path, description = "Reading ID")),
    request_body = UtilityReadingUpdate,
    responses(
        (status = 200, description = "Reading updated", body = UtilityReadingResponse),
        (status = 400, description = "Negative values or reversed billing period"),
        (status = 404, description = "Reading not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn update_utility_reading(
    State(state): State<AppState>,
    Path(id): Path<UtilityReadingId>,
    Json(request): Json<UtilityReadingUpdate>,
) -> Result<Json<UtilityReadingResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = UtilityReadings::new(&mut tx);

    let existing = repo.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
    request.validate_against(&existing)?;
    let reading = repo.update(id, &request.into()).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Json(UtilityReadingResponse::from_db(reading, &state.config.currency)))
}

#[utoipa::path(
    delete,
    path = "/utility-readings/{id}",
    tag = "utility-readings",
    summary = "Delete utility reading",
    params(("id" = uuid::Uuid, Path, description = "Reading ID")),
    responses(
        (status = 204, description = "Reading deleted"),
        (status = 404, description = "Reading not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn delete_utility_reading(State(state): State<AppState>, Path(id): Path<UtilityReadingId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if UtilityReadings::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// Consumption and cost totals per room and utility.
#[utoipa::path(
    get,
    path = "/utility-readings/consumption-summary",
    tag = "utility-readings",
    summary = "Consumption summary",
    params(ConsumptionQuery),
    responses(
        (status = 200, description = "Totals per room and utility", body = [ConsumptionSummary]),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_consumption_summary(
    State(state): State<AppState>,
    Query(query): Query<ConsumptionQuery>,
) -> Result<Json<Vec<ConsumptionSummary>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let readings = UtilityReadings::new(&mut conn).list_unpaginated(&query.filter()).await?;
    Ok(Json(summarize_consumption(&readings)))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use crate::api::models::utility_readings::UtilityReadingResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use sqlx::PgPool;

    fn reading_json(room_id: uuid::Uuid, current: &str) -> serde_json::Value {
        json!({
            "room_id": room_id,
            "utility_type": "ELECTRICITY",
            "current_reading": current,
            "rate_per_unit": "12.50",
            "billing_period_start": "2024-02-01",
            "billing_period_end": "2024-02-29",
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_previous_reading_continues_from_latest(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "101", 2).await;

        let response = app.post("/api/v1/utility-readings").json(&reading_json(room.id, "100")).await;
        response.assert_status(StatusCode::CREATED);
        let first: UtilityReadingResponse = response.json();
        assert_eq!(first.previous_reading, Decimal::ZERO);

        let response = app.post("/api/v1/utility-readings").json(&reading_json(room.id, "150")).await;
        response.assert_status(StatusCode::CREATED);
        let second: UtilityReadingResponse = response.json();
        assert_eq!(second.previous_reading, Decimal::new(100, 0));
        assert_eq!(second.consumption, Decimal::new(50, 0));
        assert_eq!(second.cost, Decimal::new(625, 0));
        assert_eq!(second.cost_display, "₱625.00");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_readings_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "102", 2).await;

        let mut body = reading_json(room.id, "100");
        body["billing_period_end"] = json!("2024-01-01");
        app.post("/api/v1/utility-readings").json(&body).await.assert_status_bad_request();

        let mut body = reading_json(room.id, "100");
        body["rate_per_unit"] = json!("-1");
        app.post("/api/v1/utility-readings").json(&body).await.assert_status_bad_request();

        app.post("/api/v1/utility-readings")
            .json(&reading_json(uuid::Uuid::new_v4(), "100"))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_consumption_summary(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "103", 2).await;
        for current in ["100", "150", "175"] {
            app.post("/api/v1/utility-readings")
                .json(&reading_json(room.id, current))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = app
            .get("/api/v1/utility-readings/consumption-summary")
            .add_query_param("room_id", room.id)
            .await;
        response.assert_status_ok();
        let summary: Vec<serde_json::Value> = response.json();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0]["reading_count"], 3);
        let total: Decimal = summary[0]["total_consumption"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, Decimal::new(175, 0));
    }
}
