use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        rooms::{ListRoomsQuery, RoomCreate, RoomResponse, RoomUpdate},
    },
    billing::stats::{RoomStats, room_stats},
    db::handlers::{Repository, Rooms, rooms::RoomFilter},
    errors::{Error, Result},
    types::RoomId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

/// List rooms with their live occupancy.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    summary = "List rooms",
    params(ListRoomsQuery),
    responses(
        (status = 200, description = "Paginated list of rooms", body = PaginatedResponse<RoomResponse>),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<ListRoomsQuery>,
) -> Result<Json<PaginatedResponse<RoomResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = RoomFilter {
        status: query.status,
        floor: query.floor,
        min_capacity: query.min_capacity,
        max_rate: query.max_rate,
        amenity: query.amenity,
        search: query.search,
        ..RoomFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Rooms::new(&mut conn);
    let rooms = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = rooms
        .into_iter()
        .map(|room| RoomResponse::from_db(room, &state.config.currency))
        .collect();
    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Create a room. Its status follows occupancy unless it is created under maintenance.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    summary = "Create room",
    request_body = RoomCreate,
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 400, description = "Invalid room data"),
        (status = 409, description = "Room number already in use"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn create_room(State(state): State<AppState>, Json(request): Json<RoomCreate>) -> Result<(StatusCode, Json<RoomResponse>)> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let room = Rooms::new(&mut conn).create(&request.into()).await?;

    Ok((StatusCode::CREATED, Json(RoomResponse::from_db(room, &state.config.currency))))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    summary = "Get room",
    params(("id" = uuid::Uuid, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room details", body = RoomResponse),
        (status = 404, description = "Room not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_room(State(state): State<AppState>, Path(id): Path<RoomId>) -> Result<Json<RoomResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let room = Rooms::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Room".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(RoomResponse::from_db(room, &state.config.currency)))
}

/// Update a room. Capacity may not drop below the number of active boarders.
#[utoipa::path(
    patch,
    path = "/rooms/{id}",
    tag = "rooms",
    summary = "Update room",
    params(("id" = uuid::Uuid, Path, description = "Room ID")),
    request_body = RoomUpdate,
    responses(
        (status = 200, description = "Room updated", body = RoomResponse),
        (status = 400, description = "Invalid room data"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Capacity below current occupancy, or room number in use"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Json(request): Json<RoomUpdate>,
) -> Result<Json<RoomResponse>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let room = Rooms::new(&mut conn).update(id, &request.into()).await?;

    Ok(Json(RoomResponse::from_db(room, &state.config.currency)))
}

/// Delete a room. Refused while active boarders are assigned to it.
#[utoipa::path(
    delete,
    path = "/rooms/{id}",
    tag = "rooms",
    summary = "Delete room",
    params(("id" = uuid::Uuid, Path, description = "Room ID")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room still has active boarders"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn delete_room(State(state): State<AppState>, Path(id): Path<RoomId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Rooms::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Room".to_string(),
            id: id.to_string(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/rooms/stats",
    tag = "rooms",
    summary = "Room statistics",
    responses(
        (status = 200, description = "Room counts by status and bed occupancy", body = RoomStats),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_room_stats(State(state): State<AppState>) -> Result<Json<RoomStats>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let rooms = Rooms::new(&mut conn).list_all().await?;
    Ok(Json(room_stats(&rooms)))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, rooms::RoomResponse};
    use crate::db::models::rooms::RoomStatus;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_room(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/api/v1/rooms")
            .json(&json!({
                "room_number": "101",
                "floor": 1,
                "capacity": 2,
                "monthly_rate": "5000.00",
                "amenities": ["wifi", "aircon"]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: RoomResponse = response.json();
        assert_eq!(created.status, RoomStatus::Available);
        assert_eq!(created.available_slots, 2);
        assert_eq!(created.monthly_rate_display, "₱5,000.00");

        let response = app.get(&format!("/api/v1/rooms/{}", created.id)).await;
        response.assert_status_ok();
        let fetched: RoomResponse = response.json();
        assert_eq!(fetched.room_number, "101");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_room_number_conflicts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        create_test_room(&pool, "101", 2).await;

        let response = app
            .post("/api/v1/rooms")
            .json(&json!({"room_number": "101", "floor": 1, "capacity": 1, "monthly_rate": "100"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_occupied_room_conflicts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "102", 2).await;
        create_test_boarder(&pool, "occupant@example.com", Some(room.id)).await;

        let response = app.delete(&format!("/api/v1/rooms/{}", room.id)).await;
        response.assert_status(StatusCode::CONFLICT);

        let response = app.delete(&format!("/api/v1/rooms/{}", uuid::Uuid::new_v4())).await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_stats(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let single = create_test_room(&pool, "201", 1).await;
        create_test_room(&pool, "202", 4).await;
        create_test_boarder(&pool, "solo@example.com", Some(single.id)).await;

        let response = app.get("/api/v1/rooms").add_query_param("status", "OCCUPIED").await;
        response.assert_status_ok();
        let page: PaginatedResponse<RoomResponse> = response.json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].room_number, "201");

        let response = app.get("/api/v1/rooms").add_query_param("min_capacity", "3").await;
        let page: PaginatedResponse<RoomResponse> = response.json();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].room_number, "202");

        let response = app.get("/api/v1/rooms/stats").await;
        response.assert_status_ok();
        let stats: serde_json::Value = response.json();
        assert_eq!(stats["total_rooms"], 2);
        assert_eq!(stats["occupied_beds"], 1);
        let rate: rust_decimal::Decimal = stats["occupancy_rate"].as_str().unwrap().parse().unwrap();
        assert_eq!(rate, rust_decimal::Decimal::new(20, 0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_shrinking_below_occupancy_conflicts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "301", 2).await;
        create_test_boarder(&pool, "a@example.com", Some(room.id)).await;
        create_test_boarder(&pool, "b@example.com", Some(room.id)).await;

        let response = app
            .patch(&format!("/api/v1/rooms/{}", room.id))
            .json(&json!({"capacity": 1}))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = app
            .patch(&format!("/api/v1/rooms/{}", room.id))
            .json(&json!({"capacity": 3}))
            .await;
        response.assert_status_ok();
        let updated: RoomResponse = response.json();
        assert_eq!(updated.status, RoomStatus::Available);
        assert_eq!(updated.available_slots, 1);
    }
}
