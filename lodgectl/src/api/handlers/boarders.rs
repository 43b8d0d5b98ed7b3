use crate::{
    AppState,
    access::generate_access_code,
    api::{
        handlers::today,
        models::{
            boarders::{AssignRoomRequest, BoarderCreate, BoarderResponse, BoarderUpdate, ListBoardersQuery, MoveOutRequest},
            pagination::PaginatedResponse,
        },
    },
    billing::stats::{BoarderStats, boarder_stats},
    db::{
        errors::DbError,
        handlers::{Boarders, Repository, boarders::BoarderFilter},
        models::boarders::Boarder,
    },
    errors::{Error, Result},
    types::BoarderId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

/// Attempts at drawing an access code that is not already taken
const ACCESS_CODE_ATTEMPTS: usize = 5;

fn is_access_code_collision(err: &DbError) -> bool {
    matches!(err, DbError::UniqueViolation { constraint: Some(c), .. } if c == "boarders_access_code_unique")
}

fn not_found(id: BoarderId) -> Error {
    Error::NotFound {
        resource: "Boarder".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/boarders",
    tag = "boarders",
    summary = "List boarders",
    params(ListBoardersQuery),
    responses(
        (status = 200, description = "Paginated list of boarders", body = PaginatedResponse<BoarderResponse>),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn list_boarders(
    State(state): State<AppState>,
    Query(query): Query<ListBoardersQuery>,
) -> Result<Json<PaginatedResponse<BoarderResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = BoarderFilter {
        is_active: query.is_active,
        room_id: query.room_id,
        search: query.search,
        ..BoarderFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Boarders::new(&mut conn);
    let boarders = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let today = today();
    let data = boarders.into_iter().map(|b| BoarderResponse::from_db(b, today)).collect();
    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Register a boarder, optionally placing them in a room straight away.
///
/// A fresh access code for the self-service portal is generated and returned.
#[utoipa::path(
    post,
    path = "/boarders",
    tag = "boarders",
    summary = "Create boarder",
    request_body = BoarderCreate,
    responses(
        (status = 201, description = "Boarder created", body = BoarderResponse),
        (status = 400, description = "Invalid boarder data"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Email already registered, or the room is full or under maintenance"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn create_boarder(
    State(state): State<AppState>,
    Json(request): Json<BoarderCreate>,
) -> Result<(StatusCode, Json<BoarderResponse>)> {
    request.validate()?;

    let today = today();
    let code_length = state.config.billing.access_code_length;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Boarders::new(&mut conn);

    let mut attempt = 1;
    let boarder = loop {
        let db_request = request.clone().into_db_request(generate_access_code(code_length), today);
        match repo.create(&db_request).await {
            Ok(boarder) => break boarder,
            Err(e) if is_access_code_collision(&e) && attempt < ACCESS_CODE_ATTEMPTS => {
                tracing::debug!(attempt, "Access code collision, drawing another");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };

    tracing::info!(boarder_id = %boarder.id, room_id = ?boarder.room_id, "Registered boarder");
    Ok((StatusCode::CREATED, Json(BoarderResponse::from_db(boarder, today))))
}

#[utoipa::path(
    get,
    path = "/boarders/{id}",
    tag = "boarders",
    summary = "Get boarder",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    responses(
        (status = 200, description = "Boarder details", body = BoarderResponse),
        (status = 404, description = "Boarder not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_boarder(State(state): State<AppState>, Path(id): Path<BoarderId>) -> Result<Json<BoarderResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boarder = Boarders::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(BoarderResponse::from_db(boarder, today())))
}

/// Update a boarder. Room and active-status changes re-reconcile the rooms involved.
///
/// Deactivating a boarder records a move-out date and reactivating them clears it.
#[utoipa::path(
    patch,
    path = "/boarders/{id}",
    tag = "boarders",
    summary = "Update boarder",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    request_body = BoarderUpdate,
    responses(
        (status = 200, description = "Boarder updated", body = BoarderResponse),
        (status = 400, description = "Invalid boarder data"),
        (status = 404, description = "Boarder or room not found"),
        (status = 409, description = "Target room is full or under maintenance"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn update_boarder(
    State(state): State<AppState>,
    Path(id): Path<BoarderId>,
    Json(request): Json<BoarderUpdate>,
) -> Result<Json<BoarderResponse>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boarder = Boarders::new(&mut conn).update(id, &request.into()).await?;

    Ok(Json(BoarderResponse::from_db(boarder, today())))
}

/// Delete a boarder together with their payments. Their bed is freed.
#[utoipa::path(
    delete,
    path = "/boarders/{id}",
    tag = "boarders",
    summary = "Delete boarder",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    responses(
        (status = 204, description = "Boarder deleted"),
        (status = 404, description = "Boarder not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn delete_boarder(State(state): State<AppState>, Path(id): Path<BoarderId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Boarders::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// Place an active boarder in a room, moving them out of their current one.
#[utoipa::path(
    post,
    path = "/boarders/{id}/assign-room",
    tag = "boarders",
    summary = "Assign room",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    request_body = AssignRoomRequest,
    responses(
        (status = 200, description = "Boarder assigned", body = BoarderResponse),
        (status = 404, description = "Boarder or room not found"),
        (status = 409, description = "Room is full or under maintenance, or the boarder has moved out"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn assign_room(
    State(state): State<AppState>,
    Path(id): Path<BoarderId>,
    Json(request): Json<AssignRoomRequest>,
) -> Result<Json<BoarderResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boarder = Boarders::new(&mut conn).assign_room(id, request.room_id).await.map_err(|e| match e {
        DbError::NotFound => not_found(id),
        other => other.into(),
    })?;

    Ok(Json(BoarderResponse::from_db(boarder, today())))
}

/// Deactivate a boarder and free their bed.
#[utoipa::path(
    post,
    path = "/boarders/{id}/move-out",
    tag = "boarders",
    summary = "Move out",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    request_body = MoveOutRequest,
    responses(
        (status = 200, description = "Boarder moved out", body = BoarderResponse),
        (status = 400, description = "Move-out date before move-in date"),
        (status = 404, description = "Boarder not found"),
        (status = 409, description = "Boarder has already moved out"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn move_out(
    State(state): State<AppState>,
    Path(id): Path<BoarderId>,
    request: Option<Json<MoveOutRequest>>,
) -> Result<Json<BoarderResponse>> {
    let today = today();
    let move_out_date = request.and_then(|Json(r)| r.move_out_date).unwrap_or(today);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boarder = Boarders::new(&mut conn).move_out(id, move_out_date).await.map_err(|e| match e {
        DbError::NotFound => not_found(id),
        other => other.into(),
    })?;

    tracing::info!(boarder_id = %boarder.id, %move_out_date, "Boarder moved out");
    Ok(Json(BoarderResponse::from_db(boarder, today)))
}

/// Replace a boarder's portal access code. The old code stops working immediately.
#[utoipa::path(
    post,
    path = "/boarders/{id}/access-code",
    tag = "boarders",
    summary = "Regenerate access code",
    params(("id" = uuid::Uuid, Path, description = "Boarder ID")),
    responses(
        (status = 200, description = "Boarder with the new access code", body = BoarderResponse),
        (status = 404, description = "Boarder not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn regenerate_access_code(State(state): State<AppState>, Path(id): Path<BoarderId>) -> Result<Json<BoarderResponse>> {
    let code_length = state.config.billing.access_code_length;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Boarders::new(&mut conn);

    let mut attempt = 1;
    let boarder: Boarder = loop {
        match repo.set_access_code(id, &generate_access_code(code_length)).await {
            Ok(boarder) => break boarder,
            Err(e) if is_access_code_collision(&e) && attempt < ACCESS_CODE_ATTEMPTS => attempt += 1,
            Err(DbError::NotFound) => return Err(not_found(id)),
            Err(e) => return Err(e.into()),
        }
    };

    Ok(Json(BoarderResponse::from_db(boarder, today())))
}

#[utoipa::path(
    get,
    path = "/boarders/stats",
    tag = "boarders",
    summary = "Boarder statistics",
    responses(
        (status = 200, description = "Active and inactive boarder counts", body = BoarderStats),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_boarder_stats(State(state): State<AppState>) -> Result<Json<BoarderStats>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boarders = Boarders::new(&mut conn).list_all().await?;
    Ok(Json(boarder_stats(&boarders)))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use crate::api::models::{boarders::BoarderResponse, pagination::PaginatedResponse, rooms::RoomResponse};
    use crate::db::models::rooms::RoomStatus;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    fn boarder_json(email: &str, room_id: Option<uuid::Uuid>) -> serde_json::Value {
        json!({
            "first_name": "Maria",
            "last_name": "Santos",
            "email": email,
            "phone": "09171234567",
            "room_id": room_id,
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_boarder_fills_room(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "101", 1).await;

        let response = app.post("/api/v1/boarders").json(&boarder_json("maria@example.com", Some(room.id))).await;
        response.assert_status(StatusCode::CREATED);
        let boarder: BoarderResponse = response.json();
        assert_eq!(boarder.access_code.len(), 8);
        assert_eq!(boarder.full_name, "Maria Santos");
        assert_eq!(boarder.phone_display, "0917 123 4567");

        let room: RoomResponse = app.get(&format!("/api/v1/rooms/{}", room.id)).await.json();
        assert_eq!(room.status, RoomStatus::Occupied);

        // Full room turns the next boarder away
        let response = app.post("/api/v1/boarders").json(&boarder_json("juan@example.com", Some(room.id))).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_boarder_validation(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.post("/api/v1/boarders").json(&boarder_json("not-an-email", None)).await;
        response.assert_status_bad_request();

        let response = app
            .post("/api/v1/boarders")
            .json(&boarder_json("ghost@example.com", Some(uuid::Uuid::new_v4())))
            .await;
        response.assert_status_not_found();

        app.post("/api/v1/boarders")
            .json(&boarder_json("dup@example.com", None))
            .await
            .assert_status(StatusCode::CREATED);
        let response = app.post("/api/v1/boarders").json(&boarder_json("DUP@example.com", None)).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_move_out_frees_room(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "102", 1).await;
        let boarder = create_test_boarder(&pool, "leaving@example.com", Some(room.id)).await;

        let response = app
            .post(&format!("/api/v1/boarders/{}/move-out", boarder.id))
            .json(&json!({"move_out_date": "2030-01-31"}))
            .await;
        response.assert_status_ok();
        let moved: BoarderResponse = response.json();
        assert!(!moved.is_active);
        assert_eq!(moved.room_id, Some(room.id));

        let room: RoomResponse = app.get(&format!("/api/v1/rooms/{}", room.id)).await.json();
        assert_eq!(room.status, RoomStatus::Available);
        assert_eq!(room.active_boarders, 0);

        let response = app.post(&format!("/api/v1/boarders/{}/move-out", boarder.id)).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_room_moves_between_rooms(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let first = create_test_room(&pool, "201", 1).await;
        let second = create_test_room(&pool, "202", 1).await;
        let boarder = create_test_boarder(&pool, "mover@example.com", Some(first.id)).await;

        let response = app
            .post(&format!("/api/v1/boarders/{}/assign-room", boarder.id))
            .json(&json!({"room_id": second.id}))
            .await;
        response.assert_status_ok();

        let first: RoomResponse = app.get(&format!("/api/v1/rooms/{}", first.id)).await.json();
        let second: RoomResponse = app.get(&format!("/api/v1/rooms/{}", second.id)).await.json();
        assert_eq!(first.status, RoomStatus::Available);
        assert_eq!(second.status, RoomStatus::Occupied);

        let response = app
            .post(&format!("/api/v1/boarders/{}/assign-room", uuid::Uuid::new_v4()))
            .json(&json!({"room_id": second.id}))
            .await;
        response.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_unknown_room_is_not_found(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "lost@example.com", None).await;

        let response = app
            .post(&format!("/api/v1/boarders/{}/assign-room", boarder.id))
            .json(&json!({"room_id": uuid::Uuid::new_v4()}))
            .await;
        response.assert_status_not_found();
        let body: serde_json::Value = response.json();
        assert!(body["message"].as_str().unwrap().starts_with("Room with ID"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_patch_reactivation_clears_move_out_date(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "103", 1).await;
        let boarder = create_test_boarder(&pool, "returning@example.com", Some(room.id)).await;

        app.post(&format!("/api/v1/boarders/{}/move-out", boarder.id))
            .json(&json!({"move_out_date": "2030-01-31"}))
            .await
            .assert_status_ok();

        let response = app
            .patch(&format!("/api/v1/boarders/{}", boarder.id))
            .json(&json!({"is_active": true}))
            .await;
        response.assert_status_ok();
        let back: BoarderResponse = response.json();
        assert!(back.is_active);
        assert_eq!(back.move_out_date, None);

        let room: RoomResponse = app.get(&format!("/api/v1/rooms/{}", room.id)).await.json();
        assert_eq!(room.status, RoomStatus::Occupied);

        let response = app
            .patch(&format!("/api/v1/boarders/{}", boarder.id))
            .json(&json!({"is_active": false, "emergency_contact_name": null}))
            .await;
        response.assert_status_ok();
        let gone: BoarderResponse = response.json();
        assert!(!gone.is_active);
        assert!(gone.move_out_date.is_some());
        assert_eq!(gone.emergency_contact_name, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_regenerate_access_code(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "codes@example.com", None).await;

        let response = app.post(&format!("/api/v1/boarders/{}/access-code", boarder.id)).await;
        response.assert_status_ok();
        let updated: BoarderResponse = response.json();
        assert_ne!(updated.access_code, boarder.access_code);

        app.get("/api/v1/portal/me")
            .add_header("X-Access-Code", &boarder.access_code)
            .await
            .assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_and_stats(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "301", 3).await;
        create_test_boarder(&pool, "one@example.com", Some(room.id)).await;
        create_test_boarder(&pool, "two@example.com", None).await;

        let page: PaginatedResponse<BoarderResponse> = app
            .get("/api/v1/boarders")
            .add_query_param("room_id", room.id)
            .await
            .json();
        assert_eq!(page.total_count, 1);

        let response = app.get("/api/v1/boarders/stats").await;
        response.assert_status_ok();
        let stats: serde_json::Value = response.json();
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["active_without_room"], 1);
    }
}
