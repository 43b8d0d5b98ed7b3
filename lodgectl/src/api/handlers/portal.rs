//! Self-service endpoints for boarders, authenticated by access code.

use crate::{
    AppState,
    api::{
        handlers::today,
        models::{
            boarders::{BoarderResponse, PortalProfile},
            payments::{PaymentResponse, PortalPaymentsQuery},
            rooms::RoomResponse,
            utility_readings::UtilityReadingResponse,
        },
    },
    auth::current_boarder::CurrentBoarder,
    billing::payments::filter_payments,
    db::handlers::{Payments, Repository, Rooms, UtilityReadings, utility_readings::UtilityReadingFilter},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/portal/me",
    tag = "portal",
    summary = "My profile",
    description = "The authenticated boarder and the room they currently occupy.",
    responses(
        (status = 200, description = "Boarder profile", body = PortalProfile),
        (status = 401, description = "Missing or invalid access code"),
        (status = 500, description = "Internal server error"),
    ),
    security(("AccessCode" = [])),
)]
#[instrument(skip_all)]
pub async fn get_profile(State(state): State<AppState>, CurrentBoarder(boarder): CurrentBoarder) -> Result<Json<PortalProfile>> {
    let room = match boarder.occupied_room() {
        Some(room_id) => {
            let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            Rooms::new(&mut conn)
                .get_by_id(room_id)
                .await?
                .map(|room| RoomResponse::from_db(room, &state.config.currency))
        }
        None => None,
    };

    Ok(Json(PortalProfile {
        boarder: BoarderResponse::from_db(boarder, today()),
        room,
    }))
}

#[utoipa::path(
    get,
    path = "/portal/payments",
    tag = "portal",
    summary = "My payments",
    description = "The authenticated boarder's payments, most recent due date first, with overdue status derived.",
    params(PortalPaymentsQuery),
    responses(
        (status = 200, description = "Payments", body = [PaymentResponse]),
        (status = 401, description = "Missing or invalid access code"),
        (status = 500, description = "Internal server error"),
    ),
    security(("AccessCode" = [])),
)]
#[instrument(skip_all)]
pub async fn list_my_payments(
    State(state): State<AppState>,
    CurrentBoarder(boarder): CurrentBoarder,
    Query(query): Query<PortalPaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payments = Payments::new(&mut conn).list_all(Some(boarder.id)).await?;

    let today = today();
    let mut mine: Vec<PaymentResponse> = filter_payments(&payments, &query.criteria(boarder.id), today)
        .into_iter()
        .cloned()
        .map(|p| PaymentResponse::from_db(p, today, &state.config.currency))
        .collect();
    mine.sort_by(|a, b| b.due_date.cmp(&a.due_date));

    Ok(Json(mine))
}

#[utoipa::path(
    get,
    path = "/portal/utility-readings",
    tag = "portal",
    summary = "My room's utility readings",
    description = "Readings for the room the authenticated boarder occupies, newest first. Empty when they have no room.",
    responses(
        (status = 200, description = "Readings", body = [UtilityReadingResponse]),
        (status = 401, description = "Missing or invalid access code"),
        (status = 500, description = "Internal server error"),
    ),
    security(("AccessCode" = [])),
)]
#[instrument(skip_all)]
pub async fn list_my_utility_readings(
    State(state): State<AppState>,
    CurrentBoarder(boarder): CurrentBoarder,
) -> Result<Json<Vec<UtilityReadingResponse>>> {
    let Some(room_id) = boarder.occupied_room() else {
        return Ok(Json(Vec::new()));
    };

    let filter = UtilityReadingFilter {
        room_id: Some(room_id),
        ..Default::default()
    };
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let readings = UtilityReadings::new(&mut conn).list_unpaginated(&filter).await?;

    Ok(Json(
        readings
            .into_iter()
            .rev()
            .map(|r| UtilityReadingResponse::from_db(r, &state.config.currency))
            .collect(),
    ))
}
