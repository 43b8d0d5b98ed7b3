use crate::{
    AppState,
    api::{
        handlers::today,
        models::{
            pagination::PaginatedResponse,
            payments::{
                CalculateTotalRequest, CalculateTotalResponse, ListPaymentsQuery, MarkPaidRequest, MonthlyTotalResponse, PaymentCreate,
                PaymentResponse, PaymentStatsQuery, PaymentUpdate,
            },
        },
    },
    billing::payments::{PaymentStats, generate_receipt_number, monthly_totals, summarize_payments},
    db::{
        errors::DbError,
        handlers::{Payments, Repository, payments::PaymentListFilter},
    },
    errors::{Error, Result},
    types::PaymentId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

fn not_found(id: PaymentId) -> Error {
    Error::NotFound {
        resource: "Payment".to_string(),
        id: id.to_string(),
    }
}

/// List payments. Filtering by OVERDUE selects pending payments past their due date.
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    summary = "List payments",
    params(ListPaymentsQuery),
    responses(
        (status = 200, description = "Paginated list of payments, most recent due date first", body = PaginatedResponse<PaymentResponse>),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<PaginatedResponse<PaymentResponse>>> {
    let (skip, limit) = query.pagination.params();
    let today = today();
    let filter = PaymentListFilter {
        criteria: query.criteria(),
        ..PaymentListFilter::new(skip, limit, today)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Payments::new(&mut conn);
    let payments = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = payments
        .into_iter()
        .map(|p| PaymentResponse::from_db(p, today, &state.config.currency))
        .collect();
    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Record a charge. Payments recorded as already paid get a receipt number.
#[utoipa::path(
    post,
    path = "/payments",
    tag = "payments",
    summary = "Create payment",
    request_body = PaymentCreate,
    responses(
        (status = 201, description = "Payment created", body = PaymentResponse),
        (status = 400, description = "Invalid amount or status, or unknown boarder"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    request.validate()?;

    let today = today();
    let db_request = request.into_db_request(today, &state.config.billing.receipt_prefix);
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).create(&db_request).await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse::from_db(payment, today, &state.config.currency)),
    ))
}

#[utoipa::path(
    get,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Get payment",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment details", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_payment(State(state): State<AppState>, Path(id): Path<PaymentId>) -> Result<Json<PaymentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).get_by_id(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(PaymentResponse::from_db(payment, today(), &state.config.currency)))
}

/// Edit the amount, type, due date or description of a pending payment.
///
/// Settling and cancelling go through `mark-paid` and `cancel`; paid and cancelled payments are
/// no longer editable.
#[utoipa::path(
    patch,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Update payment",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    request_body = PaymentUpdate,
    responses(
        (status = 200, description = "Payment updated", body = PaymentResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is already paid or was cancelled"),
        (status = 422, description = "Unknown field, such as status"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    Json(request): Json<PaymentUpdate>,
) -> Result<Json<PaymentResponse>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).update(id, &request.into()).await.map_err(|e| match e {
        DbError::NotFound => not_found(id),
        other => other.into(),
    })?;

    Ok(Json(PaymentResponse::from_db(payment, today(), &state.config.currency)))
}

#[utoipa::path(
    delete,
    path = "/payments/{id}",
    tag = "payments",
    summary = "Delete payment",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn delete_payment(State(state): State<AppState>, Path(id): Path<PaymentId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Payments::new(&mut conn).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// Settle a pending (or overdue) payment and issue a receipt number.
#[utoipa::path(
    post,
    path = "/payments/{id}/mark-paid",
    tag = "payments",
    summary = "Mark payment as paid",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    request_body = MarkPaidRequest,
    responses(
        (status = 200, description = "Payment settled", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment is already paid or was cancelled"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn mark_payment_paid(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<PaymentResponse>> {
    let today = today();
    let paid_date = request.and_then(|Json(r)| r.paid_date).unwrap_or(today);
    let receipt_number = generate_receipt_number(&state.config.billing.receipt_prefix, paid_date);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn)
        .mark_paid(id, paid_date, &receipt_number)
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found(id),
            other => other.into(),
        })?;

    tracing::info!(payment_id = %payment.id, receipt = ?payment.receipt_number, "Payment settled");
    Ok(Json(PaymentResponse::from_db(payment, today, &state.config.currency)))
}

#[utoipa::path(
    post,
    path = "/payments/{id}/cancel",
    tag = "payments",
    summary = "Cancel payment",
    params(("id" = uuid::Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment cancelled", body = PaymentResponse),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment has already been paid"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn cancel_payment(State(state): State<AppState>, Path(id): Path<PaymentId>) -> Result<Json<PaymentResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payment = Payments::new(&mut conn).cancel(id).await.map_err(|e| match e {
        DbError::NotFound => not_found(id),
        other => other.into(),
    })?;

    Ok(Json(PaymentResponse::from_db(payment, today(), &state.config.currency)))
}

/// Counts and sums per display status, optionally for a single boarder.
#[utoipa::path(
    get,
    path = "/payments/stats",
    tag = "payments",
    summary = "Payment statistics",
    params(PaymentStatsQuery),
    responses(
        (status = 200, description = "Payment totals by status", body = PaymentStats),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_payment_stats(State(state): State<AppState>, Query(query): Query<PaymentStatsQuery>) -> Result<Json<PaymentStats>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payments = Payments::new(&mut conn).list_all(query.boarder_id).await?;
    Ok(Json(summarize_payments(&payments, today())))
}

/// Billed, collected and outstanding totals per due month, oldest first.
#[utoipa::path(
    get,
    path = "/payments/monthly",
    tag = "payments",
    summary = "Monthly payment totals",
    params(PaymentStatsQuery),
    responses(
        (status = 200, description = "Totals per month", body = [MonthlyTotalResponse]),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_monthly_totals(
    State(state): State<AppState>,
    Query(query): Query<PaymentStatsQuery>,
) -> Result<Json<Vec<MonthlyTotalResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let payments = Payments::new(&mut conn).list_all(query.boarder_id).await?;
    Ok(Json(monthly_totals(&payments).into_iter().map(Into::into).collect()))
}

/// Rent plus utilities plus other fees, less any discount. Never negative.
#[utoipa::path(
    post,
    path = "/payments/calculate-total",
    tag = "payments",
    summary = "Calculate total payment",
    request_body = CalculateTotalRequest,
    responses(
        (status = 200, description = "Total due", body = CalculateTotalResponse),
        (status = 400, description = "Malformed amounts"),
    ),
)]
#[instrument(skip_all)]
pub async fn calculate_total(State(state): State<AppState>, Json(request): Json<CalculateTotalRequest>) -> Json<CalculateTotalResponse> {
    Json(request.calculate(&state.config.currency))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, payments::PaymentResponse};
    use crate::db::models::payments::PaymentStatus;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_overdue_is_derived(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "late@example.com", None).await;
        let past_due = Utc::now().date_naive() - Duration::days(3);

        let response = app
            .post("/api/v1/payments")
            .json(&json!({
                "boarder_id": boarder.id,
                "amount": "5000",
                "type": "RENT",
                "due_date": past_due,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let payment: PaymentResponse = response.json();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.display_status, PaymentStatus::Overdue);
        assert_eq!(payment.days_overdue, 3);

        let page: PaginatedResponse<PaymentResponse> =
            app.get("/api/v1/payments").add_query_param("status", "OVERDUE").await.json();
        assert_eq!(page.total_count, 1);
        let page: PaginatedResponse<PaymentResponse> =
            app.get("/api/v1/payments").add_query_param("status", "PENDING").await.json();
        assert_eq!(page.total_count, 0);

        let response = app
            .post("/api/v1/payments")
            .json(&json!({
                "boarder_id": boarder.id,
                "amount": "5000",
                "type": "RENT",
                "status": "OVERDUE",
                "due_date": past_due,
            }))
            .await;
        response.assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_paid_then_cancel_conflicts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "payer@example.com", None).await;
        let payment = create_test_payment(&pool, boarder.id, 850).await;

        let response = app
            .post(&format!("/api/v1/payments/{}/mark-paid", payment.id))
            .json(&json!({"paid_date": "2024-01-15"}))
            .await;
        response.assert_status_ok();
        let paid: PaymentResponse = response.json();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert!(paid.receipt_number.unwrap().starts_with("RCP-20240115-"));

        app.post(&format!("/api/v1/payments/{}/mark-paid", payment.id))
            .await
            .assert_status(StatusCode::CONFLICT);
        app.post(&format!("/api/v1/payments/{}/cancel", payment.id))
            .await
            .assert_status(StatusCode::CONFLICT);
        app.post(&format!("/api/v1/payments/{}/cancel", uuid::Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_patch_cannot_move_payment_between_states(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "editor@example.com", None).await;
        let paid = create_test_payment(&pool, boarder.id, 5000).await;
        let cancelled = create_test_payment(&pool, boarder.id, 700).await;
        let pending = create_test_payment(&pool, boarder.id, 300).await;

        app.post(&format!("/api/v1/payments/{}/mark-paid", paid.id))
            .await
            .assert_status_ok();
        app.post(&format!("/api/v1/payments/{}/cancel", cancelled.id))
            .await
            .assert_status_ok();

        // Status is not part of the edit body
        for (id, status) in [(paid.id, "PENDING"), (cancelled.id, "PAID"), (pending.id, "PAID")] {
            app.patch(&format!("/api/v1/payments/{id}"))
                .json(&json!({"status": status}))
                .await
                .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        }

        // Settled and cancelled payments refuse any edit
        for id in [paid.id, cancelled.id] {
            app.patch(&format!("/api/v1/payments/{id}"))
                .json(&json!({"amount": "1"}))
                .await
                .assert_status(StatusCode::CONFLICT);
        }

        let paid: PaymentResponse = app.get(&format!("/api/v1/payments/{}", paid.id)).await.json();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert!(paid.receipt_number.is_some());
        let cancelled: PaymentResponse = app.get(&format!("/api/v1/payments/{}", cancelled.id)).await.json();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);

        let response = app
            .patch(&format!("/api/v1/payments/{}", pending.id))
            .json(&json!({"amount": "350", "description": null}))
            .await;
        response.assert_status_ok();
        let edited: PaymentResponse = response.json();
        assert_eq!(edited.status, PaymentStatus::Pending);
        assert_eq!(edited.amount, rust_decimal::Decimal::new(350, 0));
        assert_eq!(edited.description, None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_stats_and_monthly(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let boarder = create_test_boarder(&pool, "stats@example.com", None).await;
        let paid = create_test_payment(&pool, boarder.id, 5000).await;
        create_test_payment(&pool, boarder.id, 850).await;
        app.post(&format!("/api/v1/payments/{}/mark-paid", paid.id))
            .await
            .assert_status_ok();

        let response = app
            .get("/api/v1/payments/stats")
            .add_query_param("boarder_id", boarder.id)
            .await;
        response.assert_status_ok();
        let stats: serde_json::Value = response.json();
        assert_eq!(stats["total_count"], 2);
        assert_eq!(stats["paid"]["count"], 1);

        let response = app.get("/api/v1/payments/monthly").await;
        response.assert_status_ok();
        let months: Vec<serde_json::Value> = response.json();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0]["payment_count"], 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_calculate_total(pool: PgPool) {
        let app = create_test_app(pool).await;

        let response = app
            .post("/api/v1/payments/calculate-total")
            .json(&json!({"rent": "5000", "utilities": "850", "discount": "200"}))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total"], "5650");
        assert_eq!(body["total_display"], "₱5,650.00");

        let response = app
            .post("/api/v1/payments/calculate-total")
            .json(&json!({"rent": "100", "discount": "500"}))
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["total"], "0");
    }
}
