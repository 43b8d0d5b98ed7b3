use crate::{
    AppState,
    api::handlers::today,
    billing::stats::{DashboardStats, dashboard_stats},
    db::handlers::{Boarders, Payments, Rooms},
    errors::{Error, Result},
};
use axum::{Json, extract::State};
use tracing::instrument;

/// Room, boarder and payment aggregates plus this month's revenue, in one call.
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    summary = "Dashboard statistics",
    responses(
        (status = 200, description = "Combined statistics", body = DashboardStats),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    // One snapshot across the three tables
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.into()))?;

    let rooms = Rooms::new(&mut tx).list_all().await?;
    let boarders = Boarders::new(&mut tx).list_all().await?;
    let payments = Payments::new(&mut tx).list_all(None).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(dashboard_stats(&rooms, &boarders, &payments, &state.config.currency, today())))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use crate::test_utils::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_dashboard_stats(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let room = create_test_room(&pool, "101", 2).await;
        let boarder = create_test_boarder(&pool, "dash@example.com", Some(room.id)).await;
        let payment = create_test_payment(&pool, boarder.id, 5000).await;
        app.post(&format!("/api/v1/payments/{}/mark-paid", payment.id))
            .await
            .assert_status_ok();

        let response = app.get("/api/v1/dashboard/stats").await;
        response.assert_status_ok();
        let stats: serde_json::Value = response.json();
        assert_eq!(stats["rooms"]["total_rooms"], 1);
        assert_eq!(stats["boarders"]["active"], 1);
        assert_eq!(stats["payments"]["paid"]["count"], 1);
        let revenue: rust_decimal::Decimal = stats["revenue_this_month"].as_str().unwrap().parse().unwrap();
        assert_eq!(revenue, rust_decimal::Decimal::new(5000, 0));
        assert_eq!(stats["currency"], "PHP");
    }
}
