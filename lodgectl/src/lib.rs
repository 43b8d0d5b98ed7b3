//! # lodgectl: back office for boarding houses
//!
//! `lodgectl` keeps track of the rooms in a boarding house, the boarders living in them, what
//! they owe and have paid, and the utility meters of each room. It exposes a JSON API for the
//! office under `/api/v1` and a small self-service portal that boarders reach with a personal
//! access code.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for persistence.
//!
//! The **API layer** ([`api`]) holds the route handlers and their request/response models. Every
//! handler is documented with `utoipa`, and the rendered reference lives at `/api/docs`.
//!
//! The **database layer** ([`db`]) uses the repository pattern: one repository per table over a
//! borrowed `PgConnection`, so handlers decide where transactions start and end.
//!
//! The domain rules are plain functions with no I/O:
//!
//! - [`occupancy`]: room capacity and the status a room should have given its active boarders
//! - [`billing`]: derived overdue status, payment and consumption aggregates, dashboard figures
//! - [`access`]: portal access codes and receipt numbers
//! - [`format`]: currency, date, phone and duration display strings
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use lodgectl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = lodgectl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     lodgectl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! Migrations are embedded and run on startup; see [`migrator`].
pub mod access;
pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod errors;
pub mod format;
pub mod occupancy;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use axum::http::HeaderValue;
use axum::{
    Json, Router, http,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{BoarderId, PaymentId, RoomId, UtilityReadingId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the lodgectl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        anyhow::ensure!(
            !config.cors.allow_credentials,
            "cors.allow_credentials cannot be combined with a '*' origin"
        );
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url serializes with a trailing slash, browsers send the bare origin
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::HeaderName::from_static(auth::current_boarder::ACCESS_CODE_HEADER),
        ])
        .allow_credentials(config.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

fn api_routes(state: AppState) -> Router {
    use api::handlers::{boarders, dashboard, payments, portal, rooms, utility_readings};

    Router::new()
        // Rooms
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/stats", get(rooms::get_room_stats))
        .route(
            "/rooms/{id}",
            get(rooms::get_room).patch(rooms::update_room).delete(rooms::delete_room),
        )
        // Boarders
        .route("/boarders", get(boarders::list_boarders).post(boarders::create_boarder))
        .route("/boarders/stats", get(boarders::get_boarder_stats))
        .route(
            "/boarders/{id}",
            get(boarders::get_boarder)
                .patch(boarders::update_boarder)
                .delete(boarders::delete_boarder),
        )
        .route("/boarders/{id}/assign-room", post(boarders::assign_room))
        .route("/boarders/{id}/move-out", post(boarders::move_out))
        .route("/boarders/{id}/access-code", post(boarders::regenerate_access_code))
        // Payments
        .route("/payments", get(payments::list_payments).post(payments::create_payment))
        .route("/payments/stats", get(payments::get_payment_stats))
        .route("/payments/monthly", get(payments::get_monthly_totals))
        .route("/payments/calculate-total", post(payments::calculate_total))
        .route(
            "/payments/{id}",
            get(payments::get_payment)
                .patch(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route("/payments/{id}/mark-paid", post(payments::mark_payment_paid))
        .route("/payments/{id}/cancel", post(payments::cancel_payment))
        // Utility readings
        .route(
            "/utility-readings",
            get(utility_readings::list_utility_readings).post(utility_readings::create_utility_reading),
        )
        .route(
            "/utility-readings/consumption-summary",
            get(utility_readings::get_consumption_summary),
        )
        .route(
            "/utility-readings/{id}",
            get(utility_readings::get_utility_reading)
                .patch(utility_readings::update_utility_reading)
                .delete(utility_readings::delete_utility_reading),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_dashboard_stats))
        // Portal
        .route("/portal/me", get(portal::get_profile))
        .route("/portal/payments", get(portal::list_my_payments))
        .route("/portal/utility-readings", get(portal::list_my_utility_readings))
        .with_state(state)
}

/// Build the application router.
///
/// The API is nested under `/api/v1`, next to `/healthz`, the OpenAPI document and its rendered
/// reference. CORS and request tracing wrap everything, and Prometheus metrics are added at
/// `/internal/metrics` when enabled.
///
/// # Errors
///
/// Returns an error if the CORS configuration cannot be turned into header values.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1", api_routes(state))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(cors_layer);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Connect to the configured database and bring the schema up to date.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool = config.database.pool.pool_options().connect(&config.database.url).await?;
    migrator().run(&pool).await?;
    info!("Database migrations applied");
    Ok(pool)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance, connecting to `config.database`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application over an existing pool. Migrations still run, so a fresh database
    /// is fine.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting lodgectl with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => {
                migrator().run(&pool).await?;
                pool
            }
            None => setup_database(&config).await?,
        };

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("lodgectl listening on http://{}", bind_addr);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::config::{Config, CorsOrigin};

    #[test]
    fn test_cors_layer_from_config() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec![CorsOrigin::Url("https://office.example.com".parse().unwrap())];
        config.cors.allow_credentials = true;
        assert!(super::create_cors_layer(&config).is_ok());

        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        assert!(super::create_cors_layer(&config).is_err());

        config.cors.allow_credentials = false;
        assert!(super::create_cors_layer(&config).is_ok());
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod integration {
    use crate::test_utils::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_health_and_docs(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        let response = server.get("/api/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert_eq!(doc["info"]["title"], "lodgectl API");
        assert!(doc["paths"]["/rooms/{id}"].is_object());

        server.get("/api/docs").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_metrics_endpoint_when_enabled(pool: PgPool) {
        let mut config = create_test_config();
        config.enable_metrics = true;
        let server = crate::Application::new_with_pool(config, Some(pool))
            .await
            .expect("Failed to create application")
            .into_test_server();

        server.get("/healthz").await.assert_status_ok();
        server.get("/internal/metrics").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_route_is_404(pool: PgPool) {
        let server = create_test_app(pool).await;
        server.get("/api/v1/nothing-here").await.assert_status_not_found();
    }
}
