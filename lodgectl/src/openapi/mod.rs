//! OpenAPI documentation for the `/api/v1/*` surface.
//!
//! [`ApiDoc`] is served as JSON at `/api/openapi.json` and rendered with Scalar at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;
use crate::auth::current_boarder::ACCESS_CODE_HEADER;
use crate::billing;
use crate::db::models;

/// Security scheme for the boarder portal
struct AccessCodeAddon;

impl Modify for AccessCodeAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "AccessCode".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    ACCESS_CODE_HEADER,
                    "The boarder's portal access code, case-insensitive.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::rooms::list_rooms,
        api::handlers::rooms::create_room,
        api::handlers::rooms::get_room,
        api::handlers::rooms::update_room,
        api::handlers::rooms::delete_room,
        api::handlers::rooms::get_room_stats,
        api::handlers::boarders::list_boarders,
        api::handlers::boarders::create_boarder,
        api::handlers::boarders::get_boarder,
        api::handlers::boarders::update_boarder,
        api::handlers::boarders::delete_boarder,
        api::handlers::boarders::assign_room,
        api::handlers::boarders::move_out,
        api::handlers::boarders::regenerate_access_code,
        api::handlers::boarders::get_boarder_stats,
        api::handlers::payments::list_payments,
        api::handlers::payments::create_payment,
        api::handlers::payments::get_payment,
        api::handlers::payments::update_payment,
        api::handlers::payments::delete_payment,
        api::handlers::payments::mark_payment_paid,
        api::handlers::payments::cancel_payment,
        api::handlers::payments::get_payment_stats,
        api::handlers::payments::get_monthly_totals,
        api::handlers::payments::calculate_total,
        api::handlers::utility_readings::list_utility_readings,
        api::handlers::utility_readings::create_utility_reading,
        api::handlers::utility_readings::get_utility_reading,
        api::handlers::utility_readings::update_utility_reading,
        api::handlers::utility_readings::delete_utility_reading,
        api::handlers::utility_readings::get_consumption_summary,
        api::handlers::dashboard::get_dashboard_stats,
        api::handlers::portal::get_profile,
        api::handlers::portal::list_my_payments,
        api::handlers::portal::list_my_utility_readings,
    ),
    components(
        schemas(
            models::rooms::RoomStatus,
            models::payments::PaymentType,
            models::payments::PaymentStatus,
            models::utility_readings::UtilityType,
            api::models::rooms::RoomCreate,
            api::models::rooms::RoomUpdate,
            api::models::rooms::RoomResponse,
            api::models::boarders::BoarderCreate,
            api::models::boarders::BoarderUpdate,
            api::models::boarders::BoarderResponse,
            api::models::boarders::AssignRoomRequest,
            api::models::boarders::MoveOutRequest,
            api::models::boarders::PortalProfile,
            api::models::payments::PaymentCreate,
            api::models::payments::PaymentUpdate,
            api::models::payments::PaymentResponse,
            api::models::payments::MarkPaidRequest,
            api::models::payments::CalculateTotalRequest,
            api::models::payments::CalculateTotalResponse,
            api::models::payments::MonthlyTotalResponse,
            api::models::utility_readings::UtilityReadingCreate,
            api::models::utility_readings::UtilityReadingUpdate,
            api::models::utility_readings::UtilityReadingResponse,
            billing::payments::StatusTotal,
            billing::payments::PaymentStats,
            billing::utilities::ConsumptionSummary,
            billing::stats::RoomStats,
            billing::stats::BoarderStats,
            billing::stats::DashboardStats,
        )
    ),
    modifiers(&AccessCodeAddon),
    tags(
        (name = "rooms", description = "Rooms and their live occupancy. A room's status follows the number of active boarders unless it is under maintenance."),
        (name = "boarders", description = "Boarder registration, room assignment, move-out and portal access codes."),
        (name = "payments", description = "Charges and their settlement. OVERDUE is never stored: a pending payment past its due date is reported as overdue."),
        (name = "utility-readings", description = "Meter readings per room and utility, with consumption and cost."),
        (name = "dashboard", description = "Combined statistics for the back office."),
        (name = "portal", description = "Self-service views for boarders. Authenticate with the `X-Access-Code` header."),
    ),
    info(
        title = "lodgectl API",
        version = "1.0.0",
        description = "Back office API for boarding houses.

## Money

Amounts are decimal strings (`\"5000.00\"`). Responses also carry display strings formatted in the configured currency.

## Errors

Errors are returned as JSON with a `message` field:

```json
{ \"message\": \"Room 101 is full (capacity 2)\" }
```",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa_scalar::{Scalar, Servable};

    #[test]
    fn test_document_lists_every_surface() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/rooms",
            "/rooms/{id}",
            "/boarders/{id}/assign-room",
            "/payments/{id}/mark-paid",
            "/utility-readings/consumption-summary",
            "/dashboard/stats",
            "/portal/me",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("AccessCode"));
    }

    #[tokio::test]
    async fn test_docs_are_served() {
        let router = axum::Router::new().merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let response = server.get("/api/docs").await;
        response.assert_status_ok();
        assert!(response.text().contains("<html"));
    }
}
