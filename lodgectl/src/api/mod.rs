//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Everything is served under `/api/v1`:
//!
//! - **Rooms** (`/rooms/*`): rooms, live occupancy and room statistics
//! - **Boarders** (`/boarders/*`): registration, room assignment, move-out and access codes
//! - **Payments** (`/payments/*`): charges, settlement, statistics and monthly totals
//! - **Utility readings** (`/utility-readings/*`): meter readings and consumption summaries
//! - **Dashboard** (`/dashboard/stats`): combined statistics
//! - **Portal** (`/portal/*`): a boarder's own profile, payments and readings, via `X-Access-Code`
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The interactive reference is served
//! at `/api/docs` and the raw document at `/api/openapi.json`.

pub mod handlers;
pub mod models;
