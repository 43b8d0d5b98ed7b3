//! API request and response data models.
//!
//! These structures define the public HTTP contract and are kept separate from the database
//! models in [`crate::db::models`], so storage and wire formats can evolve independently.
//! Responses add derived, display-ready fields (formatted money, display status, free beds)
//! on top of the stored columns.
//!
//! Monetary amounts are serialized as decimal strings (`"5000.00"`), never as floats.
//!
//! - [`rooms`]: room CRUD payloads and occupancy-aware responses
//! - [`boarders`]: boarder registration, room assignment and move-out, portal profile
//! - [`payments`]: charges, settlement, the total calculator and monthly totals
//! - [`utility_readings`]: meter readings with consumption and cost
//! - [`pagination`]: `skip`/`limit` query parameters and the paginated envelope

pub mod boarders;
pub mod pagination;
pub mod payments;
pub mod rooms;
pub mod utility_readings;
