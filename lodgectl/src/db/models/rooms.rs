//! Database models for rooms.

use crate::types::RoomId;
use bon::Builder;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Room occupancy status stored as TEXT in database.
///
/// `Available`/`Occupied` are derived from the active boarder count; `Maintenance` is set by an
/// operator and survives reconciliation until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Maintenance,
}

/// Database representation of a room
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    pub floor: i32,
    pub capacity: i32,
    pub monthly_rate: Decimal,
    pub amenities: Vec<String>,
    pub description: Option<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A room together with the number of active boarders currently assigned to it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomOccupancy {
    #[sqlx(flatten)]
    pub room: Room,
    pub active_boarders: i64,
}

/// Request to create a new room
#[derive(Debug, Clone, Builder)]
pub struct RoomCreateDBRequest {
    pub room_number: String,
    pub floor: i32,
    pub capacity: i32,
    pub monthly_rate: Decimal,
    #[builder(default)]
    pub amenities: Vec<String>,
    pub description: Option<String>,
    /// Only `Maintenance` sticks; anything else is replaced by the derived status
    pub status: Option<RoomStatus>,
}

/// Request to update an existing room. `description` is tri-state: `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct RoomUpdateDBRequest {
    pub room_number: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<i32>,
    pub monthly_rate: Option<Decimal>,
    pub amenities: Option<Vec<String>>,
    pub description: Option<Option<String>>,
    pub status: Option<RoomStatus>,
}

/// Response from database after creating or updating a room
pub type RoomDBResponse = RoomOccupancy;
