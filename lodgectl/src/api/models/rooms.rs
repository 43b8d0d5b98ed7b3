//! API request/response models for rooms.

use super::pagination::Pagination;
use crate::db::models::rooms::{RoomCreateDBRequest, RoomDBResponse, RoomStatus, RoomUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::format::format_currency;
use crate::occupancy;
use crate::types::RoomId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing rooms
#[serde_as]
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListRoomsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only rooms with this status
    pub status: Option<RoomStatus>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub floor: Option<i32>,

    /// Only rooms with at least this many beds
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub min_capacity: Option<i32>,

    /// Only rooms renting for at most this much per month
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>)]
    pub max_rate: Option<Decimal>,

    /// Only rooms listing this amenity (exact match)
    pub amenity: Option<String>,

    /// Case-insensitive substring match on room number or description
    pub search: Option<String>,
}

/// Request body for creating a room.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomCreate {
    #[schema(example = "101")]
    pub room_number: String,
    #[schema(example = 1)]
    pub floor: i32,
    /// Number of beds
    #[schema(example = 2)]
    pub capacity: i32,
    #[schema(value_type = String, example = "5000.00")]
    pub monthly_rate: Decimal,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub description: Option<String>,
    /// Only MAINTENANCE is honoured; otherwise the status follows occupancy
    pub status: Option<RoomStatus>,
}

impl RoomCreate {
    pub fn validate(&self) -> Result<()> {
        if self.room_number.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Room number must not be empty".to_string(),
            });
        }
        validate_capacity_and_rate(Some(self.capacity), Some(self.monthly_rate))
    }
}

impl From<RoomCreate> for RoomCreateDBRequest {
    fn from(create: RoomCreate) -> Self {
        RoomCreateDBRequest::builder()
            .room_number(create.room_number.trim().to_string())
            .floor(create.floor)
            .capacity(create.capacity)
            .monthly_rate(create.monthly_rate)
            .amenities(create.amenities)
            .maybe_description(create.description)
            .maybe_status(create.status)
            .build()
    }
}

/// Request body for updating a room. Only provided fields change; a `null` description clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RoomUpdate {
    pub room_number: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub monthly_rate: Option<Decimal>,
    pub amenities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// MAINTENANCE takes the room out of service; AVAILABLE or OCCUPIED puts it back
    pub status: Option<RoomStatus>,
}

impl RoomUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.room_number.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::BadRequest {
                message: "Room number must not be empty".to_string(),
            });
        }
        validate_capacity_and_rate(self.capacity, self.monthly_rate)
    }
}

impl From<RoomUpdate> for RoomUpdateDBRequest {
    fn from(update: RoomUpdate) -> Self {
        Self {
            room_number: update.room_number.map(|n| n.trim().to_string()),
            floor: update.floor,
            capacity: update.capacity,
            monthly_rate: update.monthly_rate,
            amenities: update.amenities,
            description: update.description,
            status: update.status,
        }
    }
}

fn validate_capacity_and_rate(capacity: Option<i32>, monthly_rate: Option<Decimal>) -> Result<()> {
    if capacity.is_some_and(|c| c < 0) {
        return Err(Error::BadRequest {
            message: "Capacity must not be negative".to_string(),
        });
    }
    if monthly_rate.is_some_and(|r| r < Decimal::ZERO) {
        return Err(Error::BadRequest {
            message: "Monthly rate must not be negative".to_string(),
        });
    }
    Ok(())
}

/// Room details with live occupancy
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RoomId,
    pub room_number: String,
    pub floor: i32,
    pub capacity: i32,
    #[schema(value_type = String)]
    pub monthly_rate: Decimal,
    /// Monthly rate rendered in the configured currency, e.g. `₱5,000.00`
    pub monthly_rate_display: String,
    pub amenities: Vec<String>,
    pub description: Option<String>,
    pub status: RoomStatus,
    /// Active boarders currently assigned
    pub active_boarders: i64,
    /// Free beds; zero while the room is under maintenance
    pub available_slots: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomResponse {
    pub fn from_db(db: RoomDBResponse, currency: &str) -> Self {
        let room = db.room;
        let available_slots = match room.status {
            RoomStatus::Maintenance => 0,
            _ => occupancy::available_slots(room.capacity, db.active_boarders),
        };
        Self {
            id: room.id,
            monthly_rate_display: format_currency(room.monthly_rate, currency),
            room_number: room.room_number,
            floor: room.floor,
            capacity: room.capacity,
            monthly_rate: room.monthly_rate,
            amenities: room.amenities,
            description: room.description,
            status: room.status,
            active_boarders: db.active_boarders,
            available_slots,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::rooms::{Room, RoomOccupancy};
    use uuid::Uuid;

    fn create(capacity: i32, rate: Decimal) -> RoomCreate {
        RoomCreate {
            room_number: " 101 ".to_string(),
            floor: 1,
            capacity,
            monthly_rate: rate,
            amenities: vec![],
            description: None,
            status: None,
        }
    }

    #[test]
    fn test_update_description_absent_null_or_set() {
        let absent: RoomUpdate = serde_json::from_str(r#"{"floor": 2}"#).unwrap();
        assert_eq!(RoomUpdateDBRequest::from(absent).description, None);

        let cleared: RoomUpdate = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(RoomUpdateDBRequest::from(cleared).description, Some(None));

        let set: RoomUpdate = serde_json::from_str(r#"{"description": "Garden view"}"#).unwrap();
        assert_eq!(RoomUpdateDBRequest::from(set).description, Some(Some("Garden view".to_string())));
    }

    #[test]
    fn test_validate_create() {
        assert!(create(2, Decimal::new(5000, 0)).validate().is_ok());
        assert!(create(-1, Decimal::new(5000, 0)).validate().is_err());
        assert!(create(2, Decimal::new(-1, 0)).validate().is_err());

        let mut blank = create(2, Decimal::ONE);
        blank.room_number = "   ".to_string();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_room_number_is_trimmed() {
        let request = RoomCreateDBRequest::from(create(2, Decimal::ONE));
        assert_eq!(request.room_number, "101");
    }

    #[test]
    fn test_response_hides_slots_under_maintenance() {
        let db = RoomOccupancy {
            room: Room {
                id: Uuid::new_v4(),
                room_number: "101".to_string(),
                floor: 1,
                capacity: 3,
                monthly_rate: Decimal::new(4500, 0),
                amenities: vec![],
                description: None,
                status: RoomStatus::Maintenance,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            active_boarders: 1,
        };
        let response = RoomResponse::from_db(db, "PHP");
        assert_eq!(response.available_slots, 0);
        assert_eq!(response.monthly_rate_display, "₱4,500.00");
    }

    #[test]
    fn test_list_query_parses_numbers_from_strings() {
        let query: ListRoomsQuery = serde_json::from_value(serde_json::json!({
            "floor": "2",
            "min_capacity": "3",
            "max_rate": "6000",
            "status": "AVAILABLE",
            "limit": "5"
        }))
        .unwrap();
        assert_eq!(query.floor, Some(2));
        assert_eq!(query.min_capacity, Some(3));
        assert_eq!(query.max_rate, Some(Decimal::new(6000, 0)));
        assert_eq!(query.status, Some(RoomStatus::Available));
        assert_eq!(query.pagination.limit(), 5);
    }
}
