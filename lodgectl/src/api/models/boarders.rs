//! API request/response models for boarders.

use super::pagination::Pagination;
use super::rooms::RoomResponse;
use crate::db::models::boarders::{BoarderCreateDBRequest, BoarderDBResponse, BoarderUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::format::{format_duration, format_phone_number};
use crate::types::{BoarderId, RoomId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing boarders
#[serde_as]
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListBoardersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    pub is_active: Option<bool>,

    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,

    /// Case-insensitive substring match on name, email or phone
    pub search: Option<String>,
}

/// Request body for registering a boarder. An access code is generated automatically.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoarderCreate {
    #[schema(example = "Maria")]
    pub first_name: String,
    #[schema(example = "Santos")]
    pub last_name: String,
    #[schema(example = "maria.santos@example.com")]
    pub email: String,
    #[schema(example = "09171234567")]
    pub phone: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    /// Defaults to today
    pub move_in_date: Option<NaiveDate>,
    /// Room to place the boarder in right away
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,
}

impl BoarderCreate {
    pub fn validate(&self) -> Result<()> {
        require_non_blank("First name", &self.first_name)?;
        require_non_blank("Last name", &self.last_name)?;
        require_non_blank("Phone", &self.phone)?;
        validate_email(&self.email)
    }

    pub fn into_db_request(self, access_code: String, today: NaiveDate) -> BoarderCreateDBRequest {
        BoarderCreateDBRequest::builder()
            .first_name(self.first_name.trim().to_string())
            .last_name(self.last_name.trim().to_string())
            .email(self.email.trim().to_lowercase())
            .phone(self.phone.trim().to_string())
            .maybe_emergency_contact_name(self.emergency_contact_name)
            .maybe_emergency_contact_phone(self.emergency_contact_phone)
            .move_in_date(self.move_in_date.unwrap_or(today))
            .maybe_room_id(self.room_id)
            .access_code(access_code)
            .build()
    }
}

/// Request body for updating a boarder. Only provided fields change; `null` clears a nullable one.
///
/// Setting `is_active` to false stamps a move-out date (today unless one is given) and setting it
/// back to true clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BoarderUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub emergency_contact_phone: Option<Option<String>>,
    pub move_in_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub move_out_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
    /// Room assignment (absent = no change, null = unassign, id = move to that room)
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<Option<RoomId>>,
}

impl BoarderUpdate {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Phone", &self.phone),
        ] {
            if let Some(value) = value {
                require_non_blank(field, value)?;
            }
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

impl From<BoarderUpdate> for BoarderUpdateDBRequest {
    fn from(update: BoarderUpdate) -> Self {
        Self {
            first_name: update.first_name.map(|s| s.trim().to_string()),
            last_name: update.last_name.map(|s| s.trim().to_string()),
            email: update.email.map(|s| s.trim().to_lowercase()),
            phone: update.phone.map(|s| s.trim().to_string()),
            emergency_contact_name: update.emergency_contact_name,
            emergency_contact_phone: update.emergency_contact_phone,
            move_in_date: update.move_in_date,
            move_out_date: update.move_out_date,
            is_active: update.is_active,
            room_id: update.room_id,
            require_active: false,
        }
    }
}

/// Request body for placing a boarder in a room
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignRoomRequest {
    #[schema(value_type = String, format = "uuid")]
    pub room_id: RoomId,
}

/// Request body for moving a boarder out
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MoveOutRequest {
    /// Defaults to today
    pub move_out_date: Option<NaiveDate>,
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        return Err(Error::BadRequest {
            message: format!("'{email}' is not a valid email address"),
        });
    }
    Ok(())
}

/// Boarder details returned by the admin API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoarderResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BoarderId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// Phone number formatted for display
    pub phone_display: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub move_in_date: NaiveDate,
    pub move_out_date: Option<NaiveDate>,
    /// Length of stay so far (or until move-out), e.g. `1 year, 2 months`
    pub tenancy: String,
    pub is_active: bool,
    /// Code the boarder uses for the self-service portal
    pub access_code: String,
    /// Current room, or the last room for boarders who moved out
    #[schema(value_type = Option<String>, format = "uuid")]
    pub room_id: Option<RoomId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoarderResponse {
    pub fn from_db(db: BoarderDBResponse, today: NaiveDate) -> Self {
        let tenancy_end = db.move_out_date.unwrap_or(today);
        Self {
            id: db.id,
            full_name: db.full_name(),
            phone_display: format_phone_number(&db.phone),
            tenancy: format_duration(db.move_in_date, tenancy_end),
            first_name: db.first_name,
            last_name: db.last_name,
            email: db.email,
            phone: db.phone,
            emergency_contact_name: db.emergency_contact_name,
            emergency_contact_phone: db.emergency_contact_phone,
            move_in_date: db.move_in_date,
            move_out_date: db.move_out_date,
            is_active: db.is_active,
            access_code: db.access_code,
            room_id: db.room_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// What a boarder sees about themselves on the portal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PortalProfile {
    pub boarder: BoarderResponse,
    pub room: Option<RoomResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> BoarderCreate {
        BoarderCreate {
            first_name: " Maria ".to_string(),
            last_name: "Santos".to_string(),
            email: "Maria.Santos@Example.com ".to_string(),
            phone: "09171234567".to_string(),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            move_in_date: None,
            room_id: None,
        }
    }

    #[test]
    fn test_validate_create() {
        assert!(create().validate().is_ok());

        let mut bad_email = create();
        bad_email.email = "not-an-email".to_string();
        assert!(bad_email.validate().is_err());

        let mut blank = create();
        blank.last_name = " ".to_string();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_create_normalizes_and_defaults_move_in() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let request = create().into_db_request("ABCD2345".to_string(), today);
        assert_eq!(request.first_name, "Maria");
        assert_eq!(request.email, "maria.santos@example.com");
        assert_eq!(request.move_in_date, today);
        assert_eq!(request.access_code, "ABCD2345");
    }

    #[test]
    fn test_update_room_id_is_tri_state() {
        let absent: BoarderUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.room_id, None);

        let cleared: BoarderUpdate = serde_json::from_str(r#"{"room_id": null}"#).unwrap();
        assert_eq!(cleared.room_id, Some(None));

        let id = uuid::Uuid::new_v4();
        let moved: BoarderUpdate = serde_json::from_str(&format!(r#"{{"room_id": "{id}"}}"#)).unwrap();
        assert_eq!(moved.room_id, Some(Some(id)));
    }

    #[test]
    fn test_update_null_clears_contact_fields() {
        let update: BoarderUpdate =
            serde_json::from_str(r#"{"emergency_contact_name": null, "move_out_date": null, "phone": "0917"}"#).unwrap();
        assert_eq!(update.emergency_contact_name, Some(None));
        assert_eq!(update.emergency_contact_phone, None);
        assert_eq!(update.move_out_date, Some(None));

        let request = BoarderUpdateDBRequest::from(update);
        assert_eq!(request.emergency_contact_name, Some(None));
        assert_eq!(request.emergency_contact_phone, None);
        assert!(!request.require_active);
    }
}
