//! Database models for boarders.

use crate::types::{BoarderId, RoomId};
use bon::Builder;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Database representation of a boarder
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Boarder {
    pub id: BoarderId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub move_in_date: NaiveDate,
    pub move_out_date: Option<NaiveDate>,
    pub is_active: bool,
    pub access_code: String,
    pub room_id: Option<RoomId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Boarder {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The room this boarder counts against, if any. Inactive boarders never occupy a bed.
    pub fn occupied_room(&self) -> Option<RoomId> {
        if self.is_active { self.room_id } else { None }
    }

    /// Move-out date once this boarder's active flag becomes `is_active`.
    ///
    /// Deactivation always leaves a move-out date (the requested one, else `today`) and
    /// reactivation clears it. Otherwise the requested change applies, with `None` keeping the
    /// stored date.
    pub fn move_out_date_after(
        &self,
        is_active: bool,
        requested: Option<Option<NaiveDate>>,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        match (self.is_active, is_active) {
            (false, true) => None,
            (true, false) => requested.flatten().or(Some(today)),
            (false, false) => requested.flatten().or(self.move_out_date).or(Some(today)),
            (true, true) => requested.unwrap_or(self.move_out_date),
        }
    }
}

/// Database request for creating a new boarder
#[derive(Debug, Clone, Builder)]
pub struct BoarderCreateDBRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub move_in_date: NaiveDate,
    pub room_id: Option<RoomId>,
    pub access_code: String,
}

/// Database request for updating a boarder
///
/// Nullable columns are tri-state: `None` leaves the column alone, `Some(None)` clears it and
/// `Some(Some(v))` sets it. For `room_id` that means unassigning or moving into room `v`.
#[derive(Debug, Clone, Default)]
pub struct BoarderUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emergency_contact_name: Option<Option<String>>,
    pub emergency_contact_phone: Option<Option<String>>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
    pub room_id: Option<Option<RoomId>>,
    /// Refuse the update if the boarder has already moved out
    pub require_active: bool,
}

/// Database response for a boarder
pub type BoarderDBResponse = Boarder;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn boarder(is_active: bool, room_id: Option<RoomId>) -> Boarder {
        Boarder {
            id: Uuid::new_v4(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            email: "maria@example.com".to_string(),
            phone: "09171234567".to_string(),
            emergency_contact_name: None,
            emergency_contact_phone: None,
            move_in_date: date(2024, 6, 1),
            move_out_date: None,
            is_active,
            access_code: "ABCD2345".to_string(),
            room_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(boarder(true, None).full_name(), "Maria Santos");
    }

    #[test]
    fn test_inactive_boarder_occupies_nothing() {
        let room = Uuid::new_v4();
        assert_eq!(boarder(true, Some(room)).occupied_room(), Some(room));
        assert_eq!(boarder(false, Some(room)).occupied_room(), None);
        assert_eq!(boarder(true, None).occupied_room(), None);
    }

    #[test]
    fn test_move_out_date_follows_active_flag() {
        let today = date(2024, 9, 1);
        let active = boarder(true, None);
        let mut moved_out = boarder(false, None);
        moved_out.move_out_date = Some(date(2024, 7, 31));

        // Deactivating stamps a move-out date
        assert_eq!(active.move_out_date_after(false, None, today), Some(today));
        assert_eq!(active.move_out_date_after(false, Some(None), today), Some(today));
        assert_eq!(
            active.move_out_date_after(false, Some(Some(date(2024, 8, 15))), today),
            Some(date(2024, 8, 15))
        );

        // Coming back clears it, whatever was asked for
        assert_eq!(moved_out.move_out_date_after(true, None, today), None);
        assert_eq!(moved_out.move_out_date_after(true, Some(Some(today)), today), None);

        // Staying inactive keeps a date on record
        assert_eq!(moved_out.move_out_date_after(false, None, today), Some(date(2024, 7, 31)));
        assert_eq!(moved_out.move_out_date_after(false, Some(None), today), Some(date(2024, 7, 31)));

        // Active boarders may have a planned date set or cleared
        assert_eq!(active.move_out_date_after(true, Some(Some(date(2024, 12, 31))), today), Some(date(2024, 12, 31)));
        let mut planned = boarder(true, None);
        planned.move_out_date = Some(date(2024, 12, 31));
        assert_eq!(planned.move_out_date_after(true, Some(None), today), None);
        assert_eq!(planned.move_out_date_after(true, None, today), Some(date(2024, 12, 31)));
    }
}
