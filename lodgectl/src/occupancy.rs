//! Room occupancy rules.
//!
//! A room's status is a function of its capacity and the number of *active* boarders assigned to
//! it. The functions here are pure; the repositories call them inside the transaction that
//! changes an assignment so the stored status never drifts from the count.
//!
//! `MAINTENANCE` is the one status that is never derived. An operator sets it and clears it, and
//! reconciliation leaves it alone in between.

use crate::db::models::rooms::RoomStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Why a room cannot take another boarder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OccupancyError {
    #[error("Room {room_number} is under maintenance")]
    UnderMaintenance { room_number: String },

    #[error("Room {room_number} is full (capacity {capacity})")]
    Full { room_number: String, capacity: i32 },
}

/// Status implied by the active boarder count alone.
///
/// A room with no capacity can never take anyone, so it is reported as occupied.
pub fn derive_status(capacity: i32, active_count: i64) -> RoomStatus {
    if active_count >= i64::from(capacity) {
        RoomStatus::Occupied
    } else {
        RoomStatus::Available
    }
}

/// Status to store after the active count changed. Maintenance sticks.
pub fn reconcile_status(current: RoomStatus, capacity: i32, active_count: i64) -> RoomStatus {
    match current {
        RoomStatus::Maintenance => RoomStatus::Maintenance,
        _ => derive_status(capacity, active_count),
    }
}

pub fn available_slots(capacity: i32, active_count: i64) -> i32 {
    let free = i64::from(capacity) - active_count;
    i32::try_from(free.max(0)).unwrap_or(i32::MAX)
}

/// Percentage of beds taken, rounded to two decimal places
pub fn occupancy_rate(occupied_beds: i64, total_capacity: i64) -> Decimal {
    if total_capacity <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(occupied_beds) * Decimal::ONE_HUNDRED / Decimal::from(total_capacity)).round_dp(2)
}

/// Checks whether one more active boarder fits in the room
pub fn can_accept_boarder(room_number: &str, status: RoomStatus, capacity: i32, active_count: i64) -> Result<(), OccupancyError> {
    if status == RoomStatus::Maintenance {
        return Err(OccupancyError::UnderMaintenance {
            room_number: room_number.to_string(),
        });
    }
    if available_slots(capacity, active_count) == 0 {
        return Err(OccupancyError::Full {
            room_number: room_number.to_string(),
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_status_full_iff_count_reaches_capacity() {
        for capacity in 1..=6 {
            for count in 0..=i64::from(capacity) {
                let expected = if count >= i64::from(capacity) {
                    RoomStatus::Occupied
                } else {
                    RoomStatus::Available
                };
                assert_eq!(derive_status(capacity, count), expected, "capacity={capacity} count={count}");
            }
        }
    }

    #[test]
    fn test_zero_capacity_is_always_occupied() {
        assert_eq!(derive_status(0, 0), RoomStatus::Occupied);
        assert_eq!(available_slots(0, 0), 0);
    }

    #[test]
    fn test_room_frees_up_when_boarder_leaves() {
        assert_eq!(reconcile_status(RoomStatus::Occupied, 2, 1), RoomStatus::Available);
        assert_eq!(reconcile_status(RoomStatus::Available, 2, 2), RoomStatus::Occupied);
    }

    #[test]
    fn test_maintenance_survives_reconciliation() {
        assert_eq!(reconcile_status(RoomStatus::Maintenance, 2, 0), RoomStatus::Maintenance);
        assert_eq!(reconcile_status(RoomStatus::Maintenance, 2, 2), RoomStatus::Maintenance);
    }

    #[test]
    fn test_available_slots_saturates() {
        assert_eq!(available_slots(4, 1), 3);
        assert_eq!(available_slots(2, 5), 0);
    }

    #[test]
    fn test_occupancy_rate() {
        assert_eq!(occupancy_rate(3, 4), Decimal::new(75, 0));
        assert_eq!(occupancy_rate(1, 3), Decimal::new(3333, 2));
        assert_eq!(occupancy_rate(5, 0), Decimal::ZERO);
    }

    #[test]
    fn test_can_accept_boarder() {
        assert!(can_accept_boarder("101", RoomStatus::Available, 2, 1).is_ok());
        assert_eq!(
            can_accept_boarder("101", RoomStatus::Occupied, 2, 2),
            Err(OccupancyError::Full {
                room_number: "101".to_string(),
                capacity: 2
            })
        );
        assert_eq!(
            can_accept_boarder("102", RoomStatus::Maintenance, 2, 0),
            Err(OccupancyError::UnderMaintenance {
                room_number: "102".to_string()
            })
        );
    }
}
