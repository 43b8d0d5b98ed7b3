//! Room, boarder and dashboard aggregates.

use super::payments::{self, PaymentStats};
use crate::db::models::{
    boarders::Boarder,
    payments::Payment,
    rooms::{RoomOccupancy, RoomStatus},
};
use crate::occupancy;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoomStats {
    pub total_rooms: u64,
    pub available: u64,
    pub occupied: u64,
    pub maintenance: u64,
    pub total_capacity: i64,
    pub occupied_beds: i64,
    pub available_beds: i64,
    /// Occupied beds over total capacity, as a percentage
    #[schema(value_type = String)]
    pub occupancy_rate: Decimal,
}

pub fn room_stats(rooms: &[RoomOccupancy]) -> RoomStats {
    let mut stats = RoomStats::default();
    for entry in rooms {
        stats.total_rooms += 1;
        match entry.room.status {
            RoomStatus::Available => stats.available += 1,
            RoomStatus::Occupied => stats.occupied += 1,
            RoomStatus::Maintenance => stats.maintenance += 1,
        }
        stats.total_capacity += i64::from(entry.room.capacity);
        stats.occupied_beds += entry.active_boarders;
        // Beds in a room under maintenance cannot be let
        if entry.room.status != RoomStatus::Maintenance {
            stats.available_beds += i64::from(occupancy::available_slots(entry.room.capacity, entry.active_boarders));
        }
    }
    stats.occupancy_rate = occupancy::occupancy_rate(stats.occupied_beds, stats.total_capacity);
    stats
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BoarderStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Active boarders not yet placed in a room
    pub active_without_room: u64,
}

pub fn boarder_stats(boarders: &[Boarder]) -> BoarderStats {
    let mut stats = BoarderStats::default();
    for boarder in boarders {
        stats.total += 1;
        if boarder.is_active {
            stats.active += 1;
            if boarder.room_id.is_none() {
                stats.active_without_room += 1;
            }
        } else {
            stats.inactive += 1;
        }
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub rooms: RoomStats,
    pub boarders: BoarderStats,
    pub payments: PaymentStats,
    /// Money received so far in the current calendar month
    #[schema(value_type = String)]
    pub revenue_this_month: Decimal,
    /// ISO 4217 code amounts are denominated in
    pub currency: String,
    pub as_of: NaiveDate,
}

pub fn dashboard_stats(
    rooms: &[RoomOccupancy],
    boarders: &[Boarder],
    all_payments: &[Payment],
    currency: &str,
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        rooms: room_stats(rooms),
        boarders: boarder_stats(boarders),
        payments: payments::summarize_payments(all_payments, today),
        revenue_this_month: payments::collected_in_month(all_payments, today),
        currency: currency.to_string(),
        as_of: today,
    }
}
