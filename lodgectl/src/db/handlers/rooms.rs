//! Database repository for rooms.
//!
//! Every read returns the room together with its live active-boarder count. Writes that can change
//! occupancy lock the room row first, recount, and store the reconciled status in the same
//! transaction.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::rooms::{Room, RoomCreateDBRequest, RoomDBResponse, RoomOccupancy, RoomStatus, RoomUpdateDBRequest},
    },
    occupancy,
    types::{Operation, RoomId, abbrev_uuid},
};
use rust_decimal::Decimal;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const ROOM_WITH_OCCUPANCY: &str = "SELECT r.*, \
     (SELECT COUNT(*) FROM boarders b WHERE b.room_id = r.id AND b.is_active) AS active_boarders \
     FROM rooms r WHERE 1=1";

/// Filter for listing rooms
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<RoomStatus>,
    pub floor: Option<i32>,
    pub min_capacity: Option<i32>,
    pub max_rate: Option<Decimal>,
    pub amenity: Option<String>,
    pub search: Option<String>,
}

impl RoomFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(status) = self.status {
            query.push(" AND r.status = ");
            query.push_bind(status);
        }
        if let Some(floor) = self.floor {
            query.push(" AND r.floor = ");
            query.push_bind(floor);
        }
        if let Some(min_capacity) = self.min_capacity {
            query.push(" AND r.capacity >= ");
            query.push_bind(min_capacity);
        }
        if let Some(max_rate) = self.max_rate {
            query.push(" AND r.monthly_rate <= ");
            query.push_bind(max_rate);
        }
        if let Some(ref amenity) = self.amenity {
            query.push(" AND ");
            query.push_bind(amenity.clone());
            query.push(" = ANY(r.amenities)");
        }
        if let Some(ref search) = self.search {
            let search_pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (LOWER(r.room_number) LIKE ");
            query.push_bind(search_pattern.clone());
            query.push(" OR LOWER(COALESCE(r.description, '')) LIKE ");
            query.push_bind(search_pattern);
            query.push(")");
        }
    }
}

pub struct Rooms<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Rooms<'c> {
    type CreateRequest = RoomCreateDBRequest;
    type UpdateRequest = RoomUpdateDBRequest;
    type Response = RoomDBResponse;
    type Id = RoomId;
    type Filter = RoomFilter;

    #[instrument(skip(self, request), fields(room_number = %request.room_number), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // A new room has nobody in it yet
        let status = match request.status {
            Some(RoomStatus::Maintenance) => RoomStatus::Maintenance,
            _ => occupancy::derive_status(request.capacity, 0),
        };

        let room = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (id, room_number, floor, capacity, monthly_rate, amenities, description, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.room_number)
        .bind(request.floor)
        .bind(request.capacity)
        .bind(request.monthly_rate)
        .bind(&request.amenities)
        .bind(&request.description)
        .bind(status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(RoomOccupancy { room, active_boarders: 0 })
    }

    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let mut query = QueryBuilder::new(ROOM_WITH_OCCUPANCY);
        query.push(" AND r.id = ");
        query.push_bind(id);

        let room = query.build_query_as::<RoomOccupancy>().fetch_optional(&mut *self.db).await?;
        Ok(room)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<RoomId>) -> Result<HashMap<Self::Id, RoomDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::new(ROOM_WITH_OCCUPANCY);
        query.push(" AND r.id = ANY(");
        query.push_bind(ids);
        query.push(")");

        let rooms = query.build_query_as::<RoomOccupancy>().fetch_all(&mut *self.db).await?;
        Ok(rooms.into_iter().map(|r| (r.room.id, r)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(ROOM_WITH_OCCUPANCY);
        filter.push_conditions(&mut query);

        query.push(" ORDER BY r.floor ASC, r.room_number ASC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let rooms = query.build_query_as::<RoomOccupancy>().fetch_all(&mut *self.db).await?;
        Ok(rooms)
    }

    /// Refuses to delete a room that still has active boarders. Inactive boarders keep their
    /// history and are detached by the foreign key.
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        if lock_room(&mut *tx, id).await?.is_none() {
            return Ok(false);
        }
        let active = count_active_boarders(&mut *tx, id).await?;
        if active > 0 {
            return Err(DbError::ProtectedEntity {
                operation: Operation::Delete,
                reason: format!("{active} active boarders still assigned"),
                entity_type: "room".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        let result = sqlx::query("DELETE FROM rooms WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(room_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let current = lock_room(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        let active = count_active_boarders(&mut *tx, id).await?;

        let capacity = request.capacity.unwrap_or(current.capacity);
        if i64::from(capacity) < active {
            return Err(DbError::ProtectedEntity {
                operation: Operation::Update,
                reason: format!("capacity {capacity} is below the {active} active boarders assigned"),
                entity_type: "room".to_string(),
                entity_id: Some(id.to_string()),
            });
        }

        // Asking for AVAILABLE or OCCUPIED clears maintenance; the count decides which one sticks
        let status = match request.status {
            Some(RoomStatus::Maintenance) => RoomStatus::Maintenance,
            Some(_) => occupancy::derive_status(capacity, active),
            None => occupancy::reconcile_status(current.status, capacity, active),
        };

        let room = sqlx::query_as::<_, Room>(
            r#"
            UPDATE rooms SET
                room_number = COALESCE($2, room_number),
                floor = COALESCE($3, floor),
                capacity = $4,
                monthly_rate = COALESCE($5, monthly_rate),
                amenities = COALESCE($6, amenities),
                description = CASE WHEN $7 THEN $8 ELSE description END,
                status = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.room_number)
        .bind(request.floor)
        .bind(capacity)
        .bind(request.monthly_rate)
        .bind(&request.amenities)
        .bind(request.description.is_some())
        .bind(request.description.clone().flatten())
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RoomOccupancy {
            room,
            active_boarders: active,
        })
    }
}

impl<'c> Rooms<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count rooms matching the filter
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &RoomFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM rooms r WHERE 1=1");
        filter.push_conditions(&mut query);

        let count: (i64,) = query.build_query_as().fetch_one(&mut *self.db).await?;
        Ok(count.0)
    }

    /// Every room with its occupancy, for aggregate statistics
    #[instrument(skip(self), err)]
    pub async fn list_all(&mut self) -> Result<Vec<RoomOccupancy>> {
        let mut query = QueryBuilder::new(ROOM_WITH_OCCUPANCY);
        query.push(" ORDER BY r.floor ASC, r.room_number ASC");

        let rooms = query.build_query_as::<RoomOccupancy>().fetch_all(&mut *self.db).await?;
        Ok(rooms)
    }

    /// Recount the room's active boarders and store the reconciled status.
    ///
    /// Must run inside the transaction that changed the assignment.
    #[instrument(skip(self), fields(room_id = %abbrev_uuid(&id)), err)]
    pub async fn sync_status(&mut self, id: RoomId) -> Result<RoomStatus> {
        let room = lock_room(&mut *self.db, id).await?.ok_or(DbError::NotFound)?;
        let active = count_active_boarders(&mut *self.db, id).await?;
        let status = occupancy::reconcile_status(room.status, room.capacity, active);

        if status != room.status {
            sqlx::query("UPDATE rooms SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&mut *self.db)
                .await?;
            tracing::debug!(room_number = %room.room_number, from = ?room.status, to = ?status, active, "Room status reconciled");
        }

        Ok(status)
    }
}

/// `SELECT ... FOR UPDATE` on one room. Returns `None` if it does not exist.
pub(crate) async fn lock_room(conn: &mut PgConnection, id: RoomId) -> Result<Option<Room>> {
    let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(room)
}

/// Locks several rooms in id order so concurrent moves between the same rooms cannot deadlock
pub(crate) async fn lock_rooms(conn: &mut PgConnection, ids: &[RoomId]) -> Result<HashMap<RoomId, Room>> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();

    let mut locked = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(room) = lock_room(conn, id).await? {
            locked.insert(id, room);
        }
    }
    Ok(locked)
}

pub(crate) async fn count_active_boarders(conn: &mut PgConnection, id: RoomId) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM boarders WHERE room_id = $1 AND is_active")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count.0)
}
