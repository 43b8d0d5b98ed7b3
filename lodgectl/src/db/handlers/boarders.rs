//! Database repository for boarders.
//!
//! Any write that can change which room a boarder counts against runs in one transaction that
//! locks the boarder, then the affected rooms in id order, checks the destination still has a free
//! bed, writes the boarder and reconciles every touched room's status.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{
            repository::Repository,
            rooms::{Rooms, count_active_boarders, lock_rooms},
        },
        models::boarders::{Boarder, BoarderCreateDBRequest, BoarderDBResponse, BoarderUpdateDBRequest},
    },
    occupancy,
    types::{BoarderId, Operation, RoomId, abbrev_uuid},
};
use chrono::{NaiveDate, Utc};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing boarders
#[derive(Debug, Clone, Default)]
pub struct BoarderFilter {
    pub skip: i64,
    pub limit: i64,
    pub is_active: Option<bool>,
    pub room_id: Option<RoomId>,
    /// Matches name, email or phone
    pub search: Option<String>,
}

impl BoarderFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        if let Some(is_active) = self.is_active {
            query.push(" AND is_active = ");
            query.push_bind(is_active);
        }
        if let Some(room_id) = self.room_id {
            query.push(" AND room_id = ");
            query.push_bind(room_id);
        }
        if let Some(ref search) = self.search {
            let search_pattern = format!("%{}%", search.to_lowercase());
            query.push(" AND (LOWER(first_name || ' ' || last_name) LIKE ");
            query.push_bind(search_pattern.clone());
            query.push(" OR LOWER(email) LIKE ");
            query.push_bind(search_pattern.clone());
            query.push(" OR phone LIKE ");
            query.push_bind(search_pattern);
            query.push(")");
        }
    }
}

pub struct Boarders<'c> {
    db: &'c mut PgConnection,
}

/// Lock the destination room and make sure it has a free bed
async fn reserve_bed(conn: &mut PgConnection, rooms: &[RoomId], destination: RoomId) -> Result<()> {
    let locked = lock_rooms(conn, rooms).await?;
    let room = locked.get(&destination).ok_or_else(|| DbError::MissingReference {
        entity_type: "Room".to_string(),
        entity_id: destination.to_string(),
    })?;
    let active = count_active_boarders(conn, destination).await?;
    occupancy::can_accept_boarder(&room.room_number, room.status, room.capacity, active)?;
    Ok(())
}

#[async_trait::async_trait]
impl<'c> Repository for Boarders<'c> {
    type CreateRequest = BoarderCreateDBRequest;
    type UpdateRequest = BoarderUpdateDBRequest;
    type Response = BoarderDBResponse;
    type Id = BoarderId;
    type Filter = BoarderFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        if let Some(room_id) = request.room_id {
            reserve_bed(&mut tx, &[room_id], room_id).await?;
        }

        let boarder = sqlx::query_as::<_, Boarder>(
            r#"
            INSERT INTO boarders (
                id, first_name, last_name, email, phone, emergency_contact_name,
                emergency_contact_phone, move_in_date, access_code, room_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.emergency_contact_name)
        .bind(&request.emergency_contact_phone)
        .bind(request.move_in_date)
        .bind(&request.access_code)
        .bind(request.room_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(room_id) = boarder.room_id {
            Rooms::new(&mut tx).sync_status(room_id).await?;
        }

        tx.commit().await?;
        Ok(boarder)
    }

    #[instrument(skip(self), fields(boarder_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let boarder = sqlx::query_as::<_, Boarder>("SELECT * FROM boarders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(boarder)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<BoarderId>) -> Result<HashMap<Self::Id, BoarderDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let boarders = sqlx::query_as::<_, Boarder>("SELECT * FROM boarders WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&mut *self.db)
            .await?;
        Ok(boarders.into_iter().map(|b| (b.id, b)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new("SELECT * FROM boarders WHERE 1=1");
        filter.push_conditions(&mut query);

        query.push(" ORDER BY last_name ASC, first_name ASC, created_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let boarders = query.build_query_as::<Boarder>().fetch_all(&mut *self.db).await?;
        Ok(boarders)
    }

    /// Deletes the boarder and their payments, then frees their bed
    #[instrument(skip(self), fields(boarder_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let Some(boarder) = lock_boarder(&mut tx, id).await? else {
            return Ok(false);
        };
        if let Some(room_id) = boarder.occupied_room() {
            lock_rooms(&mut tx, &[room_id]).await?;
        }

        let result = sqlx::query("DELETE FROM boarders WHERE id = $1").bind(id).execute(&mut *tx).await?;

        if let Some(room_id) = boarder.occupied_room() {
            Rooms::new(&mut tx).sync_status(room_id).await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(boarder_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let current = lock_boarder(&mut tx, id).await?.ok_or(DbError::NotFound)?;
        if request.require_active && !current.is_active {
            return Err(already_moved_out(id));
        }

        let room_id = request.room_id.unwrap_or(current.room_id);
        let is_active = request.is_active.unwrap_or(current.is_active);
        let move_out_date = current.move_out_date_after(is_active, request.move_out_date, Utc::now().date_naive());
        let before = current.occupied_room();
        let after = if is_active { room_id } else { None };

        let touched: Vec<RoomId> = before.into_iter().chain(after).collect();
        match after {
            Some(destination) if after != before => reserve_bed(&mut tx, &touched, destination).await?,
            _ => {
                lock_rooms(&mut tx, &touched).await?;
            }
        }

        let boarder = sqlx::query_as::<_, Boarder>(
            r#"
            UPDATE boarders SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                emergency_contact_name = CASE WHEN $6 THEN $7 ELSE emergency_contact_name END,
                emergency_contact_phone = CASE WHEN $8 THEN $9 ELSE emergency_contact_phone END,
                move_in_date = COALESCE($10, move_in_date),
                move_out_date = $11,
                is_active = $12,
                room_id = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(request.emergency_contact_name.is_some())
        .bind(request.emergency_contact_name.clone().flatten())
        .bind(request.emergency_contact_phone.is_some())
        .bind(request.emergency_contact_phone.clone().flatten())
        .bind(request.move_in_date)
        .bind(move_out_date)
        .bind(is_active)
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut rooms = Rooms::new(&mut tx);
        for room_id in touched {
            rooms.sync_status(room_id).await?;
        }

        tx.commit().await?;
        Ok(boarder)
    }
}

impl<'c> Boarders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Count boarders matching the filter
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &BoarderFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM boarders WHERE 1=1");
        filter.push_conditions(&mut query);

        let count: (i64,) = query.build_query_as().fetch_one(&mut *self.db).await?;
        Ok(count.0)
    }

    /// Every boarder, for aggregate statistics
    #[instrument(skip(self), err)]
    pub async fn list_all(&mut self) -> Result<Vec<Boarder>> {
        let boarders = sqlx::query_as::<_, Boarder>("SELECT * FROM boarders ORDER BY created_at ASC")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(boarders)
    }

    /// Places an active boarder in a room, moving them out of their current one
    #[instrument(skip(self), fields(boarder_id = %abbrev_uuid(&id), room_id = %abbrev_uuid(&room_id)), err)]
    pub async fn assign_room(&mut self, id: BoarderId, room_id: RoomId) -> Result<Boarder> {
        let request = BoarderUpdateDBRequest {
            room_id: Some(Some(room_id)),
            require_active: true,
            ..Default::default()
        };
        self.update(id, &request).await
    }

    /// Deactivates a boarder and frees their bed. The room stays on record as their last room.
    #[instrument(skip(self), fields(boarder_id = %abbrev_uuid(&id)), err)]
    pub async fn move_out(&mut self, id: BoarderId, move_out_date: NaiveDate) -> Result<Boarder> {
        let request = BoarderUpdateDBRequest {
            is_active: Some(false),
            move_out_date: Some(Some(move_out_date)),
            require_active: true,
            ..Default::default()
        };
        self.update(id, &request).await
    }

    /// Looks up the active boarder holding this access code
    #[instrument(skip(self, access_code), err)]
    pub async fn get_by_access_code(&mut self, access_code: &str) -> Result<Option<Boarder>> {
        let boarder = sqlx::query_as::<_, Boarder>("SELECT * FROM boarders WHERE access_code = $1 AND is_active")
            .bind(access_code)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(boarder)
    }

    #[instrument(skip(self, access_code), fields(boarder_id = %abbrev_uuid(&id)), err)]
    pub async fn set_access_code(&mut self, id: BoarderId, access_code: &str) -> Result<Boarder> {
        let boarder = sqlx::query_as::<_, Boarder>(
            "UPDATE boarders SET access_code = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(access_code)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(boarder)
    }
}

fn already_moved_out(id: BoarderId) -> DbError {
    DbError::ProtectedEntity {
        operation: Operation::Update,
        reason: "boarder has already moved out".to_string(),
        entity_type: "boarder".to_string(),
        entity_id: Some(id.to_string()),
    }
}

async fn lock_boarder(conn: &mut PgConnection, id: BoarderId) -> Result<Option<Boarder>> {
    let boarder = sqlx::query_as::<_, Boarder>("SELECT * FROM boarders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(boarder)
}
