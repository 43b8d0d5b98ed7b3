//! Base repository trait for database operations.

use std::collections::HashMap;

/// Contains the Repository trait.
///
/// A repository is the data access layer for one table. It creates, reads, updates and deletes
/// rows and lists them with simple filters. Repositories that touch room occupancy open their own
/// transaction (a savepoint when the caller already holds one) so the room status is written
/// together with the change that caused it.
use crate::db::errors::Result;

/// Base repository trait providing common database operations
///
/// This trait has separate associated types for create requests, update requests, and responses.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Fetch many entities by ID, keyed by ID. Missing IDs are simply absent.
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Delete an entity by ID, returning whether a row was removed
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
