//! Repository implementations for database access.
//!
//! This module provides repository structs for each table. Repositories follow a consistent
//! pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Builds filtered listings with [`sqlx::QueryBuilder`]
//! - Returns models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Rooms`]: Rooms, their live occupancy and status reconciliation
//! - [`Boarders`]: Boarders, room assignment, move-out and access codes
//! - [`Payments`]: Charges, settlement and cancellation
//! - [`UtilityReadings`]: Meter readings
//!
//! # Common Pattern
//!
//! ```ignore
//! use lodgectl::db::handlers::{Boarders, Repository};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Boarders::new(&mut tx);
//!
//!     let boarder = repo.assign_room(boarder_id, room_id).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod boarders;
pub mod payments;
pub mod repository;
pub mod rooms;
pub mod utility_readings;

pub use boarders::Boarders;
pub use payments::Payments;
pub use repository::Repository;
pub use rooms::Rooms;
pub use utility_readings::UtilityReadings;
