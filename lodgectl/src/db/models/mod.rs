//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Models derive `sqlx::FromRow` for query results
//! - **Separation**: Database models are distinct from API models to allow
//!   independent evolution of storage and API representations
//! - **Fixed point money**: every amount, rate and meter value is a [`rust_decimal::Decimal`]
//!
//! # Models
//!
//! - [`rooms`]: Rooms and their occupancy status
//! - [`boarders`]: Boarders, their room assignment and access codes
//! - [`payments`]: Rent, utility, deposit and other charges
//! - [`utility_readings`]: Meter snapshots used for consumption billing

pub mod boarders;
pub mod payments;
pub mod rooms;
pub mod utility_readings;
