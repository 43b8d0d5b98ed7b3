//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource. Each one validates its input, runs the operation through
//! the database repositories and the pure rules in [`crate::billing`] and [`crate::occupancy`],
//! then shapes the response models in [`crate::api::models`].
//!
//! - [`rooms`]: room CRUD and room statistics
//! - [`boarders`]: boarder CRUD, room assignment, move-out, access codes and statistics
//! - [`payments`]: payment CRUD, settlement, cancellation, statistics and the total calculator
//! - [`utility_readings`]: meter reading CRUD and consumption summaries
//! - [`dashboard`]: combined statistics
//! - [`portal`]: self-service views for a boarder identified by access code
//!
//! Errors are returned as [`crate::errors::Error`], which maps to a status code and a JSON
//! `{ "message": ... }` body.

pub mod boarders;
pub mod dashboard;
pub mod payments;
pub mod portal;
pub mod rooms;
pub mod utility_readings;

use chrono::{NaiveDate, Utc};

/// The current date in UTC. Overdue checks and defaulted dates are relative to it.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
