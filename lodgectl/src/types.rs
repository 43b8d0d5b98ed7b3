//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for readability:
//!
//! - [`RoomId`]: Room identifier
//! - [`BoarderId`]: Boarder identifier
//! - [`PaymentId`]: Payment identifier
//! - [`UtilityReadingId`]: Utility reading identifier
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use std::fmt;
use uuid::Uuid;

// Type aliases for IDs
pub type RoomId = Uuid;
pub type BoarderId = Uuid;
pub type PaymentId = Uuid;
pub type UtilityReadingId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Operations that protection rules can refuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Delete.to_string(), "delete");
        assert_eq!(format!("Cannot {} room", Operation::Update), "Cannot update room");
    }
}
