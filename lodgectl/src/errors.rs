use crate::billing::BillingError;
use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Access code missing, unknown or belonging to an inactive boarder
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Request conflicts with the current state of a resource
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound | DbError::MissingReference { .. } => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::ProtectedEntity { .. } => StatusCode::CONFLICT,
                DbError::RoomUnavailable(_) => StatusCode::CONFLICT,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "A valid access code is required".to_string()),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::MissingReference { entity_type, entity_id } => format!("{entity_type} with ID {entity_id} not found"),
                DbError::UniqueViolation { constraint, .. } => match constraint.as_deref() {
                    Some("rooms_room_number_unique") => "A room with this room number already exists".to_string(),
                    Some("boarders_email_unique") => "A boarder with this email address already exists".to_string(),
                    Some("boarders_access_code_unique") => "Access code collision, please try again".to_string(),
                    Some("payments_receipt_number_unique") => "Receipt number collision, please try again".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { constraint, .. } => match constraint.as_deref() {
                    Some("boarders_move_out_after_move_in") => "Move-out date cannot be before the move-in date".to_string(),
                    Some("utility_readings_period_order") => "Billing period start must not be after its end".to_string(),
                    _ => "Invalid data provided".to_string(),
                },
                DbError::ProtectedEntity {
                    operation,
                    entity_type,
                    reason,
                    ..
                } => format!("Cannot {operation} {entity_type}: {reason}"),
                DbError::RoomUnavailable(e) => e.to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "message": self.user_message() });
        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for Error {
    fn from(err: BillingError) -> Self {
        Error::BadRequest { message: err.to_string() }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::OccupancyError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::BadRequest { message: "x".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::Unauthenticated { message: None }.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Database(DbError::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Database(DbError::RoomUnavailable(OccupancyError::UnderMaintenance {
                room_number: "101".into()
            }))
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = Error::Other(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.user_message(), "Internal server error");

        let err = Error::Database(DbError::UniqueViolation {
            constraint: Some("rooms_room_number_unique".to_string()),
            table: Some("rooms".to_string()),
            message: "duplicate key value violates unique constraint".to_string(),
        });
        assert_eq!(err.user_message(), "A room with this room number already exists");
    }

    #[test]
    fn test_missing_reference_is_not_found() {
        let err = Error::Database(DbError::MissingReference {
            entity_type: "Room".to_string(),
            entity_id: "8d0f".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Room with ID 8d0f not found");
    }

    #[test]
    fn test_billing_error_is_bad_request() {
        let err: Error = BillingError::OverdueNotStorable.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
