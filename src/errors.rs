use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned on every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional error details (validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Duplicate LPN: {0}")]
    DuplicateLpn(String),

    #[error("Over-pick: {0}")]
    OverPick(String),

    #[error("Quantity mismatch: {0}")]
    QuantityMismatch(String),

    #[error("Empty selection: wave requires at least one outbound order")]
    EmptySelection,

    #[error("Order not pickable: {0}")]
    OrderNotPickable(Uuid),

    #[error("Invalid reservation token: {0}")]
    InvalidToken(Uuid),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Order not picked: {0}")]
    OrderNotPicked(Uuid),

    #[error("Empty shipment: {0}")]
    EmptyShipment(Uuid),

    #[error("Shipment not packed: {0}")]
    ShipmentNotPacked(Uuid),

    #[error("Empty load: {0}")]
    EmptyLoad(Uuid),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Inspection not failed: {0}")]
    InspectionNotFailed(Uuid),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::EmptySelection | Self::InvalidReference(_) => {
                StatusCode::BAD_REQUEST
            }
            // Conflict-class errors: a legitimate concurrent-state mismatch that
            // the caller must resolve (retry, operator decision).
            Self::Conflict(_)
            | Self::DuplicateLpn(_)
            | Self::OverPick(_)
            | Self::QuantityMismatch(_)
            | Self::OrderNotPickable(_)
            | Self::InvalidToken(_)
            | Self::InvalidStateTransition(_)
            | Self::OrderNotPicked(_)
            | Self::EmptyShipment(_)
            | Self::ShipmentNotPacked(_)
            | Self::EmptyLoad(_)
            | Self::InspectionNotFailed(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) | Self::CapacityExceeded(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvariantViolation(_) | Self::EventError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::InvariantViolation(_) | Self::EventError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Invariant breaches are programming-contract failures: log loudly,
        // never swallow.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error while handling request");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_class_errors_surface_for_retry() {
        assert_eq!(
            ServiceError::OverPick("task".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::DuplicateLpn("LPN-00000001".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InsufficientStock("short".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::CapacityExceeded("full".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::InvariantViolation("reserved went negative".into());
        assert_eq!(err.response_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
