//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The primary error type for the platform:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages (these end up in the dedup ledger's
///   `error_message` column on failed fulfillments)
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create an invalid-metadata error
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidMetadata, msg)
    }

    /// Create a stock-insufficient error for a ticket type
    pub fn stock_insufficient(ticket_type_id: impl Into<String>) -> Self {
        let t = ticket_type_id.into();
        Self::with_message(
            ErrorCode::StockInsufficient,
            format!("insufficient stock for ticket type {}", t),
        )
        .with_detail("ticket_type_id", t)
    }

    /// Create a ticket-type-not-found error
    pub fn ticket_type_not_found(ticket_type_id: impl Into<String>) -> Self {
        let t = ticket_type_id.into();
        Self::with_message(
            ErrorCode::TicketTypeNotFound,
            format!("ticket type {} not found", t),
        )
        .with_detail("ticket_type_id", t)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a pairing-not-found error
    pub fn pairing_not_found(pairing_id: impl Into<String>) -> Self {
        let p = pairing_id.into();
        Self::with_message(ErrorCode::PairingNotFound, format!("pairing {} not found", p))
            .with_detail("pairing_id", p)
    }

    /// Create a slot-not-found error
    pub fn slot_not_found(slot_id: impl Into<String>) -> Self {
        let s = slot_id.into();
        Self::with_message(ErrorCode::SlotNotFound, format!("slot {} not found", s))
            .with_detail("slot_id", s)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Create a gateway API error
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::GatewayError, msg)
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }
}

/// Unified API response structure
///
/// Provides a consistent response format for all API endpoints:
/// - `code`: Error code (0 for success)
/// - `message`: Human-readable message
/// - `data`: Response payload (on success)
/// - `details`: Additional error details (on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Error code (0 for success, non-zero for errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human-readable message
    pub message: String,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response without data
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            message: "OK".to_string(),
            data: None,
            details: None,
        }
    }

    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        // Log system errors
        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        use super::codes::ErrorCode;
        use axum::Json;

        let status = if self.code == Some(0) || self.code.is_none() {
            http::StatusCode::OK
        } else {
            ErrorCode::try_from(self.code.unwrap_or(1))
                .map(|c| c.http_status())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
        };

        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::StockInsufficient);
        assert_eq!(err.code, ErrorCode::StockInsufficient);
        assert_eq!(err.message, "Insufficient inventory remaining");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_message() {
        let err = AppError::with_message(ErrorCode::InvalidMetadata, "items is not a JSON array");
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
        assert_eq!(err.message, "items is not a JSON array");
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::invalid_metadata("missing required key")
            .with_detail("key", "purchaseId")
            .with_detail("scenario", "GROUP_SPLIT");

        assert_eq!(err.code, ErrorCode::InvalidMetadata);
        let details = err.details.unwrap();
        assert_eq!(details.get("key").unwrap(), "purchaseId");
        assert_eq!(details.get("scenario").unwrap(), "GROUP_SPLIT");
    }

    #[test]
    fn test_app_error_http_status() {
        assert_eq!(
            AppError::new(ErrorCode::PairingNotFound).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::new(ErrorCode::SignatureInvalid).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::new(ErrorCode::StockInsufficient).http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::stock_insufficient("tt_123");
        assert_eq!(err.code, ErrorCode::StockInsufficient);
        assert_eq!(err.message, "insufficient stock for ticket type tt_123");
        assert!(err.details.as_ref().unwrap().contains_key("ticket_type_id"));

        let err = AppError::pairing_not_found("pr_9");
        assert_eq!(err.code, ErrorCode::PairingNotFound);
        assert_eq!(err.message, "pairing pr_9 not found");

        let err = AppError::slot_not_found("sl_1");
        assert_eq!(err.code, ErrorCode::SlotNotFound);

        let err = AppError::internal("Something went wrong");
        assert_eq!(err.code, ErrorCode::InternalError);

        let err = AppError::gateway("balance lookup 502");
        assert_eq!(err.code, ErrorCode::GatewayError);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::SlotNotFound, "slot sl_42 not found");
        assert_eq!(format!("{}", err), "slot sl_42 not found");
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(42);
        assert_eq!(response.code, Some(0));
        assert_eq!(response.message, "OK");
        assert_eq!(response.data, Some(42));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let err = AppError::with_message(ErrorCode::PairingNotFound, "pairing pr_1 not found")
            .with_detail("pairing_id", "pr_1");
        let response = ApiResponse::<()>::error(&err);

        assert_eq!(response.code, Some(4001));
        assert_eq!(response.message, "pairing pr_1 not found");
        assert!(response.data.is_none());
        assert!(response.details.is_some());
    }

    #[test]
    fn test_api_response_from_error() {
        let err = AppError::new(ErrorCode::InternalError);
        let response: ApiResponse<String> = err.into();

        assert_eq!(response.code, Some(9001));
        assert_eq!(response.message, "Internal server error");
        assert!(response.data.is_none());
    }

    #[test]
    fn test_api_response_serialize() {
        let response = ApiResponse::success("hello");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":0"));
        assert!(json.contains("\"message\":\"OK\""));
        assert!(json.contains("\"data\":\"hello\""));
    }
}
