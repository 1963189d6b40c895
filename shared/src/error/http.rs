//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::UserNotFound
            | Self::TicketTypeNotFound
            | Self::PairingNotFound
            | Self::SlotNotFound
            | Self::GuaranteeNotFound
            | Self::SaleNotFound
            | Self::PromoCodeNotFound
            | Self::ListingNotFound
            | Self::OperationNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::SlotAlreadyPaid
            | Self::PaymentAlreadyRefunded
            | Self::IdempotencyKeyMismatch
            | Self::DuplicateEvent => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::SignatureInvalid => StatusCode::UNAUTHORIZED,

            // 410 Gone (open slot no longer claimable)
            Self::PairingCancelled | Self::HoldExpired | Self::ListingNotActive => {
                StatusCode::GONE
            }

            // 422 Unprocessable (business-rule violations)
            Self::StockInsufficient
            | Self::PairingNotSplit
            | Self::PairingNotFull
            | Self::PromoExhausted
            | Self::AmountMismatch => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable (transient errors, caller can retry)
            Self::OrgNotResolved
            | Self::NetworkError
            | Self::TimeoutError
            | Self::GatewayError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::OperationDeadLettered => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/metadata errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::PairingNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::SlotNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::TicketTypeNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::AlreadyExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::SlotAlreadyPaid.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::PaymentAlreadyRefunded.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(
            ErrorCode::SignatureInvalid.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_business_rule_status() {
        assert_eq!(
            ErrorCode::StockInsufficient.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::PairingNotSplit.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::AmountMismatch.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_gone_status() {
        assert_eq!(ErrorCode::PairingCancelled.http_status(), StatusCode::GONE);
        assert_eq!(ErrorCode::HoldExpired.http_status(), StatusCode::GONE);
    }

    #[test]
    fn test_service_unavailable_status() {
        assert_eq!(
            ErrorCode::OrgNotResolved.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::NetworkError.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::GatewayError.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::InvalidMetadata.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::UnknownScenario.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidBreakdown.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
