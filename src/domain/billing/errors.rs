//! Billing error types.
//!
//! Every failure the checkout and confirmation paths can report, with the
//! HTTP status and gateway acknowledgement each one maps to.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ValidationError};

/// How the webhook boundary should answer the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayAck {
    /// Reply success; the gateway stops redelivering.
    Ack,
    /// Reply failure; the gateway redelivers later.
    Retry,
    /// Reply failure that redelivery cannot fix; needs a human.
    DoNotRetry,
}

#[derive(Debug, Clone, Error)]
pub enum BillingError {
    /// Malformed input. Nothing changed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No transaction kind is compatible with the membership and method.
    #[error("Intent rejected: {reason}")]
    IntentRejected { reason: String },

    /// The order was confirmed by an earlier delivery.
    #[error("Order {0} already confirmed")]
    DuplicateConfirmation(OrderId),

    /// Gateway charged a different amount than the order expects.
    #[error("Order {order_id} expects {expected} minor units but {paid} were paid")]
    AmountMismatch {
        order_id: OrderId,
        expected: i64,
        paid: i64,
    },

    /// Upgrade order arrived while the member already holds valid premium.
    #[error("Member {member} already has a valid premium membership")]
    DuplicateUpgrade { member: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Database, lock or timeout failure. Safe to retry.
    #[error("Transient infrastructure failure: {0}")]
    TransientInfra(String),
}

impl BillingError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        BillingError::IntentRejected {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => "VALIDATION_FAILED",
            BillingError::IntentRejected { .. } => "INTENT_REJECTED",
            BillingError::DuplicateConfirmation(_) => "DUPLICATE_CONFIRMATION",
            BillingError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            BillingError::DuplicateUpgrade { .. } => "DUPLICATE_UPGRADE",
            BillingError::NotFound { .. } => "NOT_FOUND",
            BillingError::TransientInfra(_) => "TRANSIENT_INFRA",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::TransientInfra(_))
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::IntentRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::DuplicateConfirmation(_) => StatusCode::OK,
            BillingError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BillingError::DuplicateUpgrade { .. } => StatusCode::CONFLICT,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::TransientInfra(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// What to tell the gateway that delivered the payment notification.
    pub fn gateway_ack(&self) -> GatewayAck {
        match self {
            BillingError::DuplicateConfirmation(_) | BillingError::DuplicateUpgrade { .. } => {
                GatewayAck::Ack
            }
            BillingError::TransientInfra(_) => GatewayAck::Retry,
            BillingError::Validation(_)
            | BillingError::IntentRejected { .. }
            | BillingError::AmountMismatch { .. }
            | BillingError::NotFound { .. } => GatewayAck::DoNotRetry,
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::OrderNotFound => {
                BillingError::not_found("order", detail_or_message(&err, "id"))
            }
            ErrorCode::MembershipNotFound => {
                BillingError::not_found("membership", detail_or_message(&err, "id"))
            }
            ErrorCode::AccountNotFound => {
                BillingError::not_found("account", detail_or_message(&err, "id"))
            }
            ErrorCode::PriceNotFound => {
                BillingError::not_found("price", detail_or_message(&err, "id"))
            }
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat
            | ErrorCode::InvalidStateTransition
            | ErrorCode::SerializationError => BillingError::Validation(
                ValidationError::invalid_format(detail_or_message(&err, "field"), err.message),
            ),
            ErrorCode::ConcurrencyConflict
            | ErrorCode::DatabaseError
            | ErrorCode::Timeout
            | ErrorCode::InternalError => BillingError::TransientInfra(err.to_string()),
        }
    }
}

fn detail_or_message(err: &DomainError, key: &str) -> String {
    err.details
        .get(key)
        .cloned()
        .unwrap_or_else(|| err.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn amount_mismatch_displays_both_amounts() {
        let order_id: OrderId = "FT00000000000000AA".parse().unwrap();
        let err = BillingError::AmountMismatch {
            order_id,
            expected: 29800,
            paid: 100,
        };
        assert_eq!(
            err.to_string(),
            "Order FT00000000000000AA expects 29800 minor units but 100 were paid"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability and acknowledgement
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn only_transient_infra_is_retryable() {
        assert!(BillingError::TransientInfra("timeout".into()).is_retryable());
        assert!(!BillingError::DuplicateConfirmation(OrderId::new()).is_retryable());
        assert!(!BillingError::rejected("nope").is_retryable());
    }

    #[test]
    fn duplicates_are_acknowledged() {
        assert_eq!(
            BillingError::DuplicateConfirmation(OrderId::new()).gateway_ack(),
            GatewayAck::Ack
        );
        assert_eq!(
            BillingError::DuplicateUpgrade {
                member: "m".into()
            }
            .gateway_ack(),
            GatewayAck::Ack
        );
        assert_eq!(
            BillingError::DuplicateConfirmation(OrderId::new()).status_code(),
            StatusCode::OK
        );
    }

    #[test]
    fn amount_mismatch_is_not_retried() {
        let err = BillingError::AmountMismatch {
            order_id: OrderId::new(),
            expected: 1,
            paid: 2,
        };
        assert_eq!(err.gateway_ack(), GatewayAck::DoNotRetry);
        assert!(err.status_code().is_client_error());
    }

    // ══════════════════════════════════════════════════════════════
    // DomainError conversion
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn database_errors_become_transient() {
        let err: BillingError = DomainError::database("connection refused").into();
        assert!(matches!(err, BillingError::TransientInfra(_)));
    }

    #[test]
    fn missing_order_becomes_not_found() {
        let err: BillingError = DomainError::new(ErrorCode::OrderNotFound, "Order not found")
            .with_detail("id", "FT0000000000000001")
            .into();
        match err {
            BillingError::NotFound { entity, id } => {
                assert_eq!(entity, "order");
                assert_eq!(id, "FT0000000000000001");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn validation_codes_become_validation() {
        let err: BillingError = DomainError::validation("email", "bad email").into();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
