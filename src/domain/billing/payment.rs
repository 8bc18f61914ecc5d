//! Normalized payment results reported by gateways.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{OrderId, Timestamp, ValidationError};

/// Gateway-reported state of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    /// Created but not yet paid (WeChat `NOTPAY`, Alipay `WAIT_BUYER_PAY`).
    Pending,
    Failed,
    Refunded,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Paid => "paid",
            PaymentState::Pending => "pending",
            PaymentState::Failed => "failed",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentState::Paid),
            "pending" => Ok(PaymentState::Pending),
            "failed" => Ok(PaymentState::Failed),
            "refunded" => Ok(PaymentState::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_state",
                format!("unknown state '{}'", other),
            )),
        }
    }
}

/// A gateway notification or poll response, already parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub order_id: OrderId,
    pub state: PaymentState,
    pub charged_minor: i64,
    pub transaction_id: String,
    pub confirmed_at: Timestamp,
    /// Raw gateway payload, kept for audit logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<JsonValue>,
}

impl PaymentResult {
    pub fn paid(
        order_id: OrderId,
        charged_minor: i64,
        transaction_id: impl Into<String>,
        confirmed_at: Timestamp,
    ) -> Self {
        Self {
            order_id,
            state: PaymentState::Paid,
            charged_minor,
            transaction_id: transaction_id.into(),
            confirmed_at,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: JsonValue) -> Self {
        self.raw = Some(raw);
        self
    }
}
