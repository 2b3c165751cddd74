//! Provider outcomes returned through the dispatcher unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PaymentError;

/// Lifecycle state of a payment as reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting customer action or manual reconciliation.
    Pending,
    /// Accepted by the processor, not yet settled.
    Processing,
    /// Funds captured.
    Completed,
    /// Funds returned to the customer.
    Refunded,
    /// Processor declined or the call failed.
    Failed,
    /// Customer or merchant abandoned the payment.
    Cancelled,
}

impl PaymentStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Bank details the customer needs to complete a manual transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInstructions {
    /// Name on the receiving account.
    pub account_holder: String,
    /// Receiving IBAN.
    pub iban: String,
    /// Receiving BIC/SWIFT code.
    pub bic: String,
    /// Receiving bank name.
    pub bank_name: String,
    /// Amount to transfer.
    pub amount: Decimal,
    /// ISO 4217 currency.
    pub currency: String,
    /// Reference the customer must quote.
    pub reference: String,
}

/// Outcome of a process, refund, or status call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Whether the call itself succeeded. A pending payment is a success.
    pub success: bool,
    /// Payment lifecycle state.
    pub status: PaymentStatus,
    /// Provider or synthetic transaction identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Human-readable summary.
    pub message: String,
    /// Where to send the customer next, for redirect-based methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Manual transfer details, for bank transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<TransferInstructions>,
    /// Free-form provider data.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl PaymentResult {
    fn new(success: bool, status: PaymentStatus, message: impl Into<String>) -> Self {
        Self {
            success,
            status,
            transaction_id: None,
            message: message.into(),
            redirect_url: None,
            instructions: None,
            details: Map::new(),
        }
    }

    /// Successful call leaving the payment pending.
    #[must_use]
    pub fn pending(message: impl Into<String>) -> Self {
        Self::new(true, PaymentStatus::Pending, message)
    }

    /// Successful call with funds captured.
    #[must_use]
    pub fn completed(message: impl Into<String>) -> Self {
        Self::new(true, PaymentStatus::Completed, message)
    }

    /// Successful call with an arbitrary status.
    #[must_use]
    pub fn with_status(status: PaymentStatus, message: impl Into<String>) -> Self {
        Self::new(status != PaymentStatus::Failed, status, message)
    }

    /// Failed call.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(false, PaymentStatus::Failed, message)
    }

    /// Failed call derived from a gateway error.
    #[must_use]
    pub fn from_error(err: &PaymentError) -> Self {
        Self::failed(err.to_string()).with_detail("reason", err.code())
    }

    /// Attach a transaction identifier.
    #[must_use]
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Attach a redirect URL.
    #[must_use]
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Attach bank transfer instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: TransferInstructions) -> Self {
        self.instructions = Some(instructions);
        self
    }

    /// Attach a provider detail.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_results_carry_error_reason() {
        let err = PaymentError::InvalidResponse {
            operation: "capture_order",
            reason: "missing capture id",
        };
        let result = PaymentResult::from_error(&err);
        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.details.get("reason"), Some(&Value::from("invalid_response")));
    }

    #[test]
    fn serialises_without_empty_optionals() -> Result<(), serde_json::Error> {
        let result = PaymentResult::pending("waiting").with_transaction_id("T-1");
        let json = serde_json::to_value(&result)?;
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "status": "pending",
                "transaction_id": "T-1",
                "message": "waiting"
            })
        );
        Ok(())
    }

    #[test]
    fn with_status_marks_only_failures_unsuccessful() {
        assert!(PaymentResult::with_status(PaymentStatus::Cancelled, "x").success);
        assert!(!PaymentResult::with_status(PaymentStatus::Failed, "x").success);
    }
}
