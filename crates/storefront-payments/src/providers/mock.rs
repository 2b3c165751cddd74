//! Deterministic adapter for development and tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::{Order, PaymentMethodKind};
use crate::provider::{PaymentData, PaymentProvider};
use crate::result::{PaymentResult, PaymentStatus};

/// Adapter for [`PaymentMethodKind::Mock`].
///
/// `data.simulate` selects the outcome: `"failure"` fails, `"pending"` leaves
/// the payment pending, anything else completes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Build the adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    fn method(&self) -> PaymentMethodKind {
        PaymentMethodKind::Mock
    }

    async fn process_payment(&self, order: &Order, data: &PaymentData) -> PaymentResult {
        let transaction_id = format!("MOCK-{}", Uuid::new_v4().simple());
        match data.get("simulate").and_then(serde_json::Value::as_str) {
            Some("failure") => PaymentResult::failed("simulated payment failure")
                .with_detail("order", order.number.as_str()),
            Some("pending") => PaymentResult::pending("simulated pending payment")
                .with_transaction_id(transaction_id),
            _ => match order.total() {
                Ok(total) => PaymentResult::completed("mock payment captured")
                    .with_transaction_id(transaction_id)
                    .with_detail("amount", total.to_string()),
                Err(err) => PaymentResult::from_error(&err),
            },
        }
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult {
        let mut result = PaymentResult::with_status(PaymentStatus::Refunded, "mock refund issued")
            .with_transaction_id(format!("MOCK-REFUND-{}", Uuid::new_v4().simple()))
            .with_detail("original_transaction_id", transaction_id);
        if let Some(amount) = amount {
            result = result.with_detail("amount", amount.to_string());
        }
        result
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentResult {
        PaymentResult::completed("mock payment captured").with_transaction_id(transaction_id)
    }
}
