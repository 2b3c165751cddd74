//! Adapter trait implemented by every payment method.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::model::{Order, PaymentMethodKind};
use crate::result::PaymentResult;

/// Free-form request data forwarded from checkout to the adapter.
pub type PaymentData = Map<String, Value>;

/// Shared handle used by the dispatcher registry.
pub type SharedProvider = Arc<dyn PaymentProvider>;

/// Provider adapter for one payment method.
///
/// Implementations fold their own failures into a failed [`PaymentResult`];
/// nothing here returns `Err`.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Capability tag this adapter handles.
    fn method(&self) -> PaymentMethodKind;

    /// Whether the adapter handles `tag`; defaults to a case-insensitive
    /// comparison against [`Self::method`].
    fn supports(&self, tag: &str) -> bool {
        self.method().as_str().eq_ignore_ascii_case(tag.trim())
    }

    /// Start or complete a payment for `order`.
    async fn process_payment(&self, order: &Order, data: &PaymentData) -> PaymentResult;

    /// Refund a previous transaction, fully when `amount` is absent.
    async fn refund_payment(&self, transaction_id: &str, amount: Option<Decimal>)
    -> PaymentResult;

    /// Look up the current state of a transaction.
    async fn payment_status(&self, transaction_id: &str) -> PaymentResult;
}
