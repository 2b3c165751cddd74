//! Tag-based payment dispatcher.
//!
//! # Design
//! - The registry is an ordered list injected at startup; dispatch is a
//!   linear scan and the first adapter whose `supports` accepts the tag wins.
//! - Adapter results pass through untouched. No retries, no translation.
//! - Unmatched tags never fail: they produce a synthetic pending result so an
//!   operator can settle the payment by hand.

use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{Order, PaymentMethodKind};
use crate::provider::{PaymentData, SharedProvider};
use crate::result::PaymentResult;

const FALLBACK_PREFIX: &str = "MANUAL";

/// Synthetic identifier `"{TAG}-{uuid}"` for payments no adapter handled.
///
/// The tag is trimmed and uppercased; an empty tag uses `MANUAL`.
#[must_use]
pub fn synthetic_transaction_id(tag: &str) -> String {
    let tag = tag.trim();
    let prefix = if tag.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        tag.to_ascii_uppercase()
    };
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Ordered registry of payment adapters.
#[derive(Clone, Default)]
pub struct PaymentDispatcher {
    providers: Vec<SharedProvider>,
}

impl PaymentDispatcher {
    /// Build a dispatcher over `providers`, scanned in the given order.
    #[must_use]
    pub const fn new(providers: Vec<SharedProvider>) -> Self {
        Self { providers }
    }

    /// Capability tags of the registered adapters, in dispatch order.
    #[must_use]
    pub fn methods(&self) -> Vec<PaymentMethodKind> {
        self.providers.iter().map(|provider| provider.method()).collect()
    }

    /// First adapter accepting `tag`.
    #[must_use]
    pub fn provider_for(&self, tag: &str) -> Option<&SharedProvider> {
        self.providers.iter().find(|provider| provider.supports(tag))
    }

    /// Process `order` with the adapter registered for `method`.
    pub async fn process_payment(
        &self,
        order: &Order,
        method: &str,
        data: &PaymentData,
    ) -> PaymentResult {
        if let Some(provider) = self.provider_for(method) {
            debug!(method = %provider.method(), order = %order.number, "dispatching payment");
            return provider.process_payment(order, data).await;
        }
        let transaction_id = synthetic_transaction_id(method);
        info!(
            method,
            order = %order.number,
            transaction_id = %transaction_id,
            "no payment adapter registered; recording for manual processing"
        );
        PaymentResult::pending("pending manual processing").with_transaction_id(transaction_id)
    }

    /// Refund `transaction_id` through the adapter registered for `method`.
    pub async fn refund_payment(
        &self,
        transaction_id: &str,
        method: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult {
        if let Some(provider) = self.provider_for(method) {
            debug!(method = %provider.method(), transaction_id, "dispatching refund");
            return provider.refund_payment(transaction_id, amount).await;
        }
        let refund_id = synthetic_transaction_id(method);
        info!(
            method,
            transaction_id,
            refund_id = %refund_id,
            "no payment adapter registered; refund recorded for manual processing"
        );
        PaymentResult::pending("refund pending manual processing")
            .with_transaction_id(refund_id)
            .with_detail("original_transaction_id", transaction_id)
    }

    /// Query the status of `transaction_id` through the adapter for `method`.
    pub async fn payment_status(&self, transaction_id: &str, method: &str) -> PaymentResult {
        if let Some(provider) = self.provider_for(method) {
            return provider.payment_status(transaction_id).await;
        }
        PaymentResult::pending("pending manual processing").with_transaction_id(transaction_id)
    }
}

impl std::fmt::Debug for PaymentDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDispatcher")
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PaymentProvider;
    use crate::result::PaymentStatus;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SpyProvider {
        kind: PaymentMethodKind,
        processed: AtomicUsize,
        refunded: AtomicUsize,
        queried: AtomicUsize,
    }

    impl SpyProvider {
        fn new(kind: PaymentMethodKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                processed: AtomicUsize::new(0),
                refunded: AtomicUsize::new(0),
                queried: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.processed.load(Ordering::SeqCst)
                + self.refunded.load(Ordering::SeqCst)
                + self.queried.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentProvider for SpyProvider {
        fn method(&self) -> PaymentMethodKind {
            self.kind
        }

        async fn process_payment(&self, _order: &Order, _data: &PaymentData) -> PaymentResult {
            self.processed.fetch_add(1, Ordering::SeqCst);
            PaymentResult::completed(self.kind.as_str()).with_transaction_id("spy-tx")
        }

        async fn refund_payment(
            &self,
            transaction_id: &str,
            _amount: Option<Decimal>,
        ) -> PaymentResult {
            self.refunded.fetch_add(1, Ordering::SeqCst);
            PaymentResult::with_status(PaymentStatus::Refunded, "refunded")
                .with_transaction_id(transaction_id)
        }

        async fn payment_status(&self, transaction_id: &str) -> PaymentResult {
            self.queried.fetch_add(1, Ordering::SeqCst);
            PaymentResult::completed("done").with_transaction_id(transaction_id)
        }
    }

    fn order(method: &str) -> Order {
        Order {
            id: Uuid::new_v4(),
            number: "1001".into(),
            customer_email: "buyer@example.com".into(),
            currency: "EUR".into(),
            items: Vec::new(),
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            billing_address: None,
            payment_method: method.into(),
        }
    }

    fn registry() -> (Arc<SpyProvider>, Arc<SpyProvider>, PaymentDispatcher) {
        let bank = SpyProvider::new(PaymentMethodKind::BankTransfer);
        let mock = SpyProvider::new(PaymentMethodKind::Mock);
        let dispatcher = PaymentDispatcher::new(vec![
            bank.clone() as SharedProvider,
            mock.clone() as SharedProvider,
        ]);
        (bank, mock, dispatcher)
    }

    #[tokio::test]
    async fn matched_tag_invokes_only_that_adapter() {
        let (bank, mock, dispatcher) = registry();
        let result = dispatcher
            .process_payment(&order("mock"), "mock", &PaymentData::new())
            .await;
        assert_eq!(result.message, "mock");
        assert_eq!(mock.processed.load(Ordering::SeqCst), 1);
        assert_eq!(bank.calls(), 0);

        dispatcher.refund_payment("spy-tx", "MOCK", None).await;
        dispatcher.payment_status("spy-tx", "mock").await;
        assert_eq!(mock.calls(), 3);
        assert_eq!(bank.calls(), 0);
    }

    #[tokio::test]
    async fn unmatched_tag_falls_back_to_pending_manual_processing() {
        let (bank, mock, dispatcher) = registry();
        let result = dispatcher
            .process_payment(&order("voucher"), "voucher", &PaymentData::new())
            .await;
        assert!(result.success);
        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(result.message, "pending manual processing");
        let id = result.transaction_id.unwrap_or_default();
        assert!(id.starts_with("VOUCHER-"), "unexpected id {id}");
        assert!(id.len() > "VOUCHER-".len());
        assert_eq!(bank.calls() + mock.calls(), 0);
    }

    #[tokio::test]
    async fn unmatched_refund_and_status_stay_pending() {
        let dispatcher = PaymentDispatcher::default();
        let refund = dispatcher.refund_payment("TX-9", "cod", None).await;
        assert!(refund.success);
        assert_eq!(refund.status, PaymentStatus::Pending);
        assert_eq!(refund.message, "refund pending manual processing");
        assert!(
            refund
                .transaction_id
                .as_deref()
                .is_some_and(|id| id.starts_with("COD-"))
        );

        let status = dispatcher.payment_status("TX-9", "cod").await;
        assert_eq!(status.status, PaymentStatus::Pending);
        assert_eq!(status.transaction_id.as_deref(), Some("TX-9"));
    }

    #[test]
    fn empty_tag_uses_manual_prefix() {
        assert!(synthetic_transaction_id("  ").starts_with("MANUAL-"));
        assert!(synthetic_transaction_id("gift card").starts_with("GIFT CARD-"));
    }

    #[test]
    fn methods_follow_registration_order() {
        let (_, _, dispatcher) = registry();
        assert_eq!(
            dispatcher.methods(),
            vec![PaymentMethodKind::BankTransfer, PaymentMethodKind::Mock]
        );
    }
}
