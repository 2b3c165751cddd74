//! Approve-then-capture flow.
//!
//! The first call creates a processor order and redirects the customer for
//! approval. Once the customer returns, checkout calls again with
//! `data.approved_order_id` and the order is captured. The processor order id
//! stays the transaction id throughout; the capture id rides in `details`.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{GatewayResult, PaymentError};
use crate::gateway::{CaptureOrderRequest, CapturedOrder, OrderCaptureGateway, format_major_units};
use crate::model::{Order, PaymentMethodKind};
use crate::provider::{PaymentData, PaymentProvider};
use crate::result::{PaymentResult, PaymentStatus};

const APPROVED_ORDER_KEY: &str = "approved_order_id";

/// Return URLs handed to the approval page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCaptureSettings {
    /// Where the processor returns an approving customer.
    pub return_url: String,
    /// Where the processor returns a cancelling customer.
    pub cancel_url: String,
}

/// Adapter for [`PaymentMethodKind::OrderCapture`].
#[derive(Clone)]
pub struct OrderCaptureProvider {
    settings: OrderCaptureSettings,
    gateway: Arc<dyn OrderCaptureGateway>,
}

fn captured_result(order: CapturedOrder) -> PaymentResult {
    let capture_status = order.capture.as_ref().map(|capture| capture.status.as_str());
    let result = match (order.status.as_str(), capture_status) {
        (_, Some("REFUNDED" | "PARTIALLY_REFUNDED")) => {
            PaymentResult::with_status(PaymentStatus::Refunded, "payment refunded")
        }
        (_, Some("DECLINED" | "FAILED")) => PaymentResult::failed("capture declined"),
        (_, Some("PENDING")) => {
            PaymentResult::with_status(PaymentStatus::Processing, "capture pending")
        }
        ("COMPLETED", _) => PaymentResult::completed("payment captured"),
        ("APPROVED", _) => {
            PaymentResult::with_status(PaymentStatus::Processing, "approved, awaiting capture")
        }
        ("VOIDED", _) => PaymentResult::with_status(PaymentStatus::Cancelled, "order voided"),
        _ => PaymentResult::pending("awaiting customer approval"),
    };
    let mut result = result
        .with_transaction_id(order.id)
        .with_detail("processor_status", order.status);
    if let Some(capture) = order.capture {
        result = result.with_detail("capture_id", capture.id);
    }
    result
}

impl OrderCaptureProvider {
    /// Build the adapter over an order/capture gateway.
    #[must_use]
    pub fn new(settings: OrderCaptureSettings, gateway: Arc<dyn OrderCaptureGateway>) -> Self {
        Self { settings, gateway }
    }

    async fn create(&self, order: &Order) -> GatewayResult<PaymentResult> {
        let currency = order.currency.to_ascii_uppercase();
        let request = CaptureOrderRequest {
            reference: order.number.clone(),
            amount: format_major_units(order.total()?, &currency)?,
            currency,
            return_url: self.settings.return_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        };
        let created = self.gateway.create_order(&request).await?;
        let approval_url = created.approval_url.ok_or(PaymentError::InvalidResponse {
            operation: "create_order",
            reason: "order has no approval link",
        })?;
        info!(
            order = %order.number,
            processor_order = %created.id,
            "order created, awaiting approval"
        );
        Ok(PaymentResult::pending("redirect for approval")
            .with_transaction_id(created.id)
            .with_redirect_url(approval_url))
    }

    async fn capture(&self, order: &Order, approved_id: &str) -> GatewayResult<PaymentResult> {
        let captured = self.gateway.capture_order(approved_id).await?;
        info!(
            order = %order.number,
            processor_order = %captured.id,
            status = %captured.status,
            "order captured"
        );
        Ok(captured_result(captured))
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> GatewayResult<PaymentResult> {
        let order = self.gateway.get_order(transaction_id).await?;
        let capture = order.capture.ok_or(PaymentError::InvalidResponse {
            operation: "get_order",
            reason: "order has no capture",
        })?;
        let amount = match amount {
            Some(amount) => {
                let currency = capture.currency.clone().ok_or(PaymentError::MissingField {
                    field: "currency",
                })?;
                Some((format_major_units(amount, &currency)?, currency))
            }
            None => None,
        };
        let receipt = self.gateway.refund_capture(&capture.id, amount).await?;
        let result = match receipt.status.as_str() {
            "COMPLETED" => PaymentResult::with_status(PaymentStatus::Refunded, "refund issued"),
            "PENDING" => PaymentResult::pending("refund pending"),
            "CANCELLED" => PaymentResult::with_status(PaymentStatus::Cancelled, "refund cancelled"),
            _ => PaymentResult::failed("refund failed"),
        };
        Ok(result
            .with_transaction_id(receipt.id)
            .with_detail("original_transaction_id", transaction_id)
            .with_detail("capture_id", capture.id)
            .with_detail("processor_status", receipt.status))
    }
}

#[async_trait]
impl PaymentProvider for OrderCaptureProvider {
    fn method(&self) -> PaymentMethodKind {
        PaymentMethodKind::OrderCapture
    }

    async fn process_payment(&self, order: &Order, data: &PaymentData) -> PaymentResult {
        let approved = data
            .get(APPROVED_ORDER_KEY)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let outcome = match approved {
            Some(approved_id) => self.capture(order, approved_id).await,
            None => self.create(order).await,
        };
        outcome.unwrap_or_else(|err| {
            warn!(order = %order.number, error = %err, "order/capture payment failed");
            PaymentResult::from_error(&err)
        })
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult {
        self.refund(transaction_id, amount)
            .await
            .unwrap_or_else(|err| {
                warn!(transaction_id, error = %err, "order/capture refund failed");
                PaymentResult::from_error(&err).with_transaction_id(transaction_id)
            })
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentResult {
        match self.gateway.get_order(transaction_id).await {
            Ok(order) => captured_result(order),
            Err(err) => {
                warn!(transaction_id, error = %err, "order/capture status lookup failed");
                PaymentResult::from_error(&err).with_transaction_id(transaction_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CaptureRecord, CreatedOrder, RefundReceipt};
    use crate::providers::fixtures;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubGateway {
        created: Mutex<Vec<CaptureOrderRequest>>,
        captures: AtomicUsize,
        refunds: Mutex<Vec<(String, Option<(String, String)>)>>,
    }

    fn completed_order(id: &str) -> CapturedOrder {
        CapturedOrder {
            id: id.to_string(),
            status: "COMPLETED".into(),
            capture: Some(CaptureRecord {
                id: "CAP-1".into(),
                status: "COMPLETED".into(),
                amount: Some("44.70".into()),
                currency: Some("EUR".into()),
            }),
        }
    }

    #[async_trait]
    impl OrderCaptureGateway for StubGateway {
        async fn create_order(&self, request: &CaptureOrderRequest) -> GatewayResult<CreatedOrder> {
            self.created
                .lock()
                .expect("created lock")
                .push(request.clone());
            Ok(CreatedOrder {
                id: "ORDER-1".into(),
                status: "CREATED".into(),
                approval_url: Some("https://psp.example/approve".into()),
            })
        }

        async fn capture_order(&self, order_id: &str) -> GatewayResult<CapturedOrder> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(completed_order(order_id))
        }

        async fn get_order(&self, order_id: &str) -> GatewayResult<CapturedOrder> {
            if order_id == "ORDER-NEW" {
                return Ok(CapturedOrder {
                    id: order_id.into(),
                    status: "CREATED".into(),
                    capture: None,
                });
            }
            Ok(completed_order(order_id))
        }

        async fn refund_capture(
            &self,
            capture_id: &str,
            amount: Option<(String, String)>,
        ) -> GatewayResult<RefundReceipt> {
            self.refunds
                .lock()
                .expect("refunds lock")
                .push((capture_id.to_string(), amount));
            Ok(RefundReceipt {
                id: "REF-1".into(),
                status: "COMPLETED".into(),
            })
        }
    }

    fn provider(gateway: Arc<StubGateway>) -> OrderCaptureProvider {
        OrderCaptureProvider::new(
            OrderCaptureSettings {
                return_url: "https://shop.example/return".into(),
                cancel_url: "https://shop.example/cancel".into(),
            },
            gateway,
        )
    }

    #[tokio::test]
    async fn first_call_creates_order_for_total() {
        let gateway = Arc::new(StubGateway::default());
        let result = provider(gateway.clone())
            .process_payment(&fixtures::order("order_capture"), &PaymentData::new())
            .await;

        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(result.redirect_url.as_deref(), Some("https://psp.example/approve"));
        assert_eq!(result.transaction_id.as_deref(), Some("ORDER-1"));
        let created = gateway.created.lock().expect("created lock");
        assert_eq!(created[0].amount, "44.70");
        assert_eq!(created[0].currency, "EUR");
        assert_eq!(gateway.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn approved_order_is_captured() {
        let gateway = Arc::new(StubGateway::default());
        let mut data = PaymentData::new();
        data.insert(APPROVED_ORDER_KEY.into(), Value::from("ORDER-1"));

        let result = provider(gateway.clone())
            .process_payment(&fixtures::order("order_capture"), &data)
            .await;

        assert_eq!(result.status, PaymentStatus::Completed);
        assert_eq!(result.transaction_id.as_deref(), Some("ORDER-1"));
        assert_eq!(result.details.get("capture_id"), Some(&Value::from("CAP-1")));
        assert_eq!(gateway.captures.load(Ordering::SeqCst), 1);
        assert!(gateway.created.lock().expect("created lock").is_empty());
    }

    #[tokio::test]
    async fn refund_targets_capture_with_formatted_amount() {
        let gateway = Arc::new(StubGateway::default());
        let result = provider(gateway.clone())
            .refund_payment("ORDER-1", Some(dec!(5)))
            .await;

        assert_eq!(result.status, PaymentStatus::Refunded);
        assert_eq!(result.transaction_id.as_deref(), Some("REF-1"));
        let refunds = gateway.refunds.lock().expect("refunds lock");
        assert_eq!(
            refunds.as_slice(),
            &[(
                "CAP-1".to_string(),
                Some(("5.00".to_string(), "EUR".to_string()))
            )]
        );
    }

    #[tokio::test]
    async fn refund_without_capture_fails() {
        let result = provider(Arc::new(StubGateway::default()))
            .refund_payment("ORDER-NEW", None)
            .await;
        assert!(!result.success);
        assert_eq!(
            result.details.get("reason"),
            Some(&Value::from("invalid_response"))
        );
    }

    #[tokio::test]
    async fn status_reports_uncaptured_orders_as_pending() {
        let result = provider(Arc::new(StubGateway::default()))
            .payment_status("ORDER-NEW")
            .await;
        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(result.transaction_id.as_deref(), Some("ORDER-NEW"));
    }
}
