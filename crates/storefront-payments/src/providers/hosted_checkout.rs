//! Redirect to a processor-hosted checkout page.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{GatewayResult, PaymentError};
use crate::gateway::{CheckoutGateway, CheckoutLine, CheckoutSessionRequest, to_minor_units};
use crate::model::{Order, PaymentMethodKind};
use crate::provider::{PaymentData, PaymentProvider};
use crate::result::{PaymentResult, PaymentStatus};

/// Return URLs handed to the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckoutSettings {
    /// Where the processor sends a paying customer.
    pub success_url: String,
    /// Where the processor sends an abandoning customer.
    pub cancel_url: String,
}

/// Adapter for [`PaymentMethodKind::HostedCheckout`].
#[derive(Clone)]
pub struct HostedCheckoutProvider {
    settings: HostedCheckoutSettings,
    gateway: Arc<dyn CheckoutGateway>,
}

impl HostedCheckoutProvider {
    /// Build the adapter over a checkout gateway.
    #[must_use]
    pub fn new(settings: HostedCheckoutSettings, gateway: Arc<dyn CheckoutGateway>) -> Self {
        Self { settings, gateway }
    }

    fn session_request(&self, order: &Order) -> GatewayResult<CheckoutSessionRequest> {
        let currency = order.currency.to_ascii_lowercase();
        let mut lines = order
            .items()
            .iter()
            .map(|item| {
                Ok(CheckoutLine {
                    name: item.name.clone(),
                    unit_amount: to_minor_units(item.unit_price, &currency)?,
                    quantity: item.quantity,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;
        for (name, amount) in [("Shipping", order.shipping), ("Tax", order.tax)] {
            if amount > Decimal::ZERO {
                lines.push(CheckoutLine {
                    name: name.to_string(),
                    unit_amount: to_minor_units(amount, &currency)?,
                    quantity: 1,
                });
            }
        }
        Ok(CheckoutSessionRequest {
            reference: order.number.clone(),
            currency,
            customer_email: order.customer_email.clone(),
            lines,
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        })
    }

    async fn start(&self, order: &Order) -> GatewayResult<PaymentResult> {
        let request = self.session_request(order)?;
        let session = self.gateway.create_session(&request).await?;
        let url = session.url.ok_or(PaymentError::InvalidResponse {
            operation: "create_checkout_session",
            reason: "session has no url",
        })?;
        info!(order = %order.number, session = %session.id, "hosted checkout session created");
        Ok(PaymentResult::pending("redirect to hosted checkout")
            .with_transaction_id(session.id)
            .with_redirect_url(url))
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> GatewayResult<PaymentResult> {
        let session = self.gateway.retrieve_session(transaction_id).await?;
        let intent = session.payment_intent.ok_or(PaymentError::InvalidResponse {
            operation: "retrieve_checkout_session",
            reason: "session has no payment intent",
        })?;
        let currency = session.currency.unwrap_or_default();
        let minor = amount
            .map(|amount| to_minor_units(amount, &currency))
            .transpose()?;
        let receipt = self.gateway.create_refund(&intent, minor).await?;
        let result = match receipt.status.as_str() {
            "succeeded" => PaymentResult::with_status(PaymentStatus::Refunded, "refund issued"),
            "pending" | "requires_action" => PaymentResult::pending("refund pending"),
            "canceled" => PaymentResult::with_status(PaymentStatus::Cancelled, "refund cancelled"),
            _ => PaymentResult::failed("refund failed"),
        };
        Ok(result
            .with_transaction_id(receipt.id)
            .with_detail("original_transaction_id", transaction_id)
            .with_detail("processor_status", receipt.status))
    }

    async fn status(&self, transaction_id: &str) -> GatewayResult<PaymentResult> {
        let session = self.gateway.retrieve_session(transaction_id).await?;
        let status = session.status.as_deref().unwrap_or("open");
        let payment_status = session.payment_status.as_deref().unwrap_or("unpaid");
        let result = match (status, payment_status) {
            (_, "paid" | "no_payment_required") => PaymentResult::completed("payment captured"),
            ("expired", _) => {
                PaymentResult::with_status(PaymentStatus::Cancelled, "checkout session expired")
            }
            ("complete", _) => {
                PaymentResult::with_status(PaymentStatus::Processing, "payment processing")
            }
            _ => PaymentResult::pending("awaiting customer checkout"),
        };
        let mut result = result.with_transaction_id(session.id);
        if let Some(intent) = session.payment_intent {
            result = result.with_detail("payment_intent", intent);
        }
        Ok(result)
    }
}

#[async_trait]
impl PaymentProvider for HostedCheckoutProvider {
    fn method(&self) -> PaymentMethodKind {
        PaymentMethodKind::HostedCheckout
    }

    async fn process_payment(&self, order: &Order, _data: &PaymentData) -> PaymentResult {
        self.start(order).await.unwrap_or_else(|err| {
            warn!(order = %order.number, error = %err, "hosted checkout failed");
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
                warn!(transaction_id, error = %err, "hosted checkout refund failed");
                PaymentResult::from_error(&err).with_transaction_id(transaction_id)
            })
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentResult {
        self.status(transaction_id).await.unwrap_or_else(|err| {
            warn!(transaction_id, error = %err, "hosted checkout status lookup failed");
            PaymentResult::from_error(&err).with_transaction_id(transaction_id)
        })
    }
}
