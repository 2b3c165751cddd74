//! Hosted checkout processor client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{RefundReceipt, endpoint, read_json};
use crate::error::{GatewayResult, PaymentError};

/// One priced line on a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    /// Label shown to the customer.
    pub name: String,
    /// Price per unit in minor units.
    pub unit_amount: i64,
    /// Units.
    pub quantity: u32,
}

/// Request for a new hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Order number echoed back as the client reference.
    pub reference: String,
    /// Lowercase ISO 4217 currency.
    pub currency: String,
    /// Customer email prefilled on the page.
    pub customer_email: String,
    /// Priced lines, including shipping and tax.
    pub lines: Vec<CheckoutLine>,
    /// Where the processor sends the customer after paying.
    pub success_url: String,
    /// Where the processor sends the customer after abandoning.
    pub cancel_url: String,
}

/// Newly created hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    /// Session identifier.
    pub id: String,
    /// Hosted page URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Current state of a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSessionState {
    /// Session identifier.
    pub id: String,
    /// `open`, `complete`, or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid`, or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Payment intent backing the session, once paid.
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// Lowercase ISO 4217 currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
}

/// Hosted checkout processor operations.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a session and return its hosted page.
    async fn create_session(&self, request: &CheckoutSessionRequest)
    -> GatewayResult<CheckoutSession>;

    /// Fetch a session by identifier.
    async fn retrieve_session(&self, session_id: &str) -> GatewayResult<CheckoutSessionState>;

    /// Refund a payment intent, fully when `amount` is absent.
    async fn create_refund(
        &self,
        payment_intent: &str,
        amount: Option<i64>,
    ) -> GatewayResult<RefundReceipt>;
}

#[derive(Deserialize)]
struct RefundBody {
    id: String,
    status: String,
}

/// Form-encoded REST client authenticated with a bearer secret key.
#[derive(Clone)]
pub struct HttpCheckoutGateway {
    client: Client,
    base: Url,
    secret_key: String,
}

impl HttpCheckoutGateway {
    /// Build a client rooted at `base`.
    #[must_use]
    pub fn new(client: Client, base: Url, secret_key: impl Into<String>) -> Self {
        Self {
            client,
            base,
            secret_key: secret_key.into(),
        }
    }

    fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("client_reference_id".to_string(), request.reference.clone()),
            ("customer_email".to_string(), request.customer_email.clone()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "metadata[order_number]".to_string(),
                request.reference.clone(),
            ),
        ];
        for (index, line) in request.lines.iter().enumerate() {
            let prefix = format!("line_items[{index}]");
            form.push((
                format!("{prefix}[price_data][currency]"),
                request.currency.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                line.name.clone(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                line.unit_amount.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
        }
        form
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> GatewayResult<CheckoutSession> {
        const OPERATION: &str = "create_checkout_session";
        let url = endpoint(&self.base, &["v1", "checkout", "sessions"])?;
        debug!(
            reference = %request.reference,
            lines = request.lines.len(),
            "creating checkout session"
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&Self::session_form(request))
            .send()
            .await
            .map_err(|source| PaymentError::Transport {
                operation: OPERATION,
                source,
            })?;
        read_json(OPERATION, response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> GatewayResult<CheckoutSessionState> {
        const OPERATION: &str = "retrieve_checkout_session";
        let url = endpoint(&self.base, &["v1", "checkout", "sessions", session_id])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|source| PaymentError::Transport {
                operation: OPERATION,
                source,
            })?;
        read_json(OPERATION, response).await
    }

    async fn create_refund(
        &self,
        payment_intent: &str,
        amount: Option<i64>,
    ) -> GatewayResult<RefundReceipt> {
        const OPERATION: &str = "create_refund";
        let url = endpoint(&self.base, &["v1", "refunds"])?;
        let mut form = vec![("payment_intent", payment_intent.to_string())];
        if let Some(amount) = amount {
            form.push(("amount", amount.to_string()));
        }
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|source| PaymentError::Transport {
                operation: OPERATION,
                source,
            })?;
        let body: RefundBody = read_json(OPERATION, response).await?;
        Ok(RefundReceipt {
            id: body.id,
            status: body.status,
        })
    }
}
