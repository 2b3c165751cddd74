//! Approve-then-capture order processor client.
//!
//! Access tokens come from an OAuth client-credentials grant and are cached
//! until shortly before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::{RefundReceipt, endpoint, read_json};
use crate::error::{GatewayResult, PaymentError};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Request for a new order awaiting customer approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOrderRequest {
    /// Order number used as the purchase unit reference.
    pub reference: String,
    /// Uppercase ISO 4217 currency.
    pub currency: String,
    /// Total rendered in major units (`"19.90"`).
    pub amount: String,
    /// Where the processor returns an approving customer.
    pub return_url: String,
    /// Where the processor returns a cancelling customer.
    pub cancel_url: String,
}

/// Order created at the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    /// Processor order identifier.
    pub id: String,
    /// Processor order status, verbatim.
    pub status: String,
    /// Page where the customer approves the payment.
    pub approval_url: Option<String>,
}

/// Capture recorded against an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Capture identifier, used for refunds.
    pub id: String,
    /// Capture status, verbatim.
    pub status: String,
    /// Captured amount in major units, when reported.
    pub amount: Option<String>,
    /// Captured currency, when reported.
    pub currency: Option<String>,
}

/// Snapshot of an order after capture or lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOrder {
    /// Processor order identifier.
    pub id: String,
    /// Processor order status, verbatim.
    pub status: String,
    /// First capture on the order, if any.
    pub capture: Option<CaptureRecord>,
}

/// Order/capture processor operations.
#[async_trait]
pub trait OrderCaptureGateway: Send + Sync {
    /// Create an order and return its approval link.
    async fn create_order(&self, request: &CaptureOrderRequest) -> GatewayResult<CreatedOrder>;

    /// Capture an approved order.
    async fn capture_order(&self, order_id: &str) -> GatewayResult<CapturedOrder>;

    /// Fetch an order by identifier.
    async fn get_order(&self, order_id: &str) -> GatewayResult<CapturedOrder>;

    /// Refund a capture, fully when `amount` is absent.
    ///
    /// `amount` is `(value, currency)` in major units.
    async fn refund_capture(
        &self,
        capture_id: &str,
        amount: Option<(String, String)>,
    ) -> GatewayResult<RefundReceipt>;
}

#[derive(Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct LinkBody {
    href: String,
    rel: String,
}

#[derive(Deserialize)]
struct MoneyBody {
    value: String,
    currency_code: String,
}

#[derive(Deserialize)]
struct CaptureBody {
    id: String,
    status: String,
    #[serde(default)]
    amount: Option<MoneyBody>,
}

#[derive(Deserialize, Default)]
struct PaymentsBody {
    #[serde(default)]
    captures: Vec<CaptureBody>,
}

#[derive(Deserialize)]
struct PurchaseUnitBody {
    #[serde(default)]
    payments: Option<PaymentsBody>,
}

#[derive(Deserialize)]
struct OrderBody {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<LinkBody>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnitBody>,
}

#[derive(Deserialize)]
struct RefundBody {
    id: String,
    status: String,
}

impl OrderBody {
    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
    }

    fn into_captured(self) -> CapturedOrder {
        let capture = self
            .purchase_units
            .into_iter()
            .filter_map(|unit| unit.payments)
            .flat_map(|payments| payments.captures)
            .next()
            .map(|capture| {
                let (amount, currency) = capture
                    .amount
                    .map(|money| (Some(money.value), Some(money.currency_code)))
                    .unwrap_or_default();
                CaptureRecord {
                    id: capture.id,
                    status: capture.status,
                    amount,
                    currency,
                }
            });
        CapturedOrder {
            id: self.id,
            status: self.status,
            capture,
        }
    }
}

fn token_expiry(now: Instant, lifetime: Duration) -> Instant {
    let usable = lifetime
        .min(MAX_TOKEN_LIFETIME)
        .saturating_sub(TOKEN_REFRESH_MARGIN);
    now.checked_add(usable).unwrap_or(now)
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// JSON REST client authenticated with OAuth client credentials.
pub struct HttpOrderCaptureGateway {
    client: Client,
    base: Url,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl HttpOrderCaptureGateway {
    /// Build a client rooted at `base`.
    #[must_use]
    pub fn new(
        client: Client,
        base: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> GatewayResult<String> {
        const OPERATION: &str = "fetch_access_token";
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let url = endpoint(&self.base, &["v1", "oauth2", "token"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|source| PaymentError::Transport {
                operation: OPERATION,
                source,
            })?;
        let body: TokenBody = read_json(OPERATION, response).await?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(0));
        let expires_at = token_expiry(Instant::now(), lifetime);
        debug!(expires_in = lifetime.as_secs(), "access token refreshed");
        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at,
        });
        Ok(body.access_token)
    }

    async fn send_json(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &[&str],
        body: Option<serde_json::Value>,
    ) -> GatewayResult<reqwest::Response> {
        let url = endpoint(&self.base, path)?;
        let token = self.access_token().await?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request
            .send()
            .await
            .map_err(|source| PaymentError::Transport { operation, source })
    }
}

#[async_trait]
impl OrderCaptureGateway for HttpOrderCaptureGateway {
    async fn create_order(&self, request: &CaptureOrderRequest) -> GatewayResult<CreatedOrder> {
        const OPERATION: &str = "create_order";
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": request.reference,
                "amount": {"currency_code": request.currency, "value": request.amount},
            }],
            "application_context": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
            },
        });
        let response = self
            .send_json(
                OPERATION,
                reqwest::Method::POST,
                &["v2", "checkout", "orders"],
                Some(body),
            )
            .await?;
        let order: OrderBody = read_json(OPERATION, response).await?;
        let approval_url = order.approval_url();
        Ok(CreatedOrder {
            id: order.id,
            status: order.status,
            approval_url,
        })
    }

    async fn capture_order(&self, order_id: &str) -> GatewayResult<CapturedOrder> {
        const OPERATION: &str = "capture_order";
        let path = ["v2", "checkout", "orders", order_id, "capture"];
        let response = self
            .send_json(OPERATION, reqwest::Method::POST, &path, Some(json!({})))
            .await?;
        let order: OrderBody = read_json(OPERATION, response).await?;
        Ok(order.into_captured())
    }

    async fn get_order(&self, order_id: &str) -> GatewayResult<CapturedOrder> {
        const OPERATION: &str = "get_order";
        let path = ["v2", "checkout", "orders", order_id];
        let response = self
            .send_json(OPERATION, reqwest::Method::GET, &path, None)
            .await?;
        let order: OrderBody = read_json(OPERATION, response).await?;
        Ok(order.into_captured())
    }

    async fn refund_capture(
        &self,
        capture_id: &str,
        amount: Option<(String, String)>,
    ) -> GatewayResult<RefundReceipt> {
        const OPERATION: &str = "refund_capture";
        let path = ["v2", "payments", "captures", capture_id, "refund"];
        let body = amount.map_or_else(
            || json!({}),
            |(value, currency)| json!({"amount": {"value": value, "currency_code": currency}}),
        );
        let response = self
            .send_json(OPERATION, reqwest::Method::POST, &path, Some(body))
            .await?;
        let refund: RefundBody = read_json(OPERATION, response).await?;
        Ok(RefundReceipt {
            id: refund.id,
            status: refund.status,
        })
    }
}
