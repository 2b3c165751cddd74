//! Request and response documents exchanged over the HTTP API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_payments::{Order, PaymentData, PaymentMethodKind};
use storefront_telemetry::MetricsSnapshot;

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short title, localized to the request locale.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Offending request fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON pointer into the request body.
    pub pointer: String,
    /// Why the value was rejected.
    pub message: String,
}

/// Body of `PUT /v1/locale`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleSwitchRequest {
    /// Locale code to switch to.
    pub locale: String,
}

/// Response of `PUT /v1/locale`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocaleSwitchResponse {
    /// Locale now stored in the session.
    pub locale: String,
    /// Locale the session held before the switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// Response of `GET /v1/locales`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalesResponse {
    /// Locale resolved for this request.
    pub locale: String,
    /// Input that produced it.
    pub source: String,
    /// Configured fallback locale.
    pub default: String,
    /// Every locale the storefront serves.
    pub supported: Vec<String>,
}

/// Page context rendered for storefront paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContext {
    /// Locale the page renders in.
    pub locale: String,
    /// Input that produced the locale.
    pub source: String,
    /// Requested path.
    pub path: String,
}

/// Response of `GET /v1/payments/methods`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentMethodsResponse {
    /// Registered adapter tags, in dispatch order.
    pub methods: Vec<PaymentMethodKind>,
}

/// Body of `POST /v1/payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    /// Order being paid.
    pub order: Order,
    /// Method tag override; defaults to the order's tag.
    #[serde(default)]
    pub method: Option<String>,
    /// Provider-specific payload.
    #[serde(default)]
    pub data: PaymentData,
}

/// Body of `POST /v1/payments/{transaction_id}/refund`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundRequest {
    /// Method tag of the original payment.
    pub method: String,
    /// Partial refund amount; full refund when absent.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Query of `GET /v1/payments/{transaction_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PaymentStatusQuery {
    pub(crate) method: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Components currently degraded.
    pub degraded: Vec<String>,
    /// Registered payment methods.
    pub payment_methods: Vec<PaymentMethodKind>,
    /// Locale and session counters.
    pub metrics: MetricsSnapshot,
}
