//! Typed configuration models.
//!
//! # Design
//! - Pure data; parsing lives in `validate.rs` and assembly in `loader.rs`.
//! - Optional payment sections are `None` when their credentials are absent,
//!   which keeps the matching adapter out of the dispatcher registry.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use storefront_i18n::SupportedLocales;
use url::Url;

/// Fully validated storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Locale negotiation settings.
    pub locale: LocaleConfig,
    /// Payment adapter settings.
    pub payments: PaymentsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// Port to bind.
    pub http_port: u16,
}

impl ServerConfig {
    /// Socket address the API server listens on.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level directive passed to the env filter.
    pub level: String,
    /// Explicit output format (`json` or `pretty`); inferred when absent.
    pub format: Option<String>,
}

/// Locale negotiation settings.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// Supported locales and the default.
    pub supported: SupportedLocales,
    /// Lifetime of the `locale` cookie.
    pub cookie_max_age: Duration,
    /// Path prefixes exempt from locale redirects.
    pub excluded_prefixes: Vec<String>,
    /// Idle lifetime of a session.
    pub session_ttl: Duration,
}

/// Bank transfer receiving account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTransferConfig {
    /// Name on the receiving account.
    pub account_holder: String,
    /// Receiving IBAN.
    pub iban: String,
    /// Receiving BIC.
    pub bic: String,
    /// Receiving bank name.
    pub bank_name: String,
}

/// Hosted checkout processor credentials and return URLs.
#[derive(Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Bearer secret key.
    pub secret_key: String,
    /// REST API base URL.
    pub api_base: Url,
    /// Return URL after payment.
    pub success_url: Url,
    /// Return URL after cancellation.
    pub cancel_url: Url,
}

/// Order/capture processor credentials and return URLs.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// REST API base URL.
    pub api_base: Url,
    /// Return URL after approval.
    pub return_url: Url,
    /// Return URL after cancellation.
    pub cancel_url: Url,
}

// Secrets stay out of Debug output.
impl std::fmt::Debug for CheckoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutConfig")
            .field("api_base", &self.api_base.as_str())
            .field("success_url", &self.success_url.as_str())
            .field("cancel_url", &self.cancel_url.as_str())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("client_id", &self.client_id)
            .field("api_base", &self.api_base.as_str())
            .field("return_url", &self.return_url.as_str())
            .field("cancel_url", &self.cancel_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Payment adapter settings.
#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Bank transfer account, when configured.
    pub bank_transfer: Option<BankTransferConfig>,
    /// Hosted checkout credentials, when configured.
    pub checkout: Option<CheckoutConfig>,
    /// Order/capture credentials, when configured.
    pub capture: Option<CaptureConfig>,
    /// Timeout applied to every processor HTTP call.
    pub timeout: Duration,
    /// Whether the mock adapter is registered.
    pub mock_enabled: bool,
}

impl PaymentsConfig {
    /// Names of the adapters that will be registered, in dispatch order.
    #[must_use]
    pub fn enabled_methods(&self) -> Vec<&'static str> {
        let mut methods = Vec::new();
        if self.bank_transfer.is_some() {
            methods.push("bank_transfer");
        }
        if self.checkout.is_some() {
            methods.push("hosted_checkout");
        }
        if self.capture.is_some() {
            methods.push("order_capture");
        }
        if self.mock_enabled {
            methods.push("mock");
        }
        methods
    }
}
