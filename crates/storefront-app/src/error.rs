//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: storefront_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: storefront_telemetry::TelemetryError,
    },
    /// Payment adapter wiring failed.
    #[error("payment setup failed")]
    Payments {
        /// Operation identifier.
        operation: &'static str,
        /// Source payment error.
        source: storefront_payments::PaymentError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: storefront_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: storefront_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: storefront_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn payments(
        operation: &'static str,
        source: storefront_payments::PaymentError,
    ) -> Self {
        Self::Payments { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: storefront_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}
