//! HTTP surface modules (router, middleware, handlers).

/// Shared constants and header names.
pub mod constants;
/// Problem response helpers and error types.
pub mod errors;
/// Health and metrics endpoints.
pub mod health;
/// Locale middleware and locale endpoints.
pub mod locale;
/// Storefront page context.
pub mod pages;
/// Payment endpoints.
pub mod payments;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
