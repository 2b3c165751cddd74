#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! HTTP surface of the storefront runtime.
//!
//! # Design
//! - Every request passes through the locale middleware: it resolves the
//!   locale, persists session changes, and applies the locale-prefix redirect.
//! - Payment endpoints delegate to the shared [`storefront_payments::PaymentDispatcher`]
//!   and publish domain events for each outcome.
//! - Failures surface as RFC9457 problem documents with titles localized to
//!   the request locale.

pub mod error;
pub mod http;
pub(crate) mod i18n;
pub mod models;
pub(crate) mod session;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use models::{
    HealthResponse, LocaleSwitchRequest, LocaleSwitchResponse, LocalesResponse, PageContext,
    PaymentMethodsResponse, ProblemDetails, ProblemInvalidParam, ProcessPaymentRequest,
    RefundRequest,
};
