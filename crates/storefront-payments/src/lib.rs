#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Payment dispatch for storefront orders.
//!
//! Layout: `model.rs` (orders and method tags), `result.rs` (provider
//! outcomes), `provider.rs` (adapter trait), `dispatcher.rs` (registry and
//! fallback), `providers/` (bank transfer, hosted checkout, order/capture,
//! mock), `gateway/` (HTTP clients for the remote processors).

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod model;
pub mod provider;
pub mod providers;
pub mod result;

pub use dispatcher::{PaymentDispatcher, synthetic_transaction_id};
pub use error::{GatewayResult, PaymentError};
pub use gateway::{HttpCheckoutGateway, HttpOrderCaptureGateway, build_client};
pub use model::{Address, Order, OrderItem, PaymentMethodKind};
pub use provider::{PaymentData, PaymentProvider, SharedProvider};
pub use providers::{
    BankTransferProvider, BankTransferSettings, HostedCheckoutProvider, HostedCheckoutSettings,
    MockProvider, OrderCaptureProvider, OrderCaptureSettings,
};
pub use result::{PaymentResult, PaymentStatus, TransferInstructions};
