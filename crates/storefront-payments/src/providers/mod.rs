//! Built-in payment adapters.

mod bank_transfer;
mod hosted_checkout;
mod mock;
mod order_capture;

pub use bank_transfer::{BankTransferProvider, BankTransferSettings};
pub use hosted_checkout::{HostedCheckoutProvider, HostedCheckoutSettings};
pub use mock::MockProvider;
pub use order_capture::{OrderCaptureProvider, OrderCaptureSettings};
