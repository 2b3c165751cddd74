#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Environment-driven configuration for the storefront.
//!
//! Layout: `env.rs` (environment sources), `model.rs` (typed settings),
//! `validate.rs` (field parsers), `loader.rs` (assembly), `error.rs`.

pub mod env;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use model::{
    BankTransferConfig, CaptureConfig, CheckoutConfig, LocaleConfig, LoggingSettings,
    PaymentsConfig, ServerConfig, StorefrontConfig,
};
