#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Storefront application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (configuration, payment adapter registry, serving),
//! `activity.rs` (event bus subscriber that records domain activity).

/// Activity log subscriber.
pub mod activity;
/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
