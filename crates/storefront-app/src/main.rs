#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Binary entrypoint that wires the storefront services together and serves
//! the HTTP API.

use storefront_app::{AppResult, run_app};

/// Bootstraps the storefront and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
