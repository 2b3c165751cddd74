#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Locale negotiation for storefront requests.
//!
//! Layout: `locale.rs` (allow-list and supported set), `accept_language.rs`
//! (header parsing), `context.rs` (per-request session/cookie access),
//! `resolver.rs` (priority chain), `redirect.rs` (locale-prefixed URL rule).

pub mod accept_language;
pub mod context;
pub mod locale;
pub mod redirect;
pub mod resolver;

pub use accept_language::{LanguagePreference, negotiate, parse_accept_language};
pub use context::{
    LOCALE_COOKIE, RequestContext, SESSION_LOCALE_KEY, SessionData, parse_cookie_header,
};
pub use locale::{ALL_LOCALE_CODES, Locale, LocaleError, SupportedLocales};
pub use redirect::{LocaleRedirect, LocaleRedirectRule, RedirectReason, is_unsafe_method};
pub use resolver::{LocaleResolution, LocaleResolver, LocaleSource};
