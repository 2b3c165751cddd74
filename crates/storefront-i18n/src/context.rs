//! Per-request view of the locale inputs and the session they write back to.
//!
//! # Design
//! - The HTTP layer builds a `RequestContext` from the request and its
//!   session, hands it to the resolver, then persists `session()` when
//!   `session_modified()` reports a write.
//! - Session values stay as raw JSON so corrupted shapes (arrays where a
//!   string belongs) remain observable to the resolver.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Session key holding the persisted locale.
pub const SESSION_LOCALE_KEY: &str = "_locale";
/// Cookie carrying an explicit locale choice.
pub const LOCALE_COOKIE: &str = "locale";

/// Raw session attributes keyed by name.
pub type SessionData = Map<String, Value>;

/// Locale inputs gathered from one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    route_locale: Option<String>,
    session: SessionData,
    cookies: HashMap<String, String>,
    accept_language: Option<String>,
    session_modified: bool,
}

impl RequestContext {
    /// Empty context with no session, cookies, or headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the locale captured from the route, if any.
    #[must_use]
    pub fn with_route_locale(mut self, locale: Option<&str>) -> Self {
        self.route_locale = locale.map(str::to_string);
        self
    }

    /// Attach the current session attributes.
    #[must_use]
    pub fn with_session(mut self, session: SessionData) -> Self {
        self.session = session;
        self
    }

    /// Attach request cookies.
    #[must_use]
    pub fn with_cookies(mut self, cookies: HashMap<String, String>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Attach a single cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Attach the raw `Accept-Language` header value.
    #[must_use]
    pub fn with_accept_language(mut self, value: Option<&str>) -> Self {
        self.accept_language = value.map(str::to_string);
        self
    }

    /// Locale captured from the route.
    #[must_use]
    pub fn route_locale(&self) -> Option<&str> {
        self.route_locale.as_deref()
    }

    /// Raw session attribute.
    #[must_use]
    pub fn session_value(&self, key: &str) -> Option<&Value> {
        self.session.get(key)
    }

    /// Write a session attribute and mark the session dirty.
    pub fn set_session_value(&mut self, key: impl Into<String>, value: Value) {
        self.session.insert(key.into(), value);
        self.session_modified = true;
    }

    /// Cookie value by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Raw `Accept-Language` header value.
    #[must_use]
    pub fn accept_language(&self) -> Option<&str> {
        self.accept_language.as_deref()
    }

    /// Current session attributes, including writes made during resolution.
    #[must_use]
    pub const fn session(&self) -> &SessionData {
        &self.session
    }

    /// Whether any session attribute was written.
    #[must_use]
    pub const fn session_modified(&self) -> bool {
        self.session_modified
    }

    /// Consume the context, returning the session attributes.
    #[must_use]
    pub fn into_session(self) -> SessionData {
        self.session
    }
}

/// Split a `Cookie` header into name/value pairs.
///
/// Later duplicates do not override earlier ones; surrounding double quotes
/// are stripped from values.
#[must_use]
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(value);
        cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    cookies
}
