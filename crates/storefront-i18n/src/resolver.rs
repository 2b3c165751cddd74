//! Priority chain that picks the locale for a request.
//!
//! # Design
//! - Sources are consulted in a fixed order: route, session, cookie,
//!   `Accept-Language`, default. The first supported value wins.
//! - Every outcome except a clean session hit is written back to the session
//!   so later requests short-circuit at step two.
//! - A session locale stored as an array is coerced to its first element,
//!   logged, and rewritten as a plain string.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::accept_language::negotiate;
use crate::context::{LOCALE_COOKIE, RequestContext, SESSION_LOCALE_KEY};
use crate::locale::{Locale, SupportedLocales};

/// Which input produced the resolved locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleSource {
    /// Locale segment captured from the URL.
    Route,
    /// Previously persisted session value.
    Session,
    /// The `locale` cookie.
    Cookie,
    /// Browser `Accept-Language` negotiation.
    AcceptLanguage,
    /// Configured fallback.
    Default,
}

impl LocaleSource {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Session => "session",
            Self::Cookie => "cookie",
            Self::AcceptLanguage => "accept_language",
            Self::Default => "default",
        }
    }
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleResolution {
    /// Locale the request should render in.
    pub locale: Locale,
    /// Input that produced it.
    pub source: LocaleSource,
    /// `true` when the session held an array value that had to be coerced.
    pub session_repaired: bool,
}

impl LocaleResolution {
    const fn new(locale: Locale, source: LocaleSource) -> Self {
        Self {
            locale,
            source,
            session_repaired: false,
        }
    }
}

/// Resolves request locales against a supported set.
#[derive(Debug, Clone, Default)]
pub struct LocaleResolver {
    supported: SupportedLocales,
}

impl LocaleResolver {
    /// Build a resolver over the supplied locale set.
    #[must_use]
    pub const fn new(supported: SupportedLocales) -> Self {
        Self { supported }
    }

    /// Locales this resolver accepts.
    #[must_use]
    pub const fn supported(&self) -> &SupportedLocales {
        &self.supported
    }

    /// Resolve the request locale and persist it to the session where required.
    pub fn resolve(&self, context: &mut RequestContext) -> LocaleResolution {
        let resolution = self.select(context);
        if resolution.source != LocaleSource::Session || resolution.session_repaired {
            context.set_session_value(
                SESSION_LOCALE_KEY,
                Value::String(resolution.locale.as_str().to_string()),
            );
        }
        debug!(
            locale = resolution.locale.as_str(),
            source = resolution.source.as_str(),
            "resolved request locale"
        );
        resolution
    }

    fn select(&self, context: &RequestContext) -> LocaleResolution {
        if let Some(locale) = context
            .route_locale()
            .and_then(|code| self.supported.get(code))
        {
            return LocaleResolution::new(locale, LocaleSource::Route);
        }

        if let Some(raw) = context.session_value(SESSION_LOCALE_KEY)
            && let Some(resolution) = self.from_session(raw)
        {
            return resolution;
        }

        if let Some(locale) = context
            .cookie(LOCALE_COOKIE)
            .and_then(|code| self.supported.get(code))
        {
            return LocaleResolution::new(locale, LocaleSource::Cookie);
        }

        if let Some(locale) = context
            .accept_language()
            .and_then(|header| negotiate(header, &self.supported))
        {
            return LocaleResolution::new(locale, LocaleSource::AcceptLanguage);
        }

        LocaleResolution::new(self.supported.default_locale(), LocaleSource::Default)
    }

    fn from_session(&self, raw: &Value) -> Option<LocaleResolution> {
        match raw {
            Value::String(code) => self
                .supported
                .get(code)
                .map(|locale| LocaleResolution::new(locale, LocaleSource::Session)),
            Value::Array(items) => {
                let first = items.first().and_then(Value::as_str);
                let locale = first.and_then(|code| self.supported.get(code));
                warn!(
                    raw = %raw,
                    coerced = locale.map(Locale::as_str),
                    "session locale stored as an array; coercing to first element"
                );
                locale.map(|locale| LocaleResolution {
                    locale,
                    source: LocaleSource::Session,
                    session_repaired: true,
                })
            }
            _ => None,
        }
    }
}
