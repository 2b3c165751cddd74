//! Locale-prefixed URL rule.
//!
//! # Design
//! - The default locale is served without a path prefix; every other locale
//!   lives under `/{code}/...`.
//! - A request without a locale segment whose resolved locale is not the
//!   default is sent to the prefixed URL; a request carrying the default
//!   locale's segment is sent to the unprefixed URL.
//! - Unsafe methods are never redirected: a 302 would be replayed as GET and
//!   drop the submitted body. Excluded prefixes (API, assets) are left alone.

use http::Method;

use crate::locale::{Locale, SupportedLocales};

const UNSAFE_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

/// Whether a redirect would turn this request into a GET and lose its body.
#[must_use]
pub fn is_unsafe_method(method: &Method) -> bool {
    UNSAFE_METHODS.contains(method)
}

/// Why a redirect was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Locale segment added for a non-default preference.
    Prefix,
    /// Default-locale segment removed.
    Strip,
}

/// Redirect target computed by [`LocaleRedirectRule::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRedirect {
    /// Value for the `Location` header, query string included.
    pub location: String,
    /// Which rewrite produced the location.
    pub reason: RedirectReason,
}

/// Decides when a storefront URL should be rewritten to match the locale.
#[derive(Debug, Clone)]
pub struct LocaleRedirectRule {
    supported: SupportedLocales,
    excluded_prefixes: Vec<String>,
}

impl LocaleRedirectRule {
    /// Build a rule over the supported set, skipping the given path prefixes.
    #[must_use]
    pub fn new<I, S>(supported: SupportedLocales, excluded_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let excluded_prefixes = excluded_prefixes
            .into_iter()
            .map(Into::into)
            .map(|prefix: String| prefix.trim_end_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();
        Self {
            supported,
            excluded_prefixes,
        }
    }

    /// Supported locale named by the first path segment, if any.
    #[must_use]
    pub fn route_locale(&self, path: &str) -> Option<Locale> {
        first_segment(path).and_then(|segment| self.supported.get(segment))
    }

    /// Whether the path falls under an excluded prefix.
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Compute the redirect for a request, if one is due.
    #[must_use]
    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        resolved: Locale,
    ) -> Option<LocaleRedirect> {
        if is_unsafe_method(method) || self.is_excluded(path) {
            return None;
        }
        let default = self.supported.default_locale();
        let (mut location, reason) = match first_segment(path) {
            Some(segment) if self.supported.get(segment) == Some(default) => {
                let rest = &path[1 + segment.len()..];
                let location = if rest.is_empty() { "/" } else { rest };
                (location.to_string(), RedirectReason::Strip)
            }
            Some(segment) if self.supported.get(segment).is_some() => return None,
            _ if resolved == default => return None,
            _ => {
                let location = if path.is_empty() || path == "/" {
                    format!("/{resolved}")
                } else {
                    format!("/{resolved}{path}")
                };
                (location, RedirectReason::Prefix)
            }
        };
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            location.push('?');
            location.push_str(query);
        }
        Some(LocaleRedirect { location, reason })
    }
}

fn first_segment(path: &str) -> Option<&str> {
    let trimmed = path.strip_prefix('/')?;
    let segment = trimmed.split('/').next().unwrap_or(trimmed);
    (!segment.is_empty()).then_some(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleError;

    fn rule() -> Result<LocaleRedirectRule, LocaleError> {
        Ok(LocaleRedirectRule::new(
            SupportedLocales::new(["en", "de", "fr"], "en")?,
            ["/v1", "/assets/"],
        ))
    }

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).expect("allow-listed code")
    }

    #[test]
    fn unprefixed_path_gets_non_default_locale() -> Result<(), LocaleError> {
        let redirect = rule()?.evaluate(
            &Method::GET,
            "/products/shoes",
            Some("page=2"),
            locale("de"),
        );
        assert_eq!(
            redirect,
            Some(LocaleRedirect {
                location: "/de/products/shoes?page=2".to_string(),
                reason: RedirectReason::Prefix,
            })
        );
        let root = rule()?.evaluate(&Method::HEAD, "/", None, locale("fr"));
        assert_eq!(root.map(|redirect| redirect.location), Some("/fr".to_string()));
        Ok(())
    }

    #[test]
    fn default_locale_segment_is_stripped() -> Result<(), LocaleError> {
        let rule = rule()?;
        let redirect = rule.evaluate(&Method::GET, "/en/blog/post", Some(""), locale("en"));
        assert_eq!(
            redirect,
            Some(LocaleRedirect {
                location: "/blog/post".to_string(),
                reason: RedirectReason::Strip,
            })
        );
        let bare = rule.evaluate(&Method::GET, "/en", Some("q=1"), locale("en"));
        assert_eq!(bare.map(|redirect| redirect.location), Some("/?q=1".to_string()));
        Ok(())
    }

    #[test]
    fn matching_urls_are_left_alone() -> Result<(), LocaleError> {
        let rule = rule()?;
        assert!(rule.evaluate(&Method::GET, "/de/cart", None, locale("de")).is_none());
        assert!(rule.evaluate(&Method::GET, "/cart", None, locale("en")).is_none());
        assert!(rule.evaluate(&Method::GET, "/english/cart", None, locale("en")).is_none());
        Ok(())
    }

    #[test]
    fn unsafe_methods_never_redirect() -> Result<(), LocaleError> {
        let rule = rule()?;
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(rule.evaluate(&method, "/en/checkout", None, locale("en")).is_none());
            assert!(rule.evaluate(&method, "/de/checkout", None, locale("fr")).is_none());
            assert!(rule.evaluate(&method, "/checkout", None, locale("de")).is_none());
        }
        assert!(!is_unsafe_method(&Method::GET));
        assert!(!is_unsafe_method(&Method::OPTIONS));
        Ok(())
    }

    #[test]
    fn excluded_prefixes_match_on_segment_boundaries() -> Result<(), LocaleError> {
        let rule = rule()?;
        assert!(rule.is_excluded("/v1"));
        assert!(rule.is_excluded("/v1/payments"));
        assert!(rule.is_excluded("/assets/app.css"));
        assert!(!rule.is_excluded("/v10/anything"));
        assert!(rule.evaluate(&Method::GET, "/v1/locales", None, locale("de")).is_none());
        Ok(())
    }

    #[test]
    fn route_locale_reads_first_segment() -> Result<(), LocaleError> {
        let rule = rule()?;
        assert_eq!(rule.route_locale("/fr/page").map(Locale::as_str), Some("fr"));
        assert_eq!(rule.route_locale("/de").map(Locale::as_str), Some("de"));
        assert!(rule.route_locale("/ja/page").is_none());
        assert!(rule.route_locale("/").is_none());
        assert!(rule.route_locale("").is_none());
        Ok(())
    }
}
