//! Locale allow-list and the deployment's supported subset.
//!
//! # Design
//! - `Locale` only ever wraps a code from [`ALL_LOCALE_CODES`], so a value of
//!   the type is proof the code passed the allow-list.
//! - `SupportedLocales` narrows the allow-list per deployment and owns the
//!   default locale; the default is always a member.

use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Every locale code the storefront can render, in display order.
pub const ALL_LOCALE_CODES: [&str; 28] = [
    "en", "de", "fr", "es", "it", "pt", "nl", "pl", "cs", "sk", "hu", "ro", "bg", "hr", "sl",
    "sr", "ru", "uk", "el", "tr", "sv", "da", "fi", "no", "et", "lv", "lt", "ja",
];

/// Errors raised while building or querying locale sets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocaleError {
    /// Code is not part of the global allow-list.
    #[error("unknown locale code")]
    Unknown {
        /// Offending code.
        code: String,
    },
    /// Code is known but not enabled for this deployment.
    #[error("locale not supported")]
    Unsupported {
        /// Offending code.
        code: String,
    },
    /// The supported set was empty.
    #[error("supported locale set is empty")]
    Empty,
}

/// A language code drawn from the global allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locale(&'static str);

impl Locale {
    /// Look up a code in the allow-list, ignoring ASCII case and surrounding whitespace.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        ALL_LOCALE_CODES
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(code))
            .map(Self)
    }

    /// Lowercase code as used in URLs, cookies, and session state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for Locale {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.0)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// The locales enabled for a deployment plus its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLocales {
    locales: Vec<Locale>,
    default: Locale,
}

impl SupportedLocales {
    /// Build a supported set from raw codes.
    ///
    /// Duplicates are dropped while preserving first-seen order. The default
    /// must be one of the supplied codes.
    ///
    /// # Errors
    ///
    /// Returns an error when a code is outside the allow-list, the set is
    /// empty, or the default is not part of the set.
    pub fn new<'a, I>(codes: I, default: &str) -> Result<Self, LocaleError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut locales: Vec<Locale> = Vec::new();
        for code in codes {
            let locale = Locale::from_code(code).ok_or_else(|| LocaleError::Unknown {
                code: code.to_string(),
            })?;
            if !locales.contains(&locale) {
                locales.push(locale);
            }
        }
        if locales.is_empty() {
            return Err(LocaleError::Empty);
        }
        let default_locale = Locale::from_code(default).ok_or_else(|| LocaleError::Unknown {
            code: default.to_string(),
        })?;
        if !locales.contains(&default_locale) {
            return Err(LocaleError::Unsupported {
                code: default.to_string(),
            });
        }
        Ok(Self {
            locales,
            default: default_locale,
        })
    }

    /// The full allow-list with `en` as default.
    #[must_use]
    pub fn all() -> Self {
        Self {
            locales: ALL_LOCALE_CODES.iter().copied().map(Locale).collect(),
            default: Locale("en"),
        }
    }

    /// Resolve a raw code to a supported locale.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<Locale> {
        Locale::from_code(code).filter(|locale| self.locales.contains(locale))
    }

    /// Resolve a raw code, distinguishing unknown from disabled codes.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Unknown`] or [`LocaleError::Unsupported`].
    pub fn parse(&self, code: &str) -> Result<Locale, LocaleError> {
        let locale = Locale::from_code(code).ok_or_else(|| LocaleError::Unknown {
            code: code.to_string(),
        })?;
        if self.locales.contains(&locale) {
            Ok(locale)
        } else {
            Err(LocaleError::Unsupported {
                code: code.to_string(),
            })
        }
    }

    /// Whether `code` names a supported locale.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Configured fallback locale.
    #[must_use]
    pub const fn default_locale(&self) -> Locale {
        self.default
    }

    /// Supported locales in configuration order.
    #[must_use]
    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }
}

impl Default for SupportedLocales {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_is_case_insensitive() {
        assert_eq!(Locale::from_code("DE").map(Locale::as_str), Some("de"));
        assert_eq!(Locale::from_code(" fr ").map(Locale::as_str), Some("fr"));
        assert!(Locale::from_code("xx").is_none());
        assert!(Locale::from_code("").is_none());
    }

    #[test]
    fn all_covers_the_allow_list() {
        let all = SupportedLocales::all();
        assert_eq!(all.locales().len(), ALL_LOCALE_CODES.len());
        assert_eq!(all.default_locale().as_str(), "en");
        for code in ALL_LOCALE_CODES {
            assert!(all.contains(code), "{code} should be supported");
        }
    }

    #[test]
    fn narrowed_set_rejects_disabled_codes() -> Result<(), LocaleError> {
        let supported = SupportedLocales::new(["de", "fr", "de"], "de")?;
        assert_eq!(supported.locales().len(), 2);
        assert!(supported.get("en").is_none());
        assert_eq!(
            supported.parse("en"),
            Err(LocaleError::Unsupported {
                code: "en".to_string()
            })
        );
        assert_eq!(
            supported.parse("klingon"),
            Err(LocaleError::Unknown {
                code: "klingon".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn default_must_be_member() {
        assert_eq!(
            SupportedLocales::new(["de"], "en"),
            Err(LocaleError::Unsupported {
                code: "en".to_string()
            })
        );
        assert_eq!(
            SupportedLocales::new(std::iter::empty::<&str>(), "en"),
            Err(LocaleError::Empty)
        );
    }

    #[test]
    fn locale_serializes_as_code() -> Result<(), serde_json::Error> {
        let locale = Locale::from_code("ja").expect("ja is allow-listed");
        assert_eq!(serde_json::to_string(&locale)?, "\"ja\"");
        Ok(())
    }
}
