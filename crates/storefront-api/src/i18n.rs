//! # Design
//!
//! - Localize problem titles and details to the locale resolved for the request.
//! - The resolved locale is scoped per request by the locale middleware.
//! - Locales without a bundle, and keys missing from a bundle, fall back to the
//!   message key itself (English).
//! - Bundle parse failures degrade to empty bundles and log once at load time.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;
use storefront_i18n::Locale;
use tracing::error;

const BUNDLES: [(&str, &str); 3] = [
    (
        "en",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n/en.json")),
    ),
    (
        "de",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n/de.json")),
    ),
    (
        "fr",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/i18n/fr.json")),
    ),
];

tokio::task_local! {
    static REQUEST_LOCALE: Locale;
}

#[derive(Debug, Default)]
struct TranslationBundle {
    messages: HashMap<String, String>,
}

impl TranslationBundle {
    fn lookup(&self, message: &str) -> Option<&str> {
        self.messages.get(message).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct TranslationFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

/// Run `fut` with `locale` visible to [`current_locale`].
pub(crate) async fn with_request_locale<F>(locale: Locale, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_LOCALE.scope(locale, fut).await
}

pub(crate) fn current_locale() -> Option<Locale> {
    REQUEST_LOCALE.try_with(|locale| *locale).ok()
}

pub(crate) fn localize_message(locale: Option<Locale>, message: &str) -> String {
    locale
        .and_then(|locale| translations().get(locale.as_str()))
        .and_then(|bundle| bundle.lookup(message))
        .map_or_else(|| message.to_string(), ToString::to_string)
}

fn translations() -> &'static HashMap<&'static str, TranslationBundle> {
    static TRANSLATIONS: OnceLock<HashMap<&'static str, TranslationBundle>> = OnceLock::new();
    TRANSLATIONS.get_or_init(|| {
        BUNDLES
            .iter()
            .map(|(code, raw)| (*code, load_translations(code, raw)))
            .collect()
    })
}

fn load_translations(code: &str, raw: &str) -> TranslationBundle {
    match serde_json::from_str::<TranslationFile>(raw) {
        Ok(file) => TranslationBundle {
            messages: file.messages,
        },
        Err(err) => {
            error!(error = %err, locale = code, "failed to parse API i18n bundle");
            TranslationBundle::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(code: &str) -> Option<Locale> {
        Locale::from_code(code)
    }

    #[test]
    fn every_bundle_parses_with_the_same_keys() {
        let english = &translations()["en"];
        assert!(!english.messages.is_empty());
        for (code, _) in BUNDLES {
            let bundle = &translations()[code];
            for key in english.messages.keys() {
                assert!(bundle.lookup(key).is_some(), "{code} lacks {key}");
            }
        }
    }

    #[test]
    fn localize_message_uses_request_bundle() {
        assert_eq!(
            localize_message(locale("de"), "bad request"),
            "Ungültige Anfrage"
        );
        assert_eq!(
            localize_message(locale("fr"), "resource not found"),
            "Ressource introuvable"
        );
    }

    #[test]
    fn localize_message_falls_back_to_key() {
        assert_eq!(localize_message(locale("ja"), "bad request"), "bad request");
        assert_eq!(localize_message(locale("de"), "missing-key"), "missing-key");
        assert_eq!(localize_message(None, "bad request"), "bad request");
    }

    #[tokio::test]
    async fn request_locale_is_scoped() {
        assert!(current_locale().is_none());
        let Some(de) = locale("de") else {
            panic!("de is a known locale");
        };
        let inside = with_request_locale(de, async { current_locale() }).await;
        assert_eq!(inside.map(Locale::as_str), Some("de"));
    }
}
