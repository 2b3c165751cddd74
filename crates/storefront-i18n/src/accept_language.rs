//! `Accept-Language` parsing and negotiation against the supported set.
//!
//! # Design
//! - Only the primary subtag matters (`en-US` and `en` both count as `en`).
//! - Each primary subtag keeps its highest quality; ordering is by quality
//!   descending and header order for ties.
//! - `*`, `q=0`, and malformed weights never select a locale.

use crate::locale::{Locale, SupportedLocales};

/// Weighted primary language subtag extracted from the header.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    /// Lowercase primary subtag.
    pub tag: String,
    /// Quality weight in `(0, 1]`.
    pub quality: f32,
}

/// Parse an `Accept-Language` header into preferences ordered by quality.
#[must_use]
pub fn parse_accept_language(value: &str) -> Vec<LanguagePreference> {
    let mut preferences: Vec<LanguagePreference> = Vec::new();
    for part in value.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut components = trimmed.split(';');
        let range = components.next().unwrap_or_default().trim();
        if range.is_empty() || range == "*" {
            continue;
        }
        let Some(quality) = parse_quality(components) else {
            continue;
        };
        if quality <= 0.0 {
            continue;
        }
        let primary = range
            .split(['-', '_'])
            .next()
            .unwrap_or(range)
            .trim()
            .to_ascii_lowercase();
        if primary.is_empty() {
            continue;
        }
        match preferences.iter_mut().find(|entry| entry.tag == primary) {
            Some(existing) => {
                if quality > existing.quality {
                    existing.quality = quality;
                }
            }
            None => preferences.push(LanguagePreference {
                tag: primary,
                quality,
            }),
        }
    }
    preferences.sort_by(|left, right| right.quality.total_cmp(&left.quality));
    preferences
}

/// Pick the best supported locale for an `Accept-Language` header.
#[must_use]
pub fn negotiate(value: &str, supported: &SupportedLocales) -> Option<Locale> {
    parse_accept_language(value)
        .iter()
        .find_map(|preference| supported.get(&preference.tag))
}

fn parse_quality<'a>(params: impl Iterator<Item = &'a str>) -> Option<f32> {
    for param in params {
        if let Some((key, value)) = param.trim().split_once('=')
            && key.trim().eq_ignore_ascii_case("q")
        {
            return value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|quality| quality.is_finite() && (0.0..=1.0).contains(quality));
        }
    }
    Some(1.0)
}
