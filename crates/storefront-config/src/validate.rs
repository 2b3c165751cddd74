//! Field parsers shared by the loader.
//!
//! Every parser takes the variable name so failures point at the exact
//! environment variable.

use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Parse an IP address.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an IP address.
pub fn parse_bind_addr(field: &str, value: &str) -> ConfigResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "not an ip address", Some(value)))
}

/// Parse a non-zero TCP port.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric, zero, or
/// out-of-range values.
pub fn parse_port(field: &str, value: &str) -> ConfigResult<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "must be between 1 and 65535", Some(value)))?;
    if port == 0 {
        return Err(ConfigError::invalid(
            field,
            "must be between 1 and 65535",
            Some(value),
        ));
    }
    Ok(port)
}

/// Parse a positive whole number of `unit_secs`-second units into a duration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or zero values.
pub fn parse_positive_duration(field: &str, value: &str, unit_secs: u64) -> ConfigResult<Duration> {
    let count: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, "must be a positive integer", Some(value)))?;
    if count == 0 {
        return Err(ConfigError::invalid(
            field,
            "must be a positive integer",
            Some(value),
        ));
    }
    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::invalid(field, "value too large", Some(value)))
}

/// Parse a boolean flag (`1/true/yes/on`, `0/false/no/off`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything else.
pub fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(field, "must be a boolean", Some(value))),
    }
}

/// Parse an absolute `http`/`https` URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for relative or non-HTTP URLs.
pub fn parse_http_url(field: &str, value: &str) -> ConfigResult<Url> {
    let url = Url::parse(value.trim())
        .map_err(|_| ConfigError::invalid(field, "not an absolute url", Some(value)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            field,
            "url scheme must be http or https",
            Some(value),
        ));
    }
    Ok(url)
}

/// Split a comma-separated list, dropping blank entries.
#[must_use]
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalise path prefixes to a leading slash without a trailing one.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an entry is not an absolute path.
pub fn parse_path_prefixes(field: &str, value: &str) -> ConfigResult<Vec<String>> {
    parse_list(value)
        .into_iter()
        .map(|prefix| {
            if !prefix.starts_with('/') {
                return Err(ConfigError::invalid(
                    field,
                    "prefixes must start with '/'",
                    Some(&prefix),
                ));
            }
            Ok(prefix.trim_end_matches('/').to_string())
        })
        .filter(|prefix| !matches!(prefix, Ok(prefix) if prefix.is_empty()))
        .collect()
}
