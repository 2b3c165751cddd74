//! Assemble [`StorefrontConfig`] from an [`EnvSource`].

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use storefront_i18n::{ALL_LOCALE_CODES, LocaleError, SupportedLocales};
use tracing::debug;
use url::Url;

use crate::env::EnvSource;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    BankTransferConfig, CaptureConfig, CheckoutConfig, LocaleConfig, LoggingSettings,
    PaymentsConfig, ServerConfig, StorefrontConfig,
};
use crate::validate::{
    parse_bind_addr, parse_flag, parse_http_url, parse_list, parse_path_prefixes, parse_port,
    parse_positive_duration,
};

const BIND_ADDR: &str = "STOREFRONT_BIND_ADDR";
const HTTP_PORT: &str = "STOREFRONT_HTTP_PORT";
const LOG_LEVEL: &str = "STOREFRONT_LOG_LEVEL";
const LOG_FORMAT: &str = "STOREFRONT_LOG_FORMAT";
const DEFAULT_LOCALE: &str = "STOREFRONT_DEFAULT_LOCALE";
const SUPPORTED_LOCALES: &str = "STOREFRONT_SUPPORTED_LOCALES";
const LOCALE_COOKIE_DAYS: &str = "STOREFRONT_LOCALE_COOKIE_DAYS";
const LOCALE_EXCLUDED_PREFIXES: &str = "STOREFRONT_LOCALE_EXCLUDED_PREFIXES";
const SESSION_TTL_SECS: &str = "STOREFRONT_SESSION_TTL_SECS";
const BANK_ACCOUNT_HOLDER: &str = "STOREFRONT_BANK_ACCOUNT_HOLDER";
const BANK_IBAN: &str = "STOREFRONT_BANK_IBAN";
const BANK_BIC: &str = "STOREFRONT_BANK_BIC";
const BANK_NAME: &str = "STOREFRONT_BANK_NAME";
const CHECKOUT_SECRET_KEY: &str = "STOREFRONT_CHECKOUT_SECRET_KEY";
const CHECKOUT_API_BASE: &str = "STOREFRONT_CHECKOUT_API_BASE";
const CHECKOUT_SUCCESS_URL: &str = "STOREFRONT_CHECKOUT_SUCCESS_URL";
const CHECKOUT_CANCEL_URL: &str = "STOREFRONT_CHECKOUT_CANCEL_URL";
const CAPTURE_CLIENT_ID: &str = "STOREFRONT_CAPTURE_CLIENT_ID";
const CAPTURE_CLIENT_SECRET: &str = "STOREFRONT_CAPTURE_CLIENT_SECRET";
const CAPTURE_API_BASE: &str = "STOREFRONT_CAPTURE_API_BASE";
const CAPTURE_RETURN_URL: &str = "STOREFRONT_CAPTURE_RETURN_URL";
const CAPTURE_CANCEL_URL: &str = "STOREFRONT_CAPTURE_CANCEL_URL";
const PAYMENT_TIMEOUT_SECS: &str = "STOREFRONT_PAYMENT_TIMEOUT_SECS";
const MOCK_PAYMENTS: &str = "STOREFRONT_MOCK_PAYMENTS";

const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOCALE_CODE: &str = "en";
const DEFAULT_COOKIE_DAYS: u64 = 365;
const DEFAULT_EXCLUDED_PREFIXES: &str = "/v1,/health,/metrics,/assets";
const DEFAULT_SESSION_TTL_SECS: u64 = 1_800;
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CHECKOUT_API_BASE: &str = "https://api.stripe.com/";
const DEFAULT_CAPTURE_API_BASE: &str = "https://api-m.sandbox.paypal.com/";

const SECONDS_PER_DAY: u64 = 86_400;

/// Load and validate configuration from `env`.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered; nothing is partially applied.
pub fn load_config(env: &impl EnvSource) -> ConfigResult<StorefrontConfig> {
    let config = StorefrontConfig {
        server: load_server(env)?,
        logging: LoggingSettings {
            level: env
                .non_empty(LOG_LEVEL)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            format: env.non_empty(LOG_FORMAT),
        },
        locale: load_locale(env)?,
        payments: load_payments(env)?,
    };
    debug!(
        bind = %config.server.socket_addr(),
        locales = config.locale.supported.locales().len(),
        payment_methods = ?config.payments.enabled_methods(),
        "configuration loaded"
    );
    Ok(config)
}

fn load_server(env: &impl EnvSource) -> ConfigResult<ServerConfig> {
    let bind_addr = env
        .non_empty(BIND_ADDR)
        .map(|value| parse_bind_addr(BIND_ADDR, &value))
        .transpose()?
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let http_port = env
        .non_empty(HTTP_PORT)
        .map(|value| parse_port(HTTP_PORT, &value))
        .transpose()?
        .unwrap_or(DEFAULT_HTTP_PORT);
    Ok(ServerConfig {
        bind_addr,
        http_port,
    })
}

fn duration_or(
    env: &impl EnvSource,
    field: &str,
    default_units: u64,
    unit_secs: u64,
) -> ConfigResult<Duration> {
    env.non_empty(field).map_or_else(
        || Ok(Duration::from_secs(default_units * unit_secs)),
        |value| parse_positive_duration(field, &value, unit_secs),
    )
}

fn load_locale(env: &impl EnvSource) -> ConfigResult<LocaleConfig> {
    let default = env
        .non_empty(DEFAULT_LOCALE)
        .unwrap_or_else(|| DEFAULT_LOCALE_CODE.to_string());
    let codes = env
        .non_empty(SUPPORTED_LOCALES)
        .map(|value| parse_list(&value))
        .unwrap_or_else(|| ALL_LOCALE_CODES.iter().map(ToString::to_string).collect());
    let supported =
        SupportedLocales::new(codes.iter().map(String::as_str), &default).map_err(|err| {
            match err {
                LocaleError::Unknown { code } if code != default => {
                    ConfigError::invalid(SUPPORTED_LOCALES, "unknown locale code", Some(&code))
                }
                LocaleError::Empty => ConfigError::invalid(
                    SUPPORTED_LOCALES,
                    "at least one locale is required",
                    None,
                ),
                LocaleError::Unknown { code } => {
                    ConfigError::invalid(DEFAULT_LOCALE, "unknown locale code", Some(&code))
                }
                LocaleError::Unsupported { code } => ConfigError::invalid(
                    DEFAULT_LOCALE,
                    "default locale must be supported",
                    Some(&code),
                ),
            }
        })?;
    let excluded_prefixes = parse_path_prefixes(
        LOCALE_EXCLUDED_PREFIXES,
        &env.non_empty(LOCALE_EXCLUDED_PREFIXES)
            .unwrap_or_else(|| DEFAULT_EXCLUDED_PREFIXES.to_string()),
    )?;

    Ok(LocaleConfig {
        supported,
        cookie_max_age: duration_or(env, LOCALE_COOKIE_DAYS, DEFAULT_COOKIE_DAYS, SECONDS_PER_DAY)?,
        excluded_prefixes,
        session_ttl: duration_or(env, SESSION_TTL_SECS, DEFAULT_SESSION_TTL_SECS, 1)?,
    })
}

fn require(env: &impl EnvSource, field: &str, required_by: &'static str) -> ConfigResult<String> {
    env.non_empty(field)
        .ok_or_else(|| ConfigError::missing(field, required_by))
}

fn require_url(env: &impl EnvSource, field: &str, required_by: &'static str) -> ConfigResult<Url> {
    parse_http_url(field, &require(env, field, required_by)?)
}

fn url_or(env: &impl EnvSource, field: &str, default: &str) -> ConfigResult<Url> {
    parse_http_url(field, &env.non_empty(field).unwrap_or_else(|| default.to_string()))
}

fn load_bank_transfer(env: &impl EnvSource) -> ConfigResult<Option<BankTransferConfig>> {
    const FEATURE: &str = "bank_transfer";
    let Some(iban) = env.non_empty(BANK_IBAN) else {
        return Ok(None);
    };
    let iban: String = iban.chars().filter(|ch| !ch.is_whitespace()).collect();
    if iban.len() < 15 || !iban.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ConfigError::invalid(BANK_IBAN, "malformed iban", None));
    }
    Ok(Some(BankTransferConfig {
        account_holder: require(env, BANK_ACCOUNT_HOLDER, FEATURE)?,
        iban: iban.to_ascii_uppercase(),
        bic: require(env, BANK_BIC, FEATURE)?.to_ascii_uppercase(),
        bank_name: require(env, BANK_NAME, FEATURE)?,
    }))
}

fn load_checkout(env: &impl EnvSource) -> ConfigResult<Option<CheckoutConfig>> {
    const FEATURE: &str = "hosted_checkout";
    let Some(secret_key) = env.non_empty(CHECKOUT_SECRET_KEY) else {
        return Ok(None);
    };
    Ok(Some(CheckoutConfig {
        secret_key,
        api_base: url_or(env, CHECKOUT_API_BASE, DEFAULT_CHECKOUT_API_BASE)?,
        success_url: require_url(env, CHECKOUT_SUCCESS_URL, FEATURE)?,
        cancel_url: require_url(env, CHECKOUT_CANCEL_URL, FEATURE)?,
    }))
}

fn load_capture(env: &impl EnvSource) -> ConfigResult<Option<CaptureConfig>> {
    const FEATURE: &str = "order_capture";
    let client_id = env.non_empty(CAPTURE_CLIENT_ID);
    let client_secret = env.non_empty(CAPTURE_CLIENT_SECRET);
    let (client_id, client_secret) = match (client_id, client_secret) {
        (None, None) => return Ok(None),
        (Some(id), Some(secret)) => (id, secret),
        (None, Some(_)) => return Err(ConfigError::missing(CAPTURE_CLIENT_ID, FEATURE)),
        (Some(_), None) => return Err(ConfigError::missing(CAPTURE_CLIENT_SECRET, FEATURE)),
    };
    Ok(Some(CaptureConfig {
        client_id,
        client_secret,
        api_base: url_or(env, CAPTURE_API_BASE, DEFAULT_CAPTURE_API_BASE)?,
        return_url: require_url(env, CAPTURE_RETURN_URL, FEATURE)?,
        cancel_url: require_url(env, CAPTURE_CANCEL_URL, FEATURE)?,
    }))
}

fn load_payments(env: &impl EnvSource) -> ConfigResult<PaymentsConfig> {
    Ok(PaymentsConfig {
        bank_transfer: load_bank_transfer(env)?,
        checkout: load_checkout(env)?,
        capture: load_capture(env)?,
        timeout: duration_or(env, PAYMENT_TIMEOUT_SECS, DEFAULT_PAYMENT_TIMEOUT_SECS, 1)?,
        mock_enabled: env
            .var(MOCK_PAYMENTS)
            .map(|value| parse_flag(MOCK_PAYMENTS, &value))
            .transpose()?
            .unwrap_or(false),
    })
}
