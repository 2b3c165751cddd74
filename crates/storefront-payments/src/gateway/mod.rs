//! Remote processor clients used by the redirect-based adapters.
//!
//! Each processor sits behind a trait so adapters can be exercised against
//! in-process stubs; the `Http*` types are the reqwest implementations.

mod capture;
mod checkout;

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use url::Url;

use crate::error::{GatewayResult, PaymentError};

pub use capture::{
    CaptureOrderRequest, CaptureRecord, CapturedOrder, CreatedOrder, HttpOrderCaptureGateway,
    OrderCaptureGateway,
};
pub use checkout::{
    CheckoutGateway, CheckoutLine, CheckoutSession, CheckoutSessionRequest, CheckoutSessionState,
    HttpCheckoutGateway,
};

/// Receipt for a refund accepted by a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Processor refund identifier.
    pub id: String,
    /// Processor refund status, verbatim.
    pub status: String,
}

const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Number of minor-unit digits for an ISO 4217 currency.
#[must_use]
pub fn currency_exponent(currency: &str) -> u32 {
    if ZERO_DECIMAL_CURRENCIES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(currency))
    {
        0
    } else {
        2
    }
}

/// Convert a major-unit amount to integer minor units (cents for EUR).
///
/// # Errors
///
/// Returns [`PaymentError::InvalidAmount`] for negative amounts, amounts with
/// more precision than the currency allows, or values that overflow `i64`.
pub fn to_minor_units(amount: Decimal, currency: &str) -> GatewayResult<i64> {
    let exponent = currency_exponent(currency);
    check_amount(amount, exponent)?;
    amount
        .checked_mul(Decimal::from(10_i64.pow(exponent)))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| PaymentError::InvalidAmount {
            reason: "amount out of range",
            value: amount.to_string(),
        })
}

/// Render a major-unit amount with the currency's fixed number of decimals.
///
/// # Errors
///
/// Returns [`PaymentError::InvalidAmount`] under the same rules as
/// [`to_minor_units`].
pub fn format_major_units(amount: Decimal, currency: &str) -> GatewayResult<String> {
    let exponent = currency_exponent(currency);
    check_amount(amount, exponent)?;
    Ok(format!("{:.*}", exponent as usize, amount))
}

fn check_amount(amount: Decimal, exponent: u32) -> GatewayResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PaymentError::InvalidAmount {
            reason: "negative amount",
            value: amount.to_string(),
        });
    }
    if amount.round_dp(exponent) != amount {
        return Err(PaymentError::InvalidAmount {
            reason: "too many decimal places",
            value: amount.to_string(),
        });
    }
    Ok(())
}

/// Build the shared reqwest client with a request timeout.
///
/// # Errors
///
/// Returns [`PaymentError::Transport`] when the TLS backend cannot initialise.
pub fn build_client(timeout: Duration) -> GatewayResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| PaymentError::Transport {
            operation: "build_client",
            source,
        })
}

/// Append path segments to the configured base.
///
/// Each segment is percent-encoded as a single path component, so `/`, `?`
/// and `#` inside identifiers never change the target resource. Empty and
/// dot segments are rejected.
fn endpoint(base: &Url, segments: &[&str]) -> GatewayResult<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| PaymentError::InvalidUrl {
                value: base.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?;
        path.pop_if_empty();
        for segment in segments {
            if matches!(*segment, "" | "." | "..") {
                return Err(PaymentError::InvalidIdentifier {
                    value: (*segment).to_string(),
                });
            }
            path.push(segment);
        }
    }
    Ok(url)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> GatewayResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PaymentError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|source| PaymentError::Transport { operation, source })?;
    serde_json::from_slice(&bytes).map_err(|_| PaymentError::InvalidResponse {
        operation,
        reason: "malformed json body",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_respect_currency_exponent() -> GatewayResult<()> {
        assert_eq!(to_minor_units(dec!(19.90), "EUR")?, 1990);
        assert_eq!(to_minor_units(dec!(1500), "jpy")?, 1500);
        assert_eq!(to_minor_units(Decimal::ZERO, "USD")?, 0);
        Ok(())
    }

    #[test]
    fn minor_units_reject_invalid_amounts() {
        assert!(matches!(
            to_minor_units(dec!(-1), "EUR"),
            Err(PaymentError::InvalidAmount {
                reason: "negative amount",
                ..
            })
        ));
        assert!(matches!(
            to_minor_units(dec!(10.5), "JPY"),
            Err(PaymentError::InvalidAmount {
                reason: "too many decimal places",
                ..
            })
        ));
        assert!(matches!(
            to_minor_units(Decimal::MAX, "EUR"),
            Err(PaymentError::InvalidAmount {
                reason: "amount out of range",
                ..
            })
        ));
    }

    fn base(raw: &str) -> GatewayResult<Url> {
        Url::parse(raw).map_err(|source| PaymentError::InvalidUrl {
            value: raw.into(),
            source,
        })
    }

    #[test]
    fn endpoints_append_below_the_configured_base() -> GatewayResult<()> {
        for raw in ["https://psp.example/api", "https://psp.example/api/"] {
            assert_eq!(
                endpoint(&base(raw)?, &["v1", "refunds"])?.as_str(),
                "https://psp.example/api/v1/refunds"
            );
        }
        Ok(())
    }

    #[test]
    fn identifiers_stay_inside_their_segment() -> GatewayResult<()> {
        let base = base("https://psp.example/")?;
        assert_eq!(
            endpoint(&base, &["v1", "checkout", "sessions", "../../refunds"])?.as_str(),
            "https://psp.example/v1/checkout/sessions/..%2F..%2Frefunds"
        );
        assert_eq!(
            endpoint(&base, &["v2", "checkout", "orders", "A?x=1#y"])?.path(),
            "/v2/checkout/orders/A%3Fx=1%23y"
        );
        for bogus in ["..", ".", ""] {
            assert!(matches!(
                endpoint(&base, &["v2", "checkout", "orders", bogus]),
                Err(PaymentError::InvalidIdentifier { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn major_units_are_padded() -> GatewayResult<()> {
        assert_eq!(format_major_units(dec!(10), "EUR")?, "10.00");
        assert_eq!(format_major_units(dec!(7.5), "USD")?, "7.50");
        assert_eq!(format_major_units(dec!(300), "JPY")?, "300");
        Ok(())
    }
}
