//! Error types for payment gateways and adapters.

use thiserror::Error;

/// Primary error type for payment gateway calls.
///
/// Adapters never surface these to the dispatcher; they are folded into a
/// failed [`crate::PaymentResult`] at the adapter boundary.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("payment gateway unreachable")]
    Transport {
        /// Gateway operation identifier.
        operation: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The gateway answered with a non-success status.
    #[error("payment gateway rejected request")]
    Rejected {
        /// Gateway operation identifier.
        operation: &'static str,
        /// HTTP status returned by the gateway.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The gateway answered but the payload lacked required data.
    #[error("payment gateway returned an invalid response")]
    InvalidResponse {
        /// Gateway operation identifier.
        operation: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// An amount could not be expressed in the gateway's format.
    #[error("invalid payment amount")]
    InvalidAmount {
        /// Machine-readable reason.
        reason: &'static str,
        /// Offending amount.
        value: String,
    },
    /// Request data was missing a required field.
    #[error("missing payment field")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A caller-supplied identifier cannot address a processor resource.
    #[error("invalid payment identifier")]
    InvalidIdentifier {
        /// Offending identifier.
        value: String,
    },
    /// A configured gateway URL could not be joined.
    #[error("invalid payment gateway url")]
    InvalidUrl {
        /// URL fragment that failed to parse.
        value: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

impl PaymentError {
    /// Short identifier used as the `reason` detail on failed results.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Rejected { .. } => "rejected",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::MissingField { .. } => "missing_field",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// Convenience alias for gateway results.
pub type GatewayResult<T> = Result<T, PaymentError>;
