//! Order data consumed by payment providers and the method tags that route it.
//!
//! # Design
//! - Orders are owned by the catalogue/checkout side of the application; this
//!   crate only reads items, totals, and the payment method tag.
//! - Tags stay plain strings on the order so unknown methods survive
//!   deserialisation and reach the dispatcher fallback.

use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GatewayResult, PaymentError};

/// Payment method tags with a built-in provider adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    /// Manual bank transfer with generated instructions.
    BankTransfer,
    /// Redirect to a processor-hosted checkout page.
    HostedCheckout,
    /// Approve-then-capture order flow.
    OrderCapture,
    /// Deterministic provider for development and tests.
    Mock,
}

impl PaymentMethodKind {
    /// Every built-in method, in default registration order.
    pub const ALL: [Self; 4] = [
        Self::BankTransfer,
        Self::HostedCheckout,
        Self::OrderCapture,
        Self::Mock,
    ];

    /// Wire tag for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::HostedCheckout => "hosted_checkout",
            Self::OrderCapture => "order_capture",
            Self::Mock => "mock",
        }
    }

    /// Parse a wire tag, ignoring ASCII case and surrounding whitespace.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }
}

impl Display for PaymentMethodKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Single order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Stock keeping unit.
    pub sku: String,
    /// Display name shown on provider pages.
    pub name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Price per unit in the order currency.
    pub unit_price: Decimal,
}

impl OrderItem {
    /// `quantity * unit_price`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] when the product overflows.
    pub fn line_total(&self) -> GatewayResult<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| overflow(self.unit_price))
    }
}

/// Postal address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Recipient name.
    pub name: String,
    /// Street line.
    pub line1: String,
    /// Optional second street line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City or locality.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Order snapshot handed to the payment layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable order identifier.
    pub id: Uuid,
    /// Human-facing order number used in references.
    pub number: String,
    /// Customer contact address.
    pub customer_email: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Ordered lines.
    pub items: Vec<OrderItem>,
    /// Shipping charge.
    #[serde(default)]
    pub shipping: Decimal,
    /// Tax charge.
    #[serde(default)]
    pub tax: Decimal,
    /// Billing address, when collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    /// Payment method tag chosen at checkout.
    pub payment_method: String,
}

impl Order {
    /// Ordered lines.
    #[must_use]
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] when a line or the sum overflows.
    pub fn subtotal(&self) -> GatewayResult<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| {
            let line = item.line_total()?;
            sum.checked_add(line).ok_or_else(|| overflow(line))
        })
    }

    /// Amount due: subtotal plus shipping and tax.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] when the total overflows.
    pub fn total(&self) -> GatewayResult<Decimal> {
        let subtotal = self.subtotal()?;
        subtotal
            .checked_add(self.shipping)
            .and_then(|sum| sum.checked_add(self.tax))
            .ok_or_else(|| overflow(subtotal))
    }

    /// Payment method tag chosen at checkout.
    #[must_use]
    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }
}

fn overflow(value: Decimal) -> PaymentError {
    PaymentError::InvalidAmount {
        reason: "amount out of range",
        value: value.to_string(),
    }
}
