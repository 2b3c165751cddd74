//! Manual bank transfer: the customer pays out of band using generated
//! instructions, and an operator reconciles the payment.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::model::{Order, PaymentMethodKind};
use crate::provider::{PaymentData, PaymentProvider};
use crate::result::{PaymentResult, TransferInstructions};

/// Receiving account details printed on transfer instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTransferSettings {
    /// Name on the receiving account.
    pub account_holder: String,
    /// Receiving IBAN.
    pub iban: String,
    /// Receiving BIC/SWIFT code.
    pub bic: String,
    /// Receiving bank name.
    pub bank_name: String,
}

/// Adapter for [`PaymentMethodKind::BankTransfer`].
#[derive(Debug, Clone)]
pub struct BankTransferProvider {
    settings: BankTransferSettings,
}

impl BankTransferProvider {
    /// Build the adapter over the receiving account.
    #[must_use]
    pub const fn new(settings: BankTransferSettings) -> Self {
        Self { settings }
    }

    /// Reference the customer quotes on the transfer.
    #[must_use]
    pub fn payment_reference(order: &Order) -> String {
        let number: String = order
            .number
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        format!("ORDER-{}", number.to_ascii_uppercase())
    }
}

#[async_trait]
impl PaymentProvider for BankTransferProvider {
    fn method(&self) -> PaymentMethodKind {
        PaymentMethodKind::BankTransfer
    }

    async fn process_payment(&self, order: &Order, _data: &PaymentData) -> PaymentResult {
        let reference = Self::payment_reference(order);
        let amount = match order.total() {
            Ok(amount) => amount,
            Err(err) => {
                warn!(order = %order.number, error = %err, "bank transfer amount rejected");
                return PaymentResult::from_error(&err);
            }
        };
        let instructions = TransferInstructions {
            account_holder: self.settings.account_holder.clone(),
            iban: self.settings.iban.clone(),
            bic: self.settings.bic.clone(),
            bank_name: self.settings.bank_name.clone(),
            amount,
            currency: order.currency.clone(),
            reference: reference.clone(),
        };
        info!(order = %order.number, reference = %reference, "bank transfer instructions issued");
        PaymentResult::pending("awaiting bank transfer")
            .with_transaction_id(reference)
            .with_instructions(instructions)
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult {
        let mut result = PaymentResult::pending("refund pending manual processing")
            .with_transaction_id(format!("REFUND-{transaction_id}"))
            .with_detail("original_transaction_id", transaction_id);
        if let Some(amount) = amount {
            result = result.with_detail("amount", amount.to_string());
        }
        result
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentResult {
        PaymentResult::pending("awaiting reconciliation").with_transaction_id(transaction_id)
    }
}
