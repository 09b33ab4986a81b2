//! Payment types and data structures

use crate::error::{GatewayError, GatewayResult};
use crate::params::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw card details. Forwarded to a provider once, never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCard {
    /// Cardholder name
    pub name: String,
    /// Primary account number
    pub number: String,
    /// Expiry month, 1-12
    pub exp_month: u32,
    /// Four-digit expiry year
    pub exp_year: u32,
    /// Card verification code
    #[serde(default)]
    pub cvc: Option<String>,
}

impl CreditCard {
    pub fn new(name: impl Into<String>, number: impl Into<String>, exp_month: u32, exp_year: u32) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            exp_month,
            exp_year,
            cvc: None,
        }
    }

    /// With CVC
    pub fn cvc(mut self, cvc: impl Into<String>) -> Self {
        self.cvc = Some(cvc.into());
        self
    }

    /// Last four digits of the PAN
    pub fn last4(&self) -> String {
        last4(&self.number)
    }

    /// Pre-flight checks, no I/O.
    pub fn validate(&self) -> GatewayResult<()> {
        let digits = self.number.len();
        if !(12..=19).contains(&digits) || !self.number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GatewayError::InvalidRequest(
                "card number must be 12 to 19 digits".into(),
            ));
        }
        if !(1..=12).contains(&self.exp_month) {
            return Err(GatewayError::InvalidRequest(format!(
                "expiry month {} out of range",
                self.exp_month
            )));
        }
        if !(1000..=9999).contains(&self.exp_year) {
            return Err(GatewayError::InvalidRequest(format!(
                "expiry year {} must have four digits",
                self.exp_year
            )));
        }
        if let Some(cvc) = &self.cvc
            && (!(3..=4).contains(&cvc.len()) || !cvc.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(GatewayError::InvalidRequest("CVC must be 3 or 4 digits".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for CreditCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCard")
            .field("name", &self.name)
            .field("number", &format_args!("****{}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &self.cvc.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Last four characters of a card number, masked or not.
pub fn last4(number: &str) -> String {
    let len = number.chars().count();
    number.chars().skip(len.saturating_sub(4)).collect()
}

/// Reference to a card tokenized and stored at the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SavedCreditCard {
    pub customer_id: String,
    pub credit_card_id: String,
}

impl SavedCreditCard {
    pub fn new(customer_id: impl Into<String>, credit_card_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            credit_card_id: credit_card_id.into(),
        }
    }
}

/// Payment method: exactly one instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard(CreditCard),
    SavedCreditCard(SavedCreditCard),
}

impl PaymentMethod {
    pub fn validate(&self) -> GatewayResult<()> {
        match self {
            Self::CreditCard(card) => card.validate(),
            Self::SavedCreditCard(saved) => {
                if saved.customer_id.is_empty() || saved.credit_card_id.is_empty() {
                    return Err(GatewayError::InvalidRequest(
                        "saved credit card needs both customer and card id".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl From<CreditCard> for PaymentMethod {
    fn from(card: CreditCard) -> Self {
        Self::CreditCard(card)
    }
}

impl From<SavedCreditCard> for PaymentMethod {
    fn from(saved: SavedCreditCard) -> Self {
        Self::SavedCreditCard(saved)
    }
}

/// Billing address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// Charge as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Outstanding amount in minor units
    pub amount: i64,
    /// ISO-4217 code, uppercase
    pub currency: String,
    pub captured: bool,
    pub paid: bool,
    pub cancelled: bool,
    /// Provider status string
    pub status: String,
    /// Merchant order id echoed by the provider
    pub order_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Enforce that a cancelled transaction is neither paid nor captured.
    pub fn normalized(mut self) -> Self {
        if self.cancelled {
            self.paid = false;
            self.captured = false;
        }
        self
    }
}

// Requests

/// Authorize request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizeParams {
    /// ISO-4217 code
    pub currency: String,
    pub description: Option<String>,
    pub order_id: String,
    /// Provider customer id
    pub customer: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub params: Params,
}

impl AuthorizeParams {
    pub fn new(currency: impl Into<String>, order_id: impl Into<String>, method: impl Into<PaymentMethod>) -> Self {
        Self {
            currency: currency.into(),
            order_id: order_id.into(),
            payment_method: Some(method.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteAuthorizeParams {
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureParams {
    /// Major units; `None` captures the full authorization
    pub amount: Option<u64>,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundParams {
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoidParams {
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCreditCardParams {
    pub customer_id: String,
    pub credit_card: CreditCard,
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCreditCardParams {
    pub customer_id: String,
    pub credit_card_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCreditCardsParams {
    pub customer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCreditCardParams {
    pub customer_id: String,
    pub credit_card_id: String,
}

// Responses

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub transaction_id: String,
    pub params: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteAuthorizeResponse {
    pub transaction_id: String,
    pub params: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub transaction_id: String,
    pub params: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundResponse {
    pub transaction_id: String,
    pub params: Params,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoidResponse {
    pub transaction_id: String,
    pub params: Params,
}

/// Result of storing a card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditCardResponse {
    pub customer_id: String,
    pub credit_card_id: String,
    pub params: Params,
}

impl CreditCardResponse {
    /// Reference to use in later authorizations
    pub fn saved_credit_card(&self) -> SavedCreditCard {
        SavedCreditCard::new(&self.customer_id, &self.credit_card_id)
    }
}

/// Masked description of a stored card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCreditCard {
    pub customer_id: String,
    pub customer_name: String,
    pub credit_card_id: String,
    /// Last four digits only
    pub masked_number: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub brand: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCreditCardResponse {
    pub credit_card: CustomerCreditCard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCreditCardsResponse {
    pub credit_cards: Vec<CustomerCreditCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCreditCardResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    fn jcb() -> CreditCard {
        CreditCard::new("JCB Card", "3580876521284076", 1, 2030)
    }

    #[test]
    fn test_card_validation() {
        assert!(jcb().validate().is_ok());
        assert!(jcb().cvc("123").validate().is_ok());

        let mut card = jcb();
        card.exp_month = 13;
        assert!(card.validate().is_err());

        let mut card = jcb();
        card.exp_year = 30;
        assert!(card.validate().is_err());

        let mut card = jcb();
        card.number = "3580-8765".into();
        assert!(card.validate().is_err());

        assert!(jcb().cvc("12a").validate().is_err());
    }

    #[test]
    fn test_card_debug_masks_pan() {
        let rendered = format!("{:?}", jcb().cvc("123"));
        assert!(rendered.contains("****4076"));
        assert!(!rendered.contains("3580876521284076"));
        assert!(!rendered.contains("123\""));
    }

    #[test]
    fn test_saved_card_validation() {
        let method = PaymentMethod::from(SavedCreditCard::new("C1", ""));
        assert!(method.validate().is_err());
        let method = PaymentMethod::from(SavedCreditCard::new("C1", "card_1"));
        assert!(method.validate().is_ok());
    }

    #[test]
    fn test_cancelled_transaction_is_not_paid() {
        let txn = Transaction {
            id: "ch_1".into(),
            amount: 0,
            currency: "USD".into(),
            captured: true,
            paid: true,
            cancelled: true,
            status: "succeeded".into(),
            order_id: None,
            created_at: None,
        }
        .normalized();
        assert!(!txn.paid);
        assert!(!txn.captured);
    }
}
