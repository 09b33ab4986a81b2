//! Card Payment Gateway
//!
//! Provides one provider-agnostic interface for card payments: authorize,
//! 3-D Secure completion, capture, refund, void, query and saved-card
//! management, with adapters for Stripe and Paygent.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Merchant<G>                              │
//! │        validation | deadline | cancellation | id checks          │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │                     Gateway trait                         │  │
//! │  │  authorize | complete_authorize | capture | refund        │  │
//! │  │  void | query | create/get/list/delete credit card        │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! │                  │                           │                  │
//! │                  ▼                           ▼                  │
//! │  ┌───────────────────────────┐  ┌───────────────────────────┐  │
//! │  │  Stripe (REST, form/JSON) │  │ Paygent (telegrams, mTLS) │  │
//! │  └───────────────────────────┘  └───────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paygate_payments::{AuthorizeParams, CaptureParams, CreditCard, Merchant};
//! use paygate_payments::providers::{StripeConfig, StripeGateway};
//!
//! let merchant = Merchant::new(StripeGateway::new(StripeConfig::new("sk_test_..."))?);
//!
//! let card = CreditCard::new("Jane Doe", "4242424242424242", 12, 2030).cvc("123");
//! let auth = merchant
//!     .authorize(2999, AuthorizeParams::new("USD", "order-1234", card))
//!     .await?;
//!
//! merchant.capture(&auth.transaction_id, CaptureParams::default()).await?;
//! ```

pub mod error;
pub mod money;
pub mod params;
pub mod provider;
pub mod types;

pub mod providers;

pub use error::*;
pub use money::*;
pub use params::{Params, ThreeDSecureParams};
pub use provider::*;
pub use types::*;

pub use tokio_util::sync::CancellationToken;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Provider-agnostic entry point wrapping one gateway
pub struct Merchant<G: Gateway> {
    gateway: Arc<G>,
    config: MerchantConfig,
    cancellation: Option<CancellationToken>,
}

impl<G: Gateway> Merchant<G> {
    /// Create a new merchant
    pub fn new(gateway: G) -> Self {
        Self::with_config(gateway, MerchantConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(gateway: G, config: MerchantConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            config,
            cancellation: None,
        }
    }

    /// Abort in-flight calls once `token` is cancelled.
    ///
    /// The token applies to every call made through this merchant. To scope
    /// one to a single operation, attach it to a clone; clones share the
    /// gateway, so this costs no reconnect:
    ///
    /// ```rust,ignore
    /// let token = CancellationToken::new();
    /// let scoped = merchant.clone().with_cancellation(token.clone());
    /// let auth = scoped.authorize(29, params).await?;
    /// ```
    ///
    /// The provider-side state of an aborted call is unknown; use
    /// [`query`](Self::query) to recover it.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Get the gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &MerchantConfig {
        &self.config
    }

    /// Place an authorization hold of `amount` major units
    pub async fn authorize(&self, amount: u64, params: AuthorizeParams) -> GatewayResult<AuthorizeResponse> {
        require_amount(amount)?;
        if params.currency.is_empty() {
            return Err(GatewayError::InvalidRequest("currency is required".into()));
        }
        require_id("order id", &params.order_id)?;
        match &params.payment_method {
            Some(method) => method.validate()?,
            None => return Err(GatewayError::InvalidRequest("payment method is required".into())),
        }

        let response = self.run("authorize", self.gateway.authorize(amount, params)).await?;
        self.ensure_id("transaction id", &response.transaction_id)?;
        Ok(response)
    }

    /// Finish a 3-D Secure authorization
    pub async fn complete_authorize(
        &self,
        payment_id: &str,
        params: CompleteAuthorizeParams,
    ) -> GatewayResult<CompleteAuthorizeResponse> {
        require_id("payment id", payment_id)?;
        let response = self
            .run("complete_authorize", self.gateway.complete_authorize(payment_id, params))
            .await?;
        self.ensure_id("transaction id", &response.transaction_id)?;
        Ok(response)
    }

    /// Settle an authorization, in full unless `params.amount` is set
    pub async fn capture(&self, transaction_id: &str, params: CaptureParams) -> GatewayResult<CaptureResponse> {
        require_id("transaction id", transaction_id)?;
        if let Some(amount) = params.amount {
            require_amount(amount)?;
        }
        let response = self.run("capture", self.gateway.capture(transaction_id, params)).await?;
        self.ensure_id("transaction id", &response.transaction_id)?;
        Ok(response)
    }

    /// Refund `amount` major units
    pub async fn refund(&self, transaction_id: &str, amount: u64, params: RefundParams) -> GatewayResult<RefundResponse> {
        require_id("transaction id", transaction_id)?;
        require_amount(amount)?;
        let response = self
            .run("refund", self.gateway.refund(transaction_id, amount, params))
            .await?;
        self.ensure_id("transaction id", &response.transaction_id)?;
        Ok(response)
    }

    /// Cancel a transaction without settlement
    pub async fn void(&self, transaction_id: &str, params: VoidParams) -> GatewayResult<VoidResponse> {
        require_id("transaction id", transaction_id)?;
        let response = self.run("void", self.gateway.void(transaction_id, params)).await?;
        self.ensure_id("transaction id", &response.transaction_id)?;
        Ok(response)
    }

    /// Read a transaction
    pub async fn query(&self, transaction_id: &str) -> GatewayResult<Transaction> {
        require_id("transaction id", transaction_id)?;
        let transaction = self.run("query", self.gateway.query(transaction_id)).await?;
        self.ensure_id("transaction id", &transaction.id)?;
        Ok(transaction.normalized())
    }

    /// Store a card for a customer
    pub async fn create_credit_card(&self, params: CreateCreditCardParams) -> GatewayResult<CreditCardResponse> {
        require_id("customer id", &params.customer_id)?;
        params.credit_card.validate()?;
        let response = self
            .run("create_credit_card", self.gateway.create_credit_card(params))
            .await?;
        self.ensure_id("credit card id", &response.credit_card_id)?;
        Ok(response)
    }

    /// Read a stored card
    pub async fn get_credit_card(&self, params: GetCreditCardParams) -> GatewayResult<GetCreditCardResponse> {
        require_id("customer id", &params.customer_id)?;
        require_id("credit card id", &params.credit_card_id)?;
        let response = self.run("get_credit_card", self.gateway.get_credit_card(params)).await?;
        self.ensure_id("credit card id", &response.credit_card.credit_card_id)?;
        Ok(response)
    }

    /// List a customer's stored cards
    pub async fn list_credit_cards(&self, params: ListCreditCardsParams) -> GatewayResult<ListCreditCardsResponse> {
        require_id("customer id", &params.customer_id)?;
        let response = self
            .run("list_credit_cards", self.gateway.list_credit_cards(params))
            .await?;
        for card in &response.credit_cards {
            self.ensure_id("credit card id", &card.credit_card_id)?;
        }
        Ok(response)
    }

    /// Remove a stored card
    pub async fn delete_credit_card(&self, params: DeleteCreditCardParams) -> GatewayResult<DeleteCreditCardResponse> {
        require_id("customer id", &params.customer_id)?;
        require_id("credit card id", &params.credit_card_id)?;
        self.run("delete_credit_card", self.gateway.delete_credit_card(params))
            .await
    }

    /// Drive one gateway call under the deadline and cancellation token.
    async fn run<T, F>(&self, operation: &'static str, call: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let started = Instant::now();
        let bounded = async {
            match self.config.timeout() {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::transport(
                        TransportCause::Timeout,
                        format!("{operation} exceeded {} ms", limit.as_millis()),
                    )),
                },
                None => call.await,
            }
        };

        let result = match &self.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(GatewayError::transport(
                    TransportCause::Cancelled,
                    format!("{operation} cancelled"),
                )),
                result = bounded => result,
            },
            None => bounded.await,
        };

        if self.config.log_transactions {
            let gateway = self.gateway.name();
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => info!(gateway, operation, elapsed_ms, "payment operation completed"),
                Err(e) => warn!(gateway, operation, elapsed_ms, error = %e, "payment operation failed"),
            }
        }
        result
    }

    fn ensure_id(&self, what: &str, id: &str) -> GatewayResult<()> {
        if id.is_empty() {
            return Err(GatewayError::protocol(
                format!("{} returned an empty {what}", self.gateway.name()),
                "",
            ));
        }
        Ok(())
    }
}

impl<G: Gateway> Clone for Merchant<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            config: self.config.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

fn require_id(what: &str, id: &str) -> GatewayResult<()> {
    if id.is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{what} is required")));
    }
    Ok(())
}

fn require_amount(amount: u64) -> GatewayResult<()> {
    if amount == 0 {
        return Err(GatewayError::InvalidRequest("amount must be positive".into()));
    }
    Ok(())
}

/// Merchant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Deadline per operation in milliseconds
    pub timeout_ms: Option<u64>,
    /// Log every operation at info level
    pub log_transactions: bool,
}

impl MerchantConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            log_transactions: true,
        }
    }
}
