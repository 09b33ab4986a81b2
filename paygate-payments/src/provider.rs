//! Gateway trait and the shared REST client

use crate::{
    error::{GatewayError, GatewayResult},
    types::*,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Operation surface every provider adapter satisfies.
///
/// Amounts are unsigned major units. Each default body fails with
/// [`GatewayError::Unsupported`] without touching the network, so an adapter
/// only overrides what its provider can do.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Get provider name
    fn name(&self) -> &'static str;

    /// Place an authorization hold
    async fn authorize(&self, amount: u64, params: AuthorizeParams) -> GatewayResult<AuthorizeResponse> {
        let _ = (amount, params);
        Err(self.unsupported("authorize"))
    }

    /// Finish a deferred (3-D Secure) authorization
    async fn complete_authorize(
        &self,
        payment_id: &str,
        params: CompleteAuthorizeParams,
    ) -> GatewayResult<CompleteAuthorizeResponse> {
        let _ = (payment_id, params);
        Err(self.unsupported("complete_authorize"))
    }

    /// Settle an authorization
    async fn capture(&self, transaction_id: &str, params: CaptureParams) -> GatewayResult<CaptureResponse> {
        let _ = (transaction_id, params);
        Err(self.unsupported("capture"))
    }

    /// Return funds, or shrink an uncaptured authorization
    async fn refund(&self, transaction_id: &str, amount: u64, params: RefundParams) -> GatewayResult<RefundResponse> {
        let _ = (transaction_id, amount, params);
        Err(self.unsupported("refund"))
    }

    /// Cancel without settlement
    async fn void(&self, transaction_id: &str, params: VoidParams) -> GatewayResult<VoidResponse> {
        let _ = (transaction_id, params);
        Err(self.unsupported("void"))
    }

    /// Read a transaction
    async fn query(&self, transaction_id: &str) -> GatewayResult<Transaction> {
        let _ = transaction_id;
        Err(self.unsupported("query"))
    }

    /// Tokenize and store a card for a customer
    async fn create_credit_card(&self, params: CreateCreditCardParams) -> GatewayResult<CreditCardResponse> {
        let _ = params;
        Err(self.unsupported("create_credit_card"))
    }

    /// Read a stored card
    async fn get_credit_card(&self, params: GetCreditCardParams) -> GatewayResult<GetCreditCardResponse> {
        let _ = params;
        Err(self.unsupported("get_credit_card"))
    }

    /// List a customer's stored cards in provider order
    async fn list_credit_cards(&self, params: ListCreditCardsParams) -> GatewayResult<ListCreditCardsResponse> {
        let _ = params;
        Err(self.unsupported("list_credit_cards"))
    }

    /// Remove a stored card; removing an absent card succeeds
    async fn delete_credit_card(&self, params: DeleteCreditCardParams) -> GatewayResult<DeleteCreditCardResponse> {
        let _ = params;
        Err(self.unsupported("delete_credit_card"))
    }

    #[doc(hidden)]
    fn unsupported(&self, operation: &'static str) -> GatewayError {
        GatewayError::Unsupported {
            gateway: self.name(),
            operation,
        }
    }
}

/// Common HTTP client for REST providers
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid base url {base_url:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::from)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::new(api_key.into().into()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with query parameters
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> GatewayResult<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .query(query)
            .send()
            .await?)
    }

    /// POST request with form body
    pub async fn post_form(
        &self,
        path: &str,
        body: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> GatewayResult<reqwest::Response> {
        let mut request = self
            .client
            .post(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .form(body);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        Ok(request.send().await?)
    }

    /// DELETE request
    pub async fn delete(&self, path: &str) -> GatewayResult<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?)
    }
}
