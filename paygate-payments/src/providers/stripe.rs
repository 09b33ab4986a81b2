//! Stripe payment provider implementation

use crate::{
    error::{GatewayError, GatewayResult},
    money::{Currency, Money},
    params::{self, Params},
    provider::{Gateway, ProviderClient},
    types::*,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";
const PAGE_SIZE: &str = "100";

/// Stripe adapter configuration
#[derive(Clone, Deserialize)]
pub struct StripeConfig {
    /// Secret API key
    pub key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Charges capture immediately unless disabled here or by the `capture` param
    #[serde(default = "default_true")]
    pub capture_on_authorize: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

impl StripeConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_url: default_base_url(),
            capture_on_authorize: true,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Point the adapter at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Authorize without capturing; `capture` settles later
    pub fn deferred_capture(mut self) -> Self {
        self.capture_on_authorize = false;
        self
    }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("capture_on_authorize", &self.capture_on_authorize)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Stripe provider
pub struct StripeGateway {
    client: ProviderClient,
    capture_on_authorize: bool,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> GatewayResult<Self> {
        Ok(Self {
            client: ProviderClient::new(
                &config.base_url,
                config.key,
                Duration::from_secs(config.timeout_secs),
            )?,
            capture_on_authorize: config.capture_on_authorize,
        })
    }

    /// Mint a single-use token for raw card details
    async fn create_token(
        &self,
        card: &CreditCard,
        customer: Option<&str>,
        address: Option<&Address>,
    ) -> GatewayResult<String> {
        let mut form = vec![
            ("card[name]", card.name.clone()),
            ("card[number]", card.number.clone()),
            ("card[exp_month]", card.exp_month.to_string()),
            ("card[exp_year]", card.exp_year.to_string()),
        ];
        if let Some(cvc) = &card.cvc {
            form.push(("card[cvc]", cvc.clone()));
        }
        if let Some(address) = address {
            let fields = [
                ("card[address_line1]", &address.line1),
                ("card[address_line2]", &address.line2),
                ("card[address_city]", &address.city),
                ("card[address_state]", &address.state),
                ("card[address_zip]", &address.zip),
                ("card[address_country]", &address.country),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    form.push((key, value.clone()));
                }
            }
        }
        if let Some(customer) = customer.filter(|c| !c.is_empty()) {
            form.push(("customer", customer.to_string()));
        }

        let token: StripeToken = decode(self.client.post_form("/tokens", &form, None).await?).await?;
        Ok(token.id)
    }

    async fn fetch_charge(&self, charge_id: &str) -> GatewayResult<StripeCharge> {
        let path = format!("/charges/{}", path_id(charge_id)?);
        decode(self.client.get(&path, &[]).await?).await
    }

    async fn capture_charge(&self, charge_id: &str, amount: Option<i64>) -> GatewayResult<()> {
        let mut form = Vec::new();
        if let Some(amount) = amount {
            form.push(("amount", amount.to_string()));
        }
        let path = format!("/charges/{}/capture", path_id(charge_id)?);
        match decode::<StripeCharge>(self.client.post_form(&path, &form, None).await?).await {
            Ok(_) => Ok(()),
            Err(GatewayError::Provider(e)) if e.code == "charge_already_captured" => {
                debug!(charge_id, "charge already captured");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_refund(&self, charge_id: &str, amount: Option<i64>) -> GatewayResult<StripeRefund> {
        let mut form = vec![("charge", charge_id.to_string())];
        if let Some(amount) = amount {
            form.push(("amount", amount.to_string()));
        }
        decode(self.client.post_form("/refunds", &form, None).await?).await
    }
}

#[async_trait]
impl Gateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn authorize(&self, amount: u64, request: AuthorizeParams) -> GatewayResult<AuthorizeResponse> {
        let currency = Currency::parse(&request.currency)?;
        let money = Money::from_major(amount, currency)?;

        let mut form = vec![
            ("amount", money.amount.to_string()),
            ("currency", currency.code().to_lowercase()),
        ];

        let description = request
            .description
            .clone()
            .or_else(|| request.params.get_str(params::DESCRIPTION).map(str::to_string));
        if let Some(desc) = description {
            form.push(("description", desc));
        }
        form.push(("metadata[order_id]", request.order_id.clone()));

        match &request.payment_method {
            Some(PaymentMethod::CreditCard(card)) => {
                let token = self
                    .create_token(card, request.customer.as_deref(), request.billing_address.as_ref())
                    .await?;
                form.push(("source", token));
            }
            Some(PaymentMethod::SavedCreditCard(saved)) => {
                if !saved.customer_id.is_empty() {
                    form.push(("customer", saved.customer_id.clone()));
                }
                form.push(("source", saved.credit_card_id.clone()));
            }
            None => {
                return Err(GatewayError::InvalidRequest("payment method is required".into()));
            }
        }

        let capture = request
            .params
            .get_bool(params::CAPTURE)
            .unwrap_or(self.capture_on_authorize);
        form.push(("capture", capture.to_string()));

        if let Some(descriptor) = request.params.get_str(params::STATEMENT_DESCRIPTOR) {
            form.push(("statement_descriptor", descriptor.to_string()));
        }

        let idempotency_key = request.params.get_str(params::IDEMPOTENCY_KEY);
        let response = self.client.post_form("/charges", &form, idempotency_key).await?;
        let charge: StripeCharge = decode(response).await?;

        debug!(charge_id = %charge.id, captured = charge.captured, "charge created");
        Ok(AuthorizeResponse {
            params: Params::new()
                .with("captured", charge.captured)
                .with("status", charge.status.clone()),
            transaction_id: charge.id,
        })
    }

    async fn complete_authorize(
        &self,
        payment_id: &str,
        _params: CompleteAuthorizeParams,
    ) -> GatewayResult<CompleteAuthorizeResponse> {
        // Charges are final on creation, nothing is pending here.
        Ok(CompleteAuthorizeResponse {
            transaction_id: payment_id.to_string(),
            params: Params::new(),
        })
    }

    async fn capture(&self, transaction_id: &str, params: CaptureParams) -> GatewayResult<CaptureResponse> {
        let amount = match params.amount {
            Some(amount) => {
                let charge = self.fetch_charge(transaction_id).await?;
                let currency = Currency::parse(&charge.currency)?;
                Some(Money::from_major(amount, currency)?.amount)
            }
            None => None,
        };
        self.capture_charge(transaction_id, amount).await?;
        Ok(CaptureResponse {
            transaction_id: transaction_id.to_string(),
            params: Params::new(),
        })
    }

    async fn refund(&self, transaction_id: &str, amount: u64, _params: RefundParams) -> GatewayResult<RefundResponse> {
        let transaction = self.query(transaction_id).await?;
        let currency = Currency::parse(&transaction.currency)?;
        let refund_amount = Money::from_major(amount, currency)?.amount;

        if transaction.captured {
            let refund = self.create_refund(transaction_id, Some(refund_amount)).await?;
            debug!(charge_id = transaction_id, refund_id = %refund.id, "refund created");
            return Ok(RefundResponse {
                transaction_id: transaction_id.to_string(),
                params: Params::new().with("refund_id", refund.id),
            });
        }

        // Uncaptured: settle only what remains instead of refunding.
        if refund_amount > transaction.amount {
            return Err(GatewayError::InvalidRequest(format!(
                "refund of {} exceeds authorized {}",
                Money::new(refund_amount, currency),
                Money::new(transaction.amount, currency)
            )));
        }
        let remaining = transaction.amount - refund_amount;
        if remaining == 0 {
            self.create_refund(transaction_id, None).await?;
        } else {
            self.capture_charge(transaction_id, Some(remaining)).await?;
        }
        debug!(charge_id = transaction_id, remaining, "uncaptured charge reduced");
        Ok(RefundResponse {
            transaction_id: transaction_id.to_string(),
            params: Params::new(),
        })
    }

    async fn void(&self, transaction_id: &str, _params: VoidParams) -> GatewayResult<VoidResponse> {
        let refund = self.create_refund(path_id(transaction_id)?, None).await?;
        Ok(VoidResponse {
            transaction_id: transaction_id.to_string(),
            params: Params::new().with("refund_id", refund.id),
        })
    }

    async fn query(&self, transaction_id: &str) -> GatewayResult<Transaction> {
        Ok(self.fetch_charge(transaction_id).await?.into())
    }

    async fn create_credit_card(&self, params: CreateCreditCardParams) -> GatewayResult<CreditCardResponse> {
        let token = self
            .create_token(&params.credit_card, None, params.billing_address.as_ref())
            .await?;
        let path = format!("/customers/{}/sources", path_id(&params.customer_id)?);
        let card: StripeCard = decode(self.client.post_form(&path, &[("source", token)], None).await?).await?;

        Ok(CreditCardResponse {
            customer_id: card.customer.clone().unwrap_or(params.customer_id),
            credit_card_id: card.id,
            params: Params::new(),
        })
    }

    async fn get_credit_card(&self, params: GetCreditCardParams) -> GatewayResult<GetCreditCardResponse> {
        let path = format!(
            "/customers/{}/sources/{}",
            path_id(&params.customer_id)?,
            path_id(&params.credit_card_id)?
        );
        let card: StripeCard = decode(self.client.get(&path, &[]).await?).await?;
        Ok(GetCreditCardResponse {
            credit_card: card.into_customer_card(&params.customer_id),
        })
    }

    async fn list_credit_cards(&self, params: ListCreditCardsParams) -> GatewayResult<ListCreditCardsResponse> {
        let path = format!("/customers/{}/sources", path_id(&params.customer_id)?);
        let mut credit_cards = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![("object", "card".to_string()), ("limit", PAGE_SIZE.to_string())];
            if let Some(after) = &starting_after {
                query.push(("starting_after", after.clone()));
            }
            let page: StripeList<StripeCard> = decode(self.client.get(&path, &query).await?).await?;
            starting_after = page.data.last().map(|c| c.id.clone());
            credit_cards.extend(
                page.data
                    .into_iter()
                    .map(|c| c.into_customer_card(&params.customer_id)),
            );
            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        Ok(ListCreditCardsResponse { credit_cards })
    }

    async fn delete_credit_card(&self, params: DeleteCreditCardParams) -> GatewayResult<DeleteCreditCardResponse> {
        let path = format!(
            "/customers/{}/sources/{}",
            path_id(&params.customer_id)?,
            path_id(&params.credit_card_id)?
        );
        match decode::<serde_json::Value>(self.client.delete(&path).await?).await {
            Ok(_) => Ok(DeleteCreditCardResponse {}),
            Err(e) if e.is_not_found() => {
                debug!(credit_card_id = %params.credit_card_id, "card already absent");
                Ok(DeleteCreditCardResponse {})
            }
            Err(e) => Err(e),
        }
    }
}

/// Read a Stripe response body, mapping error envelopes to provider errors.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(|e| GatewayError::protocol(format!("unexpected Stripe response: {e}"), &body));
    }

    match serde_json::from_str::<StripeError>(&body) {
        Ok(StripeError { error }) => {
            let code = error
                .code
                .or(error.decline_code)
                .or(error.error_type)
                .unwrap_or_else(|| status.as_u16().to_string());
            Err(GatewayError::provider(code, error.message.unwrap_or_default()))
        }
        Err(_) => Err(GatewayError::protocol(
            format!("HTTP {status} without a Stripe error body"),
            &body,
        )),
    }
}

/// Stripe object ids are plain tokens; anything else would alter the path.
fn path_id(id: &str) -> GatewayResult<&str> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(id)
    } else {
        Err(GatewayError::InvalidRequest(format!("malformed Stripe id {id:?}")))
    }
}

// Stripe API types

#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    decline_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct StripeToken {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    amount: i64,
    #[serde(default)]
    amount_refunded: i64,
    currency: String,
    status: String,
    captured: bool,
    #[serde(default)]
    paid: bool,
    #[serde(default)]
    refunded: bool,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<StripeCharge> for Transaction {
    fn from(mut sc: StripeCharge) -> Self {
        Transaction {
            amount: sc.amount - sc.amount_refunded,
            currency: sc.currency.to_uppercase(),
            captured: sc.captured,
            paid: sc.paid,
            cancelled: sc.refunded,
            status: sc.status,
            order_id: sc.metadata.remove("order_id"),
            created_at: Utc.timestamp_opt(sc.created, 0).single(),
            id: sc.id,
        }
        .normalized()
    }
}

#[derive(Debug, Deserialize)]
struct StripeCard {
    id: String,
    customer: Option<String>,
    name: Option<String>,
    last4: String,
    exp_month: u32,
    exp_year: u32,
    brand: String,
}

impl StripeCard {
    fn into_customer_card(self, customer_id: &str) -> CustomerCreditCard {
        CustomerCreditCard {
            customer_id: self.customer.unwrap_or_else(|| customer_id.to_string()),
            customer_name: self.name.unwrap_or_default(),
            credit_card_id: self.id,
            masked_number: self.last4,
            exp_month: self.exp_month,
            exp_year: self.exp_year,
            brand: self.brand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer, config: fn(StripeConfig) -> StripeConfig) -> StripeGateway {
        StripeGateway::new(config(StripeConfig::new("sk_test_123").with_base_url(server.uri()))).unwrap()
    }

    fn charge(id: &str, amount: i64, currency: &str, captured: bool) -> Value {
        json!({
            "id": id,
            "object": "charge",
            "amount": amount,
            "amount_refunded": 0,
            "currency": currency,
            "captured": captured,
            "paid": true,
            "refunded": false,
            "status": "succeeded",
            "created": 1_700_000_000,
            "metadata": { "order_id": "O1" }
        })
    }

    fn card_json(id: &str, last4: &str) -> Value {
        json!({
            "id": id,
            "object": "card",
            "customer": "cus_1",
            "name": "JCB Card",
            "last4": last4,
            "exp_month": 1,
            "exp_year": 2030,
            "brand": "JCB"
        })
    }

    fn jcb() -> CreditCard {
        CreditCard::new("JCB Card", "3580876521284076", 1, 2030)
    }

    #[tokio::test]
    async fn test_authorize_raw_card_mints_token_and_scales_usd() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .and(body_string_contains("card%5Bnumber%5D=3580876521284076"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "tok_1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .and(body_string_contains("amount=20000&currency=usd"))
            .and(body_string_contains("metadata%5Border_id%5D=O1"))
            .and(body_string_contains("source=tok_1"))
            .and(body_string_contains("capture=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_1", 20000, "usd", true)))
            .expect(1)
            .mount(&server)
            .await;

        let response = gateway(&server, |c| c)
            .authorize(200, AuthorizeParams::new("USD", "O1", jcb()))
            .await
            .unwrap();
        assert_eq!(response.transaction_id, "ch_1");
        assert_eq!(response.params.get_bool("captured"), Some(true));
    }

    #[tokio::test]
    async fn test_authorize_saved_card_jpy_is_not_scaled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .and(body_string_contains("amount=100&currency=jpy"))
            .and(body_string_contains("customer=cus_1"))
            .and(body_string_contains("source=card_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_2", 100, "jpy", true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let response = gateway(&server, |c| c)
            .authorize(100, AuthorizeParams::new("JPY", "O2", SavedCreditCard::new("cus_1", "card_1")))
            .await
            .unwrap();
        assert_eq!(response.transaction_id, "ch_2");
    }

    #[tokio::test]
    async fn test_refund_of_uncaptured_charge_partially_captures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_1", 20000, "usd", false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/charges/ch_1/capture"))
            .and(body_string_contains("amount=15000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_1", 15000, "usd", true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refunds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "re_1"})))
            .expect(0)
            .mount(&server)
            .await;

        let response = gateway(&server, StripeConfig::deferred_capture)
            .refund("ch_1", 50, RefundParams::default())
            .await
            .unwrap();
        assert_eq!(response.transaction_id, "ch_1");
    }

    #[tokio::test]
    async fn test_refund_of_captured_charge_creates_refund() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_1", 20000, "usd", true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/refunds"))
            .and(body_string_contains("charge=ch_1&amount=5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "re_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = gateway(&server, |c| c)
            .refund("ch_1", 50, RefundParams::default())
            .await
            .unwrap();
        assert_eq!(response.params.get_str("refund_id"), Some("re_1"));
    }

    #[tokio::test]
    async fn test_refund_exceeding_authorization_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(charge("ch_1", 1000, "usd", false)))
            .mount(&server)
            .await;

        let err = gateway(&server, |c| c)
            .refund("ch_1", 11, RefundParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_capture_of_captured_charge_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges/ch_1/capture"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "charge_already_captured",
                    "message": "Charge ch_1 has already been captured."
                }
            })))
            .mount(&server)
            .await;

        let response = gateway(&server, |c| c)
            .capture("ch_1", CaptureParams::default())
            .await
            .unwrap();
        assert_eq!(response.transaction_id, "ch_1");
    }

    #[tokio::test]
    async fn test_declined_charge_keeps_provider_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "decline_code": "insufficient_funds",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server, |c| c)
            .authorize(10, AuthorizeParams::new("USD", "O1", SavedCreditCard::new("cus_1", "card_1")))
            .await
            .unwrap_err();
        match err {
            GatewayError::Provider(e) => {
                assert_eq!(e.code, "card_declined");
                assert_eq!(e.detail, "Your card was declined.");
                assert_eq!(e.kind, crate::error::ProviderErrorKind::Declined);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_failure_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charges/ch_1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = gateway(&server, |c| c).query("ch_1").await.unwrap_err();
        match err {
            GatewayError::Protocol { fragment, .. } => assert!(fragment.contains("bad gateway")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_maps_refunds() {
        let server = MockServer::start().await;
        let mut body = charge("ch_1", 20000, "usd", true);
        body["amount_refunded"] = json!(20000);
        body["refunded"] = json!(true);
        Mock::given(method("GET"))
            .and(path("/charges/ch_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let txn = gateway(&server, |c| c).query("ch_1").await.unwrap();
        assert_eq!(txn.amount, 0);
        assert_eq!(txn.currency, "USD");
        assert_eq!(txn.order_id.as_deref(), Some("O1"));
        assert!(txn.cancelled);
        assert!(!txn.paid && !txn.captured);
    }

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers/cus_1/sources"))
            .and(query_param("object", "card"))
            .and(query_param_is_missing("starting_after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [card_json("card_1", "4076"), card_json("card_2", "4242")],
                "has_more": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customers/cus_1/sources"))
            .and(query_param("starting_after", "card_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [card_json("card_3", "0005")],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let list = gateway(&server, |c| c)
            .list_credit_cards(ListCreditCardsParams {
                customer_id: "cus_1".into(),
            })
            .await
            .unwrap();
        let ids: Vec<_> = list.credit_cards.iter().map(|c| c.credit_card_id.as_str()).collect();
        assert_eq!(ids, ["card_1", "card_2", "card_3"]);
        assert_eq!(list.credit_cards[0].masked_number, "4076");
    }

    #[tokio::test]
    async fn test_create_then_get_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "tok_9"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/customers/cus_1/sources"))
            .and(body_string_contains("source=tok_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card_json("card_9", "4076")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/customers/cus_1/sources/card_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(card_json("card_9", "4076")))
            .mount(&server)
            .await;

        let gw = gateway(&server, |c| c);
        let saved = gw
            .create_credit_card(CreateCreditCardParams {
                customer_id: "cus_1".into(),
                credit_card: jcb(),
                billing_address: None,
            })
            .await
            .unwrap();
        assert_eq!(saved.customer_id, "cus_1");
        assert_eq!(saved.credit_card_id, "card_9");

        let fetched = gw
            .get_credit_card(GetCreditCardParams {
                customer_id: "cus_1".into(),
                credit_card_id: saved.credit_card_id,
            })
            .await
            .unwrap();
        assert_eq!(fetched.credit_card.masked_number, jcb().last4());
        assert_eq!(fetched.credit_card.exp_month, 1);
        assert_eq!(fetched.credit_card.exp_year, 2030);
    }

    #[tokio::test]
    async fn test_delete_absent_card_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/customers/cus_1/sources/card_1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "resource_missing",
                    "message": "No such source: 'card_1'"
                }
            })))
            .mount(&server)
            .await;

        let result = gateway(&server, |c| c)
            .delete_credit_card(DeleteCreditCardParams {
                customer_id: "cus_1".into(),
                credit_card_id: "card_1".into(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_path_id_rejects_traversal() {
        assert!(path_id("ch_1").is_ok());
        assert!(path_id("../customers").is_err());
        assert!(path_id("").is_err());
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let rendered = format!("{:?}", StripeConfig::new("sk_live_secret"));
        assert!(!rendered.contains("sk_live_secret"));
    }
}
