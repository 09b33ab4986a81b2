//! Paygent telegram gateway
//!
//! Paygent speaks a line-oriented `key=value` protocol over mutual TLS.
//! Every operation is a numbered telegram described in [`catalog`]; the
//! adapter builds requests through the catalog, sends them through a
//! [`TelegramTransport`] and interprets the parsed answer.
//!
//! ```text
//! authorize ──► 020 ──► result=0 ─────────────► payment_id
//!                  └──► result=7 (3-D Secure) ─► payment_id + acs_url/pa_req/md
//! complete_authorize ──► 094 ──► already authorized? done : 024
//! capture ─────────────► [028 when shrinking] ──► 022
//! refund / void ───────► 094 ──► 021 | 023 | 028 | 029
//! ```
//!
//! Amounts are sent as given; the provider only settles in yen.

pub mod catalog;
pub mod config;
pub mod telegram;
pub mod transport;

pub use catalog::{Operation, TelegramSpec};
pub use config::{Credentials, PaygentConfig};
pub use telegram::{Outcome, TelegramRequest, TelegramResponse};
pub use transport::{HttpsTelegramTransport, TelegramTransport};

use crate::{
    error::{GatewayError, GatewayResult},
    money::Currency,
    params::{self, Params, ThreeDSecureParams},
    provider::Gateway,
    types::*,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const GATEWAY: &str = "paygent";
/// Single lump-sum payment
const PAYMENT_CLASS_LUMP_SUM: &str = "10";
const TOKYO_OFFSET_SECS: i32 = 9 * 3600;

/// Payment lifecycle as reported by the query telegram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Waiting for 3-D Secure authentication
    Pending,
    Authorized,
    Captured,
    Cancelled,
    Other(String),
}

impl PaymentStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "10" | "11" => Self::Pending,
            "20" => Self::Authorized,
            "40" | "43" => Self::Captured,
            "32" | "33" | "41" | "61" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Cancelled => "cancelled",
            Self::Other(code) => code,
        }
    }
}

/// Query telegram answer
#[derive(Debug, Clone)]
struct Payment {
    id: String,
    status: PaymentStatus,
    amount: u64,
    currency: String,
    order_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Payment {
    fn from_response(payment_id: &str, response: &TelegramResponse) -> GatewayResult<Self> {
        let status = PaymentStatus::from_code(response.require("payment_status")?);
        let amount = match response.get("payment_amount").filter(|v| !v.is_empty()) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                GatewayError::protocol(format!("payment_amount {raw:?} is not a number"), response.raw())
            })?,
            None => 0,
        };
        let currency = response
            .get("currency_code")
            .filter(|v| !v.is_empty())
            .unwrap_or(Currency::JPY.code())
            .to_uppercase();

        Ok(Self {
            id: response
                .get("payment_id")
                .filter(|v| !v.is_empty())
                .unwrap_or(payment_id)
                .to_string(),
            status,
            amount,
            currency,
            order_id: response.get("trading_id").filter(|v| !v.is_empty()).map(str::to_string),
            created_at: response.get("payment_date").and_then(parse_payment_date),
        })
    }

    fn into_transaction(self) -> GatewayResult<Transaction> {
        let amount = i64::try_from(self.amount)
            .map_err(|_| GatewayError::protocol("payment_amount out of range", &self.amount.to_string()))?;
        let captured = self.status == PaymentStatus::Captured;
        Ok(Transaction {
            id: self.id,
            amount,
            currency: self.currency,
            captured,
            paid: captured,
            cancelled: self.status == PaymentStatus::Cancelled,
            status: self.status.as_str().to_string(),
            order_id: self.order_id,
            created_at: self.created_at,
        }
        .normalized())
    }
}

/// Paygent gateway
pub struct PaygentGateway {
    credentials: Credentials,
    transport: Arc<dyn TelegramTransport>,
}

impl PaygentGateway {
    /// Create a gateway over mutual TLS, loading the identity and CA bundle now
    pub fn new(config: PaygentConfig) -> GatewayResult<Self> {
        let transport = HttpsTelegramTransport::from_config(&config)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create a gateway over a custom transport
    pub fn with_transport(config: &PaygentConfig, transport: Arc<dyn TelegramTransport>) -> Self {
        Self {
            credentials: config.credentials(),
            transport,
        }
    }

    /// Send a telegram and return the parsed answer with its outcome.
    async fn exchange(&self, request: TelegramRequest) -> GatewayResult<(TelegramResponse, Outcome)> {
        let spec = request.spec();
        let body = request.encode(&self.credentials)?;
        debug!(gateway = GATEWAY, telegram_kind = spec.kind, operation = ?spec.operation, "sending telegram");

        let raw = self.transport.send(body).await?;
        let response = TelegramResponse::parse(&raw);
        if !response.unparsed().is_empty() {
            warn!(
                gateway = GATEWAY,
                telegram_kind = spec.kind,
                lines = response.unparsed().len(),
                "telegram response contained unparsed lines"
            );
        }

        let outcome = response.outcome().inspect_err(|e| {
            debug!(gateway = GATEWAY, telegram_kind = spec.kind, error = %e, "telegram failed");
        })?;
        if outcome == Outcome::Success {
            response.check(spec)?;
        }
        Ok((response, outcome))
    }

    /// Send a telegram that must succeed outright.
    async fn call(&self, request: TelegramRequest) -> GatewayResult<TelegramResponse> {
        match self.exchange(request).await? {
            (response, Outcome::Success) => Ok(response),
            (response, Outcome::ThreeDSecureRedirect) => Err(GatewayError::protocol(
                "unexpected 3-D Secure redirect",
                response.raw(),
            )),
        }
    }

    async fn fetch_payment(&self, payment_id: &str) -> GatewayResult<Payment> {
        let response = self
            .call(TelegramRequest::new(Operation::Query).field("payment_id", payment_id))
            .await?;
        Payment::from_response(payment_id, &response)
    }

    async fn fetch_cards(&self, customer_id: &str, card_id: Option<&str>) -> GatewayResult<Vec<CustomerCreditCard>> {
        let request = match card_id {
            Some(card_id) => TelegramRequest::new(Operation::GetSavedCard).field("customer_card_id", card_id),
            None => TelegramRequest::new(Operation::ListSavedCards),
        }
        .field("customer_id", customer_id);

        let response = self.call(request).await?;
        response
            .groups("customer_card_id")
            .iter()
            .map(|group| customer_card(customer_id, group, response.raw()))
            .collect()
    }
}

#[async_trait]
impl Gateway for PaygentGateway {
    fn name(&self) -> &'static str {
        GATEWAY
    }

    async fn authorize(&self, amount: u64, request: AuthorizeParams) -> GatewayResult<AuthorizeResponse> {
        let currency = Currency::parse(&request.currency)?;

        let mut telegram = match &request.payment_method {
            Some(PaymentMethod::CreditCard(card)) => TelegramRequest::new(Operation::Authorize)
                .field("card_number", &card.number)
                .field("card_valid_term", valid_term(card.exp_month, card.exp_year))
                .optional("cardholder_name", Some(&card.name).filter(|name| !name.is_empty()))
                .optional("card_conf_number", card.cvc.as_ref())
                .optional("security_code_use", card.cvc.as_ref().map(|_| "1")),
            Some(PaymentMethod::SavedCreditCard(saved)) => TelegramRequest::new(Operation::AuthorizeSavedCard)
                .field("stock_card_mode", "1")
                .field("customer_id", &saved.customer_id)
                .field("customer_card_id", &saved.credit_card_id),
            None => {
                return Err(GatewayError::InvalidRequest("payment method is required".into()));
            }
        };

        telegram = telegram
            .field("trading_id", &request.order_id)
            .field("payment_amount", amount)
            .field("payment_class", PAYMENT_CLASS_LUMP_SUM)
            .field("currency_code", currency.code());

        if request.params.get_bool(params::THREE_D_MODE).unwrap_or(false) {
            let browser: ThreeDSecureParams = request.params.get_as(params::THREE_D_PARAMS)?.ok_or_else(|| {
                GatewayError::InvalidRequest(format!(
                    "{} requires {}",
                    params::THREE_D_MODE,
                    params::THREE_D_PARAMS
                ))
            })?;
            telegram = telegram
                .field("3dsecure_ryaku", "0")
                .field("http_user_agent", browser.user_agent)
                .field("http_accept", browser.http_accept)
                .field("term_url", browser.term_url);
        } else {
            telegram = telegram.field("3dsecure_ryaku", "1");
        }

        let (response, outcome) = self.exchange(telegram).await?;
        let transaction_id = response.require("payment_id")?.to_string();
        let mut out = response.unparsed_params();

        if outcome == Outcome::ThreeDSecureRedirect {
            out.insert(params::ACS_URL, response.require("acs_url")?);
            for key in [params::PA_REQ, params::MD] {
                if let Some(value) = response.get(key) {
                    out.insert(key, value);
                }
            }
            debug!(gateway = GATEWAY, transaction_id = %transaction_id, "authorization awaits 3-D Secure");
        }

        Ok(AuthorizeResponse {
            transaction_id,
            params: out,
        })
    }

    async fn complete_authorize(
        &self,
        payment_id: &str,
        request: CompleteAuthorizeParams,
    ) -> GatewayResult<CompleteAuthorizeResponse> {
        let pares = request
            .params
            .get_str(params::PARES)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::InvalidRequest(format!("{} is required", params::PARES)))?;

        let payment = self.fetch_payment(payment_id).await?;
        if matches!(payment.status, PaymentStatus::Authorized | PaymentStatus::Captured) {
            debug!(gateway = GATEWAY, transaction_id = payment_id, "already authenticated");
            return Ok(CompleteAuthorizeResponse {
                transaction_id: payment_id.to_string(),
                params: Params::new(),
            });
        }

        let response = self
            .call(
                TelegramRequest::new(Operation::CompleteThreeDSecure)
                    .field("payment_id", payment_id)
                    .field("pares", pares)
                    .optional("md", request.params.get_str(params::MD)),
            )
            .await?;

        Ok(CompleteAuthorizeResponse {
            transaction_id: response.require("payment_id")?.to_string(),
            params: response.unparsed_params(),
        })
    }

    async fn capture(&self, transaction_id: &str, request: CaptureParams) -> GatewayResult<CaptureResponse> {
        if let Some(amount) = request.amount {
            let payment = self.fetch_payment(transaction_id).await?;
            if amount > payment.amount {
                return Err(GatewayError::InvalidRequest(format!(
                    "capture of {amount} exceeds the authorized {}",
                    payment.amount
                )));
            }
            if amount < payment.amount {
                self.call(
                    TelegramRequest::new(Operation::AuthorizeChange)
                        .field("payment_id", transaction_id)
                        .field("payment_amount", amount),
                )
                .await?;
            }
        }

        let response = self
            .call(TelegramRequest::new(Operation::Capture).field("payment_id", transaction_id))
            .await?;

        Ok(CaptureResponse {
            transaction_id: transaction_id.to_string(),
            params: response.unparsed_params(),
        })
    }

    async fn refund(&self, transaction_id: &str, amount: u64, _request: RefundParams) -> GatewayResult<RefundResponse> {
        let payment = self.fetch_payment(transaction_id).await?;
        if payment.status == PaymentStatus::Cancelled {
            return Err(GatewayError::InvalidRequest(format!(
                "payment {transaction_id} is already cancelled"
            )));
        }
        let remaining = payment.amount.checked_sub(amount).ok_or_else(|| {
            GatewayError::InvalidRequest(format!(
                "refund of {amount} exceeds the outstanding {}",
                payment.amount
            ))
        })?;

        let captured = payment.status == PaymentStatus::Captured;
        let telegram = match (captured, remaining) {
            (true, 0) => TelegramRequest::new(Operation::SaleCancel),
            (true, remaining) => TelegramRequest::new(Operation::SaleChange).field("payment_amount", remaining),
            (false, 0) => TelegramRequest::new(Operation::AuthorizeCancel),
            (false, remaining) => {
                TelegramRequest::new(Operation::AuthorizeChange).field("payment_amount", remaining)
            }
        }
        .field("payment_id", transaction_id);

        let response = self.call(telegram).await?;
        debug!(gateway = GATEWAY, transaction_id, amount, remaining, "refunded");

        Ok(RefundResponse {
            transaction_id: transaction_id.to_string(),
            params: response.unparsed_params(),
        })
    }

    async fn void(&self, transaction_id: &str, _request: VoidParams) -> GatewayResult<VoidResponse> {
        let payment = self.fetch_payment(transaction_id).await?;
        let operation = match payment.status {
            PaymentStatus::Cancelled => {
                return Ok(VoidResponse {
                    transaction_id: transaction_id.to_string(),
                    params: Params::new(),
                });
            }
            PaymentStatus::Captured => Operation::SaleCancel,
            _ => Operation::AuthorizeCancel,
        };

        let response = self
            .call(TelegramRequest::new(operation).field("payment_id", transaction_id))
            .await?;

        Ok(VoidResponse {
            transaction_id: transaction_id.to_string(),
            params: response.unparsed_params(),
        })
    }

    async fn query(&self, transaction_id: &str) -> GatewayResult<Transaction> {
        self.fetch_payment(transaction_id).await?.into_transaction()
    }

    async fn create_credit_card(&self, request: CreateCreditCardParams) -> GatewayResult<CreditCardResponse> {
        let card = &request.credit_card;
        let response = self
            .call(
                TelegramRequest::new(Operation::CreateSavedCard)
                    .field("customer_id", &request.customer_id)
                    .field("card_number", &card.number)
                    .field("card_valid_term", valid_term(card.exp_month, card.exp_year))
                    .optional("cardholder_name", Some(&card.name).filter(|name| !name.is_empty())),
            )
            .await?;

        Ok(CreditCardResponse {
            credit_card_id: response.require("customer_card_id")?.to_string(),
            customer_id: request.customer_id,
            params: response.unparsed_params(),
        })
    }

    async fn get_credit_card(&self, request: GetCreditCardParams) -> GatewayResult<GetCreditCardResponse> {
        let cards = self
            .fetch_cards(&request.customer_id, Some(&request.credit_card_id))
            .await?;
        cards
            .into_iter()
            .find(|card| card.credit_card_id == request.credit_card_id)
            .map(|credit_card| GetCreditCardResponse { credit_card })
            .ok_or_else(|| {
                GatewayError::provider(
                    "not_found",
                    format!(
                        "card {} not found for customer {}",
                        request.credit_card_id, request.customer_id
                    ),
                )
            })
    }

    async fn list_credit_cards(&self, request: ListCreditCardsParams) -> GatewayResult<ListCreditCardsResponse> {
        Ok(ListCreditCardsResponse {
            credit_cards: self.fetch_cards(&request.customer_id, None).await?,
        })
    }

    async fn delete_credit_card(&self, request: DeleteCreditCardParams) -> GatewayResult<DeleteCreditCardResponse> {
        let result = self
            .call(
                TelegramRequest::new(Operation::DeleteSavedCard)
                    .field("customer_id", &request.customer_id)
                    .field("customer_card_id", &request.credit_card_id),
            )
            .await;

        match result {
            Ok(_) => Ok(DeleteCreditCardResponse {}),
            Err(GatewayError::Provider(err)) => {
                let cards = self.fetch_cards(&request.customer_id, None).await?;
                if cards.iter().any(|card| card.credit_card_id == request.credit_card_id) {
                    return Err(GatewayError::Provider(err));
                }
                debug!(gateway = GATEWAY, code = %err.code, "card already absent");
                Ok(DeleteCreditCardResponse {})
            }
            Err(e) => Err(e),
        }
    }
}

/// Expiry as MMYY
fn valid_term(month: u32, year: u32) -> String {
    format!("{:02}{:02}", month, year % 100)
}

fn parse_valid_term(term: &str) -> Option<(u32, u32)> {
    if term.len() != 4 || !term.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month: u32 = term[..2].parse().ok()?;
    let year: u32 = term[2..].parse().ok()?;
    (1..=12).contains(&month).then_some((month, 2000 + year))
}

/// `YYYYMMDDhhmmss`, Japan time
fn parse_payment_date(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S").ok()?;
    let offset = FixedOffset::east_opt(TOKYO_OFFSET_SECS)?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

fn customer_card(customer_id: &str, group: &HashMap<&str, &str>, raw: &str) -> GatewayResult<CustomerCreditCard> {
    let field = |key: &str| group.get(key).copied().unwrap_or_default();
    let term = field("card_valid_term");
    let (exp_month, exp_year) = parse_valid_term(term)
        .ok_or_else(|| GatewayError::protocol(format!("card_valid_term {term:?} is not MMYY"), raw))?;

    Ok(CustomerCreditCard {
        customer_id: customer_id.to_string(),
        customer_name: field("cardholder_name").to_string(),
        credit_card_id: field("customer_card_id").to_string(),
        masked_number: last4(field("card_number")),
        exp_month,
        exp_year,
        brand: field("card_brand").to_string(),
    })
}
