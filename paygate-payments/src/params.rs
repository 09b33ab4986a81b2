//! Opaque provider-specific parameter bag
//!
//! Requests and responses carry a [`Params`] map for extensions that only one
//! provider understands (3-D Secure, descriptors, idempotency keys). An adapter
//! reads the keys it knows and ignores the rest.

use crate::error::{GatewayError, GatewayResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Enables the 3-D Secure two-leg flow (`bool`).
pub const THREE_D_MODE: &str = "3DMode";
/// [`ThreeDSecureParams`] for the 3-D Secure initiation leg.
pub const THREE_D_PARAMS: &str = "3DParams";
/// Issuer response posted back to the merchant's return URL.
pub const PARES: &str = "pares";
/// Merchant data echoed by the issuer's ACS.
pub const MD: &str = "md";
/// ACS URL the cardholder must be redirected to.
pub const ACS_URL: &str = "acs_url";
/// Payer authentication request to post to the ACS.
pub const PA_REQ: &str = "pa_req";
/// Response lines that did not parse as `key=value`.
pub const UNPARSED: &str = "unparsed";
pub const DESCRIPTION: &str = "description";
pub const STATEMENT_DESCRIPTOR: &str = "statement_descriptor";
pub const IDEMPOTENCY_KEY: &str = "idempotency_key";
/// Overrides whether a charge is captured on authorize (`bool`).
pub const CAPTURE: &str = "capture";

/// String-keyed bag of opaque values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a serializable value
    pub fn insert_as<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> GatewayResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| GatewayError::InvalidRequest(format!("unserializable param: {e}")))?;
        self.0.insert(key.into(), value);
        Ok(())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `true` only for a JSON boolean `true` or the string `"true"`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Decode a structured value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> GatewayResult<Option<T>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| GatewayError::InvalidRequest(format!("param {key:?}: {e}"))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Browser details required to start a 3-D Secure challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDSecureParams {
    pub user_agent: String,
    /// Merchant URL the issuer posts the result back to
    pub term_url: String,
    /// Browser `Accept` header
    pub http_accept: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_accessor() {
        let params = Params::new()
            .with(THREE_D_MODE, true)
            .with("flag", "true")
            .with("count", 3);
        assert_eq!(params.get_bool(THREE_D_MODE), Some(true));
        assert_eq!(params.get_bool("flag"), Some(true));
        assert_eq!(params.get_bool("count"), None);
        assert_eq!(params.get_bool("missing"), None);
    }

    #[test]
    fn test_three_d_params_round_trip_through_bag() {
        let three_d = ThreeDSecureParams {
            user_agent: "Mozilla/5.0".into(),
            term_url: "https://shop.example/return".into(),
            http_accept: "text/html".into(),
        };
        let mut params = Params::new();
        params.insert_as(THREE_D_PARAMS, &three_d).unwrap();
        let decoded: ThreeDSecureParams = params.get_as(THREE_D_PARAMS).unwrap().unwrap();
        assert_eq!(decoded, three_d);
    }

    #[test]
    fn test_malformed_structured_param() {
        let params = Params::new().with(THREE_D_PARAMS, json!({"user_agent": 1}));
        let result: GatewayResult<Option<ThreeDSecureParams>> = params.get_as(THREE_D_PARAMS);
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }
}
