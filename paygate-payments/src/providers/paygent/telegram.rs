//! Telegram codec: CRLF-separated `key=value` records

use super::catalog::{Operation, TelegramSpec};
use super::config::Credentials;
use crate::error::{GatewayError, GatewayResult};
use crate::params::{self, Params};
use secrecy::ExposeSecret;
use std::collections::HashMap;

const CRLF: &str = "\r\n";

/// Outcome carried by the `result` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `result=0`
    Success,
    /// `result=7`: cardholder must be sent to the issuer's ACS
    ThreeDSecureRedirect,
}

/// Request record for one catalog operation
#[derive(Debug)]
pub struct TelegramRequest {
    spec: &'static TelegramSpec,
    fields: Vec<(&'static str, String)>,
}

impl TelegramRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            spec: operation.spec(),
            fields: Vec::new(),
        }
    }

    pub fn spec(&self) -> &'static TelegramSpec {
        self.spec
    }

    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn optional<V: ToString>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Check the request against its catalog row.
    pub fn validate(&self) -> GatewayResult<()> {
        for (key, value) in &self.fields {
            if !self.spec.accepts(key) {
                return Err(GatewayError::InvalidRequest(format!(
                    "field {key} is not part of telegram {}",
                    self.spec.kind
                )));
            }
            if value.contains(['\r', '\n']) {
                return Err(GatewayError::InvalidRequest(format!(
                    "field {key} contains a line break"
                )));
            }
        }
        for required in self.spec.required {
            if !self.fields.iter().any(|(key, value)| key == required && !value.is_empty()) {
                return Err(GatewayError::InvalidRequest(format!(
                    "telegram {} requires {required}",
                    self.spec.kind
                )));
            }
        }
        Ok(())
    }

    /// Validate and render the wire body, credentials first.
    pub fn encode(&self, credentials: &Credentials) -> GatewayResult<String> {
        self.validate()?;
        let header = [
            ("merchant_id", credentials.merchant_id.as_str()),
            ("connect_id", credentials.connect_id.as_str()),
            ("connect_password", credentials.connect_password.expose_secret()),
            ("telegram_version", credentials.telegram_version.as_str()),
            ("telegram_kind", self.spec.kind),
        ];
        if header.iter().any(|(_, value)| value.contains(['\r', '\n'])) {
            return Err(GatewayError::InvalidRequest(
                "credentials must not contain line breaks".into(),
            ));
        }

        let mut body = String::new();
        for (key, value) in header.into_iter().chain(self.fields.iter().map(|(k, v)| (*k, v.as_str()))) {
            body.push_str(key);
            body.push('=');
            body.push_str(value);
            body.push_str(CRLF);
        }
        Ok(body)
    }
}

/// Parsed response record
#[derive(Debug, Clone)]
pub struct TelegramResponse {
    fields: Vec<(String, String)>,
    unparsed: Vec<String>,
    raw: String,
}

impl TelegramResponse {
    /// Parse a response body. Never fails: lines that are not `key=value`
    /// are kept aside in [`unparsed`](Self::unparsed).
    pub fn parse(raw: &str) -> Self {
        let mut fields = Vec::new();
        let mut unparsed = Vec::new();
        for line in raw.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    fields.push((key.to_string(), value.to_string()));
                }
                _ => unparsed.push(line.to_string()),
            }
        }
        Self {
            fields,
            unparsed,
            raw: raw.to_string(),
        }
    }

    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for a key, or a protocol error
    pub fn require(&self, key: &str) -> GatewayResult<&str> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GatewayError::protocol(format!("response is missing {key}"), &self.raw))
    }

    pub fn unparsed(&self) -> &[String] {
        &self.unparsed
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Interpret `result`, turning failures into errors.
    pub fn outcome(&self) -> GatewayResult<Outcome> {
        match self.get("result") {
            Some("0") => Ok(Outcome::Success),
            Some("7") => Ok(Outcome::ThreeDSecureRedirect),
            Some("1") => Err(GatewayError::provider(
                self.get("response_code").unwrap_or("unknown"),
                self.get("response_detail").unwrap_or_default(),
            )),
            Some(other) => Err(GatewayError::protocol(
                format!("unknown result {other:?}"),
                &self.raw,
            )),
            None => Err(GatewayError::protocol("response has no result", &self.raw)),
        }
    }

    /// Check the fields a successful response of this kind must carry.
    pub fn check(&self, spec: &TelegramSpec) -> GatewayResult<()> {
        for field in spec.response {
            self.require(field)?;
        }
        Ok(())
    }

    /// Split repeated records; each group starts at an occurrence of `anchor`.
    pub fn groups(&self, anchor: &str) -> Vec<HashMap<&str, &str>> {
        let mut groups = Vec::new();
        let mut current: Option<HashMap<&str, &str>> = None;
        for (key, value) in &self.fields {
            if key == anchor {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
                current = Some(HashMap::new());
            }
            if let Some(group) = current.as_mut() {
                group.insert(key.as_str(), value.as_str());
            }
        }
        groups.extend(current);
        groups
    }

    /// Params echoing anything the parser could not read
    pub fn unparsed_params(&self) -> Params {
        let mut out = Params::new();
        if !self.unparsed.is_empty() {
            out.insert(params::UNPARSED, self.unparsed.clone());
        }
        out
    }
}
