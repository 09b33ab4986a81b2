//! Paygent adapter configuration

use crate::error::{GatewayError, GatewayResult};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const SANDBOX_ENDPOINT: &str = "https://sandbox.paygent.co.jp/n/card/request";
const PRODUCTION_ENDPOINT: &str = "https://module.paygent.co.jp/n/card/request";

/// Per-instance settings, typically deserialized by the embedding application
#[derive(Clone, Deserialize)]
pub struct PaygentConfig {
    pub merchant_id: String,
    pub connect_id: String,
    pub connect_password: String,
    #[serde(default = "default_telegram_version")]
    pub telegram_version: String,

    /// Client identity: PKCS#12 (`.p12`/`.pfx`) or a PEM bundle
    #[serde(default = "default_client_file_path")]
    pub client_file_path: PathBuf,
    /// Unlocks a PKCS#12 identity
    #[serde(default = "default_cert_password")]
    pub cert_password: String,
    /// PEM bundle of CAs trusted for the provider's server certificate
    #[serde(default = "default_ca_file_path")]
    pub ca_file_path: PathBuf,

    #[serde(default)]
    pub production_mode: bool,
    /// Overrides the sandbox/production endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_telegram_version() -> String {
    "1.0".to_string()
}

fn default_client_file_path() -> PathBuf {
    PathBuf::from("paygent.pem")
}

fn default_cert_password() -> String {
    "changeit".to_string()
}

fn default_ca_file_path() -> PathBuf {
    PathBuf::from("curl-ca-bundle.crt")
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    60
}

impl PaygentConfig {
    pub fn new(
        merchant_id: impl Into<String>,
        connect_id: impl Into<String>,
        connect_password: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            connect_id: connect_id.into(),
            connect_password: connect_password.into(),
            telegram_version: default_telegram_version(),
            client_file_path: default_client_file_path(),
            cert_password: default_cert_password(),
            ca_file_path: default_ca_file_path(),
            production_mode: false,
            endpoint: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }

    /// Set the client identity file and its passphrase
    pub fn with_client_certificate(mut self, path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        self.client_file_path = path.into();
        self.cert_password = password.into();
        self
    }

    /// Set the CA bundle
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file_path = path.into();
        self
    }

    /// Use the production environment
    pub fn production(mut self) -> Self {
        self.production_mode = true;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_telegram_version(mut self, version: impl Into<String>) -> Self {
        self.telegram_version = version.into();
        self
    }

    /// Resolved request endpoint
    pub fn endpoint(&self) -> GatewayResult<Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.as_str(),
            None if self.production_mode => PRODUCTION_ENDPOINT,
            None => SANDBOX_ENDPOINT,
        };
        Url::parse(raw).map_err(|e| GatewayError::InvalidRequest(format!("invalid endpoint {raw:?}: {e}")))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Fields sent on every telegram
    pub fn credentials(&self) -> Credentials {
        Credentials {
            merchant_id: self.merchant_id.clone(),
            connect_id: self.connect_id.clone(),
            connect_password: SecretString::new(self.connect_password.clone().into()),
            telegram_version: self.telegram_version.clone(),
        }
    }
}

impl fmt::Debug for PaygentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaygentConfig")
            .field("merchant_id", &self.merchant_id)
            .field("connect_id", &self.connect_id)
            .field("connect_password", &"[REDACTED]")
            .field("telegram_version", &self.telegram_version)
            .field("client_file_path", &self.client_file_path)
            .field("cert_password", &"[REDACTED]")
            .field("ca_file_path", &self.ca_file_path)
            .field("production_mode", &self.production_mode)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Immutable credential set
#[derive(Debug, Clone)]
pub struct Credentials {
    pub merchant_id: String,
    pub connect_id: String,
    pub connect_password: SecretString,
    pub telegram_version: String,
}
