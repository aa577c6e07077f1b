//! Dispatch configuration — which transport method to use and its credentials.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Transport method for outbound messages.
///
/// A closed set: adding a channel means adding a variant and satisfying the
/// exhaustive matches in the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMethod {
    /// WhatsApp Cloud API, authenticated with an access token.
    Official,
    /// A self-hosted forwarding gateway (e.g. Evolution API).
    Gateway,
    /// No network send — hand off a pre-filled wa.me link to the operator.
    Manual,
}

impl std::fmt::Display for DispatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Official => write!(f, "official"),
            Self::Gateway => write!(f, "gateway"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for DispatchMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "official" => Ok(Self::Official),
            "gateway" => Ok(Self::Gateway),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown dispatch method: {}", s)),
        }
    }
}

/// Outbound messaging configuration, supplied by the settings collaborator.
///
/// Read-only to the core operations; the console swaps the whole value when
/// settings change. Credentials are held as [`SecretString`] so they never
/// end up in debug output or logs.
#[derive(Debug)]
pub struct DispatchConfig {
    pub method: DispatchMethod,
    /// Cloud API bearer token (`official` only).
    pub access_token: Option<SecretString>,
    /// Cloud API sender phone number id (`official` only).
    pub phone_number_id: Option<String>,
    /// Forwarding endpoint URL (`gateway` only).
    pub gateway_url: Option<String>,
    /// Optional API key sent to the forwarding endpoint.
    pub gateway_api_key: Option<SecretString>,
}

impl DispatchConfig {
    /// Manual handoff — always available, requires nothing.
    pub fn manual() -> Self {
        Self {
            method: DispatchMethod::Manual,
            access_token: None,
            phone_number_id: None,
            gateway_url: None,
            gateway_api_key: None,
        }
    }

    /// Cloud API configuration.
    pub fn official(access_token: impl Into<String>, phone_number_id: impl Into<String>) -> Self {
        Self {
            method: DispatchMethod::Official,
            access_token: Some(SecretString::from(access_token.into())),
            phone_number_id: Some(phone_number_id.into()),
            gateway_url: None,
            gateway_api_key: None,
        }
    }

    /// Forwarding gateway configuration.
    pub fn gateway(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            method: DispatchMethod::Gateway,
            access_token: None,
            phone_number_id: None,
            gateway_url: Some(url.into()),
            gateway_api_key: api_key.map(SecretString::from),
        }
    }

    /// Read the dispatch configuration from `ZAPFLOW_WA_*` environment
    /// variables. Defaults to `manual` when no method is set.
    ///
    /// Credential completeness is deliberately NOT validated here — the
    /// gateway enforces each method's contract per send, so a half-configured
    /// environment fails at dispatch time with `ConfigIncomplete` instead of
    /// refusing to start.
    pub fn from_env() -> Result<Self, ConfigError> {
        let method = match std::env::var("ZAPFLOW_WA_METHOD") {
            Ok(raw) => raw
                .parse::<DispatchMethod>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "ZAPFLOW_WA_METHOD".to_string(),
                    message,
                })?,
            Err(_) => DispatchMethod::Manual,
        };

        Ok(Self {
            method,
            access_token: std::env::var("ZAPFLOW_WA_ACCESS_TOKEN")
                .ok()
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
            phone_number_id: std::env::var("ZAPFLOW_WA_PHONE_NUMBER_ID")
                .ok()
                .filter(|v| !v.is_empty()),
            gateway_url: std::env::var("ZAPFLOW_WA_GATEWAY_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            gateway_api_key: std::env::var("ZAPFLOW_WA_GATEWAY_API_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
        })
    }
}
