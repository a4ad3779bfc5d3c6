//! # SUNAT Client
//!
//! Read-only lookups against the tax-authority API: taxpayer data by RUC and
//! the official USD exchange rate for a date.
//!
//! ## Retry Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt ──► connect error / timeout / 5xx / 429 ──► transient         │
//! │     │                                                  │                │
//! │     │                                 retries left? ───┤                │
//! │     │                                   yes: sleep(backoff), again      │
//! │     │                                   no:  Unavailable               │
//! │     │                                                                   │
//! │     └──► other 4xx, bad JSON ──► permanent, no retry                   │
//! │                                                                         │
//! │  Every attempt is bounded by the client timeout.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use ts_rs::TS;

use super::IntegrationError;
use crate::config::SunatSettings;
use arendir_core::validation::validate_ruc;
use arendir_core::ExchangeRate;

/// Taxpayer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RucInfo {
    #[serde(alias = "numeroDocumento")]
    pub ruc: String,
    #[serde(alias = "razonSocial")]
    pub razon_social: String,
    /// `ACTIVO`, `BAJA DE OFICIO`, ...
    #[serde(default)]
    pub estado: Option<String>,
    /// `HABIDO`, `NO HALLADO`, ...
    #[serde(default)]
    pub condicion: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
}

/// Official buy/sell rate for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRateQuote {
    #[ts(as = "String")]
    pub fecha: NaiveDate,
    #[serde(default = "default_currency")]
    pub moneda: String,
    #[serde(alias = "precioCompra")]
    #[ts(as = "String")]
    pub compra: ExchangeRate,
    #[serde(alias = "precioVenta")]
    #[ts(as = "String")]
    pub venta: ExchangeRate,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Why a single attempt failed.
#[derive(Debug)]
enum CallError {
    Transport(reqwest::Error),
    Status(StatusCode),
    Decode(String),
}

impl CallError {
    fn is_transient(&self) -> bool {
        match self {
            CallError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CallError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CallError::Decode(_) => false,
        }
    }

    fn into_unavailable(self) -> IntegrationError {
        IntegrationError::unavailable("SUNAT", self.to_string())
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Transport(e) => write!(f, "request failed: {}", e),
            CallError::Status(status) => write!(f, "upstream answered {}", status),
            CallError::Decode(e) => write!(f, "unexpected response: {}", e),
        }
    }
}

/// HTTP client for the SUNAT lookups.
#[derive(Debug, Clone)]
pub struct SunatClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl SunatClient {
    /// Builds a client from settings. Fails if no base URL is configured.
    pub fn new(settings: &SunatSettings) -> Result<Self, IntegrationError> {
        let base_url = settings
            .base_url
            .as_deref()
            .ok_or_else(|| IntegrationError::unavailable("SUNAT", "base_url is not configured"))?
            .trim_end_matches('/')
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| IntegrationError::unavailable("SUNAT", e.to_string()))?;

        Ok(SunatClient {
            http,
            base_url,
            token: settings.token.clone(),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(250),
        })
    }

    /// Overrides the first retry delay.
    pub fn with_initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Taxpayer data for an 11-digit RUC.
    ///
    /// ## Errors
    /// - `Validation` for a malformed RUC (no request is made)
    /// - `NotFound` when SUNAT answers 404
    /// - `Unavailable` for everything else
    pub async fn lookup_ruc(&self, ruc: &str) -> Result<RucInfo, IntegrationError> {
        let ruc = ruc.trim();
        validate_ruc(ruc)?;

        let url = format!("{}/ruc", self.base_url);
        match self.get_json::<RucInfo>(&url, &[("numero", ruc)]).await {
            Ok(info) => Ok(info),
            Err(CallError::Status(StatusCode::NOT_FOUND)) => Err(IntegrationError::NotFound {
                entity: "RUC",
                id: ruc.to_string(),
            }),
            Err(e) => Err(e.into_unavailable()),
        }
    }

    /// USD/PEN rate published for `fecha`.
    pub async fn exchange_rate(
        &self,
        fecha: NaiveDate,
    ) -> Result<ExchangeRateQuote, IntegrationError> {
        let url = format!("{}/tipo-cambio-sunat", self.base_url);
        let date = fecha.format("%Y-%m-%d").to_string();
        self.get_json::<ExchangeRateQuote>(&url, &[("date", date.as_str())])
            .await
            .map_err(CallError::into_unavailable)
    }

    /// GET with retries on transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CallError> {
        let mut backoff = self.create_backoff();
        let mut retries = 0u32;

        loop {
            match self.get_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                url = %url,
                                attempt = retries,
                                ?duration,
                                error = %err,
                                "SUNAT call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => return Err(err),
                    }
                }
                Err(err) => {
                    debug!(url = %url, error = %err, "SUNAT call failed");
                    return Err(err);
                }
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CallError> {
        let mut req = self.http.get(url).query(query);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(CallError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Status(status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CallError::Decode(e.to_string()))
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: Duration::from_secs(2),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}
