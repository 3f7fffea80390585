//! Invoice-registry verifier client.
//!
//! The national invoice registry is treated as a black box: given a
//! normalized registration number it answers whether the number is on file
//! and, if so, under which name and effective date range. Interpreting that
//! answer (matched / not yet active / expired) is business logic and lives
//! in `kicho-core`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::config::RegistryConfig;

/// Errors returned by the registry verifier.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP request could not be performed.
    #[error("Registry request failed: {0}")]
    Http(String),

    /// The registry answered with an unexpected status code.
    #[error("Registry returned status {0}")]
    Status(u16),

    /// The registry response body could not be decoded.
    #[error("Failed to decode registry response: {0}")]
    Decode(String),
}

/// Raw lookup result for a registration number.
#[derive(Debug, Clone)]
pub struct RegistryRecord {
    /// Whether the number is on file at the registry.
    pub found: bool,
    /// Registrant's legal name, if returned.
    pub name: Option<String>,
    /// Registrant's legal name in kana, if returned.
    pub name_kana: Option<String>,
    /// First day the registration is effective, if returned.
    pub valid_from: Option<NaiveDate>,
    /// Last day the registration is effective, if returned.
    pub valid_to: Option<NaiveDate>,
    /// When the registry was consulted.
    pub checked_at: DateTime<Utc>,
}

impl RegistryRecord {
    /// A record for a number the registry does not know.
    #[must_use]
    pub fn not_found(checked_at: DateTime<Utc>) -> Self {
        Self {
            found: false,
            name: None,
            name_kana: None,
            valid_from: None,
            valid_to: None,
            checked_at,
        }
    }
}

/// Looks up invoice registration numbers at the national registry.
#[async_trait]
pub trait RegistryVerifier: Send + Sync {
    /// Verifies a normalized registration number.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be reached or answers with an
    /// unexpected payload.
    async fn verify(&self, registration_no: &str) -> Result<RegistryRecord, RegistryError>;
}

/// Wire format of a registry lookup response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryResponse {
    count: u32,
    #[serde(default)]
    registrations: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryEntry {
    name: Option<String>,
    name_kana: Option<String>,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

impl RegistryResponse {
    fn into_record(self, checked_at: DateTime<Utc>) -> RegistryRecord {
        if self.count == 0 {
            return RegistryRecord::not_found(checked_at);
        }
        let entry = self.registrations.into_iter().next();
        match entry {
            Some(entry) => RegistryRecord {
                found: true,
                name: entry.name,
                name_kana: entry.name_kana,
                valid_from: entry.effective_from,
                valid_to: entry.effective_to,
                checked_at,
            },
            None => RegistryRecord::not_found(checked_at),
        }
    }
}

/// HTTP client for the invoice-registry lookup service.
#[derive(Debug, Clone)]
pub struct InvoiceRegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl InvoiceRegistryClient {
    /// Creates a new registry client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RegistryVerifier for InvoiceRegistryClient {
    async fn verify(&self, registration_no: &str) -> Result<RegistryRecord, RegistryError> {
        let url = format!("{}/registrations/{registration_no}", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        let checked_at = Utc::now();

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(RegistryRecord::not_found(checked_at));
        }
        if !response.status().is_success() {
            return Err(RegistryError::Status(response.status().as_u16()));
        }

        let body: RegistryResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Decode(e.to_string()))?;

        Ok(body.into_record(checked_at))
    }
}
