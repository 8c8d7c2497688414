// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider` for the
// dyn agent.
//
// ## Behavior
//
// - One HTTP request per trait call (zone lookup, record listing, update)
// - Full error propagation to the engine; no retry, no backoff, no caching
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Cloudflare's `success: false` envelopes surface as provider errors
// - Dry-run mode for safe testing
//
// ## Authentication
//
// Either a scoped API token (`Authorization: Bearer`) or the legacy global
// API key with the account email (`X-Auth-Key` / `X-Auth-Email`).
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or `Debug` output
// - Construction fails fast if credentials are empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyn_core::config::ProviderConfig;
use dyn_core::traits::{DnsProvider, DnsRecord, RecordType};
use dyn_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare API credentials
#[derive(Clone)]
pub enum Credentials {
    /// Scoped API token
    Token(String),
    /// Global API key plus the account email
    Key { api_key: String, email: String },
}

// Never print secrets
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<REDACTED>").finish(),
            Credentials::Key { email, .. } => f
                .debug_struct("Key")
                .field("api_key", &"<REDACTED>")
                .field("email", email)
                .finish(),
        }
    }
}

impl Credentials {
    fn validate(&self) -> Result<()> {
        match self {
            Credentials::Token(token) if token.trim().is_empty() => {
                Err(Error::config("Cloudflare API token cannot be empty"))
            }
            Credentials::Key { api_key, email }
                if api_key.trim().is_empty() || email.trim().is_empty() =>
            {
                Err(Error::config("Cloudflare API key and email cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Cloudflare DNS provider
///
/// Stateless and single-shot: every trait call is one API request. All
/// coordination (scheduling, retry on the next tick, deciding whether an
/// update is needed) is owned by the engine.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// API credentials
    /// ⚠️ NEVER log this value
    credentials: Credentials,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

/// Record as sent and received on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    #[serde(default, skip_serializing)]
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
}

impl WireRecord {
    fn into_record(self, zone_id: &str) -> DnsRecord {
        DnsRecord {
            id: self.id,
            zone_id: zone_id.to_string(),
            name: self.name,
            record_type: self.record_type,
            content: self.content,
            ttl: self.ttl,
            proxied: self.proxied,
        }
    }

    fn from_record(record: &DnsRecord) -> Self {
        Self {
            id: record.id.clone(),
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token, or API key + email
    /// - `dry_run`: If true, perform GET requests but skip PUT updates
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: Empty credentials or HTTP client construction failure
    pub fn new(credentials: Credentials, dry_run: bool) -> Result<Self> {
        Self::with_base_url(credentials, dry_run, CLOUDFLARE_API_BASE)
    }

    /// Create a provider talking to a different API endpoint
    ///
    /// Mainly useful for tests and API proxies.
    pub fn with_base_url(
        credentials: Credentials,
        dry_run: bool,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration
    ///
    /// A configured API token takes precedence over key + email.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        match config {
            ProviderConfig::Cloudflare {
                api_key,
                email,
                api_token,
                dry_run,
            } => {
                let credentials = match (api_token, api_key, email) {
                    (Some(token), _, _) if !token.trim().is_empty() => {
                        Credentials::Token(token.clone())
                    }
                    (_, Some(api_key), Some(email)) => Credentials::Key {
                        api_key: api_key.clone(),
                        email: email.clone(),
                    },
                    _ => return Err(Error::config("Cloudflare credentials are required")),
                };

                if *dry_run {
                    tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
                }

                Self::new(credentials, *dry_run)
            }
        }
    }

    /// Attach authentication headers
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Key { api_key, email } => request
                .header("X-Auth-Key", api_key)
                .header("X-Auth-Email", email),
        }
    }

    /// Send a request and unwrap the Cloudflare envelope
    ///
    /// `action` names the operation in error messages (e.g. "Zone lookup").
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Option<T>> {
        let response = self
            .authorize(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if !status.is_success() {
            return Err(map_status_error(status, action, &body));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{} failed: {}", action, describe_errors(&envelope.errors)),
            ));
        }

        Ok(envelope.result)
    }
}

/// Map a non-2xx status to an error
fn map_status_error(status: reqwest::StatusCode, action: &str, body: &str) -> Error {
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| describe_errors(&envelope.errors))
        .unwrap_or_else(|| body.to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API credentials or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::provider(PROVIDER, format!("{} failed: not found ({})", action, detail)),
        409 => Error::provider(
            PROVIDER,
            format!("Conflict: Record is being updated by another process. Status: {}", status),
        ),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {} - {}", status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", action, status, detail)),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let url = format!("{}/zones", self.base_url);
        let zones: Vec<Zone> = self
            .send(self.client.get(&url).query(&[("name", zone_name)]), "Zone lookup")
            .await?
            .unwrap_or_default();

        let zone = zones
            .into_iter()
            .find(|z| z.name == zone_name)
            .ok_or_else(|| Error::provider(PROVIDER, format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A
    /// ```
    async fn list_records(&self, zone_id: &str, record_type: RecordType) -> Result<Vec<DnsRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let records: Vec<WireRecord> = self
            .send(
                self.client.get(&url).query(&[("type", record_type.as_str())]),
                "Record listing",
            )
            .await?
            .unwrap_or_default();

        Ok(records.into_iter().map(|r| r.into_record(zone_id)).collect())
    }

    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "home.example.com", "content": "1.2.3.4", "ttl": 1, "proxied": false }
    /// ```
    async fn update_record(&self, zone_id: &str, record_id: &str, record: &DnsRecord) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        );
        let payload = WireRecord::from_record(record);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload).unwrap_or_default()
            );
            return Ok(());
        }

        let _: Option<serde_json::Value> = self
            .send(self.client.put(&url).json(&payload), "Record update")
            .await?;

        tracing::debug!("Record {} updated: {} -> {}", record_id, record.name, record.content);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
