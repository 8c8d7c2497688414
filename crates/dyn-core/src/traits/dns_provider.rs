// # DNS Provider Trait
//
// Defines the narrow interface the reconciliation loop needs from a DNS
// provider: zone lookup, record listing and update by identifier.
//
// ## Implementations
//
// - Cloudflare: `dyn-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dyn_core::traits::{DnsProvider, RecordType};
//
// let zone_id = provider.resolve_zone_id("example.com").await?;
// let records = provider.list_records(&zone_id, RecordType::A).await?;
// ```

use async_trait::async_trait;

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A record (IPv4)
    A,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider record identifier
    pub id: String,
    /// Identifier of the zone owning the record
    pub zone_id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type as reported by the provider (e.g., "A")
    pub record_type: String,
    /// Record content (the address, for A records)
    pub content: String,
    /// Time-to-live, if the provider reports one
    pub ttl: Option<u32>,
    /// Provider proxying flag, if supported
    pub proxied: Option<bool>,
}

/// Trait for DNS provider implementations
///
/// Providers are stateless and single-shot: every method performs one API
/// round trip and returns its result. Retry, scheduling and the decision
/// whether an update is needed are owned by the engine.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a zone name to the provider's zone identifier
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// List all records of `record_type` in a zone
    ///
    /// Only the provider's default result page is returned.
    async fn list_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Replace a record, keyed by zone and record identifier
    ///
    /// `record` is the full desired record; callers copy the existing record
    /// and change only what needs changing.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Whether `update_record` only logs instead of changing anything
    fn is_dry_run(&self) -> bool {
        false
    }
}
