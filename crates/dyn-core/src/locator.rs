//! Record lookup
//!
//! Finds the provider-side A record for the configured name. The record is
//! read fresh on every call; nothing is cached between ticks.

use crate::config::record_fqdn;
use crate::error::Result;
use crate::traits::{DnsProvider, DnsRecord, RecordType};
use std::net::Ipv4Addr;
use tracing::debug;

/// The provider record the agent keeps in sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecord {
    /// Zone identifier the record belongs to
    pub zone_id: String,
    /// Provider record identifier
    pub record_id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type (always A)
    pub record_type: RecordType,
    /// Address currently stored at the provider
    ///
    /// `None` when the stored content is not an IPv4 address; such a record
    /// never compares equal and is repaired by the next update.
    pub recorded_address: Option<Ipv4Addr>,
    /// The full provider record, copied into update payloads
    pub record: DnsRecord,
}

impl ManagedRecord {
    /// Build a managed record from a provider record
    pub fn from_record(zone_id: &str, record: DnsRecord) -> Self {
        let recorded_address = parse_recorded_address(&record.content);

        // Listing is scoped to the zone, so the zone we asked for is
        // authoritative even if the provider omits it from the record
        Self {
            zone_id: zone_id.to_string(),
            record_id: record.id.clone(),
            name: record.name.clone(),
            record_type: RecordType::A,
            recorded_address,
            record,
        }
    }
}

/// Parse provider content into an IPv4 address
///
/// Accepts dotted-decimal with leading zeros in any octet (`"010.000.000.001"`
/// is `10.0.0.1`), which the strict std parser rejects.
pub fn parse_recorded_address(content: &str) -> Option<Ipv4Addr> {
    let content = content.trim();
    if let Ok(ip) = content.parse::<Ipv4Addr>() {
        return Some(ip);
    }

    let mut octets = [0u8; 4];
    let mut parts = content.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }

    Some(Ipv4Addr::from(octets))
}

/// Locate the A record named `record_name` in `zone_name`
///
/// The match is exact string equality against the fully-qualified name
/// (`"<record>.<zone>"`, or the zone itself for the root form `"@"`).
///
/// # Returns
///
/// - `Ok(Some(record))`: First matching record
/// - `Ok(None)`: No A record with that name exists; nothing to reconcile
/// - `Err(Error)`: Zone lookup or record listing failed
pub async fn locate_record(
    provider: &dyn DnsProvider,
    zone_name: &str,
    record_name: &str,
) -> Result<Option<ManagedRecord>> {
    let fqdn = record_fqdn(zone_name, record_name);

    let zone_id = provider.resolve_zone_id(zone_name).await?;
    debug!("Zone {} resolved to {}", zone_name, zone_id);

    let records = provider.list_records(&zone_id, RecordType::A).await?;
    debug!("Zone {} has {} A record(s)", zone_name, records.len());

    let located = records
        .into_iter()
        .find(|r| r.name == fqdn)
        .map(|r| ManagedRecord::from_record(&zone_id, r));

    Ok(located)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> DnsRecord {
        DnsRecord {
            id: "rec-1".to_string(),
            zone_id: String::new(),
            name: "home.example.com".to_string(),
            record_type: "A".to_string(),
            content: content.to_string(),
            ttl: Some(300),
            proxied: Some(false),
        }
    }

    #[test]
    fn test_from_record_parses_address() {
        let managed = ManagedRecord::from_record("zone-1", record("198.51.100.5"));
        assert_eq!(managed.zone_id, "zone-1");
        assert_eq!(managed.record_id, "rec-1");
        assert_eq!(managed.recorded_address, Some(Ipv4Addr::new(198, 51, 100, 5)));
    }

    #[test]
    fn test_parse_recorded_address_leading_zeros() {
        assert_eq!(
            parse_recorded_address("198.051.100.005"),
            Some(Ipv4Addr::new(198, 51, 100, 5))
        );
        assert_eq!(parse_recorded_address(" 203.0.113.7\n"), Some(Ipv4Addr::new(203, 0, 113, 7)));
        assert_eq!(parse_recorded_address("256.0.0.1"), None);
        assert_eq!(parse_recorded_address("1.2.3"), None);
        assert_eq!(parse_recorded_address("1.2.3.4.5"), None);
        assert_eq!(parse_recorded_address("1.2.3.+4"), None);
        assert_eq!(parse_recorded_address("2001:db8::1"), None);
    }

    #[test]
    fn test_from_record_unparsable_content() {
        let managed = ManagedRecord::from_record("zone-1", record("not-an-ip"));
        assert_eq!(managed.recorded_address, None);
    }
}
