//! Drift detection and correction
//!
//! Compares the discovered public IP with the managed record and updates the
//! record only when the two differ. The equal case makes no provider call.

use crate::error::Result;
use crate::locator::ManagedRecord;
use crate::traits::DnsProvider;
use std::net::Ipv4Addr;
use tracing::{info, warn};

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The record already holds the discovered address
    Unchanged {
        /// The current address
        address: Ipv4Addr,
    },
    /// The record was updated to the discovered address
    Updated {
        /// The address the record held before (if it was a valid IPv4)
        previous: Option<Ipv4Addr>,
        /// The new address
        current: Ipv4Addr,
    },
}

/// Reconcile `located` with `discovered`
///
/// Addresses are compared as parsed `Ipv4Addr` values, never as text. On
/// drift the existing record is copied with its content replaced and sent to
/// the provider keyed by zone and record identifier.
///
/// # Returns
///
/// - `Ok(ReconcileOutcome::Unchanged)`: No drift, no provider call made
/// - `Ok(ReconcileOutcome::Updated)`: Drift corrected
/// - `Err(Error)`: Update failed; the provider still holds the old record
pub async fn reconcile(
    provider: &dyn DnsProvider,
    discovered: Ipv4Addr,
    located: &ManagedRecord,
) -> Result<ReconcileOutcome> {
    if located.recorded_address == Some(discovered) {
        return Ok(ReconcileOutcome::Unchanged { address: discovered });
    }

    let recorded = display_address(located);
    warn!(
        "DNS A record {} ({}) is out of sync with public IP ({})",
        located.name, recorded, discovered
    );

    let mut update = located.record.clone();
    update.content = discovered.to_string();

    provider
        .update_record(&located.zone_id, &located.record_id, &update)
        .await?;

    if provider.is_dry_run() {
        info!(
            "[DRY-RUN] DNS A record {} ({}) would have been synced with public IP ({})",
            located.name, recorded, discovered
        );
    } else {
        info!(
            "DNS A record {} ({}) has been synced with public IP ({})",
            located.name, recorded, discovered
        );
    }

    Ok(ReconcileOutcome::Updated {
        previous: located.recorded_address,
        current: discovered,
    })
}

fn display_address(located: &ManagedRecord) -> String {
    match located.recorded_address {
        Some(ip) => ip.to_string(),
        None => located.record.content.clone(),
    }
}
