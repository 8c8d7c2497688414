//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call and return scripted results, so the
//! reconciliation scenarios run without any network access.

#![allow(dead_code)]

use dyn_core::config::{DnsConfig, DynConfig, ProviderConfig};
use dyn_core::error::{Error, Result};
use dyn_core::traits::{DnsProvider, DnsRecord, PublicIpSource, RecordType};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Zone name used throughout the tests
pub const ZONE: &str = "example.com";

/// Zone identifier the fake provider assigns to [`ZONE`]
pub const ZONE_ID: &str = "zone-123";

/// A public IP source returning scripted answers
///
/// Each call pops the next scripted answer (`None` is a resolution failure);
/// once the script is exhausted the last answer repeats.
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    last: Arc<Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// A source that always answers `ip`
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::scripted(vec![Some(ip)])
    }

    /// A source that always fails
    pub fn failing() -> Self {
        Self::scripted(vec![None])
    }

    /// A source answering from `script`
    pub fn scripted(script: Vec<Option<Ipv4Addr>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times public_ip() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a source that shares script and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl PublicIpSource for ScriptedIpSource {
    async fn public_ip(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock().unwrap();
        let answer = match self.script.lock().unwrap().pop_front() {
            Some(answer) => {
                *last = answer;
                answer
            }
            None => *last,
        };

        answer.ok_or_else(|| Error::resolution("scripted resolver failure"))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A recorded update_record() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub zone_id: String,
    pub record_id: String,
    pub record: DnsRecord,
}

/// An in-memory provider that records calls
///
/// Successful updates are applied to the stored records, so a second
/// reconciliation observes the first one's effect, like a real provider.
pub struct RecordingDnsProvider {
    zones: Arc<HashMap<String, String>>,
    records: Arc<Mutex<Vec<DnsRecord>>>,
    updates: Arc<Mutex<Vec<UpdateCall>>>,
    zone_lookups: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    failing_updates: Arc<AtomicUsize>,
    fail_zone_lookup: Arc<AtomicBool>,
    dry_run: Arc<AtomicBool>,
}

impl RecordingDnsProvider {
    /// A provider hosting [`ZONE`] with the given A records
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        let mut zones = HashMap::new();
        zones.insert(ZONE.to_string(), ZONE_ID.to_string());

        Self {
            zones: Arc::new(zones),
            records: Arc::new(Mutex::new(records)),
            updates: Arc::new(Mutex::new(Vec::new())),
            zone_lookups: Arc::new(AtomicUsize::new(0)),
            list_calls: Arc::new(AtomicUsize::new(0)),
            failing_updates: Arc::new(AtomicUsize::new(0)),
            fail_zone_lookup: Arc::new(AtomicBool::new(false)),
            dry_run: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next `n` update calls fail
    pub fn fail_next_updates(&self, n: usize) {
        self.failing_updates.store(n, Ordering::SeqCst);
    }

    /// Make zone lookups fail (e.g., bad credentials)
    pub fn fail_zone_lookups(&self, fail: bool) {
        self.fail_zone_lookup.store(fail, Ordering::SeqCst);
    }

    /// Report dry-run mode (updates are still recorded and applied)
    pub fn set_dry_run(&self, dry_run: bool) {
        self.dry_run.store(dry_run, Ordering::SeqCst);
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Get all recorded update calls
    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    /// Get the number of zone lookups
    pub fn zone_lookup_count(&self) -> usize {
        self.zone_lookups.load(Ordering::SeqCst)
    }

    /// Get the number of record listings
    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Current content of the record with `id`
    pub fn content_of(&self, id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.content.clone())
    }

    /// Create a provider that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            zones: Arc::clone(&other.zones),
            records: Arc::clone(&other.records),
            updates: Arc::clone(&other.updates),
            zone_lookups: Arc::clone(&other.zone_lookups),
            list_calls: Arc::clone(&other.list_calls),
            failing_updates: Arc::clone(&other.failing_updates),
            fail_zone_lookup: Arc::clone(&other.fail_zone_lookup),
            dry_run: Arc::clone(&other.dry_run),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for RecordingDnsProvider {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        self.zone_lookups.fetch_add(1, Ordering::SeqCst);

        if self.fail_zone_lookup.load(Ordering::SeqCst) {
            return Err(Error::auth("scripted authentication failure"));
        }

        self.zones
            .get(zone_name)
            .cloned()
            .ok_or_else(|| Error::provider("recording", format!("Zone not found: {}", zone_name)))
    }

    async fn list_records(&self, zone_id: &str, record_type: RecordType) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.zone_id == zone_id && r.record_type == record_type.as_str())
            .cloned()
            .collect())
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, record: &DnsRecord) -> Result<()> {
        self.updates.lock().unwrap().push(UpdateCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            record: record.clone(),
        });

        let remaining = self.failing_updates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_updates.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::provider("recording", "scripted update failure"));
        }

        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.zone_id == zone_id && r.id == record_id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(Error::provider("recording", format!("Record not found: {}", record_id))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }
}

/// An A record in [`ZONE`]
pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        zone_id: ZONE_ID.to_string(),
        name: name.to_string(),
        record_type: "A".to_string(),
        content: content.to_string(),
        ttl: Some(300),
        proxied: Some(false),
    }
}

/// Helper to create a minimal DynConfig for testing
pub fn minimal_config(record: &str) -> DynConfig {
    DynConfig::new(
        ProviderConfig::Cloudflare {
            api_key: None,
            email: None,
            api_token: Some("test-token-0123456789abcdef".to_string()),
            dry_run: false,
        },
        DnsConfig::new(ZONE, record),
        Duration::from_secs(300),
    )
}

/// Drain all events currently buffered in the receiver
pub fn drain_events(
    rx: &mut tokio::sync::mpsc::Receiver<dyn_core::SyncEvent>,
) -> Vec<dyn_core::SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// In-memory sink for formatted `tracing` output
///
/// Install with [`LogCapture::install`]; the returned guard scopes the
/// subscriber to the current thread, so use it from `#[tokio::test]`'s
/// current-thread runtime.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route INFO and above for this thread into a fresh buffer
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Captured lines
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Captured lines containing `needle`
    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.contains(needle))
            .collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
