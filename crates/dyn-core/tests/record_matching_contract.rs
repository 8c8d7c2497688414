//! Contract Test: Record Matching
//!
//! Constraints verified:
//! - The managed record is matched by exact fully-qualified name
//! - The root form "@" matches the zone apex
//! - A missing record is "nothing to do", never an error, and never updated
//! - Provider failures during lookup propagate to the tick
//!
//! If this test fails, the agent could update the wrong record.

mod common;

use common::*;
use dyn_core::locator::locate_record;
use dyn_core::{Error, SyncEngine, SyncEvent, TickOutcome};
use std::net::Ipv4Addr;

#[tokio::test]
async fn exact_name_match_only() {
    let provider = RecordingDnsProvider::with_records(vec![
        a_record("rec-sub", "home.sub.example.com", "192.0.2.1"),
        a_record("rec-x", "homex.example.com", "192.0.2.2"),
        a_record("rec-home", "home.example.com", "192.0.2.3"),
    ]);

    let located = locate_record(&provider, ZONE, "home")
        .await
        .expect("lookup succeeds")
        .expect("home.example.com exists");

    assert_eq!(located.record_id, "rec-home");
    assert_eq!(located.name, "home.example.com");
    assert_eq!(located.zone_id, ZONE_ID);
    assert_eq!(located.recorded_address, Some(Ipv4Addr::new(192, 0, 2, 3)));
}

#[tokio::test]
async fn near_misses_are_not_found() {
    let provider = RecordingDnsProvider::with_records(vec![
        a_record("rec-sub", "home.sub.example.com", "192.0.2.1"),
        a_record("rec-x", "homex.example.com", "192.0.2.2"),
        a_record("rec-upper", "HOME.example.com", "192.0.2.4"),
    ]);

    let located = locate_record(&provider, ZONE, "home")
        .await
        .expect("lookup succeeds");

    assert!(located.is_none(), "got {:?}", located);
}

#[tokio::test]
async fn root_form_matches_zone_apex() {
    let provider = RecordingDnsProvider::with_records(vec![
        a_record("rec-www", "www.example.com", "192.0.2.1"),
        a_record("rec-apex", "example.com", "192.0.2.2"),
    ]);

    let located = locate_record(&provider, ZONE, "@")
        .await
        .expect("lookup succeeds")
        .expect("apex record exists");

    assert_eq!(located.record_id, "rec-apex");
}

#[tokio::test]
async fn first_match_wins() {
    let provider = RecordingDnsProvider::with_records(vec![
        a_record("rec-first", "home.example.com", "192.0.2.1"),
        a_record("rec-second", "home.example.com", "192.0.2.2"),
    ]);

    let located = locate_record(&provider, ZONE, "home")
        .await
        .expect("lookup succeeds")
        .expect("record exists");

    assert_eq!(located.record_id, "rec-first");
}

#[tokio::test]
async fn lookup_is_two_round_trips() {
    let provider = RecordingDnsProvider::with_records(vec![a_record(
        "rec-home",
        "home.example.com",
        "192.0.2.1",
    )]);

    locate_record(&provider, ZONE, "home")
        .await
        .expect("lookup succeeds");

    assert_eq!(provider.zone_lookup_count(), 1);
    assert_eq!(provider.list_call_count(), 1);
}

#[tokio::test]
async fn missing_record_skips_without_update() {
    let provider = RecordingDnsProvider::with_records(vec![a_record(
        "rec-other",
        "other.example.com",
        "192.0.2.1",
    )]);
    let provider_handle = RecordingDnsProvider::sharing_counters_with(&provider);

    let (engine, mut events) = SyncEngine::new(
        Box::new(ScriptedIpSource::fixed(Ipv4Addr::new(198, 51, 100, 9))),
        Box::new(provider),
        minimal_config("home"),
    )
    .expect("engine construction succeeds");

    let outcome = engine.sync_once().await.expect("missing record is not an error");
    assert_eq!(outcome, TickOutcome::RecordNotFound);
    assert_eq!(provider_handle.update_call_count(), 0);

    let events = drain_events(&mut events);
    assert!(events.contains(&SyncEvent::RecordNotFound {
        record_name: "home.example.com".to_string(),
    }));
}

#[tokio::test]
async fn provider_failure_propagates() {
    let provider = RecordingDnsProvider::with_records(vec![]);
    provider.fail_zone_lookups(true);

    let result = locate_record(&provider, ZONE, "home").await;
    assert!(matches!(result, Err(Error::Authentication(_))));
    assert_eq!(provider.list_call_count(), 0, "no listing after zone failure");
}

#[tokio::test]
async fn unknown_zone_is_an_error() {
    let provider = RecordingDnsProvider::with_records(vec![]);

    let result = locate_record(&provider, "example.org", "home").await;
    assert!(matches!(result, Err(Error::Provider { .. })));
}
