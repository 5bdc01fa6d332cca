//! Contract Test: Draft Version & Commit Model
//!
//! Verifies the transactional behaviour of a session:
//!
//! - the draft version is created lazily, at most once
//! - the draft is committed at flush end iff it was created
//! - a failing provider call aborts the flush and nothing is committed
//! - a failing collect step skips the flush entirely
//! - the observed set is fetched once and can be invalidated

mod common;

use common::*;
use zonesync_core::{Error, Reconciler, VersionId, ZoneId};

#[tokio::test]
async fn open_pins_zone_and_latest_version() {
    let provider = MockZoneProvider::new(&[]);

    let session = open(&provider, session_config()).await;

    assert_eq!(session.zone_id(), ZONE);
    assert_eq!(session.zone_id(), ZoneId(42));
    assert_eq!(session.latest_version(), VersionId(1));
    assert_eq!(session.draft_version(), None);
    assert_eq!(
        provider.calls(),
        vec![
            Call::ApiVersion,
            Call::GetZoneInfo(DOMAIN.to_string()),
            Call::ListVersions,
        ]
    );
}

#[tokio::test]
async fn open_fails_on_zone_without_versions() {
    let provider = MockZoneProvider::without_versions();

    let err = Reconciler::open(Box::new(provider), session_config())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
}

#[tokio::test]
async fn open_rejects_invalid_domain_without_calling_provider() {
    let provider = MockZoneProvider::new(&[]);

    let err = Reconciler::open(Box::new(provider.clone()), zonesync_core::SessionConfig::new(""))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn draft_is_created_once_for_many_mutations() {
    let provider = MockZoneProvider::new(&[]);
    let mut session = open(&provider, session_config()).await;

    session.create(&rec("a", "A", 300, "1.1.1.1")).await.unwrap();
    session.create(&rec("b", "A", 300, "1.1.1.2")).await.unwrap();
    session.destroy(&rec("c", "A", 300, "1.1.1.3")).await.unwrap();

    assert_eq!(session.draft_version(), Some(VersionId(2)));
    let creates = provider
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::CreateVersion))
        .count();
    assert_eq!(creates, 1);

    let report = session.flush().await.unwrap();
    assert_eq!(report.committed, Some(VersionId(2)));
    assert_eq!(provider.commit_count(), 1);
}

#[tokio::test]
async fn live_version_is_never_mutated_before_commit() {
    let provider = MockZoneProvider::new(&[rec("a", "A", 600, "2.2.2.2")]);
    let mut session = open(&provider, session_config()).await;

    session.destroy(&rec("a", "A", 600, "2.2.2.2")).await.unwrap();

    assert_eq!(provider.live_records(), vec![rec("a", "A", 600, "2.2.2.2")]);
    assert_eq!(provider.live_version(), VersionId(1));
}

#[tokio::test]
async fn failed_add_aborts_flush_without_commit() {
    let provider = MockZoneProvider::new(&[rec("a", "A", 600, "2.2.2.2")]);
    provider.fail_on(FailPoint::Add);

    let err = sync(
        &provider,
        session_config(),
        &[rec("a", "A", 300, "1.1.1.1"), rec("b", "A", 300, "1.1.1.2")],
    )
    .await
    .unwrap_err();

    assert!(err.is_provider_failure());
    assert_eq!(provider.commit_count(), 0);
    assert_eq!(provider.live_version(), VersionId(1));
    assert_eq!(provider.live_records(), vec![rec("a", "A", 600, "2.2.2.2")]);

    // Only the first add was attempted.
    let adds = provider
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Add(..)))
        .count();
    assert_eq!(adds, 1);
}

#[tokio::test]
async fn failed_commit_propagates() {
    let provider = MockZoneProvider::new(&[]);
    provider.fail_on(FailPoint::Commit);

    let err = sync(&provider, session_config(), &[rec("a", "A", 300, "1.1.1.1")])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    assert!(provider.live_records().is_empty());
}

#[tokio::test]
async fn failed_listing_aborts_before_any_mutation() {
    let provider = MockZoneProvider::new(&[]);
    provider.fail_on(FailPoint::ListRecords);

    let err = sync(&provider, session_config(), &[rec("a", "A", 300, "1.1.1.1")])
        .await
        .unwrap_err();

    assert!(err.is_provider_failure());
    assert!(provider.mutation_calls().is_empty());
}

#[tokio::test]
async fn failed_collect_skips_flush() {
    let provider = MockZoneProvider::new(&[]);
    let session = open(&provider, session_config()).await;
    provider.clear_calls();

    let err = session
        .with_session(|s| {
            s.add_desired(rec("a", "A", 300, "1.1.1.1"));
            s.add_desired(zonesync_core::Record::new("b", "A", -1, "1.1.1.2")?);
            Ok(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn dropped_session_abandons_draft() {
    let provider = MockZoneProvider::new(&[]);
    {
        let mut session = open(&provider, session_config()).await;
        session.create(&rec("a", "A", 300, "1.1.1.1")).await.unwrap();
    }

    assert_eq!(provider.commit_count(), 0);
    assert!(provider.live_records().is_empty());
}

#[tokio::test]
async fn observed_set_is_fetched_once_until_refreshed() {
    let provider = MockZoneProvider::new(&[rec("a", "A", 300, "1.1.1.1")]);
    let mut session = open(&provider, session_config()).await;

    assert_eq!(session.observed().await.unwrap().len(), 1);
    assert_eq!(session.observed().await.unwrap().len(), 1);

    let listings = |p: &MockZoneProvider| {
        p.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ListRecords(_)))
            .count()
    };
    assert_eq!(listings(&provider), 1);

    session.refresh_observed();
    assert_eq!(listings(&provider), 1);
    session.observed().await.unwrap();
    assert_eq!(listings(&provider), 2);

    // The cache is reused by flush.
    session.flush().await.unwrap();
    assert_eq!(listings(&provider), 2);
}

#[tokio::test]
async fn malformed_observed_record_is_a_provider_error() {
    let provider = MockZoneProvider::with_raw_records(vec![zonesync_core::ZoneRecord {
        name: "a".to_string(),
        record_type: "A".to_string(),
        ttl: -300,
        value: "1.1.1.1".to_string(),
    }]);
    let mut session = open(&provider, session_config()).await;

    let err = session.observed().await.unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
}

#[tokio::test]
async fn desired_records_keep_insertion_order() {
    let provider = MockZoneProvider::new(&[]);
    let mut session = open(&provider, session_config()).await;

    session.add_desired(rec("b", "A", 300, "1.1.1.2"));
    session.add_desired(rec("a", "A", 300, "1.1.1.1"));
    session.add_desired(rec("b", "A", 300, "1.1.1.2"));

    let names: Vec<&str> = session.desired().iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["b", "a", "b"]);
    assert!(provider.mutation_calls().is_empty());
}
