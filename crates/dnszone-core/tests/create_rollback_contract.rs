//! Contract Test: Create With Compensating Rollback
//!
//! Constraints verified:
//! - The record is created before the zone, and the zone is named from the
//!   id the control plane returned
//! - A zone failure deletes the record again (state back to "nothing exists")
//! - A failed rollback leaves the record in place and reports both errors
//!   plus the orphaned id
//! - A record failure stops the saga before any cloud call
//! - Transient cloud failures are retried; exhausting the deadline counts as
//!   a zone failure
//! - Rollback removes a zone left by a lost create response before the
//!   record; if that fails the record stays as the zone's only handle

mod common;

use common::*;
use dnszone_core::error::{CloudErrorKind, Error};
use dnszone_core::traits::ControlPlane;
use dnszone_core::{CreateOutcome, CreateZoneRequest, ProvisioningSaga, naming};
use tokio_test::assert_ok;

fn request() -> CreateZoneRequest {
    CreateZoneRequest::new("my-domain", "my-project", "my-network", "host-project")
        .expect("valid request")
}

fn saga(
    control_plane: &ScriptedControlPlane,
    cloud: &ScriptedCloud,
    retry_timeout_secs: u64,
) -> ProvisioningSaga {
    let (saga, _events) = ProvisioningSaga::new(
        Box::new(control_plane.clone()),
        Box::new(cloud.clone()),
        &fast_saga_config(retry_timeout_secs),
    )
    .expect("saga construction succeeds");
    saga
}

#[tokio::test]
async fn created_zone_is_named_from_the_returned_record() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log);

    let record = assert_ok!(saga(&control_plane, &cloud, 10).create(&request()).await);

    assert_eq!(record.id, "abc123");
    let zone_name = naming::zone_name(&record.gcp.domain_prefix, &record.id);
    let zone = cloud
        .inner
        .zone("my-project", &zone_name)
        .await
        .expect("zone exists under the derived name");
    assert_eq!(zone.dns_name, naming::dns_name("my-domain", "abc123"));
    assert_eq!(
        zone.networks,
        vec![naming::network_resource_id("host-project", "my-network")]
    );

    assert!(
        log.position("control_plane.create").unwrap() < log.position("cloud.create_zone").unwrap(),
        "record must be created before the zone: {:?}",
        log.entries()
    );
}

#[tokio::test]
async fn failed_zone_create_rolls_back_the_record() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud =
        ScriptedCloud::new(&log).fail_creates([Fault::Reject(CloudErrorKind::Unauthorized)]);

    let outcome = saga(&control_plane, &cloud, 10)
        .create_outcome(&request())
        .await;

    match outcome {
        CreateOutcome::Clean { cause } => {
            assert_eq!(cause.cloud_kind(), Some(CloudErrorKind::Unauthorized));
        }
        other => panic!("expected Clean, got {:?}", other),
    }

    let err = control_plane.inner.get_dns_domain("abc123").await.unwrap_err();
    assert!(err.is_not_found(), "record must be gone after rollback");
    assert!(cloud.inner.is_empty().await);
}

#[tokio::test]
async fn clean_rollback_reports_only_the_cloud_error() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log).fail_creates([Fault::Reject(CloudErrorKind::Other)]);

    let err = saga(&control_plane, &cloud, 10)
        .create(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CloudProvider { .. }), "got {:?}", err);
}

#[tokio::test]
async fn failed_rollback_orphans_the_record_and_reports_both_errors() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]).fail_next_deletes(1);
    let cloud = ScriptedCloud::new(&log).fail_creates([Fault::Reject(CloudErrorKind::Conflict)]);

    let err = saga(&control_plane, &cloud, 10)
        .create(&request())
        .await
        .unwrap_err();

    match &err {
        Error::Compensation {
            record_id,
            cause,
            compensation,
        } => {
            assert_eq!(record_id, "abc123");
            assert_eq!(cause.cloud_kind(), Some(CloudErrorKind::Conflict));
            assert!(matches!(**compensation, Error::ControlPlane(_)));
        }
        other => panic!("expected Compensation, got {:?}", other),
    }
    let msg = err.to_string();
    assert!(msg.contains("abc123"));
    assert!(msg.contains("injected failure"));
    assert!(msg.contains("injected delete failure"));

    // Left in place for manual cleanup, and not retried
    assert!(control_plane.inner.contains("abc123").await);
    let deletes = log
        .entries()
        .iter()
        .filter(|e| e.starts_with("control_plane.delete"))
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn record_failure_stops_before_any_cloud_call() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &[]).failing_creates();
    let cloud = ScriptedCloud::new(&log);

    let outcome = saga(&control_plane, &cloud, 10)
        .create_outcome(&request())
        .await;

    assert!(matches!(outcome, CreateOutcome::Failed(Error::ControlPlane(_))));
    assert_eq!(cloud.create_calls(), 0);
    assert!(control_plane.inner.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn transient_zone_failures_are_retried() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log).fail_creates([
        Fault::Reject(CloudErrorKind::RateLimited),
        Fault::Reject(CloudErrorKind::Unavailable),
    ]);

    let record = assert_ok!(saga(&control_plane, &cloud, 60).create(&request()).await);

    assert_eq!(record.id, "abc123");
    assert_eq!(cloud.create_calls(), 3);
    assert!(cloud.inner.zone("my-project", "my-domain-abc123").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn zone_created_by_a_lost_response_is_adopted() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud =
        ScriptedCloud::new(&log).fail_creates([Fault::ApplyThenFail(CloudErrorKind::Unavailable)]);

    let record = assert_ok!(saga(&control_plane, &cloud, 60).create(&request()).await);

    assert_eq!(record.id, "abc123");
    assert_eq!(cloud.create_calls(), 2);
    assert_eq!(cloud.inner.len().await, 1);
    assert!(control_plane.inner.contains("abc123").await);
}

#[tokio::test(start_paused = true)]
async fn retry_deadline_on_zone_create_triggers_rollback() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log).always_fail_creates(CloudErrorKind::Unavailable);

    let outcome = saga(&control_plane, &cloud, 5).create_outcome(&request()).await;

    match outcome {
        CreateOutcome::Clean { cause } => assert!(cause.is_timeout(), "got {:?}", cause),
        other => panic!("expected Clean, got {:?}", other),
    }
    // Attempts at t=0s, 1s, 3s; the 4s backoff crosses the 5s deadline
    assert_eq!(cloud.create_calls(), 3);
    assert!(!control_plane.inner.contains("abc123").await);
}

#[tokio::test(start_paused = true)]
async fn rollback_removes_a_zone_left_by_a_lost_response() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log).fail_creates([
        Fault::ApplyThenFail(CloudErrorKind::Unavailable),
        Fault::Reject(CloudErrorKind::Unavailable),
        Fault::Reject(CloudErrorKind::Unavailable),
    ]);

    let outcome = saga(&control_plane, &cloud, 5).create_outcome(&request()).await;

    match outcome {
        CreateOutcome::Clean { cause } => assert!(cause.is_timeout(), "got {:?}", cause),
        other => panic!("expected Clean, got {:?}", other),
    }
    assert!(cloud.inner.is_empty().await, "zone must not outlive the rollback");
    assert!(!control_plane.inner.contains("abc123").await);
    assert!(
        log.position("cloud.delete_zone").unwrap() < log.position("control_plane.delete").unwrap(),
        "zone must be removed before the record: {:?}",
        log.entries()
    );
}

#[tokio::test(start_paused = true)]
async fn failed_zone_cleanup_keeps_the_record() {
    let log = CallLog::default();
    let control_plane = ScriptedControlPlane::new(&log, &["abc123"]);
    let cloud = ScriptedCloud::new(&log)
        .fail_creates([
            Fault::ApplyThenFail(CloudErrorKind::Unavailable),
            Fault::Reject(CloudErrorKind::Unauthorized),
        ])
        .fail_deletes([Fault::Reject(CloudErrorKind::Unauthorized)]);

    let err = saga(&control_plane, &cloud, 5)
        .create(&request())
        .await
        .unwrap_err();

    match &err {
        Error::Compensation {
            record_id,
            cause,
            compensation,
        } => {
            assert_eq!(record_id, "abc123");
            assert_eq!(cause.cloud_kind(), Some(CloudErrorKind::Unauthorized));
            assert_eq!(compensation.cloud_kind(), Some(CloudErrorKind::Unauthorized));
        }
        other => panic!("expected Compensation, got {:?}", other),
    }
    assert!(control_plane.inner.contains("abc123").await);
    assert!(cloud.inner.zone("my-project", "my-domain-abc123").await.is_some());
    assert_eq!(log.position("control_plane.delete"), None);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_call() {
    let err = CreateZoneRequest::new("My_Domain", "my-project", "my-network", "host-project")
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = CreateZoneRequest::new("my-domain", "my-project", "projects/x/y", "host-project")
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
