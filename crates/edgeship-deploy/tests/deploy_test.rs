mod common;

use common::{FakeCloud, VERIFICATION_FAILURE, spec, spec_with};
use edgeship_cloud::{CertificateStatus, DnsRecord, PollPolicy, RecordType, StackState};
use edgeship_deploy::{ACCOUNT_VERIFICATION_MESSAGE, DeploymentOutcome, FixedAnswer, Timings};
use std::time::Duration;

/// Records of the domain that point at `target`
fn records_targeting(cloud: &FakeCloud, target: &str) -> Vec<DnsRecord> {
    cloud
        .records()
        .into_iter()
        .filter(|r| r.content == target)
        .collect()
}

#[tokio::test]
async fn test_fresh_apex_deploy() {
    let cloud = FakeCloud::new().into_arc();
    let orchestrator = cloud.orchestrator();

    let result = orchestrator
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(result.bucket_name.as_deref(), Some("example-com-site"));
    assert!(result.certificate_id.is_some());

    let target = result.distribution_domain.clone().unwrap();
    let records = records_targeting(&cloud, &target);
    assert_eq!(records.len(), 2);
    assert!(
        records
            .iter()
            .any(|r| r.name == "example.com" && r.record_type == RecordType::Alias)
    );
    assert!(
        records
            .iter()
            .any(|r| r.name == "www.example.com" && r.record_type == RecordType::Cname)
    );

    let state = cloud.state.lock().unwrap();
    assert_eq!(
        state.synced,
        vec![("./dist".to_string(), "example-com-site".to_string())]
    );
    assert_eq!(state.invalidations.len(), 1);
    assert_eq!(state.invalidations[0].1, vec!["/*".to_string()]);
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let cloud = FakeCloud::new().into_arc();
    let orchestrator = cloud.orchestrator();
    let spec = spec("example.com");

    let first = orchestrator.deploy(&spec, &FixedAnswer(false)).await;
    assert_eq!(first.outcome, DeploymentOutcome::Created);
    let records_after_first = cloud.records();
    let upserts_after_first = cloud.count_calls("upsert_record");

    let second = orchestrator.deploy(&spec, &FixedAnswer(false)).await;
    assert!(second.success, "{}", second.message);
    assert_eq!(second.outcome, DeploymentOutcome::Unchanged);
    assert_eq!(second.distribution_id, first.distribution_id);
    assert_eq!(second.certificate_id, first.certificate_id);

    assert_eq!(cloud.count_calls("create_stack"), 1);
    assert_eq!(cloud.count_calls("request_certificate"), 1);
    assert_eq!(cloud.count_calls("upsert_record"), upserts_after_first);
    assert_eq!(cloud.records(), records_after_first);
    assert_eq!(cloud.state.lock().unwrap().distributions.len(), 1);
}

#[tokio::test]
async fn test_adopts_distribution_serving_domain() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_distribution(
        "ELEGACY",
        "dlegacy.cloudfront.net",
        &["example.com"],
        "legacy-site.s3.us-east-1.amazonaws.com",
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Adopted);
    assert_eq!(result.distribution_id.as_deref(), Some("ELEGACY"));
    assert_eq!(result.distribution_domain.as_deref(), Some("dlegacy.cloudfront.net"));
    assert_eq!(result.bucket_name.as_deref(), Some("legacy-site"));

    assert_eq!(cloud.count_calls("create_stack"), 0);
    assert_eq!(cloud.count_calls("request_certificate"), 0);
    assert_eq!(
        cloud.state.lock().unwrap().synced[0].1,
        "legacy-site".to_string()
    );
}

#[tokio::test]
async fn test_subdomain_gets_single_cname() {
    let cloud = FakeCloud::new().into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("app.example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    let target = result.distribution_domain.unwrap();
    let records = records_targeting(&cloud, &target);
    assert_eq!(
        records,
        vec![DnsRecord::cname("app.example.com", target.as_str())]
    );
    assert!(!cloud.records().iter().any(|r| r.name.starts_with("www.")));
}

#[tokio::test]
async fn test_reuses_issued_certificate() {
    let cloud = FakeCloud::new().into_arc();
    let existing = cloud.add_certificate(
        "example.com",
        &["example.com", "www.example.com"],
        CertificateStatus::Issued,
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.certificate_id, Some(existing));
    assert_eq!(cloud.count_calls("request_certificate"), 0);
}

#[tokio::test]
async fn test_apex_certificate_without_www_is_replaced() {
    let cloud = FakeCloud::new().into_arc();
    let apex_only = cloud.add_certificate("example.com", &["example.com"], CertificateStatus::Issued);

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(cloud.count_calls("request_certificate"), 1);
    assert_ne!(result.certificate_id, Some(apex_only));
}

#[tokio::test]
async fn test_resumes_pending_certificate() {
    let cloud = FakeCloud::new().into_arc();
    let pending = cloud.add_certificate(
        "example.com",
        &["example.com", "www.example.com"],
        CertificateStatus::PendingValidation,
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.certificate_id, Some(pending));
    assert_eq!(cloud.count_calls("request_certificate"), 0);
}

#[tokio::test]
async fn test_presupplied_certificate_must_be_issued() {
    let cloud = FakeCloud::new().into_arc();
    let pending = cloud.add_certificate(
        "example.com",
        &["example.com", "www.example.com"],
        CertificateStatus::PendingValidation,
    );
    let spec = spec_with("example.com", &format!("certificate \"{}\"", pending));

    let result = cloud.orchestrator().deploy(&spec, &FixedAnswer(false)).await;

    assert!(!result.success);
    assert!(result.message.contains("was not issued"), "{}", result.message);
    assert_eq!(cloud.count_calls("create_stack"), 0);
}

#[tokio::test]
async fn test_certificate_issuance_timeout_fails_run() {
    let mut cloud = FakeCloud::new();
    cloud.auto_issue = false;
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert_eq!(result.outcome, DeploymentOutcome::Failed);
    assert!(
        result.message.contains("Timeout waiting for certificate"),
        "{}",
        result.message
    );
    assert!(result.certificate_id.is_some());
    assert_eq!(cloud.count_calls("create_stack"), 0);
}

#[tokio::test]
async fn test_validation_options_timeout_fails_run() {
    let mut cloud = FakeCloud::new();
    cloud.options_delay = u32::MAX;
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert!(
        result
            .message
            .contains("Timeout waiting for DNS validation options"),
        "{}",
        result.message
    );
}

#[tokio::test]
async fn test_refused_migration_writes_nothing() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_record(DnsRecord::cname("app.example.com", "cname.vercel-dns.com"));

    let result = cloud
        .orchestrator()
        .deploy(&spec("app.example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success);
    assert_eq!(result.outcome, DeploymentOutcome::Skipped);
    assert!(result.message.contains("Vercel"), "{}", result.message);

    assert_eq!(cloud.count_calls("delete_record"), 0);
    assert_eq!(cloud.count_calls("upsert_record"), 0);
    assert_eq!(cloud.count_calls("create_stack"), 0);
    assert_eq!(
        cloud.records(),
        vec![DnsRecord::cname("app.example.com", "cname.vercel-dns.com")]
    );
}

#[tokio::test]
async fn test_confirmed_migration_replaces_foreign_record() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_record(DnsRecord::cname("app.example.com", "my-site.netlify.app"));

    let result = cloud
        .orchestrator()
        .deploy(&spec("app.example.com"), &FixedAnswer(true))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(cloud.count_calls("delete_record app.example.com CNAME"), 1);

    let app: Vec<_> = cloud
        .records()
        .into_iter()
        .filter(|r| r.name == "app.example.com")
        .collect();
    assert_eq!(app.len(), 1);
    assert_eq!(Some(app[0].content.clone()), result.distribution_domain);
}

#[tokio::test]
async fn test_account_verification_falls_back_to_adoption() {
    let mut cloud = FakeCloud::new();
    cloud.create_failure = Some(VERIFICATION_FAILURE.to_string());
    let cloud = cloud.into_arc();

    // 以前の実行で壊れたスタックが残っているので事前の採用チェックは走らない
    cloud.add_stack("edgeship-marketing", StackState::RollbackComplete);
    cloud.add_distribution(
        "EMANUAL",
        "dmanual.cloudfront.net",
        &["example.com", "www.example.com"],
        "manual-bucket.s3.amazonaws.com",
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Adopted);
    assert_eq!(result.distribution_id.as_deref(), Some("EMANUAL"));
    assert_eq!(result.bucket_name.as_deref(), Some("manual-bucket"));
    assert_eq!(result.warnings, vec![ACCOUNT_VERIFICATION_MESSAGE.to_string()]);
    assert_eq!(cloud.count_calls("delete_stack"), 1);
    assert_eq!(cloud.count_calls("create_stack"), 1);
}

#[tokio::test]
async fn test_account_verification_without_match_is_actionable() {
    let mut cloud = FakeCloud::new();
    cloud.create_failure = Some(VERIFICATION_FAILURE.to_string());
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert_eq!(result.message, ACCOUNT_VERIFICATION_MESSAGE);
}

#[tokio::test]
async fn test_stack_failure_short_circuits_dns() {
    let mut cloud = FakeCloud::new();
    cloud.create_failure = Some("CNAMEAlreadyExists: example.com".to_string());
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("CNAMEAlreadyExists"), "{}", result.message);
    assert!(
        !cloud
            .records()
            .iter()
            .any(|r| r.content.ends_with("cloudfront.net"))
    );
    assert!(cloud.state.lock().unwrap().synced.is_empty());
}

#[tokio::test]
async fn test_rolled_back_stack_is_replaced() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_stack("edgeship-marketing", StackState::RollbackComplete);

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(cloud.count_calls("delete_stack"), 1);
    assert_eq!(
        cloud.stack("edgeship-marketing").unwrap().status,
        StackState::CreateComplete
    );
}

#[tokio::test]
async fn test_orphan_bucket_is_reclaimed() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_bucket("example-com-site", false);

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.bucket_name.as_deref(), Some("example-com-site"));
    assert_eq!(cloud.count_calls("delete_bucket example-com-site"), 1);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_stuck_orphan_bucket_gets_alternate_name() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_bucket("example-com-site", true);

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    let bucket = result.bucket_name.clone().unwrap();
    assert!(bucket.starts_with("example-com-site-"), "{}", bucket);
    assert_eq!(bucket.len(), "example-com-site-".len() + 6);
    assert_eq!(result.warnings.len(), 1);
    assert!(cloud.has_bucket("example-com-site"));
}

#[tokio::test]
async fn test_unmanaged_domain_fails_before_any_change() {
    let mut cloud = FakeCloud::new();
    cloud.manages_domain = false;
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(true))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("cannot manage DNS"), "{}", result.message);
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn test_flattening_provider_uses_apex_cname() {
    let cloud = FakeCloud::flattening().into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    let target = result.distribution_domain.unwrap();
    let mut records = records_targeting(&cloud, &target);
    records.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        records,
        vec![
            DnsRecord::cname("example.com", target.as_str()),
            DnsRecord::cname("www.example.com", target.as_str()),
        ]
    );
}

#[tokio::test]
async fn test_apex_fails_without_alias_or_cname_support() {
    let mut cloud = FakeCloud::new();
    cloud.capabilities.alias_records = false;
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert!(
        result.message.contains("supports neither alias records nor CNAME"),
        "{}",
        result.message
    );
    // www は apex の結果に関わらず設定される
    assert!(cloud.records().iter().any(|r| r.name == "www.example.com"));
    assert!(cloud.state.lock().unwrap().synced.is_empty());
}

#[tokio::test]
async fn test_rolled_back_stack_does_not_block_adoption() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_stack("edgeship-marketing", StackState::RollbackComplete);
    cloud.add_distribution(
        "ELEGACY",
        "dlegacy.cloudfront.net",
        &["example.com"],
        "legacy-site.s3.us-east-1.amazonaws.com",
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Adopted);
    assert_eq!(result.distribution_id.as_deref(), Some("ELEGACY"));
    assert_eq!(cloud.count_calls("create_stack"), 0);
    assert_eq!(cloud.count_calls("delete_stack"), 0);
}

#[tokio::test]
async fn test_rolled_back_stack_reclaims_orphan_bucket() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_stack("edgeship-marketing", StackState::CreateFailed);
    cloud.add_bucket("example-com-site", false);

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(cloud.count_calls("delete_bucket example-com-site"), 1);
    assert_eq!(result.bucket_name.as_deref(), Some("example-com-site"));
}

#[tokio::test]
async fn test_waits_for_unwinding_delete() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_stack("edgeship-marketing", StackState::DeleteInProgress);
    cloud.script_stack(
        "edgeship-marketing",
        &[
            StackState::DeleteInProgress,
            StackState::DeleteInProgress,
            StackState::DeleteComplete,
        ],
    );

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(cloud.count_calls("create_stack"), 1);
    // 削除中のスタックは待つだけで、改めて削除しない
    assert_eq!(cloud.count_calls("delete_stack"), 0);
}

#[tokio::test]
async fn test_waits_for_running_update() {
    let cloud = FakeCloud::new().into_arc();
    let orchestrator = cloud.orchestrator();
    let spec = spec("example.com");

    let first = orchestrator.deploy(&spec, &FixedAnswer(false)).await;
    assert!(first.success, "{}", first.message);

    cloud.set_stack_status("edgeship-marketing", StackState::UpdateInProgress);
    cloud.script_stack(
        "edgeship-marketing",
        &[
            StackState::UpdateInProgress,
            StackState::UpdateCompleteCleanupInProgress,
            StackState::UpdateComplete,
        ],
    );

    let second = orchestrator.deploy(&spec, &FixedAnswer(false)).await;

    assert!(second.success, "{}", second.message);
    assert_eq!(second.outcome, DeploymentOutcome::Unchanged);
    assert_eq!(second.distribution_id, first.distribution_id);
    assert_eq!(cloud.count_calls("create_stack"), 1);
    assert_eq!(cloud.count_calls("delete_stack"), 0);
}

#[tokio::test]
async fn test_stack_wait_timeout_fails_run() {
    let cloud = FakeCloud::new().into_arc();
    cloud.add_stack("edgeship-marketing", StackState::UpdateInProgress);

    let timings = Timings {
        stack: PollPolicy::new(Duration::ZERO, 3),
        ..Timings::immediate()
    };
    let result = cloud
        .orchestrator()
        .with_timings(timings)
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert_eq!(result.outcome, DeploymentOutcome::Failed);
    assert!(result.message.contains("Timed out"), "{}", result.message);
    assert!(result.message.contains("UPDATE_IN_PROGRESS"), "{}", result.message);
    assert_eq!(cloud.count_calls("create_stack"), 0);
    assert_eq!(cloud.count_calls("request_certificate"), 0);
}

#[tokio::test]
async fn test_www_failure_is_a_warning() {
    let mut cloud = FakeCloud::new();
    cloud.rejected_names = vec!["www.example.com".to_string()];
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("example.com"), &FixedAnswer(false))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.outcome, DeploymentOutcome::Created);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("www.example.com"), "{:?}", result.warnings);

    let target = result.distribution_domain.clone().unwrap();
    assert_eq!(
        records_targeting(&cloud, &target),
        vec![DnsRecord::alias("example.com", target.as_str())]
    );
    assert_eq!(cloud.state.lock().unwrap().synced.len(), 1);
}

#[tokio::test]
async fn test_subdomain_record_failure_fails_run() {
    let mut cloud = FakeCloud::new();
    cloud.rejected_names = vec!["app.example.com".to_string()];
    let cloud = cloud.into_arc();

    let result = cloud
        .orchestrator()
        .deploy(&spec("app.example.com"), &FixedAnswer(false))
        .await;

    assert!(!result.success);
    assert!(result.message.contains("app.example.com"), "{}", result.message);
    assert!(cloud.state.lock().unwrap().synced.is_empty());
}
