//! Failure handling across a billing run.

use std::fs;

use billing_core::{Error, ObjectType};
use billing_store::aggregate_cost;
use integration_tests::{fixtures, mocks::MockSink, setup::TestContext};
use pipeline::PipelineRunner;
use tokio_util::sync::CancellationToken;

#[test]
fn test_corrupt_archive_does_not_block_others() {
    let ctx = TestContext::new();
    ctx.add_archive("good.zip", &[("report.csv", fixtures::sample_report().as_str())]);
    fs::write(ctx.config.data_folder.join("bad.zip"), b"not a zip archive").unwrap();

    let report = PipelineRunner::new(&ctx.config)
        .run(&ctx.store, &CancellationToken::new())
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.archives_processed, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].archive.ends_with("bad.zip"));
    assert!(report.failures[0].error.contains("ARCHIVE_002"));
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Env, "e1").unwrap(), Some(7.0));
}

#[test]
fn test_archive_failing_midway_contributes_nothing() {
    let ctx = TestContext::new();
    ctx.add_archive(
        "mixed.zip",
        &[
            ("first.csv", fixtures::sample_report().as_str()),
            ("../escape.csv", fixtures::sample_report().as_str()),
        ],
    );

    let sink = MockSink::new();
    let report = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.archives_processed, 0);
    assert_eq!(sink.call_count(), 0);
    assert_eq!(ctx.staged_files(), 0);
    assert!(!ctx.dir.path().join("escape.csv").exists());
}

#[test]
fn test_latin1_bytes_outside_billing_columns_are_aggregated() {
    let ctx = TestContext::new();
    let mut body = fixtures::sample_report().into_bytes();
    body.extend_from_slice(b"5,Caf\xe9 Service,v2:e9:f9:fr9:s9,1.0\n");
    ctx.add_archive_bytes("latin1.zip", &[("report.csv", body.as_slice())]);

    let report = PipelineRunner::new(&ctx.config)
        .run(&ctx.store, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.archives_processed, 1);
    assert_eq!(report.stats.rows_aggregated, 4);
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Env, "e1").unwrap(), Some(7.0));
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Server, "s9").unwrap(), Some(1.0));
}

#[test]
fn test_undecodable_tag_is_skipped() {
    let ctx = TestContext::new();
    let mut body = fixtures::sample_report().into_bytes();
    body.extend_from_slice(b"5,EC2,v2:e\xff:f1:fr1:s1,50\n");
    ctx.add_archive_bytes("tag.zip", &[("report.csv", body.as_slice())]);

    let sink = MockSink::new();
    let report = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.stats.rows_skipped, 2);
    assert_eq!(sink.captured()[0].get(ObjectType::Farm, "f1"), Some(7.0));
}

#[test]
fn test_missing_data_folder_is_an_empty_run() {
    let ctx = TestContext::new();
    fs::remove_dir_all(&ctx.config.data_folder).unwrap();

    let sink = MockSink::new();
    let report = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.archives_processed, 0);
    assert_eq!(sink.call_count(), 0);
}

#[test]
fn test_sink_failure_fails_the_run() {
    let ctx = TestContext::new();
    ctx.add_archive("report.zip", &[("report.csv", fixtures::sample_report().as_str())]);

    let sink = MockSink::new();
    sink.set_should_fail(true);
    let err = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap_err();

    assert_eq!(err.error_code(), Some("DB_003"));
    assert!(sink.captured().is_empty());
}

#[test]
fn test_file_without_billing_columns_is_skipped() {
    let ctx = TestContext::new();
    ctx.add_archive(
        "report.zip",
        &[
            ("summary.csv", "InvoiceID,Total\n1,99.0\n"),
            ("report.csv", fixtures::sample_report().as_str()),
        ],
    );

    let sink = MockSink::new();
    let report = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_skipped, 1);
    let captured = sink.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].get(ObjectType::Farm, "f1"), Some(7.0));
}

#[test]
fn test_unparseable_costs_are_skipped() {
    let ctx = TestContext::new();
    let body = fixtures::report_csv(&[
        fixtures::row(1, "v2:e1:f1:fr1:s1", "2"),
        fixtures::row(2, "v2:e1:f1:fr1:s1", "n/a"),
        fixtures::row(3, "v2:e1:f1:fr1:s1", ""),
    ]);
    ctx.add_archive("costs.zip", &[("costs.csv", body.as_str())]);

    let sink = MockSink::new();
    let report = PipelineRunner::new(&ctx.config)
        .run(&sink, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.stats.rows_aggregated, 1);
    assert_eq!(report.stats.cost_errors, 2);
    assert_eq!(sink.captured()[0].get(ObjectType::Env, "e1"), Some(2.0));
}

#[test]
fn test_cancelled_run_persists_nothing() {
    let ctx = TestContext::new();
    ctx.add_archive("report.zip", &[("report.csv", fixtures::sample_report().as_str())]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = MockSink::new();
    let err = PipelineRunner::new(&ctx.config).run(&sink, &cancel).unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(sink.call_count(), 0);
}
