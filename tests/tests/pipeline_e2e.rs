//! End-to-end runs: archives on disk through to the SQLite store.

use billing_core::ObjectType;
use billing_store::{aggregate_cost, list_aggregates};
use integration_tests::{fixtures, setup::TestContext};
use pipeline::PipelineRunner;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[test]
fn test_single_archive_is_aggregated_and_persisted() {
    let ctx = TestContext::new();
    ctx.add_archive("report.zip", &[("report.csv", fixtures::sample_report().as_str())]);

    let report = PipelineRunner::new(&ctx.config)
        .run(&ctx.store, &CancellationToken::new())
        .expect("Run failed");
    info!(run_id = %report.run_id, "Run finished");

    assert!(report.is_success());
    assert_eq!(report.archives_processed, 1);
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.stats.rows_aggregated, 3);
    assert_eq!(report.stats.rows_skipped, 1);
    assert_eq!(report.aggregates_persisted, 4);

    for (object_type, id) in [
        (ObjectType::Env, "e1"),
        (ObjectType::Farm, "f1"),
        (ObjectType::FarmRole, "fr1"),
        (ObjectType::Server, "s1"),
    ] {
        assert_eq!(
            aggregate_cost(&ctx.store, object_type, id).unwrap(),
            Some(7.0),
            "{object_type} {id}"
        );
    }
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Env, "broken").unwrap(), None);
    assert_eq!(ctx.staged_files(), 0);
}

#[test]
fn test_second_run_accumulates() {
    let ctx = TestContext::new();
    ctx.add_archive("report.zip", &[("report.csv", fixtures::sample_report().as_str())]);

    let runner = PipelineRunner::new(&ctx.config);
    runner.run(&ctx.store, &CancellationToken::new()).unwrap();
    runner.run(&ctx.store, &CancellationToken::new()).unwrap();

    assert_eq!(
        aggregate_cost(&ctx.store, ObjectType::Server, "s1").unwrap(),
        Some(14.0)
    );
    assert_eq!(list_aggregates(&ctx.store, ObjectType::Server).unwrap().len(), 1);
}

#[test]
fn test_many_archives_and_entries_sum_per_level() {
    let ctx = TestContext::new();
    let wide = fixtures::wide_report(400, 4);
    ctx.add_archive("a.zip", &[("one.csv", wide.as_str()), ("two.csv", wide.as_str())]);
    ctx.add_archive("b.ZIP", &[("nested/three.csv", wide.as_str())]);

    let report = PipelineRunner::new(&ctx.config)
        .run(&ctx.store, &CancellationToken::new())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.archives_processed, 2);
    assert_eq!(report.files_processed, 3);
    assert_eq!(report.stats.rows_aggregated, 1_200);

    // 100 rows per env per file, three files, 0.25 each
    let envs = list_aggregates(&ctx.store, ObjectType::Env).unwrap();
    assert_eq!(envs.len(), 4);
    assert!(envs.iter().all(|row| row.cost == 75.0));

    let servers = list_aggregates(&ctx.store, ObjectType::Server).unwrap();
    assert_eq!(servers.len(), 7);
    let total: f64 = servers.iter().map(|row| row.cost).sum();
    assert_eq!(total, 300.0);
    assert_eq!(ctx.staged_files(), 0);
}

#[test]
fn test_empty_segments_only_touch_present_levels() {
    let ctx = TestContext::new();
    let body = fixtures::report_csv(&[
        fixtures::row(1, "v2:e1:::", "4"),
        fixtures::row(2, "v2::f9::", "6"),
    ]);
    ctx.add_archive("partial.zip", &[("partial.csv", body.as_str())]);

    let report = PipelineRunner::new(&ctx.config)
        .run(&ctx.store, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.aggregates_persisted, 2);
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Env, "e1").unwrap(), Some(4.0));
    assert_eq!(aggregate_cost(&ctx.store, ObjectType::Farm, "f9").unwrap(), Some(6.0));
    assert!(list_aggregates(&ctx.store, ObjectType::FarmRole).unwrap().is_empty());
    assert!(list_aggregates(&ctx.store, ObjectType::Server).unwrap().is_empty());
}
