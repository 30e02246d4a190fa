//! Pipeline runner.
//!
//! One run:
//! 1. List archives in the data folder
//! 2. Aggregate each archive into its own totals
//! 3. Merge totals of archives that succeeded
//! 4. Persist the merged totals once

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use billing_core::{
    AggregateSink, AggregationTotals, ArchiveErrorCode, Error, LevelSummary, Result,
};
use chrono::{DateTime, Utc};
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::archives::list_archives;
use crate::config::PipelineConfig;
use crate::extract::ArchiveExtractor;
use crate::pool::PoolStats;
use crate::state::{RunState, RunStateMachine};

/// An archive that could not be processed.
#[derive(Debug, Clone)]
pub struct ArchiveFailure {
    pub archive: PathBuf,
    pub error: String,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub archives_processed: usize,
    pub failures: Vec<ArchiveFailure>,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub stats: PoolStats,
    /// Triples handed to the sink
    pub aggregates_persisted: usize,
    pub summary: Vec<LevelSummary>,
}

impl RunReport {
    /// True when every archive was processed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives archives through extraction, aggregation, and persistence.
pub struct PipelineRunner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs every archive in the data folder and persists the result once.
    pub fn run<S>(&self, sink: &S, cancel: &CancellationToken) -> Result<RunReport>
    where
        S: AggregateSink + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("billing_run", %run_id);
        let _guard = span.enter();

        let mut state = RunStateMachine::new();
        let result = self.run_inner(run_id, sink, &mut state, cancel);
        if result.is_err() {
            state.fail();
        }
        result
    }

    fn run_inner<S>(
        &self,
        run_id: Uuid,
        sink: &S,
        state: &mut RunStateMachine,
        cancel: &CancellationToken,
    ) -> Result<RunReport>
    where
        S: AggregateSink + ?Sized,
    {
        let started_at = Utc::now();
        self.config.check()?;
        fs::create_dir_all(&self.config.unzip_folder).map_err(|e| {
            Error::archive(
                ArchiveErrorCode::Staging,
                format!(
                    "cannot create staging folder {}: {}",
                    self.config.unzip_folder.display(),
                    e
                ),
            )
        })?;

        let archives = list_archives(&self.config.data_folder)?;
        info!(
            data_folder = %self.config.data_folder.display(),
            archives = archives.len(),
            workers = self.config.num_threads,
            chunk_size = self.config.chunk_size,
            "Starting billing run"
        );

        let mut report = RunReport {
            run_id,
            started_at,
            archives_processed: 0,
            failures: Vec::new(),
            files_processed: 0,
            files_skipped: 0,
            stats: PoolStats::default(),
            aggregates_persisted: 0,
            summary: Vec::new(),
        };

        let extractor = ArchiveExtractor::new(self.config);
        let mut totals = AggregationTotals::new();
        for archive in archives {
            match extractor.process_archive(&archive, state, cancel) {
                Ok(done) => {
                    metrics().archives_processed.inc();
                    report.archives_processed += 1;
                    report.files_processed += done.files_processed;
                    report.files_skipped += done.files_skipped;
                    report.stats.absorb(done.stats);
                    totals.merge(done.totals);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    metrics().archives_failed.inc();
                    error!(archive = %archive.display(), error = %e, "Archive failed");
                    report.failures.push(ArchiveFailure {
                        archive,
                        error: e.to_string(),
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        state.transition(RunState::Persisting)?;
        report.summary = totals.summary();
        report.aggregates_persisted = persist(sink, &totals)?;
        state.transition(RunState::Done)?;

        info!(
            archives = report.archives_processed,
            failed = report.failures.len(),
            files = report.files_processed,
            rows = report.stats.rows_aggregated,
            skipped = report.stats.rows_skipped,
            persisted = report.aggregates_persisted,
            "Billing run finished"
        );
        for level in &report.summary {
            info!(
                object_type = %level.object_type,
                objects = level.objects,
                total_cost = level.total_cost,
                "Aggregated level"
            );
        }

        Ok(report)
    }
}

fn persist<S>(sink: &S, totals: &AggregationTotals) -> Result<usize>
where
    S: AggregateSink + ?Sized,
{
    if totals.is_empty() {
        return Ok(0);
    }

    let start = Instant::now();
    let written = sink.persist(totals).map_err(|e| {
        metrics().persist_errors.inc();
        e
    })?;

    metrics()
        .persist_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    metrics().aggregates_persisted.inc_by(written as u64);
    Ok(written)
}
