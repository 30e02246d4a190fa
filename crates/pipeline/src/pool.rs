//! Aggregation worker pool.
//!
//! Each worker drains the shared [`ChunkQueue`] into its own
//! [`AggregationTotals`]; the pool merges them once every worker has
//! returned. No totals are shared while rows are being aggregated.

use std::io::Read;
use std::thread;

use billing_core::{aggregate_row, AggregationTotals, Error, Result, RowOutcome, TagIndex};
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chunk::{Chunk, ChunkProducer, ChunkQueue};
use crate::config::PipelineConfig;

/// Row and chunk counters of one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub chunks: usize,
    pub rows_aggregated: usize,
    pub rows_skipped: usize,
    pub cost_errors: usize,
}

impl PoolStats {
    pub fn absorb(&mut self, other: PoolStats) {
        self.chunks += other.chunks;
        self.rows_aggregated += other.rows_aggregated;
        self.rows_skipped += other.rows_skipped;
        self.cost_errors += other.cost_errors;
    }
}

/// Result of draining one CSV file.
#[derive(Debug, Default)]
pub struct PoolReport {
    pub totals: AggregationTotals,
    pub stats: PoolStats,
    /// Chunks the reader enqueued
    pub chunks_produced: usize,
    /// One message per worker that stopped on an error
    pub failures: Vec<String>,
}

impl PoolReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fixed-size pool of aggregation workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.num_threads, config.queue_capacity())
    }

    /// Aggregates every chunk of `producer` and waits for all workers.
    ///
    /// Worker failures are collected in the report rather than returned;
    /// only cancellation aborts the run.
    pub fn run<R: Read + Send>(
        &self,
        producer: ChunkProducer<R>,
        index: TagIndex,
        cancel: &CancellationToken,
    ) -> Result<PoolReport> {
        let (feeder, queue) = ChunkQueue::bounded(self.queue_capacity);

        let report = thread::scope(|scope| {
            let feeding = thread::Builder::new()
                .name("chunk-feeder".to_string())
                .spawn_scoped(scope, move || feeder.feed(producer, cancel));

            let mut handles = Vec::with_capacity(self.workers);
            for id in 0..self.workers {
                let worker = Worker {
                    id,
                    index,
                    queue: queue.clone(),
                    cancel,
                };
                let spawned = thread::Builder::new()
                    .name(format!("aggregate-{id}"))
                    .spawn_scoped(scope, move || worker.run());
                handles.push(spawned);
            }
            drop(queue);

            // Drain barrier: every worker has returned past this loop.
            let mut report = PoolReport::default();
            for (id, handle) in handles.into_iter().enumerate() {
                let outcome = match handle {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| WorkerOutcome::failed("worker panicked")),
                    Err(e) => WorkerOutcome::failed(format!("failed to spawn worker: {e}")),
                };

                report.stats.absorb(outcome.stats);
                report.totals.merge(outcome.totals);
                if let Some(failure) = outcome.failure {
                    error!(worker = id, error = %failure, "Aggregation worker stopped");
                    metrics().worker_failures.inc();
                    report.failures.push(format!("worker {id}: {failure}"));
                }
            }

            match feeding {
                Ok(handle) => match handle.join() {
                    Ok(sent) => report.chunks_produced = sent,
                    Err(_) => report.failures.push("chunk feeder panicked".to_string()),
                },
                Err(e) => report
                    .failures
                    .push(format!("failed to spawn chunk feeder: {e}")),
            }

            report
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(
            chunks = report.stats.chunks,
            rows = report.stats.rows_aggregated,
            skipped = report.stats.rows_skipped,
            "Worker pool drained"
        );

        Ok(report)
    }
}

struct WorkerOutcome {
    totals: AggregationTotals,
    stats: PoolStats,
    failure: Option<String>,
}

impl WorkerOutcome {
    fn failed(msg: impl Into<String>) -> Self {
        Self {
            totals: AggregationTotals::new(),
            stats: PoolStats::default(),
            failure: Some(msg.into()),
        }
    }
}

struct Worker<'a> {
    id: usize,
    index: TagIndex,
    queue: ChunkQueue,
    cancel: &'a CancellationToken,
}

impl Worker<'_> {
    /// Fetch → aggregate → repeat, until the queue is closed and empty.
    fn run(self) -> WorkerOutcome {
        let mut totals = AggregationTotals::new();
        let mut stats = PoolStats::default();
        let mut failure = None;

        metrics().active_workers.inc();
        while !self.cancel.is_cancelled() {
            match self.queue.fetch() {
                Some(Ok(chunk)) => {
                    let chunk_stats = self.aggregate_chunk(&chunk, &mut totals);
                    record_chunk(&chunk_stats);
                    stats.absorb(chunk_stats);
                }
                Some(Err(e)) => {
                    failure = Some(e.to_string());
                    break;
                }
                None => break,
            }
        }
        metrics().active_workers.dec();

        WorkerOutcome {
            totals,
            stats,
            failure,
        }
    }

    fn aggregate_chunk(&self, chunk: &Chunk, totals: &mut AggregationTotals) -> PoolStats {
        let mut stats = PoolStats {
            chunks: 1,
            ..PoolStats::default()
        };

        for row in &chunk.rows {
            if self.cancel.is_cancelled() {
                break;
            }

            let line = row.position().map(|p| p.line());
            match aggregate_row(totals, row, self.index) {
                Ok(RowOutcome::Aggregated { .. }) => stats.rows_aggregated += 1,
                Ok(RowOutcome::Skipped(reason)) => {
                    info!(
                        worker = self.id,
                        chunk = chunk.sequence,
                        line = ?line,
                        %reason,
                        "Skipping malformed row"
                    );
                    stats.rows_skipped += 1;
                }
                Err(e) if e.is_row_level() => {
                    warn!(
                        worker = self.id,
                        chunk = chunk.sequence,
                        line = ?line,
                        error = %e,
                        "Skipping row with unparseable cost"
                    );
                    stats.cost_errors += 1;
                }
                Err(e) => {
                    warn!(worker = self.id, chunk = chunk.sequence, error = %e, "Row failed");
                    stats.rows_skipped += 1;
                }
            }
        }

        stats
    }
}

fn record_chunk(stats: &PoolStats) {
    let m = metrics();
    m.chunks_processed.inc();
    m.rows_aggregated.inc_by(stats.rows_aggregated as u64);
    m.rows_skipped.inc_by(stats.rows_skipped as u64);
    m.cost_parse_errors.inc_by(stats.cost_errors as u64);
}
