//! Archive extraction and per-file aggregation.

use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};

use billing_core::{AggregationTotals, ArchiveErrorCode, Error, Result, TagIndex};
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::chunk::ChunkProducer;
use crate::config::PipelineConfig;
use crate::pool::{PoolReport, PoolStats, WorkerPool};
use crate::state::{RunState, RunStateMachine};

/// Outcome of one fully processed archive.
#[derive(Debug)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub stats: PoolStats,
    pub totals: AggregationTotals,
}

impl ArchiveReport {
    fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            files_processed: 0,
            files_skipped: 0,
            stats: PoolStats::default(),
            totals: AggregationTotals::new(),
        }
    }

    fn absorb(&mut self, pool: PoolReport) {
        self.files_processed += 1;
        self.stats.absorb(pool.stats);
        self.totals.merge(pool.totals);
    }
}

/// An extracted entry, removed from the staging folder on drop together with
/// the directories created for it, once they are empty.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    /// Deepest first
    created_dirs: Vec<PathBuf>,
}

impl StagedFile {
    fn new(path: PathBuf, created_dirs: Vec<PathBuf>) -> Self {
        Self { path, created_dirs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.path.display(), "Removed staged file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), error = %e, "Failed to remove staged file"),
        }
        for dir in &self.created_dirs {
            if fs::remove_dir(dir).is_err() {
                break;
            }
        }
    }
}

/// Unpacks archives into the staging folder and aggregates each CSV entry.
pub struct ArchiveExtractor<'a> {
    config: &'a PipelineConfig,
    pool: WorkerPool,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            pool: WorkerPool::from_config(config),
        }
    }

    /// Aggregates every entry of the archive at `path`.
    ///
    /// Any error is fatal for the whole archive; totals of entries already
    /// processed are dropped with the error.
    pub fn process_archive(
        &self,
        path: &Path,
        state: &mut RunStateMachine,
        cancel: &CancellationToken,
    ) -> Result<ArchiveReport> {
        state.transition(RunState::Extracting)?;
        info!(archive = %path.display(), "Working with archive");

        let file = File::open(path).map_err(|e| {
            Error::archive(
                ArchiveErrorCode::Unreadable,
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(path, e))?;

        let mut report = ArchiveReport::new(path);
        for i in 0..zip.len() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            state.transition(RunState::Extracting)?;
            let Some(staged) = self.stage_entry(&mut zip, i, path)? else {
                continue;
            };

            info!(file = %staged.path().display(), "Processing");
            match self.process_csv(&staged, state, cancel)? {
                Some(pool) => {
                    metrics().files_processed.inc();
                    report.absorb(pool);
                }
                None => {
                    metrics().files_skipped.inc();
                    report.files_skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Extracts entry `i`. Directories yield `None`.
    fn stage_entry<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        i: usize,
        archive: &Path,
    ) -> Result<Option<StagedFile>> {
        let mut entry = zip.by_index(i).map_err(|e| corrupt(archive, e))?;
        if entry.is_dir() {
            return Ok(None);
        }

        let Some(name) = entry.enclosed_name() else {
            return Err(Error::UnsafeEntry(format!(
                "{} in {}",
                entry.name(),
                archive.display()
            )));
        };
        let target = self.config.unzip_folder.join(name);

        let mut created_dirs = Vec::new();
        if let Some(parent) = target.parent() {
            created_dirs = missing_dirs(parent, &self.config.unzip_folder);
            fs::create_dir_all(parent).map_err(|e| staging(parent, e))?;
        }
        let staged = StagedFile::new(target, created_dirs);
        let mut out = File::create(staged.path()).map_err(|e| staging(staged.path(), e))?;

        io::copy(&mut entry, &mut out).map_err(|e| {
            Error::archive(
                ArchiveErrorCode::Corrupt,
                format!(
                    "failed to extract {} from {}: {}",
                    entry.name(),
                    archive.display(),
                    e
                ),
            )
        })?;

        Ok(Some(staged))
    }

    /// Aggregates one staged CSV. Returns `None` when the file lacks the tag
    /// or cost column.
    fn process_csv(
        &self,
        staged: &StagedFile,
        state: &mut RunStateMachine,
        cancel: &CancellationToken,
    ) -> Result<Option<PoolReport>> {
        state.transition(RunState::Decoding)?;
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(staged.path())?;

        let headers = reader.byte_headers()?;
        let names = headers.iter().map(|h| std::str::from_utf8(h).unwrap_or_default());
        let index = match TagIndex::resolve(names) {
            Ok(index) => index,
            Err(e) => {
                warn!(file = %staged.path().display(), error = %e, "Skipping file without billing columns");
                return Ok(None);
            }
        };
        debug!(
            file = %staged.path().display(),
            meta_tag = index.meta_tag,
            cost = index.cost,
            "Resolved tag indexes"
        );

        state.transition(RunState::Chunking)?;
        let producer = ChunkProducer::new(reader, self.config.chunk_size)?;

        state.transition(RunState::Aggregating)?;
        let pool = self.pool.run(producer, index, cancel)?;
        state.transition(RunState::Draining)?;

        if !pool.is_clean() {
            return Err(Error::worker(format!(
                "{}: {}",
                staged.path().display(),
                pool.failures.join("; ")
            )));
        }

        info!(
            file = %staged.path().display(),
            chunks = pool.stats.chunks,
            rows = pool.stats.rows_aggregated,
            skipped = pool.stats.rows_skipped,
            cost_errors = pool.stats.cost_errors,
            "Aggregated file"
        );
        Ok(Some(pool))
    }
}

/// Directories between `root` (exclusive) and `dir` that do not exist yet,
/// deepest first.
fn missing_dirs(dir: &Path, root: &Path) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(path) = current {
        if path == root || !path.starts_with(root) || path.exists() {
            break;
        }
        missing.push(path.to_path_buf());
        current = path.parent();
    }
    missing
}

fn corrupt(archive: &Path, e: zip::result::ZipError) -> Error {
    Error::archive(
        ArchiveErrorCode::Corrupt,
        format!("{}: {}", archive.display(), e),
    )
}

fn staging(path: &Path, e: io::Error) -> Error {
    Error::archive(
        ArchiveErrorCode::Staging,
        format!("cannot write {}: {}", path.display(), e),
    )
}
