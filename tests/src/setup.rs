//! Common test setup functions.

use std::fs;
use std::path::PathBuf;

use billing_store::{init_schema, BillingStore, StoreConfig};
use pipeline::PipelineConfig;
use tempfile::TempDir;

use crate::fixtures::{write_archive, write_archive_bytes};

/// Temporary folders plus a file-backed store with the schema applied.
pub struct TestContext {
    pub dir: TempDir,
    pub config: PipelineConfig,
    pub store: BillingStore,
}

impl TestContext {
    pub fn new() -> Self {
        telemetry::init_tracing(telemetry::TracingConfig::default());

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = PipelineConfig {
            data_folder: dir.path().join("billing_data"),
            unzip_folder: dir.path().join("unzipped"),
            num_threads: 4,
            chunk_size: 2,
            queue_capacity: None,
        };
        fs::create_dir_all(&config.data_folder).expect("Failed to create data folder");

        let store = BillingStore::open(StoreConfig {
            path: dir.path().join("billing.db"),
            ..StoreConfig::default()
        })
        .expect("Failed to open store");
        init_schema(&store).expect("Failed to initialize schema");

        Self { dir, config, store }
    }

    /// Writes an archive into the data folder and returns its path.
    pub fn add_archive(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.config.data_folder.join(name);
        write_archive(&path, entries);
        path
    }

    pub fn add_archive_bytes(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = self.config.data_folder.join(name);
        write_archive_bytes(&path, entries);
        path
    }

    /// Files left in the staging folder.
    pub fn staged_files(&self) -> usize {
        fs::read_dir(&self.config.unzip_folder)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_file())
                    .count()
            })
            .unwrap_or(0)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
