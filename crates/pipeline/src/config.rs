//! Pipeline configuration.

use std::path::PathBuf;

use billing_core::limits::{DEFAULT_CHUNK_SIZE, DEFAULT_WORKER_THREADS, QUEUE_CHUNKS_PER_WORKER};
use billing_core::{Error, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Folder scanned for `*.zip` billing archives
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,
    /// Staging folder for extracted CSV files
    #[serde(default = "default_unzip_folder")]
    pub unzip_folder: PathBuf,
    /// Workers spawned per CSV file
    #[serde(default = "default_num_threads")]
    #[validate(range(min = 1, max = 256))]
    pub num_threads: usize,
    /// Rows per chunk
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,
    /// Chunks buffered between the reader and the workers.
    /// Defaults to two per worker.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub queue_capacity: Option<usize>,
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("billing_data")
}

fn default_unzip_folder() -> PathBuf {
    PathBuf::from("unzipped")
}

fn default_num_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_folder: default_data_folder(),
            unzip_folder: default_unzip_folder(),
            num_threads: default_num_threads(),
            chunk_size: default_chunk_size(),
            queue_capacity: None,
        }
    }
}

impl PipelineConfig {
    /// Effective chunk queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(self.num_threads * QUEUE_CHUNKS_PER_WORKER)
    }

    /// Validates ranges, mapping failures into the crate error.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::config(format!("invalid pipeline config: {}", e)))
    }
}
