//! Concurrent chunked aggregation of zipped billing reports.
//!
//! Handles one batch run:
//! - Archive listing and extraction to a staging folder
//! - Chunked CSV reading through a bounded queue
//! - Worker pool aggregation with per-worker totals
//! - Single persistence pass after every archive has drained

pub mod archives;
pub mod chunk;
pub mod config;
pub mod extract;
pub mod pool;
pub mod runner;
pub mod state;

pub use archives::list_archives;
pub use tokio_util::sync::CancellationToken;
pub use chunk::{Chunk, ChunkFeeder, ChunkProducer, ChunkQueue};
pub use config::*;
pub use extract::{ArchiveExtractor, ArchiveReport};
pub use pool::{PoolReport, PoolStats, WorkerPool};
pub use runner::*;
pub use state::{RunState, RunStateMachine};
