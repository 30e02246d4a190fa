//! Sizing constants for the billing aggregator.
//!
//! Defaults here are used when the configuration leaves a value unset.

// === Chunking ===

/// Rows per chunk handed to a worker.
///
/// Small enough that a stalled worker holds little work, large enough that
/// queue traffic stays negligible next to row parsing.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Workers spawned per CSV file.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Chunks buffered per worker between the reader and the pool.
pub const QUEUE_CHUNKS_PER_WORKER: usize = 2;

// === Identifier tags ===

/// Segments in a valid identifier tag: version, env, farm, farm role, server.
pub const IDENTIFIER_SEGMENTS: usize = 5;

/// Separator between identifier tag segments.
pub const IDENTIFIER_SEPARATOR: char = ':';
