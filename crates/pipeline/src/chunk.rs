//! Chunked row delivery.
//!
//! [`ChunkProducer`] reads a CSV lazily and groups rows into ordered chunks.
//! [`ChunkQueue`] hands those chunks to any number of workers through a
//! bounded channel: each chunk is received by exactly one worker, and a
//! closed, drained channel is the end-of-stream signal.

use std::io::Read;

use billing_core::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use csv::{ByteRecord, ByteRecordsIntoIter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An ordered batch of rows from one CSV file.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based position of this chunk in the file
    pub sequence: usize,
    pub rows: Vec<ByteRecord>,
}

/// Splits the data rows of a CSV reader into chunks of `chunk_size`.
///
/// The header must already be consumed by the reader. Rows stay raw bytes so
/// a stray encoding in one column cannot fail the file. A read error is
/// yielded once and ends the sequence.
pub struct ChunkProducer<R> {
    records: ByteRecordsIntoIter<R>,
    chunk_size: usize,
    next_sequence: usize,
    finished: bool,
}

impl<R: Read> ChunkProducer<R> {
    pub fn new(reader: csv::Reader<R>, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be at least 1"));
        }

        Ok(Self {
            records: reader.into_byte_records(),
            chunk_size,
            next_sequence: 0,
            finished: false,
        })
    }
}

impl<R: Read> Iterator for ChunkProducer<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut rows = Vec::with_capacity(self.chunk_size);
        while rows.len() < self.chunk_size {
            match self.records.next() {
                Some(Ok(record)) => rows.push(record),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if rows.is_empty() {
            return None;
        }

        let chunk = Chunk {
            sequence: self.next_sequence,
            rows,
        };
        self.next_sequence += 1;
        Some(Ok(chunk))
    }
}

/// Sending half of a chunk queue.
pub struct ChunkFeeder {
    sender: Sender<Result<Chunk>>,
}

/// Receiving half of a chunk queue, cloned once per worker.
#[derive(Clone)]
pub struct ChunkQueue {
    receiver: Receiver<Result<Chunk>>,
}

impl ChunkQueue {
    /// Creates a queue holding at most `capacity` undelivered chunks.
    pub fn bounded(capacity: usize) -> (ChunkFeeder, ChunkQueue) {
        let (sender, receiver) = bounded(capacity.max(1));
        (ChunkFeeder { sender }, ChunkQueue { receiver })
    }

    /// Blocks until a chunk is available.
    ///
    /// Returns `None` once the feeder is gone and every chunk was taken.
    pub fn fetch(&self) -> Option<Result<Chunk>> {
        self.receiver.recv().ok()
    }
}

impl ChunkFeeder {
    /// Drives `producer` to exhaustion, enqueueing every chunk.
    ///
    /// Stops early when cancelled or when every worker has hung up. Returns the
    /// number of chunks enqueued. Dropping the feeder on return closes the queue.
    pub fn feed<R: Read>(self, producer: ChunkProducer<R>, cancel: &CancellationToken) -> usize {
        let mut sent = 0;

        for item in producer {
            if cancel.is_cancelled() {
                debug!(sent, "Chunk feeder cancelled");
                break;
            }

            let failed = item.is_err();
            if self.sender.send(item).is_err() {
                debug!(sent, "All workers gone, chunk feeder stopping");
                break;
            }
            if failed {
                break;
            }
            sent += 1;
        }

        sent
    }
}
