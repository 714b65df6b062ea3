//! Bounded ingestion pipeline.
//!
//! Producers submit [`Candidate`]s; a fixed pool of workers validates them,
//! merges them into the stored slide with the same GUID hash and upserts the
//! result. Every submission yields exactly one [`Outcome`] on the outcome
//! channel.
//!
//! ### Capacity and backpressure
//! - Each worker owns a bounded queue of `queue_capacity` submissions, so at
//!   most `workers × queue_capacity` candidates wait in memory.
//! - A producer is pinned to one worker queue. `submit` suspends while that
//!   queue is full; candidates are never dropped.
//! - The outcome channel is bounded too: a caller that stops reading
//!   eventually stalls the workers and, through them, the producers.
//!
//! ### Ordering
//! - Outcomes of one producer arrive in submission order, and its upserts are
//!   applied in that order.
//! - Producers sharing the pipeline are not ordered relative to each other;
//!   concurrent writes to one GUID hash are last-writer-wins.
//!
//! ### Fan-out
//! A [`FanOut`] holds one producer per worker and routes each candidate by
//! its GUID hash, so one caller keeps every worker busy while writes to the
//! same slide stay in submission order. [`IngestRouter`] shares one
//! long-lived pipeline between many callers and hands each batch back only
//! its own outcomes.
//!
//! ### Shutdown
//! Dropping every [`Producer`] and the [`Pipeline`] closes the queues. Workers
//! drain what is queued, then exit, which closes the outcome channel.

mod router;
mod worker;

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Error;
use crate::slide::{Candidate, compute_guid_hash};
use crate::store::SlideDb;

pub use router::IngestRouter;
pub use worker::ingest;

/// Sizing of the worker pool and its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Bounded queue length per worker.
    pub queue_capacity: usize,
    /// Bounded length of the outcome channel.
    pub outcome_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4, queue_capacity: 32, outcome_capacity: 128 }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("workers", self.workers),
            ("queue_capacity", self.queue_capacity),
            ("outcome_capacity", self.outcome_capacity),
        ] {
            if value == 0 {
                return Err(Error::InvalidInput(format!("pipeline {field} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// How a candidate landed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// No slide had this GUID hash; a new one was created.
    Inserted,
    /// The candidate was merged into an existing slide.
    Updated,
}

/// Result of processing one submitted candidate.
#[derive(Debug)]
pub struct Outcome {
    /// Producer that submitted the candidate.
    pub producer: u64,
    /// Position of the candidate in its producer's submissions, from 0.
    pub sequence: u64,
    /// Identity key of the candidate; empty if it was rejected before one
    /// could be determined.
    pub guid_hash: String,
    pub result: Result<IngestStatus, Error>,
}

struct Submission {
    producer: u64,
    sequence: u64,
    candidate: Candidate,
}

/// Handle to a running pipeline. Hands out producers.
pub struct Pipeline {
    queues: Vec<mpsc::Sender<Submission>>,
    workers: Vec<JoinHandle<()>>,
    next_producer: AtomicU64,
}

impl Pipeline {
    /// Start the worker pool.
    ///
    /// Returns the pipeline handle and the receiving end of the outcome
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any of the sizes in `config` is zero.
    pub fn spawn(db: SlideDb, config: PipelineConfig) -> Result<(Self, mpsc::Receiver<Outcome>), Error> {
        config.validate()?;

        let (outcome_tx, outcome_rx) = mpsc::channel(config.outcome_capacity);
        let mut queues = Vec::with_capacity(config.workers);
        let mut workers = Vec::with_capacity(config.workers);

        for id in 0..config.workers {
            let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
            queues.push(queue_tx);
            workers.push(tokio::spawn(worker::run(id, db.clone(), queue_rx, outcome_tx.clone())));
        }

        tracing::info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            outcome_capacity = config.outcome_capacity,
            "ingestion pipeline started"
        );

        Ok((Self { queues, workers, next_producer: AtomicU64::new(0) }, outcome_rx))
    }

    /// Create a new producer with its own ordering stream.
    pub fn producer(&self) -> Producer {
        let id = self.next_producer.fetch_add(1, Ordering::Relaxed);
        self.producer_with_id(id)
    }

    /// Create one producer per worker.
    ///
    /// The ids are allocated as one block, so each producer is pinned to a
    /// different worker.
    pub fn fan_out(&self) -> FanOut {
        let workers = self.queues.len() as u64;
        let first = self.next_producer.fetch_add(workers, Ordering::Relaxed);
        let producers = (first..first + workers).map(|id| self.producer_with_id(id)).collect();
        FanOut { producers }
    }

    fn producer_with_id(&self, id: u64) -> Producer {
        let queue = self.queues[(id % self.queues.len() as u64) as usize].clone();
        Producer { id, queue, next_sequence: 0 }
    }

    /// Close the pipeline's own queue handles and wait for every worker to
    /// finish draining.
    ///
    /// Workers only finish once every [`Producer`] has been dropped as well.
    pub async fn join(self) {
        let Self { queues, workers, .. } = self;
        drop(queues);
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "ingestion worker panicked");
            }
        }
    }
}

/// Submits candidates to one worker queue, preserving their order.
pub struct Producer {
    id: u64,
    queue: mpsc::Sender<Submission>,
    next_sequence: u64,
}

impl Producer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a candidate, waiting while the queue is full.
    ///
    /// Returns the candidate's sequence number within this producer.
    /// Cancelling the returned future before it completes leaves the
    /// candidate unsubmitted and the sequence unused.
    ///
    /// # Errors
    ///
    /// Returns `Error::PipelineClosed` if the workers have exited.
    pub async fn submit(&mut self, candidate: Candidate) -> Result<u64, Error> {
        let sequence = self.next_sequence;
        self.queue
            .send(Submission { producer: self.id, sequence, candidate })
            .await
            .map_err(|_| Error::PipelineClosed)?;
        self.next_sequence += 1;
        Ok(sequence)
    }
}

/// Producers spanning every worker of a pipeline.
///
/// Candidates with the same GUID hash always go through the same producer,
/// so their outcomes and upserts keep submission order. Distinct slides are
/// written in parallel.
pub struct FanOut {
    producers: Vec<Producer>,
}

impl FanOut {
    /// Ids of the producers, one per worker.
    pub fn ids(&self) -> Vec<u64> {
        self.producers.iter().map(Producer::id).collect()
    }

    /// Queue a candidate on the producer that owns its GUID hash.
    ///
    /// Returns the `(producer, sequence)` pair its [`Outcome`] will carry.
    ///
    /// # Errors
    ///
    /// Returns `Error::PipelineClosed` if the workers have exited.
    pub async fn submit(&mut self, candidate: Candidate) -> Result<(u64, u64), Error> {
        let index = route(&candidate, self.producers.len());
        let producer = &mut self.producers[index];
        let sequence = producer.submit(candidate).await?;
        Ok((producer.id, sequence))
    }
}

/// Pick a producer slot from the GUID hash the worker will resolve.
fn route(candidate: &Candidate, slots: usize) -> usize {
    let key = match candidate.guid_hash.as_deref().map(str::trim).filter(|guid| !guid.is_empty()) {
        Some(guid) => guid.to_string(),
        None => compute_guid_hash(&candidate.site, &candidate.page),
    };
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % slots as u64) as usize
}
