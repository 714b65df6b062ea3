use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Outcome, Pipeline, PipelineConfig};
use crate::Error;
use crate::slide::Candidate;
use crate::store::SlideDb;

type Routes = Arc<Mutex<HashMap<u64, mpsc::Sender<Outcome>>>>;

fn lock(routes: &Routes) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<Outcome>>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A long-lived pipeline shared by many concurrent batches.
///
/// One task reads the pipeline's outcome channel and forwards each outcome
/// to the batch that owns its producer.
pub struct IngestRouter {
    pipeline: Pipeline,
    routes: Routes,
    outcome_capacity: usize,
    task: JoinHandle<()>,
}

impl IngestRouter {
    /// Start the worker pool and the outcome router.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any of the sizes in `config` is zero.
    pub fn spawn(db: SlideDb, config: PipelineConfig) -> Result<Self, Error> {
        let (pipeline, outcomes) = Pipeline::spawn(db, config)?;
        let routes = Routes::default();
        let task = tokio::spawn(forward(outcomes, routes.clone()));
        Ok(Self { pipeline, routes, outcome_capacity: config.outcome_capacity, task })
    }

    /// Ingest a batch through the shared workers.
    ///
    /// Candidates are spread over every worker by GUID hash. Returns one
    /// outcome per candidate, in input order.
    ///
    /// # Errors
    ///
    /// Returns `Error::PipelineClosed` if the workers exit before every
    /// candidate is accounted for.
    pub async fn ingest_batch(&self, candidates: Vec<Candidate>) -> Result<Vec<Outcome>, Error> {
        let total = candidates.len();
        let mut fan_out = self.pipeline.fan_out();
        let (tx, mut rx) = mpsc::channel(self.outcome_capacity);
        let _registration = Registration::new(&self.routes, fan_out.ids(), tx);

        let feeder = async move {
            let mut order = Vec::with_capacity(total);
            for candidate in candidates {
                order.push(fan_out.submit(candidate).await?);
            }
            Ok::<_, Error>(order)
        };
        tokio::pin!(feeder);

        // Outcomes are read while submitting, so a full queue never deadlocks.
        let mut order = None;
        let mut received = HashMap::with_capacity(total);
        while order.as_ref().is_none_or(|order: &Vec<(u64, u64)>| received.len() < order.len()) {
            tokio::select! {
                submitted = &mut feeder, if order.is_none() => order = Some(submitted?),
                outcome = rx.recv() => match outcome {
                    Some(outcome) => {
                        received.insert((outcome.producer, outcome.sequence), outcome);
                    }
                    None => return Err(Error::PipelineClosed),
                },
            }
        }

        order
            .unwrap_or_default()
            .into_iter()
            .map(|key| received.remove(&key).ok_or(Error::PipelineClosed))
            .collect()
    }

    /// Stop routing and wait for the workers to drain.
    pub async fn shutdown(self) {
        let Self { pipeline, task, .. } = self;
        pipeline.join().await;
        if let Err(e) = task.await {
            tracing::error!(error = %e, "outcome router panicked");
        }
    }
}

/// Routes a batch's producers to its channel until dropped.
struct Registration {
    routes: Routes,
    ids: Vec<u64>,
}

impl Registration {
    fn new(routes: &Routes, ids: Vec<u64>, tx: mpsc::Sender<Outcome>) -> Self {
        let mut table = lock(routes);
        for id in &ids {
            table.insert(*id, tx.clone());
        }
        Self { routes: routes.clone(), ids }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut table = lock(&self.routes);
        for id in &self.ids {
            table.remove(id);
        }
    }
}

async fn forward(mut outcomes: mpsc::Receiver<Outcome>, routes: Routes) {
    while let Some(outcome) = outcomes.recv().await {
        let route = lock(&routes).get(&outcome.producer).cloned();
        match route {
            Some(tx) => {
                if tx.send(outcome).await.is_err() {
                    tracing::debug!("batch finished before its outcome arrived");
                }
            }
            None => tracing::debug!(producer = outcome.producer, "outcome for an unrouted producer"),
        }
    }

    // Workers are gone; waiting batches see a closed channel.
    lock(&routes).clear();
    tracing::debug!("outcome router stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::IngestStatus;
    use crate::slide::{Page, Site};

    fn candidate(n: usize) -> Candidate {
        Candidate::new(Site::new("Blog", "http://b"), Page::new(format!("Post {n}"), format!("http://b/{n}")))
    }

    #[tokio::test]
    async fn test_batch_outcomes_in_input_order() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let router = IngestRouter::spawn(db.clone(), PipelineConfig::default()).unwrap();

        let batch = vec![candidate(1), Candidate { site: Site::default(), ..candidate(2) }, candidate(1), candidate(3)];
        let outcomes = router.ingest_batch(batch).await.unwrap();

        let guids: Vec<_> = outcomes.iter().map(|o| o.guid_hash.clone()).collect();
        assert_eq!(guids[0], candidate(1).resolve_guid_hash());
        assert_eq!(guids[3], candidate(3).resolve_guid_hash());
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &IngestStatus::Inserted);
        assert!(matches!(outcomes[1].result, Err(Error::InvalidCandidate(_))));
        assert_eq!(outcomes[2].result.as_ref().unwrap(), &IngestStatus::Updated);
        assert_eq!(db.count_slides().await.unwrap(), 2);

        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_batch_larger_than_queues() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let config = PipelineConfig { workers: 2, queue_capacity: 1, outcome_capacity: 1 };
        let router = IngestRouter::spawn(db.clone(), config).unwrap();

        let outcomes = router.ingest_batch((0..50).map(candidate).collect()).await.unwrap();
        assert_eq!(outcomes.len(), 50);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(db.count_slides().await.unwrap(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_get_their_own_outcomes() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let router = Arc::new(IngestRouter::spawn(db.clone(), PipelineConfig::default()).unwrap());

        let mut tasks = Vec::new();
        for b in 0..4 {
            let router = router.clone();
            tasks.push(tokio::spawn(async move {
                let batch: Vec<_> = (0..30).map(|n| candidate(b * 100 + n)).collect();
                let expected: Vec<_> = batch.iter().map(Candidate::resolve_guid_hash).collect();
                let outcomes = router.ingest_batch(batch).await.unwrap();
                let guids: Vec<_> = outcomes.into_iter().map(|o| o.guid_hash).collect();
                assert_eq!(guids, expected);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(db.count_slides().await.unwrap(), 120);
        assert!(lock(&router.routes).is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let db = SlideDb::open_in_memory().await.unwrap();
        let router = IngestRouter::spawn(db, PipelineConfig::default()).unwrap();
        assert!(router.ingest_batch(Vec::new()).await.unwrap().is_empty());
    }
}
