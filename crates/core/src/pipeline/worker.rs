use tokio::sync::mpsc;

use super::{IngestStatus, Outcome, Submission};
use crate::Error;
use crate::slide::Candidate;
use crate::store::SlideDb;

pub(super) async fn run(
    id: usize, db: SlideDb, mut queue: mpsc::Receiver<Submission>, outcomes: mpsc::Sender<Outcome>,
) {
    let mut reporting = true;

    while let Some(Submission { producer, sequence, candidate }) = queue.recv().await {
        let (guid_hash, result) = ingest(&db, candidate).await;

        match &result {
            Ok(status) => tracing::debug!(worker = id, producer, sequence, guid_hash = %guid_hash, ?status, "ingested"),
            Err(e) => tracing::warn!(
                worker = id,
                producer,
                sequence,
                guid_hash = %guid_hash,
                code = e.code(),
                error = %e,
                "ingest failed"
            ),
        }

        if reporting && outcomes.send(Outcome { producer, sequence, guid_hash, result }).await.is_err() {
            // Keep writing; only the reports are lost.
            tracing::debug!(worker = id, "outcome receiver dropped");
            reporting = false;
        }
    }

    tracing::debug!(worker = id, "ingestion worker stopped");
}

/// Normalize, validate and merge one candidate into the store.
///
/// Returns the candidate's GUID hash alongside the result so failures can be
/// attributed. The hash is empty when the candidate was rejected before its
/// identity could be derived.
pub async fn ingest(db: &SlideDb, mut candidate: Candidate) -> (String, Result<IngestStatus, Error>) {
    candidate.normalize();

    if let Err(e) = candidate.validate() {
        return (candidate.guid_hash.unwrap_or_default(), Err(e));
    }

    let guid_hash = candidate.resolve_guid_hash();
    let result = merge_and_store(db, &guid_hash, candidate).await;
    (guid_hash, result)
}

async fn merge_and_store(db: &SlideDb, guid_hash: &str, candidate: Candidate) -> Result<IngestStatus, Error> {
    let (_, status) = db
        .modify_slide(guid_hash, move |stored| {
            Ok(match stored {
                Some(mut stored) => {
                    stored.merge(candidate);
                    (Some(stored), IngestStatus::Updated)
                }
                None => (Some(candidate.into_slide()), IngestStatus::Inserted),
            })
        })
        .await?;
    Ok(status)
}
