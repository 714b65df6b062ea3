//! slides_ingest tool implementation.
//!
//! Feeds a batch of candidates through the server's shared ingestion
//! pipeline and reports one result per candidate, in input order.

use artarchive_core::{Candidate, Error, IngestRouter, IngestStatus};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

const MAX_CANDIDATES: usize = 1000;

/// Parameters for the slides_ingest tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SlidesIngestParams {
    /// Slides to insert or merge (max: 1000).
    pub candidates: Vec<Candidate>,
}

/// Outcome for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct IngestItem {
    /// Position of the candidate in the request.
    pub index: u64,
    pub guid_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IngestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub total: u32,
    pub inserted: u32,
    pub updated: u32,
    pub failed: u32,
}

/// Output from the slides_ingest tool.
#[derive(Debug, Clone, Serialize)]
pub struct SlidesIngestOutput {
    /// Results in input order.
    pub results: Vec<IngestItem>,
    pub summary: IngestSummary,
}

/// Implementation of the slides_ingest tool.
pub async fn ingest_impl(router: &IngestRouter, params: SlidesIngestParams) -> Result<CallToolResult, McpError> {
    if params.candidates.is_empty() {
        return Err(Error::InvalidInput("candidates cannot be empty".into()).into());
    }
    if params.candidates.len() > MAX_CANDIDATES {
        return Err(Error::InvalidInput(format!("at most {MAX_CANDIDATES} candidates per call")).into());
    }

    let total = params.candidates.len();
    let outcomes = router.ingest_batch(params.candidates).await?;

    let mut results = Vec::with_capacity(total);
    let mut summary = IngestSummary { total: total as u32, ..Default::default() };

    for (index, outcome) in outcomes.into_iter().enumerate() {
        let (status, error) = match outcome.result {
            Ok(status) => {
                match status {
                    IngestStatus::Inserted => summary.inserted += 1,
                    IngestStatus::Updated => summary.updated += 1,
                }
                (Some(status), None)
            }
            Err(e) => {
                summary.failed += 1;
                (None, Some(e.to_string()))
            }
        };
        results.push(IngestItem { index: index as u64, guid_hash: outcome.guid_hash, status, error });
    }

    tracing::info!(
        total = summary.total,
        inserted = summary.inserted,
        updated = summary.updated,
        failed = summary.failed,
        "ingested batch"
    );
    json_result(&SlidesIngestOutput { results, summary })
}
