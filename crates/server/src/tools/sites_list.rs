//! sites_list tool implementation.

use artarchive_core::{Archive, Site};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sites_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SitesListOutput {
    /// Distinct source sites, ordered by title then URL.
    pub sites: Vec<Site>,
}

/// Implementation of the sites_list tool.
pub async fn sites_list_impl(archive: &Archive) -> Result<CallToolResult, McpError> {
    let sites = archive.list_sites().await?.into_iter().collect();
    json_result(&SitesListOutput { sites })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{fixtures, output_json};

    #[tokio::test]
    async fn test_sites_deduplicated() {
        let archive = fixtures::archive().await;
        for n in 0..3 {
            archive.db().upsert_slide(&fixtures::candidate(n).into_slide()).await.unwrap();
        }

        let output = output_json(&sites_list_impl(&archive).await.unwrap());
        let sites = output["sites"].as_array().unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0]["url"], "http://b");
    }
}
