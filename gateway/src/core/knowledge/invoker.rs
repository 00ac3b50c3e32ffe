//! Runs the knowledge search tool for a completed function call.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::base::{KnowledgeBase, SearchError, SearchResult, SearchResultItem};

/// Output sent back to the model when the lookup fails.
pub const SEARCH_FAILURE_OUTPUT: &str = "Failed to search knowledge base";

/// Arguments of the `search_knowledge_base` tool.
#[derive(Debug, Deserialize)]
pub struct SearchArguments {
    pub query: String,
}

impl SearchArguments {
    /// Decode the JSON-encoded arguments string of a function call.
    pub fn parse(arguments: &str) -> SearchResult<Self> {
        let args: Self = serde_json::from_str(arguments)
            .map_err(|e| SearchError::InvalidArguments(e.to_string()))?;
        if args.query.trim().is_empty() {
            return Err(SearchError::InvalidArguments("empty query".to_string()));
        }
        Ok(args)
    }
}

/// Run a lookup and return the tool output string.
///
/// Success yields the JSON array of results; any failure yields
/// `{"error":"Failed to search knowledge base"}`. Errors never escape.
pub async fn run_search_tool(
    knowledge: Option<&dyn KnowledgeBase>,
    call_id: &str,
    arguments: &str,
) -> String {
    match search(knowledge, arguments).await {
        Ok(results) => {
            info!(call_id, results = results.len(), "Knowledge base search completed");
            encode_results(&results)
        }
        Err(e) => {
            warn!(call_id, error = %e, "Knowledge base search failed");
            failure_output()
        }
    }
}

async fn search(
    knowledge: Option<&dyn KnowledgeBase>,
    arguments: &str,
) -> SearchResult<Vec<SearchResultItem>> {
    let knowledge = knowledge.ok_or(SearchError::NotConfigured)?;
    let args = SearchArguments::parse(arguments)?;
    knowledge.search(&args.query).await
}

fn encode_results(results: &[SearchResultItem]) -> String {
    serde_json::to_string(results).unwrap_or_else(|_| failure_output())
}

/// The error marker payload.
pub fn failure_output() -> String {
    json!({ "error": SEARCH_FAILURE_OUTPUT }).to_string()
}
