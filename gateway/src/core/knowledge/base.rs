//! Knowledge base abstraction used by the search tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum number of documents returned by one lookup.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Errors raised by a knowledge base lookup.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request never produced a response
    #[error("Search request failed: {0}")]
    Transport(String),

    /// The index answered with a non-2xx status
    #[error("Search request returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a search result set
    #[error("Failed to decode search response: {0}")]
    Decode(String),

    /// The tool arguments carried no usable query
    #[error("Invalid search arguments: {0}")]
    InvalidArguments(String),

    /// No knowledge base is configured
    #[error("Knowledge base not configured")]
    NotConfigured,
}

/// Result type for knowledge base lookups.
pub type SearchResult<T> = Result<T, SearchError>;

/// One document projected from a search hit.
///
/// Missing fields serialize as `null` so every item has the same keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: Value,
    pub content: Value,
    pub id: Value,
}

/// A searchable document index.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Run one query, returning hits in relevance order.
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchResultItem>>;
}
