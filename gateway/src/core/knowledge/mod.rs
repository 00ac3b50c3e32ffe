//! Knowledge base lookup for the realtime search tool.
//!
//! When the model finishes the arguments of a `search_knowledge_base` call,
//! the realtime session runs [`run_search_tool`] and returns its output to the
//! model as a `function_call_output` item.

mod azure_search;
mod base;
mod invoker;

pub use azure_search::{
    AzureSearchClient, DEFAULT_SEARCH_API_VERSION, SearchConfig, SearchRequest, VectorQuery,
};
pub use base::{KnowledgeBase, MAX_SEARCH_RESULTS, SearchError, SearchResult, SearchResultItem};
pub use invoker::{SEARCH_FAILURE_OUTPUT, SearchArguments, failure_output, run_search_tool};
