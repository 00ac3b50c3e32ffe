//! Azure AI Search client.
//!
//! Issues one semantic query per lookup against
//! `{endpoint}/indexes/{index}/docs/search`, optionally adding a text vector
//! query against the configured embedding field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::base::{KnowledgeBase, MAX_SEARCH_RESULTS, SearchError, SearchResult, SearchResultItem};

/// Default Azure AI Search REST API version.
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";

/// Azure AI Search connection and index field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Service endpoint, e.g. `https://my-search.search.windows.net`
    pub endpoint: String,
    pub index: String,
    pub api_key: String,
    pub semantic_configuration: String,
    pub identifier_field: String,
    pub title_field: String,
    pub content_field: String,
    pub embedding_field: String,
    /// Add a text vector query alongside the semantic query
    pub use_vector_query: bool,
    pub api_version: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index: String::new(),
            api_key: String::new(),
            semantic_configuration: "default".to_string(),
            identifier_field: "id".to_string(),
            title_field: "title".to_string(),
            content_field: "content".to_string(),
            embedding_field: "embedding".to_string(),
            use_vector_query: false,
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
        }
    }
}

/// Request body for the docs/search endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,
    pub select: String,
    pub top: usize,
    pub search_mode: &'static str,
    pub query_type: &'static str,
    pub semantic_configuration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_queries: Option<Vec<VectorQuery>>,
}

/// Text vector query, vectorized by the index.
#[derive(Debug, Serialize)]
pub struct VectorQuery {
    pub kind: &'static str,
    pub text: String,
    pub fields: String,
    pub k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<Map<String, Value>>,
}

/// Knowledge base backed by an Azure AI Search index.
pub struct AzureSearchClient {
    config: SearchConfig,
    client: reqwest::Client,
}

impl AzureSearchClient {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Full URL of the docs/search endpoint.
    pub fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index,
            self.config.api_version
        )
    }

    /// Build the request body for a query.
    pub fn build_request(&self, query: &str) -> SearchRequest {
        let vector_queries = self.config.use_vector_query.then(|| {
            vec![VectorQuery {
                kind: "text",
                text: query.to_string(),
                fields: self.config.embedding_field.clone(),
                k: MAX_SEARCH_RESULTS,
            }]
        });

        SearchRequest {
            search: query.to_string(),
            select: [
                self.config.title_field.as_str(),
                self.config.content_field.as_str(),
                self.config.identifier_field.as_str(),
            ]
            .join(","),
            top: MAX_SEARCH_RESULTS,
            search_mode: "any",
            query_type: "semantic",
            semantic_configuration: self.config.semantic_configuration.clone(),
            vector_queries,
        }
    }

    fn project(&self, mut hit: Map<String, Value>) -> SearchResultItem {
        SearchResultItem {
            title: hit.remove(&self.config.title_field).unwrap_or(Value::Null),
            content: hit.remove(&self.config.content_field).unwrap_or(Value::Null),
            id: hit.remove(&self.config.identifier_field).unwrap_or(Value::Null),
        }
    }
}

#[async_trait]
impl KnowledgeBase for AzureSearchClient {
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchResultItem>> {
        let url = self.search_url();
        debug!(index = %self.config.index, query, "Knowledge base search");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&self.build_request(query))
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let results: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(results
            .value
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|hit| self.project(hit))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str) -> SearchConfig {
        SearchConfig {
            endpoint: endpoint.to_string(),
            index: "docs".to_string(),
            api_key: "search-key".to_string(),
            semantic_configuration: "semantic-default".to_string(),
            identifier_field: "content_id".to_string(),
            title_field: "document_title".to_string(),
            content_field: "content_text".to_string(),
            embedding_field: "content_embedding".to_string(),
            use_vector_query: false,
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
        }
    }

    #[test]
    fn test_search_url_trims_trailing_slash() {
        let client = AzureSearchClient::new(test_config("https://search.example.net/"));
        assert_eq!(
            client.search_url(),
            "https://search.example.net/indexes/docs/docs/search?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_request_body_without_vectors() {
        let client = AzureSearchClient::new(test_config("https://search.example.net"));
        let body = serde_json::to_value(client.build_request("refund policy")).unwrap();

        assert_eq!(
            body,
            json!({
                "search": "refund policy",
                "select": "document_title,content_text,content_id",
                "top": 5,
                "searchMode": "any",
                "queryType": "semantic",
                "semanticConfiguration": "semantic-default"
            })
        );
    }

    #[test]
    fn test_request_body_with_vectors() {
        let mut config = test_config("https://search.example.net");
        config.use_vector_query = true;
        let client = AzureSearchClient::new(config);
        let body = serde_json::to_value(client.build_request("refund policy")).unwrap();

        assert_eq!(
            body["vectorQueries"],
            json!([{
                "kind": "text",
                "text": "refund policy",
                "fields": "content_embedding",
                "k": 5
            }])
        );
    }

    #[tokio::test]
    async fn test_search_projects_configured_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/docs/docs/search"))
            .and(query_param("api-version", "2023-11-01"))
            .and(header("api-key", "search-key"))
            .and(body_json(json!({
                "search": "hours",
                "select": "document_title,content_text,content_id",
                "top": 5,
                "searchMode": "any",
                "queryType": "semantic",
                "semanticConfiguration": "semantic-default"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"@search.score": 2.1, "document_title": "Hours", "content_text": "9 to 5", "content_id": "a1"},
                    {"@search.score": 1.2, "document_title": "Holidays", "content_id": "a2"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        let results = client.search("hours").await.unwrap();

        assert_eq!(
            results,
            vec![
                SearchResultItem {
                    title: json!("Hours"),
                    content: json!("9 to 5"),
                    id: json!("a1"),
                },
                SearchResultItem {
                    title: json!("Holidays"),
                    content: Value::Null,
                    id: json!("a2"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let server = MockServer::start().await;
        let hits: Vec<Value> = (0..8)
            .map(|i| json!({"document_title": format!("t{i}"), "content_text": "c", "content_id": i}))
            .collect();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": hits })))
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        let results = client.search("anything").await.unwrap();
        assert_eq!(results.len(), MAX_SEARCH_RESULTS);
        assert_eq!(results[0].title, json!("t0"));
    }

    #[tokio::test]
    async fn test_search_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        match client.search("hours").await {
            Err(SearchError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_transport_failure() {
        // Nothing listens on port 9 locally.
        let client = AzureSearchClient::new(test_config("http://127.0.0.1:9"));
        assert!(matches!(
            client.search("hours").await,
            Err(SearchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_search_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        assert!(matches!(
            client.search("hours").await,
            Err(SearchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_search_body_without_value_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"@odata.count": 0})))
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        assert!(matches!(
            client.search("hours").await,
            Err(SearchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_search_waits_for_slow_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": [{"content_id": "slow"}]}))
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = AzureSearchClient::new(test_config(&server.uri()));
        let results = client.search("hours").await.unwrap();
        assert_eq!(results[0].id, json!("slow"));
    }
}
