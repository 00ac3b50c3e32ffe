use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   tls:
///     enabled: true
///     cert_path: "/etc/chatbridge/cert.pem"
///     key_path: "/etc/chatbridge/key.pem"
///
/// realtime:
///   endpoint: "https://my-resource.openai.azure.com"
///   api_key: "your-azure-openai-key"
///   deployment: "gpt-4o-realtime-preview"
///   api_version: "2024-10-01-preview"
///   voice: "alloy"
///   respond_after_tool_call: false
///
/// search:
///   endpoint: "https://my-search.search.windows.net"
///   index: "knowledge"
///   api_key: "your-search-key"
///   semantic_configuration: "default"
///   content_field: "chunk"
///
/// direct_line:
///   token: "your-direct-line-secret"
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   max_connections_per_ip: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub search: Option<SearchYaml>,
    pub direct_line: Option<DirectLineYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Azure OpenAI Realtime settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub transcription_model: Option<String>,
    /// Ask the model for a new response after each tool output
    pub respond_after_tool_call: Option<bool>,
}

/// Azure AI Search settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SearchYaml {
    pub endpoint: Option<String>,
    pub index: Option<String>,
    pub api_key: Option<String>,
    pub semantic_configuration: Option<String>,
    pub identifier_field: Option<String>,
    pub title_field: Option<String>,
    pub content_field: Option<String>,
    pub embedding_field: Option<String>,
    pub use_vector_query: Option<bool>,
}

/// Direct Line settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DirectLineYaml {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// `*`, a comma separated list of origins, or unset for same-origin only
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: YamlConfig =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }
}
