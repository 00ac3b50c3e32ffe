use super::ConfigError;
use super::utils::{env_var, parse_env, parse_env_bool};

/// Raw values read from the process environment.
///
/// Nothing here is defaulted; [`super::merge::merge_config`] layers YAML on
/// top and fills in defaults.
#[derive(Debug, Default)]
pub(crate) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,

    pub tls_enabled: Option<bool>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    pub realtime_endpoint: Option<String>,
    pub realtime_api_key: Option<String>,
    pub realtime_deployment: Option<String>,
    pub realtime_api_version: Option<String>,
    pub realtime_voice: Option<String>,
    pub realtime_instructions: Option<String>,
    pub realtime_transcription_model: Option<String>,
    pub realtime_respond_after_tool_call: Option<bool>,

    pub search_endpoint: Option<String>,
    pub search_index: Option<String>,
    pub search_api_key: Option<String>,
    pub search_semantic_configuration: Option<String>,
    pub search_identifier_field: Option<String>,
    pub search_title_field: Option<String>,
    pub search_content_field: Option<String>,
    pub search_embedding_field: Option<String>,
    pub search_use_vector_query: Option<bool>,

    pub direct_line_token: Option<String>,
    pub direct_line_base_url: Option<String>,

    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl EnvConfig {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_var("HOST"),
            port: parse_env("PORT")?,

            tls_enabled: parse_env_bool("TLS_ENABLED")?,
            tls_cert_path: env_var("TLS_CERT_PATH"),
            tls_key_path: env_var("TLS_KEY_PATH"),

            realtime_endpoint: env_var("AZURE_OPENAI_ENDPOINT"),
            realtime_api_key: env_var("AZURE_OPENAI_API_KEY"),
            realtime_deployment: env_var("AZURE_OPENAI_REALTIME_DEPLOYMENT"),
            realtime_api_version: env_var("AZURE_OPENAI_REALTIME_API_VERSION"),
            realtime_voice: env_var("AZURE_OPENAI_REALTIME_VOICE_CHOICE"),
            realtime_instructions: env_var("AZURE_OPENAI_REALTIME_INSTRUCTIONS"),
            realtime_transcription_model: env_var("AZURE_OPENAI_REALTIME_TRANSCRIPTION_MODEL"),
            realtime_respond_after_tool_call: parse_env_bool(
                "AZURE_OPENAI_REALTIME_RESPOND_AFTER_TOOL",
            )?,

            search_endpoint: env_var("AZURE_SEARCH_ENDPOINT"),
            search_index: env_var("AZURE_SEARCH_INDEX"),
            search_api_key: env_var("AZURE_SEARCH_API_KEY"),
            search_semantic_configuration: env_var("AZURE_SEARCH_SEMANTIC_CONFIGURATION"),
            search_identifier_field: env_var("AZURE_SEARCH_IDENTIFIER_FIELD"),
            search_title_field: env_var("AZURE_SEARCH_TITLE_FIELD"),
            search_content_field: env_var("AZURE_SEARCH_CONTENT_FIELD"),
            search_embedding_field: env_var("AZURE_SEARCH_EMBEDDING_FIELD"),
            search_use_vector_query: parse_env_bool("AZURE_SEARCH_USE_VECTOR_QUERY")?,

            direct_line_token: env_var("DIRECT_LINE_TOKEN"),
            direct_line_base_url: env_var("DIRECT_LINE_BASE_URL"),

            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")?,
            rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE")?,
            max_websocket_connections: parse_env("MAX_WEBSOCKET_CONNECTIONS")?,
            max_connections_per_ip: parse_env("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}
