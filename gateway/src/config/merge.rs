use std::path::PathBuf;

use super::env::EnvConfig;
use super::validation;
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig, TlsConfig};
use crate::core::direct_line::{DIRECT_LINE_BASE_URL, DirectLineConfig};
use crate::core::knowledge::SearchConfig;
use crate::core::realtime::{
    DEFAULT_API_VERSION, DEFAULT_DEPLOYMENT, DEFAULT_INSTRUCTIONS, DEFAULT_TRANSCRIPTION_MODEL,
    DEFAULT_VOICE, RealtimeConfig,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;
const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// Merge environment values with an optional YAML overlay.
///
/// YAML values win over environment values; anything set in neither falls
/// back to its default.
pub(crate) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let tls_yaml = server.tls.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let search = yaml.search.unwrap_or_default();
    let direct_line = yaml.direct_line.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    // TLS
    let tls_enabled = tls_yaml.enabled.or(env.tls_enabled).unwrap_or(false);
    let cert_path = tls_yaml.cert_path.or(env.tls_cert_path);
    let key_path = tls_yaml.key_path.or(env.tls_key_path);
    validation::validate_tls(tls_enabled, &cert_path, &key_path)?;
    let tls = match (tls_enabled, cert_path, key_path) {
        (true, Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        _ => None,
    };

    let realtime = RealtimeConfig {
        endpoint: realtime
            .endpoint
            .or(env.realtime_endpoint)
            .unwrap_or_default(),
        api_key: realtime.api_key.or(env.realtime_api_key).unwrap_or_default(),
        deployment: realtime
            .deployment
            .or(env.realtime_deployment)
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
        api_version: realtime
            .api_version
            .or(env.realtime_api_version)
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        voice: realtime
            .voice
            .or(env.realtime_voice)
            .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        instructions: realtime
            .instructions
            .or(env.realtime_instructions)
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        transcription_model: realtime
            .transcription_model
            .or(env.realtime_transcription_model)
            .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        respond_after_tool_call: realtime
            .respond_after_tool_call
            .or(env.realtime_respond_after_tool_call)
            .unwrap_or(false),
    };

    // Search
    let search_endpoint = search.endpoint.or(env.search_endpoint);
    let search_index = search.index.or(env.search_index);
    let search_api_key = search.api_key.or(env.search_api_key);
    let search_enabled =
        validation::validate_search_credentials(&search_endpoint, &search_index, &search_api_key)?;
    let search = if search_enabled {
        let defaults = SearchConfig::default();
        Some(SearchConfig {
            endpoint: search_endpoint.unwrap_or_default(),
            index: search_index.unwrap_or_default(),
            api_key: search_api_key.unwrap_or_default(),
            semantic_configuration: search
                .semantic_configuration
                .or(env.search_semantic_configuration)
                .unwrap_or(defaults.semantic_configuration),
            identifier_field: search
                .identifier_field
                .or(env.search_identifier_field)
                .unwrap_or(defaults.identifier_field),
            title_field: search
                .title_field
                .or(env.search_title_field)
                .unwrap_or(defaults.title_field),
            content_field: search
                .content_field
                .or(env.search_content_field)
                .unwrap_or(defaults.content_field),
            embedding_field: search
                .embedding_field
                .or(env.search_embedding_field)
                .unwrap_or(defaults.embedding_field),
            use_vector_query: search
                .use_vector_query
                .or(env.search_use_vector_query)
                .unwrap_or(defaults.use_vector_query),
            api_version: defaults.api_version,
        })
    } else {
        None
    };

    // Direct Line
    let direct_line = direct_line
        .token
        .or(env.direct_line_token)
        .map(|token| DirectLineConfig {
            token,
            base_url: direct_line
                .base_url
                .or(env.direct_line_base_url)
                .unwrap_or_else(|| DIRECT_LINE_BASE_URL.to_string()),
        });

    let rate_limit_requests_per_second = security
        .rate_limit_requests_per_second
        .or(env.rate_limit_requests_per_second)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);
    let rate_limit_burst_size = security
        .rate_limit_burst_size
        .or(env.rate_limit_burst_size)
        .unwrap_or(DEFAULT_RATE_LIMIT_BURST);
    validation::validate_rate_limit(rate_limit_requests_per_second, rate_limit_burst_size)?;

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        tls,
        realtime,
        search,
        direct_line,
        cors_allowed_origins: security.cors_allowed_origins.or(env.cors_allowed_origins),
        rate_limit_requests_per_second,
        rate_limit_burst_size,
        max_websocket_connections: security
            .max_websocket_connections
            .or(env.max_websocket_connections),
        max_connections_per_ip: security
            .max_connections_per_ip
            .or(env.max_connections_per_ip)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    })
}
