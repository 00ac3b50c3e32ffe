//! Base types for the upstream realtime speech session.
//!
//! The upstream speaks the Azure OpenAI Realtime protocol: a single WebSocket
//! carrying JSON events, authenticated with an `api-key` header. Audio is
//! exchanged as base64 PCM 16-bit frames inside those events and is never
//! decoded by the gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the upstream failed before the socket opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Default realtime deployment name.
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-realtime-preview";

/// Default realtime API version.
pub const DEFAULT_API_VERSION: &str = "2024-10-01-preview";

/// Default output voice.
pub const DEFAULT_VOICE: &str = "alloy";

/// Default input transcription model.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default system instructions sent with every session.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful AI assistant. Use the provided Azure Search knowledge base to answer questions accurately.";

/// Configuration for the upstream realtime session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,

    /// API key sent in the `api-key` header
    pub api_key: String,

    /// Deployment name of the realtime model
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Realtime API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Voice ID for audio output
    #[serde(default = "default_voice")]
    pub voice: String,

    /// System instructions for the assistant
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Model used to transcribe user audio
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Ask the model for a new response after each tool output
    #[serde(default)]
    pub respond_after_tool_call: bool,
}

fn default_deployment() -> String {
    DEFAULT_DEPLOYMENT.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn default_transcription_model() -> String {
    DEFAULT_TRANSCRIPTION_MODEL.to_string()
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: default_deployment(),
            api_version: default_api_version(),
            voice: default_voice(),
            instructions: default_instructions(),
            transcription_model: default_transcription_model(),
            respond_after_tool_call: false,
        }
    }
}

impl RealtimeConfig {
    /// Check that the endpoint and API key are present.
    pub fn validate(&self) -> RealtimeResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "realtime endpoint is required".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "realtime API key is required".to_string(),
            ));
        }
        Ok(())
    }
}
