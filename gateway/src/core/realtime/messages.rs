//! Outbound realtime message types.
//!
//! The gateway originates only three client events of its own:
//! - session.update - Sent once when the upstream socket opens
//! - conversation.item.create - Carries a `function_call_output` item
//! - response.create - Optional follow-up after a tool output
//!
//! Everything else the browser sends is forwarded as-is and never decoded
//! into these types.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::base::{RealtimeConfig, RealtimeError, RealtimeResult};
use super::events::RealtimeEvent;

/// Name of the knowledge lookup tool exposed to the model.
pub const SEARCH_TOOL_NAME: &str = "search_knowledge_base";

/// Audio format used in both directions.
pub const AUDIO_FORMAT_PCM16: &str = "pcm16";

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    pub modalities: Vec<String>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    pub input_audio_format: String,

    pub output_audio_format: String,

    /// Input audio transcription configuration
    pub input_audio_transcription: InputAudioTranscription,

    /// Turn detection configuration
    pub turn_detection: TurnDetection,

    /// Tool definitions
    pub tools: Vec<ToolDef>,

    /// Tool choice strategy
    pub tool_choice: String,
}

impl SessionConfig {
    /// Build the session configuration for a realtime deployment.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: config.instructions.clone(),
            voice: config.voice.clone(),
            input_audio_format: AUDIO_FORMAT_PCM16.to_string(),
            output_audio_format: AUDIO_FORMAT_PCM16.to_string(),
            input_audio_transcription: InputAudioTranscription {
                model: config.transcription_model.clone(),
            },
            turn_detection: TurnDetection::default(),
            tools: vec![ToolDef::search_knowledge_base()],
            tool_choice: "auto".to_string(),
        }
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        threshold: f32,
        /// Audio prefix padding in ms
        prefix_padding_ms: u32,
        /// Silence duration in ms
        silence_duration_ms: u32,
    },
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self::ServerVad {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 200,
        }
    }
}

/// Tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// Function parameters JSON schema
    pub parameters: serde_json::Value,
}

impl ToolDef {
    /// The knowledge base search tool.
    pub fn search_knowledge_base() -> Self {
        Self {
            tool_type: "function".to_string(),
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search the Azure AI Search knowledge base for relevant information"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to find relevant information"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item created by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversationItem {
    /// Result of a function call, as a JSON-encoded string
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
}

// =============================================================================
// Client Events (sent upstream)
// =============================================================================

/// Client events originated by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Tool output event for a completed function call.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.into(),
                output: output.into(),
            },
        }
    }

    /// Encode as a wire event.
    pub fn to_event(&self) -> RealtimeResult<RealtimeEvent> {
        let value = serde_json::to_value(self)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        RealtimeEvent::from_value(value).map_err(|e| RealtimeError::SerializationError(e.to_string()))
    }
}
