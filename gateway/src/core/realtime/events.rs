//! Realtime protocol events.
//!
//! Every frame on either socket is a JSON object with a string `type` field.
//! The gateway only interprets a handful of types; everything else is carried
//! through untouched. A parsed [`RealtimeEvent`] therefore keeps the exact
//! text it came from so that forwarding never re-encodes the payload.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised for payloads that are not valid realtime events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no string `type` field")]
    MissingType,
}

// =============================================================================
// Event kinds
// =============================================================================

/// Event types the gateway knows by name.
///
/// Anything else maps to [`EventKind::Unrecognized`] and is still dispatched
/// and forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Server events
    SessionCreated,
    SessionUpdated,
    InputAudioBufferCommitted,
    InputAudioBufferCleared,
    InputAudioBufferSpeechStarted,
    InputAudioBufferSpeechStopped,
    ConversationItemCreated,
    InputAudioTranscriptionCompleted,
    InputAudioTranscriptionFailed,
    ResponseCreated,
    ResponseOutputItemAdded,
    ResponseOutputItemDone,
    ResponseContentPartAdded,
    ResponseContentPartDone,
    ResponseTextDelta,
    ResponseTextDone,
    ResponseAudioTranscriptDelta,
    ResponseAudioTranscriptDone,
    ResponseAudioDelta,
    ResponseAudioDone,
    ResponseFunctionCallArgumentsDelta,
    ResponseFunctionCallArgumentsDone,
    ResponseDone,
    RateLimitsUpdated,
    Error,

    // Client events
    SessionUpdate,
    InputAudioBufferAppend,
    InputAudioBufferCommit,
    InputAudioBufferClear,
    ConversationItemCreate,
    ConversationItemTruncate,
    ConversationItemDelete,
    ResponseCreate,
    ResponseCancel,

    /// Any type string not listed above
    Unrecognized,
}

impl EventKind {
    /// All named kinds, excluding [`EventKind::Unrecognized`].
    pub const NAMED: [EventKind; 34] = [
        Self::SessionCreated,
        Self::SessionUpdated,
        Self::InputAudioBufferCommitted,
        Self::InputAudioBufferCleared,
        Self::InputAudioBufferSpeechStarted,
        Self::InputAudioBufferSpeechStopped,
        Self::ConversationItemCreated,
        Self::InputAudioTranscriptionCompleted,
        Self::InputAudioTranscriptionFailed,
        Self::ResponseCreated,
        Self::ResponseOutputItemAdded,
        Self::ResponseOutputItemDone,
        Self::ResponseContentPartAdded,
        Self::ResponseContentPartDone,
        Self::ResponseTextDelta,
        Self::ResponseTextDone,
        Self::ResponseAudioTranscriptDelta,
        Self::ResponseAudioTranscriptDone,
        Self::ResponseAudioDelta,
        Self::ResponseAudioDone,
        Self::ResponseFunctionCallArgumentsDelta,
        Self::ResponseFunctionCallArgumentsDone,
        Self::ResponseDone,
        Self::RateLimitsUpdated,
        Self::Error,
        Self::SessionUpdate,
        Self::InputAudioBufferAppend,
        Self::InputAudioBufferCommit,
        Self::InputAudioBufferClear,
        Self::ConversationItemCreate,
        Self::ConversationItemTruncate,
        Self::ConversationItemDelete,
        Self::ResponseCreate,
        Self::ResponseCancel,
    ];

    /// Wire name of the event type, `None` for [`EventKind::Unrecognized`].
    pub fn as_str(&self) -> Option<&'static str> {
        let name = match self {
            Self::SessionCreated => "session.created",
            Self::SessionUpdated => "session.updated",
            Self::InputAudioBufferCommitted => "input_audio_buffer.committed",
            Self::InputAudioBufferCleared => "input_audio_buffer.cleared",
            Self::InputAudioBufferSpeechStarted => "input_audio_buffer.speech_started",
            Self::InputAudioBufferSpeechStopped => "input_audio_buffer.speech_stopped",
            Self::ConversationItemCreated => "conversation.item.created",
            Self::InputAudioTranscriptionCompleted => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::InputAudioTranscriptionFailed => {
                "conversation.item.input_audio_transcription.failed"
            }
            Self::ResponseCreated => "response.created",
            Self::ResponseOutputItemAdded => "response.output_item.added",
            Self::ResponseOutputItemDone => "response.output_item.done",
            Self::ResponseContentPartAdded => "response.content_part.added",
            Self::ResponseContentPartDone => "response.content_part.done",
            Self::ResponseTextDelta => "response.text.delta",
            Self::ResponseTextDone => "response.text.done",
            Self::ResponseAudioTranscriptDelta => "response.audio_transcript.delta",
            Self::ResponseAudioTranscriptDone => "response.audio_transcript.done",
            Self::ResponseAudioDelta => "response.audio.delta",
            Self::ResponseAudioDone => "response.audio.done",
            Self::ResponseFunctionCallArgumentsDelta => "response.function_call_arguments.delta",
            Self::ResponseFunctionCallArgumentsDone => "response.function_call_arguments.done",
            Self::ResponseDone => "response.done",
            Self::RateLimitsUpdated => "rate_limits.updated",
            Self::Error => "error",
            Self::SessionUpdate => "session.update",
            Self::InputAudioBufferAppend => "input_audio_buffer.append",
            Self::InputAudioBufferCommit => "input_audio_buffer.commit",
            Self::InputAudioBufferClear => "input_audio_buffer.clear",
            Self::ConversationItemCreate => "conversation.item.create",
            Self::ConversationItemTruncate => "conversation.item.truncate",
            Self::ConversationItemDelete => "conversation.item.delete",
            Self::ResponseCreate => "response.create",
            Self::ResponseCancel => "response.cancel",
            Self::Unrecognized => return None,
        };
        Some(name)
    }

    /// Map a wire type string to its kind.
    pub fn from_type(event_type: &str) -> Self {
        Self::NAMED
            .iter()
            .copied()
            .find(|kind| kind.as_str() == Some(event_type))
            .unwrap_or(Self::Unrecognized)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("<unrecognized>"))
    }
}

/// Upstream event kinds relayed to the browser.
pub const FORWARDED_UPSTREAM_EVENTS: [EventKind; 15] = [
    EventKind::SessionCreated,
    EventKind::SessionUpdated,
    EventKind::InputAudioBufferCommitted,
    EventKind::InputAudioBufferCleared,
    EventKind::InputAudioBufferSpeechStarted,
    EventKind::InputAudioBufferSpeechStopped,
    EventKind::ConversationItemCreated,
    EventKind::InputAudioTranscriptionCompleted,
    EventKind::ResponseCreated,
    EventKind::ResponseOutputItemAdded,
    EventKind::ResponseContentPartAdded,
    EventKind::ResponseAudioTranscriptDelta,
    EventKind::ResponseAudioDelta,
    EventKind::ResponseDone,
    EventKind::Error,
];

// =============================================================================
// Events
// =============================================================================

/// A single realtime event.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    raw: String,
    fields: Map<String, Value>,
    kind: EventKind,
}

impl RealtimeEvent {
    /// Parse an event from a text frame, keeping the original text.
    pub fn parse(text: &str) -> Result<Self, EventError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| EventError::InvalidJson(e.to_string()))?;
        let fields = into_event_fields(value)?;
        let kind = EventKind::from_type(type_of(&fields)?);
        Ok(Self {
            raw: text.to_string(),
            fields,
            kind,
        })
    }

    /// Build an event from a JSON value. The text form is the compact encoding.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let fields = into_event_fields(value)?;
        let kind = EventKind::from_type(type_of(&fields)?);
        let raw = serde_json::to_string(&fields).map_err(|e| EventError::InvalidJson(e.to_string()))?;
        Ok(Self { raw, fields, kind })
    }

    /// The `type` field.
    pub fn event_type(&self) -> &str {
        // Presence was checked at construction.
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The named kind of this event.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The exact text this event was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// A top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A top-level string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// All top-level fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn into_event_fields(value: Value) -> Result<Map<String, Value>, EventError> {
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(EventError::NotAnObject),
    }
}

fn type_of(fields: &Map<String, Value>) -> Result<&str, EventError> {
    fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EventError::MissingType)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_through_wire_name() {
        for kind in EventKind::NAMED {
            let name = kind.as_str().unwrap();
            assert_eq!(EventKind::from_type(name), kind, "{name}");
        }
        assert_eq!(EventKind::Unrecognized.as_str(), None);
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        assert_eq!(
            EventKind::from_type("response.some_future_event"),
            EventKind::Unrecognized
        );
        assert_eq!(EventKind::from_type(""), EventKind::Unrecognized);
    }

    #[test]
    fn test_parse_keeps_raw_text() {
        let text = r#"{ "type" : "response.create",  "response": {"modalities": ["text"]} }"#;
        let event = RealtimeEvent::parse(text).unwrap();

        assert_eq!(event.raw(), text);
        assert_eq!(event.event_type(), "response.create");
        assert_eq!(event.kind(), EventKind::ResponseCreate);
        assert_eq!(event.get("response"), Some(&json!({"modalities": ["text"]})));
    }

    #[test]
    fn test_parse_unrecognized_type_is_kept() {
        let event = RealtimeEvent::parse(r#"{"type":"x.custom","n":1}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Unrecognized);
        assert_eq!(event.event_type(), "x.custom");
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        assert!(matches!(
            RealtimeEvent::parse("not json"),
            Err(EventError::InvalidJson(_))
        ));
        assert_eq!(
            RealtimeEvent::parse("[1, 2]"),
            Err(EventError::NotAnObject)
        );
        assert_eq!(
            RealtimeEvent::parse(r#"{"event": "x"}"#),
            Err(EventError::MissingType)
        );
        assert_eq!(
            RealtimeEvent::parse(r#"{"type": 5}"#),
            Err(EventError::MissingType)
        );
    }

    #[test]
    fn test_from_value_encodes_compactly() {
        let event = RealtimeEvent::from_value(json!({"type": "response.cancel"})).unwrap();
        assert_eq!(event.raw(), r#"{"type":"response.cancel"}"#);
        assert_eq!(event.kind(), EventKind::ResponseCancel);

        assert_eq!(
            RealtimeEvent::from_value(json!("session.update")),
            Err(EventError::NotAnObject)
        );
    }

    #[test]
    fn test_forwarded_events_exclude_function_call_completion() {
        assert!(!FORWARDED_UPSTREAM_EVENTS.contains(&EventKind::ResponseFunctionCallArgumentsDone));
        assert!(FORWARDED_UPSTREAM_EVENTS.contains(&EventKind::SessionCreated));
        assert!(FORWARDED_UPSTREAM_EVENTS.contains(&EventKind::Error));
        assert!(!FORWARDED_UPSTREAM_EVENTS.contains(&EventKind::Unrecognized));
    }
}
