//! Realtime speech session plumbing.
//!
//! This module provides the pieces of the realtime voice relay:
//! - [`EventChannel`] - typed pub/sub over one WebSocket (browser or upstream)
//! - [`RealtimeSession`] - the upstream Azure OpenAI Realtime connection
//! - [`RealtimeEvent`] / [`EventKind`] - protocol events, known and unknown
//!
//! # Architecture
//!
//! Events are opaque JSON objects with a `type` field. Handlers are keyed by
//! [`EventKind`]; unknown types fall into [`EventKind::Unrecognized`] and are
//! still delivered. Only the events the gateway originates itself
//! (`session.update`, tool outputs) are built from typed messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatbridge_gateway::core::realtime::{EventKind, RealtimeEvent, RealtimeSession};
//!
//! let session = RealtimeSession::new(config, Some(knowledge))?;
//! session.on(EventKind::ResponseDone, |event| println!("{}", event.raw()));
//! session.connect().await?;
//! session.send_event(&RealtimeEvent::parse(r#"{"type":"response.create"}"#)?);
//! ```

mod base;
mod channel;
mod events;
pub mod messages;
mod session;

pub use base::{
    DEFAULT_API_VERSION, DEFAULT_DEPLOYMENT, DEFAULT_INSTRUCTIONS, DEFAULT_TRANSCRIPTION_MODEL,
    DEFAULT_VOICE, RealtimeConfig, RealtimeError, RealtimeResult,
};
pub use channel::{EventChannel, EventHandler, Frame, WsFrame};
pub use events::{EventError, EventKind, FORWARDED_UPSTREAM_EVENTS, RealtimeEvent};
pub use messages::{ClientEvent, SEARCH_TOOL_NAME, SessionConfig};
pub use session::{RealtimeSession, build_ws_url};
