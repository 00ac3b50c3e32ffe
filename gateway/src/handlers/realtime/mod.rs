//! Browser realtime voice relay
//!
//! Each browser WebSocket on `/api/realtime` is paired with one upstream
//! Azure OpenAI Realtime session.
//!
//! # Protocol
//!
//! Both directions carry the upstream's own JSON events; the gateway does not
//! define a protocol of its own.
//!
//! ## Client → Server
//!
//! Every well-formed event (`input_audio_buffer.append`, `response.create`,
//! `response.cancel`, ...) is forwarded upstream byte for byte once the
//! upstream session is open.
//!
//! ## Server → Client
//!
//! Only session, input buffer, conversation item, response and `error` events
//! are forwarded. Tool call events stay inside the gateway, which answers
//! `search_knowledge_base` calls itself.
//!
//! If the upstream cannot be reached the browser receives a single `error`
//! event and the socket is left open for the browser to close.

mod relay;

pub use relay::{RelayState, realtime_handler, run_relay};
