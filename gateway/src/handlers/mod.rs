//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `conversations` - Text chat bridged to a Direct Line bot
//! - `realtime` - Realtime voice relay WebSocket

pub mod api;
pub mod conversations;
pub mod realtime;

// Re-export commonly used handlers for convenient access
pub use realtime::realtime_handler;
