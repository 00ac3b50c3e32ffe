//! Upstream Azure OpenAI Realtime session.
//!
//! # API Reference
//!
//! - Endpoint: `wss://{resource}/openai/realtime?api-version=<version>&deployment=<deployment>`
//! - Headers: `api-key`, `OpenAI-Beta: realtime=v1`
//! - Protocol: WebSocket with JSON events
//!
//! The session sends exactly one `session.update` when the socket opens and
//! then lets callers exchange events through [`RealtimeSession::send_event`]
//! and [`RealtimeSession::on`]. Completed `search_knowledge_base` calls are
//! answered by the session itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatbridge_gateway::core::realtime::{EventKind, RealtimeConfig, RealtimeSession};
//!
//! let session = RealtimeSession::new(config, None)?;
//! session.on(EventKind::ResponseAudioTranscriptDelta, |event| {
//!     println!("{}", event.get_str("delta").unwrap_or_default());
//! });
//! session.connect().await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, info, warn};
use url::Url;

use super::base::{RealtimeConfig, RealtimeError, RealtimeResult};
use super::channel::EventChannel;
use super::events::{EventKind, RealtimeEvent};
use super::messages::{ClientEvent, SEARCH_TOOL_NAME, SessionConfig};
use crate::core::knowledge::{KnowledgeBase, run_search_tool};

/// Build the upstream WebSocket URL for a realtime deployment.
///
/// `https` endpoints map to `wss`, `http` to `ws`; a bare host is treated as
/// `wss`.
pub fn build_ws_url(config: &RealtimeConfig) -> RealtimeResult<Url> {
    let endpoint = config.endpoint.trim().trim_end_matches('/');
    let with_scheme = if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if endpoint.starts_with("wss://") || endpoint.starts_with("ws://") {
        endpoint.to_string()
    } else {
        format!("wss://{endpoint}")
    };

    let mut url = Url::parse(&format!("{with_scheme}/openai/realtime"))
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("invalid endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("api-version", &config.api_version)
        .append_pair("deployment", &config.deployment);
    Ok(url)
}

/// One upstream realtime connection.
pub struct RealtimeSession {
    config: RealtimeConfig,
    channel: EventChannel,
}

impl RealtimeSession {
    /// Create a session and register the knowledge lookup handlers.
    ///
    /// Nothing is opened until [`connect`](Self::connect).
    pub fn new(
        config: RealtimeConfig,
        knowledge: Option<Arc<dyn KnowledgeBase>>,
    ) -> RealtimeResult<Self> {
        config.validate()?;

        let channel = EventChannel::new("upstream");

        // Maps call_id -> function name. `response.function_call_arguments.done`
        // may omit the name, `response.output_item.added` always carries it.
        let pending_function_calls: Arc<Mutex<HashMap<String, String>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let pending = pending_function_calls.clone();
        channel.on(EventKind::ResponseOutputItemAdded, move |event| {
            track_function_call(event, &pending);
        });

        // Calls still tracked when their response ends never completed
        let pending = pending_function_calls.clone();
        channel.on(EventKind::ResponseDone, move |_| {
            let mut pending = pending.lock();
            if !pending.is_empty() {
                debug!(abandoned = pending.len(), "Dropping unfinished function calls");
                pending.clear();
            }
        });

        let tool_channel = channel.clone();
        let respond_after_tool_call = config.respond_after_tool_call;
        channel.on(EventKind::ResponseFunctionCallArgumentsDone, move |event| {
            handle_function_call(
                event,
                &tool_channel,
                &pending_function_calls,
                knowledge.clone(),
                respond_after_tool_call,
            );
        });

        Ok(Self { config, channel })
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    /// Open the upstream socket and send the session configuration.
    ///
    /// Returns once the socket is open and `session.update` is queued as the
    /// first outbound message.
    pub async fn connect(&self) -> RealtimeResult<()> {
        if self.channel.is_open() {
            return Ok(());
        }

        let url = build_ws_url(&self.config)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;
        let api_key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("invalid API key: {e}")))?;
        request.headers_mut().insert("api-key", api_key);
        request
            .headers_mut()
            .insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        debug!(host = url.host_str().unwrap_or_default(), "Connecting to realtime upstream");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(
            deployment = %self.config.deployment,
            "Connected to Azure OpenAI Realtime API"
        );

        let session_update = ClientEvent::SessionUpdate {
            session: SessionConfig::from_config(&self.config),
        }
        .to_event()?;
        self.channel.attach(ws_stream, vec![session_update])
    }

    /// Send one event upstream. Dropped with a log line when not connected.
    pub fn send_event(&self, event: &RealtimeEvent) {
        self.channel.send(event);
    }

    /// Subscribe to upstream events of one kind.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.channel.on(kind, handler);
    }

    /// Subscribe to every upstream event.
    pub fn on_every<F>(&self, handler: F)
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.channel.on_every(handler);
    }

    /// Close the upstream socket. Safe to call more than once.
    pub fn disconnect(&self) {
        if self.channel.is_open() {
            info!("Disconnecting from Azure OpenAI Realtime API");
        }
        self.channel.close();
    }

    /// Resolves once the upstream socket has closed.
    pub async fn closed(&self) {
        self.channel.closed().await
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.channel.close();
    }
}

fn track_function_call(event: &RealtimeEvent, pending: &Mutex<HashMap<String, String>>) {
    let Some(item) = event.get("item") else {
        return;
    };
    if item.get("type").and_then(|t| t.as_str()) != Some("function_call") {
        return;
    }
    if let (Some(call_id), Some(name)) = (
        item.get("call_id").and_then(|v| v.as_str()),
        item.get("name").and_then(|v| v.as_str()),
    ) {
        debug!(call_id, name, "Tracking function call");
        pending.lock().insert(call_id.to_string(), name.to_string());
    }
}

fn handle_function_call(
    event: &RealtimeEvent,
    channel: &EventChannel,
    pending: &Mutex<HashMap<String, String>>,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    respond_after_tool_call: bool,
) {
    let Some(call_id) = event.get_str("call_id").map(str::to_owned) else {
        warn!("Function call completed without a call_id");
        return;
    };

    let tracked = pending.lock().remove(&call_id);
    let name = event.get_str("name").map(str::to_owned).or(tracked);

    if name.as_deref() != Some(SEARCH_TOOL_NAME) {
        debug!(call_id = %call_id, name = ?name, "Ignoring call to unhandled function");
        return;
    }

    let arguments = event.get_str("arguments").unwrap_or("{}").to_owned();
    let channel = channel.clone();
    tokio::spawn(async move {
        let output = run_search_tool(knowledge.as_deref(), &call_id, &arguments).await;

        match ClientEvent::function_call_output(call_id.as_str(), output).to_event() {
            Ok(item) => channel.send(&item),
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Failed to encode function call output");
                return;
            }
        }

        if respond_after_tool_call {
            match ClientEvent::ResponseCreate.to_event() {
                Ok(event) => channel.send(&event),
                Err(e) => warn!(error = %e, "Failed to encode response.create"),
            }
        }
    });
}
