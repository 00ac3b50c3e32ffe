use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::select;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::knowledge::KnowledgeBase;
use crate::core::realtime::{
    EventChannel, FORWARDED_UPSTREAM_EVENTS, RealtimeConfig, RealtimeEvent, RealtimeSession,
};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

const CONNECT_FAILURE_MESSAGE: &str = "Failed to connect to Azure OpenAI Realtime API";

/// Lifecycle of one browser/upstream pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Browser accepted, upstream still connecting. Nothing is forwarded.
    Connecting,
    /// Both sockets open.
    Active,
    /// Terminal.
    Closing,
}

/// Realtime WebSocket handler
///
/// Upgrades the connection and relays it to a fresh upstream session. The
/// connection slot taken by the connection limit middleware is released when
/// the relay ends.
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let client_ip = client_ip.map(|Extension(ClientIp(ip))| ip);
    info!(client_ip = ?client_ip, "Realtime WebSocket connection upgrade requested");

    let failed_state = state.clone();
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_failed_upgrade(move |e| {
            warn!("Realtime WebSocket upgrade failed: {}", e);
            release(&failed_state, client_ip);
        })
        .on_upgrade(move |socket| async move {
            run_relay(
                socket,
                state.config.realtime.clone(),
                state.knowledge.clone(),
            )
            .await;
            release(&state, client_ip);
        })
}

fn release(state: &AppState, client_ip: Option<IpAddr>) {
    if let Some(ip) = client_ip {
        state.release_connection(ip);
    }
}

/// Relay one browser socket until either side goes away.
pub async fn run_relay(
    socket: WebSocket,
    config: RealtimeConfig,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
) {
    let relay_id = Uuid::new_v4();
    let relay_state = Arc::new(Mutex::new(RelayState::Connecting));
    let browser = EventChannel::new("browser");

    let session = match RealtimeSession::new(config, knowledge) {
        Ok(session) => Some(Arc::new(session)),
        Err(e) => {
            error!(relay_id = %relay_id, error = %e, "Realtime session is not configured");
            None
        }
    };

    if let Some(session) = &session {
        wire_pair(&browser, session, &relay_state, relay_id);
    }

    if let Err(e) = browser.attach(socket, Vec::new()) {
        error!(relay_id = %relay_id, error = %e, "Failed to attach browser socket");
        return;
    }
    info!(relay_id = %relay_id, "Browser connected");

    let Some(session) = session else {
        fail_and_wait(&browser, &relay_state, relay_id).await;
        return;
    };

    let connected = select! {
        result = session.connect() => Some(result),
        _ = browser.closed() => None,
    };

    match connected {
        None => {
            info!(relay_id = %relay_id, "Browser closed before upstream connected");
            *relay_state.lock() = RelayState::Closing;
            session.disconnect();
            return;
        }
        Some(Err(e)) => {
            error!(relay_id = %relay_id, error = %e, "Upstream connection failed");
            session.disconnect();
            fail_and_wait(&browser, &relay_state, relay_id).await;
            return;
        }
        Some(Ok(())) => {
            *relay_state.lock() = RelayState::Active;
            info!(relay_id = %relay_id, "Relay active");
        }
    }

    select! {
        _ = browser.closed() => info!(relay_id = %relay_id, "Browser disconnected"),
        _ = session.closed() => info!(relay_id = %relay_id, "Upstream closed"),
    }

    *relay_state.lock() = RelayState::Closing;
    session.disconnect();
    browser.close();
    info!(relay_id = %relay_id, "Relay closed");
}

/// Register the forwarding handlers for both directions.
fn wire_pair(
    browser: &EventChannel,
    session: &Arc<RealtimeSession>,
    relay_state: &Arc<Mutex<RelayState>>,
    relay_id: Uuid,
) {
    let upstream = session.clone();
    let state = relay_state.clone();
    // The upstream socket opens inside `connect`, slightly before the relay
    // marks itself Active, so readiness is taken from the socket itself.
    browser.on_every(move |event| {
        if *state.lock() != RelayState::Closing && upstream.is_connected() {
            upstream.send_event(event);
        } else {
            debug!(
                relay_id = %relay_id,
                event_type = event.event_type(),
                "Upstream not ready, dropping browser event"
            );
        }
    });

    for kind in FORWARDED_UPSTREAM_EVENTS {
        let browser = browser.clone();
        let state = relay_state.clone();
        session.on(kind, move |event| {
            if *state.lock() != RelayState::Closing {
                browser.send(event);
            }
        });
    }
}

async fn fail_and_wait(
    browser: &EventChannel,
    relay_state: &Mutex<RelayState>,
    relay_id: Uuid,
) {
    *relay_state.lock() = RelayState::Closing;
    match RealtimeEvent::from_value(json!({
        "type": "error",
        "error": { "message": CONNECT_FAILURE_MESSAGE }
    })) {
        Ok(event) => browser.send(&event),
        Err(e) => error!(relay_id = %relay_id, error = %e, "Failed to build error event"),
    }
    browser.closed().await;
    info!(relay_id = %relay_id, "Browser closed after upstream failure");
}
