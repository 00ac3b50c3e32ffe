//! Duplex event channel over a single WebSocket.
//!
//! An [`EventChannel`] wraps either side of a relay pair: the browser socket
//! accepted by axum or the upstream socket opened with tokio-tungstenite.
//! Outbound events go through one unbounded queue drained by a writer task,
//! so sends never block and keep their order. Inbound frames are parsed on a
//! reader task and handed to the registered handlers synchronously, in
//! registration order.
//!
//! Handlers may be registered before a socket is attached. Sending on a
//! channel that is not open logs and drops the event.

use std::collections::HashMap;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::base::{RealtimeError, RealtimeResult};
use super::events::{EventKind, RealtimeEvent};

/// Callback invoked for each matching inbound event.
pub type EventHandler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

// =============================================================================
// Frames
// =============================================================================

/// Transport-neutral view of a WebSocket frame.
#[derive(Debug)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Close,
    Control,
}

/// WebSocket message types an [`EventChannel`] can run over.
pub trait WsFrame: Send + Unpin + 'static {
    fn text(text: String) -> Self;
    fn close() -> Self;
    fn into_frame(self) -> Frame;
}

impl WsFrame for axum::extract::ws::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn close() -> Self {
        Self::Close(None)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text.as_str().to_owned()),
            Self::Binary(data) => Frame::Binary(data),
            Self::Close(_) => Frame::Close,
            Self::Ping(_) | Self::Pong(_) => Frame::Control,
        }
    }
}

impl WsFrame for tokio_tungstenite::tungstenite::Message {
    fn text(text: String) -> Self {
        Self::Text(text.into())
    }

    fn close() -> Self {
        Self::Close(None)
    }

    fn into_frame(self) -> Frame {
        match self {
            Self::Text(text) => Frame::Text(text.as_str().to_owned()),
            Self::Binary(data) => Frame::Binary(data),
            Self::Close(_) => Frame::Close,
            Self::Ping(_) | Self::Pong(_) | Self::Frame(_) => Frame::Control,
        }
    }
}

// =============================================================================
// Handler registry
// =============================================================================

#[derive(Default)]
struct HandlerRegistry {
    by_kind: HashMap<EventKind, Vec<EventHandler>>,
    every: Vec<EventHandler>,
}

impl HandlerRegistry {
    fn handlers_for(&self, kind: EventKind) -> Vec<EventHandler> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .chain(self.every.iter())
            .cloned()
            .collect()
    }

    fn clear(&mut self) {
        self.by_kind.clear();
        self.every.clear();
    }
}

// =============================================================================
// Event channel
// =============================================================================

enum Outbound {
    Text(String),
    Close,
}

struct ChannelInner {
    label: &'static str,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    open: AtomicBool,
    closed: CancellationToken,
    handlers: RwLock<HandlerRegistry>,
}

/// Typed pub/sub wrapper around one WebSocket.
///
/// Cloning is cheap and every clone refers to the same socket.
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

impl EventChannel {
    /// Create a detached channel. `label` tags its log lines.
    pub fn new(label: &'static str) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                label,
                outbound: Mutex::new(None),
                open: AtomicBool::new(false),
                closed: CancellationToken::new(),
                handlers: RwLock::new(HandlerRegistry::default()),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Whether a socket is attached and not yet closed.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Register a handler for one event kind.
    ///
    /// Handlers registered for [`EventKind::Unrecognized`] receive every event
    /// whose type is not a named kind.
    pub fn on<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .by_kind
            .entry(kind)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a handler that runs for every inbound event, after the
    /// kind-specific handlers.
    pub fn on_every<F>(&self, handler: F)
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.inner.handlers.write().every.push(Arc::new(handler));
    }

    /// Queue an event for transmission, sending its text unchanged.
    pub fn send(&self, event: &RealtimeEvent) {
        if !self.is_open() {
            warn!(
                channel = self.inner.label,
                event_type = event.event_type(),
                "Channel not open, dropping outbound event"
            );
            return;
        }

        let outbound = self.inner.outbound.lock();
        match outbound.as_ref() {
            Some(tx) if tx.send(Outbound::Text(event.raw().to_owned())).is_ok() => {
                trace!(
                    channel = self.inner.label,
                    event_type = event.event_type(),
                    "Queued outbound event"
                );
            }
            _ => {
                warn!(
                    channel = self.inner.label,
                    event_type = event.event_type(),
                    "Channel writer gone, dropping outbound event"
                );
            }
        }
    }

    /// Attach a socket and start the reader and writer tasks.
    ///
    /// `initial` events are queued ahead of anything sent after the channel
    /// opens.
    pub fn attach<S, M, E>(&self, socket: S, initial: Vec<RealtimeEvent>) -> RealtimeResult<()>
    where
        S: Stream<Item = Result<M, E>> + Sink<M> + Send + 'static,
        <S as Sink<M>>::Error: Display + Send,
        M: WsFrame,
        E: Display + Send + 'static,
    {
        if self.inner.closed.is_cancelled() {
            return Err(RealtimeError::NotConnected);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut outbound = self.inner.outbound.lock();
            if outbound.is_some() {
                return Err(RealtimeError::WebSocketError(
                    "channel already attached".to_string(),
                ));
            }
            for event in initial {
                let _ = tx.send(Outbound::Text(event.raw().to_owned()));
            }
            *outbound = Some(tx);
            self.inner.open.store(true, Ordering::SeqCst);
        }

        let (sink, stream) = socket.split::<M>();
        tokio::spawn(write_loop::<_, M>(
            sink,
            rx,
            self.inner.closed.clone(),
            self.inner.label,
        ));
        tokio::spawn(read_loop(stream, self.clone()));

        debug!(channel = self.inner.label, "Channel attached");
        Ok(())
    }

    /// Close the channel. Only the first call sends a close frame.
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::SeqCst);
        if let Some(tx) = self.inner.outbound.lock().take() {
            debug!(channel = self.inner.label, "Closing channel");
            let _ = tx.send(Outbound::Close);
        }
        self.inner.closed.cancel();
        // Handlers may hold clones of other channels; dropping them here
        // releases a relay pair once both sides are closed.
        self.inner.handlers.write().clear();
    }

    /// Resolves once the channel has closed for any reason.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    fn receive_text(&self, text: &str) {
        match RealtimeEvent::parse(text) {
            Ok(event) => self.dispatch(&event),
            Err(e) => {
                warn!(
                    channel = self.inner.label,
                    error = %e,
                    "Dropping malformed payload"
                );
            }
        }
    }

    /// Run every handler registered for this event.
    pub(crate) fn dispatch(&self, event: &RealtimeEvent) {
        let handlers = self.inner.handlers.read().handlers_for(event.kind());
        if handlers.is_empty() {
            trace!(
                channel = self.inner.label,
                event_type = event.event_type(),
                "No handlers for event"
            );
            return;
        }

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(
                    channel = self.inner.label,
                    event_type = event.event_type(),
                    "Event handler panicked"
                );
            }
        }
    }
}

async fn write_loop<K, M>(
    mut sink: K,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    closed: CancellationToken,
    label: &'static str,
) where
    K: Sink<M> + Unpin,
    K::Error: Display,
    M: WsFrame,
{
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Text(text) => {
                if let Err(e) = sink.send(M::text(text)).await {
                    warn!(channel = label, "Failed to send WebSocket message: {}", e);
                    break;
                }
            }
            Outbound::Close => {
                if let Err(e) = sink.send(M::close()).await {
                    debug!(channel = label, "Close frame not sent: {}", e);
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
    closed.cancel();
}

async fn read_loop<R, M, E>(mut stream: R, channel: EventChannel)
where
    R: Stream<Item = Result<M, E>> + Unpin,
    M: WsFrame,
    E: Display,
{
    let closed = channel.inner.closed.clone();
    let label = channel.inner.label;

    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(message)) => match message.into_frame() {
                Frame::Text(text) => channel.receive_text(&text),
                Frame::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => channel.receive_text(text),
                    Err(_) => warn!(channel = label, "Dropping non UTF-8 binary frame"),
                },
                Frame::Close => {
                    info!(channel = label, "WebSocket closed by peer");
                    break;
                }
                Frame::Control => trace!(channel = label, "Control frame"),
            },
            Some(Err(e)) => {
                warn!(channel = label, "WebSocket error: {}", e);
                break;
            }
            None => {
                debug!(channel = label, "WebSocket stream ended");
                break;
            }
        }
    }

    channel.close();
}
