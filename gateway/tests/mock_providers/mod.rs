//! Mock upstream servers for integration tests
//!
//! - [`MockRealtimeUpstream`]: Azure OpenAI Realtime WebSocket, driven by the test
//! - HTTP collaborators (Azure AI Search, Direct Line) are mocked with wiremock
//!   directly in the tests.

// Not every test binary uses every helper
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the gateway presented when it opened the upstream socket.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub uri: String,
    pub api_key: Option<String>,
    pub openai_beta: Option<String>,
}

/// Something the mock observed from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Text(String),
    Closed,
}

enum Command {
    Send(String),
    Close,
}

/// A realtime upstream accepting a single connection.
pub struct MockRealtimeUpstream {
    pub addr: SocketAddr,
    handshake: Arc<Mutex<Option<Handshake>>>,
    received: mpsc::UnboundedReceiver<Received>,
    commands: mpsc::UnboundedSender<Command>,
}

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl MockRealtimeUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handshake = Arc::new(Mutex::new(None));
        let (received_tx, received) = mpsc::unbounded_channel();
        let (commands, mut commands_rx) = mpsc::unbounded_channel();

        let seen = handshake.clone();
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let callback = move |request: &Request, response: Response| {
                *seen.lock() = Some(Handshake {
                    uri: request.uri().to_string(),
                    api_key: header(request, "api-key"),
                    openai_beta: header(request, "openai-beta"),
                });
                Ok::<Response, ErrorResponse>(response)
            };
            let Ok(ws) = accept_hdr_async(stream, callback).await else {
                return;
            };
            let (mut write, mut read) = ws.split();

            loop {
                tokio::select! {
                    command = commands_rx.recv() => match command {
                        Some(Command::Send(text)) => {
                            if write.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Command::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(Received::Text(text.as_str().to_string()));
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                            let _ = received_tx.send(Received::Closed);
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                }
            }
        });

        Self {
            addr,
            handshake,
            received,
            commands,
        }
    }

    /// Endpoint to configure as `AZURE_OPENAI_ENDPOINT`.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().clone()
    }

    /// Send a server event to the gateway.
    pub fn send(&self, event: Value) {
        self.send_raw(&event.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.commands.send(Command::Send(text.to_string()));
    }

    /// Close the upstream socket.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Next thing received from the gateway.
    pub async fn next(&mut self) -> Received {
        timeout(RECEIVE_TIMEOUT, self.received.recv())
            .await
            .expect("timed out waiting for the gateway")
            .unwrap_or(Received::Closed)
    }

    /// Next raw text frame; panics if the socket closed instead.
    pub async fn next_text(&mut self) -> String {
        match self.next().await {
            Received::Text(text) => text,
            Received::Closed => panic!("upstream socket closed"),
        }
    }

    pub async fn next_event(&mut self) -> Value {
        serde_json::from_str(&self.next_text().await).unwrap()
    }

    /// Wait for the gateway to close the socket, skipping any text frames.
    pub async fn wait_closed(&mut self) {
        while let Received::Text(_) = self.next().await {}
    }
}

/// An address nothing is listening on.
pub async fn unreachable_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
