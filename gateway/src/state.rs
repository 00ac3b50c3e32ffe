//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::direct_line::DirectLineClient;
use crate::core::knowledge::{AzureSearchClient, KnowledgeBase};
use crate::core::storage::{ConversationStore, MemoryStore};

/// Reason a WebSocket connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    GlobalLimitReached,
    PerIpLimitReached,
}

/// State shared by every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn ConversationStore>,
    /// `None` when no Direct Line token is configured
    pub direct_line: Option<DirectLineClient>,
    /// `None` when search is not configured
    pub knowledge: Option<Arc<dyn KnowledgeBase>>,

    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build state from configuration with an in-memory conversation store.
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn ConversationStore>) -> Arc<Self> {
        let direct_line = config.direct_line.clone().map(DirectLineClient::new);
        let knowledge = config.search.clone().map(|search| {
            info!(index = %search.index, "Knowledge base lookups enabled");
            Arc::new(AzureSearchClient::new(search)) as Arc<dyn KnowledgeBase>
        });

        Arc::new(Self {
            config,
            store,
            direct_line,
            knowledge,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    /// Reserve a WebSocket slot for `ip`.
    ///
    /// Every successful call must be paired with [`release_connection`](Self::release_connection).
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        if let Some(max) = self.config.max_websocket_connections {
            let reserved = self
                .ws_connections
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    (current < max).then_some(current + 1)
                });
            if reserved.is_err() {
                return Err(ConnectionLimitError::GlobalLimitReached);
            }
        } else {
            self.ws_connections.fetch_add(1, Ordering::SeqCst);
        }

        let max_per_ip = self.config.max_connections_per_ip;
        let mut entry = self.ip_connections.entry(ip).or_insert(0);
        if *entry >= max_per_ip {
            drop(entry);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *entry += 1;
        Ok(())
    }

    /// Return a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_sub(1)
            });
        self.ip_connections
            .remove_if_mut(&ip, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|count| *count).unwrap_or(0)
    }
}
