pub mod direct_line;
pub mod knowledge;
pub mod realtime;
pub mod storage;

// Re-export commonly used types for convenience
pub use direct_line::{DirectLineClient, DirectLineConfig, DirectLineError};

pub use knowledge::{AzureSearchClient, KnowledgeBase, SearchConfig, SearchError};

pub use realtime::{
    EventChannel, EventKind, RealtimeConfig, RealtimeError, RealtimeEvent, RealtimeResult,
    RealtimeSession,
};

pub use storage::{ConversationStore, MemoryStore, StoreError};
