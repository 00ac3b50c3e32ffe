pub mod connection_limit;
pub mod rate_limit;

// Re-export middleware functions
pub use connection_limit::{ClientIp, connection_limit_middleware};
pub use rate_limit::{RateLimitLayer, rate_limit_layer};
