//! IO modules - external interfaces
//!
//! - `http` - JSON HTTP API (hyper)
//! - `requests` - Request schemas and field validation
//! - `prometheus` - Prometheus text exposition for /metrics

pub mod http;
pub mod prometheus;
pub mod requests;

// Re-export commonly used types
pub use http::{route, serve, start_server, AppState};
