//! Infrastructure - configuration, metrics, and injected time/randomness
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free request metrics
//! - `clock` - Current-time source
//! - `random` - Random source for tracking number serials

pub mod clock;
pub mod config;
pub mod metrics;
pub mod random;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use metrics::Metrics;
pub use random::{FixedRandomSource, RandomSource, SeededRandomSource, ThreadRandomSource};
