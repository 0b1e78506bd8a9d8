//! Request statistics.
//!
//! # Data Flow
//! ```text
//! proxy_handler (one per inbound request)
//!     → StatsEmitter::emit (try_send, never blocks)
//!     → bounded channel, topic "proxy.stats"
//!     → Statistician task (sole owner of the counters)
//!     → periodic throughput log + metrics
//! ```

pub mod signal;
pub mod statistician;

pub use signal::{stats_channel, StatsEmitter, StatsSignal, STATS_TOPIC};
pub use statistician::{RequestCounter, Statistician, ThroughputReport};
