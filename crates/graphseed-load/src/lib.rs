//! Graphseed Load: client-side orchestration against a Gremlin Server
//!
//! ```text
//! connect ──► create graph ──► define schema ──► activate indexes ──► load vertices/edges
//!                                                      │
//!                       ┌──────────────────────────────┘
//!                       ▼
//!              build ─► register ─► poll REGISTERED ─► reindex ─► poll ENABLED
//!
//! ──► read query ──► (drop) ──► close
//! ```
//!
//! All phases run sequentially on one [`RemoteSession`]; the only waits are
//! the fixed-interval sleeps of the index poller.
//!
//! [`RemoteSession`]: graphseed_gremlin::RemoteSession

pub mod batch;
pub mod index;
pub mod orchestrator;
pub mod records;
pub mod schema;

pub use batch::{BatchLoader, LoadError, LoadStats, TokenRewriter, DEFAULT_BATCH_SIZE};
pub use index::{
    Activation, CancelFlag, IndexPoller, PollError, Sleeper, ThreadSleeper, WaitPolicy,
    STATUS_ENABLED, STATUS_REGISTERED,
};
pub use orchestrator::{Connector, Orchestrator, RecordSink, RunConfig, RunError, RunReport};
pub use records::LineSource;
pub use schema::{default_schema, load_schema, validate_schema, SchemaError};
