// # dyn-core
//
// Core library for the dyn dynamic-DNS agent.
//
// ## Architecture Overview
//
// The agent keeps one DNS "A" record in line with the caller's public IPv4
// address by polling:
// - **PublicIpSource**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for reading and updating records via a provider API
// - **locator**: Finds the managed record by exact fully-qualified name
// - **reconciler**: Compares addresses and updates only on drift
// - **Scheduler**: Fixed-period tick loop with shutdown
// - **SyncEngine**: Application context wiring the above together
//
// ## Design Principles
//
// 1. **Stateless ticks**: Every tick rediscovers the IP and re-reads the record
// 2. **Failure isolation**: A failed tick is logged; the next tick retries
// 3. **Narrow interfaces**: Collaborators are traits, replaceable by test doubles
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod reconciler;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{DnsConfig, DynConfig, ProviderConfig, PublicIpQuery, ResolutionFailurePolicy};
pub use engine::{SyncEngine, SyncEvent, TickOutcome};
pub use error::{Error, Result};
pub use locator::{ManagedRecord, locate_record};
pub use reconciler::{ReconcileOutcome, reconcile};
pub use scheduler::Scheduler;
pub use traits::{DnsProvider, DnsRecord, PublicIpSource, RecordType};
