// # mydns-core
//
// Core library for the MyDNS interval updater.
//
// ## Architecture Overview
//
// - **DnsUpdater**: Trait for one complete attempt (public IP lookup, then provider update)
// - **UpdateScheduler**: Manual trigger, interval timer, cancellation
// - **BusyGate**: At most one attempt in flight, shared by every trigger path
// - **HistoryLog**: Append-only record of attempts, exposed newest-first
//
// ## Design Principles
//
// 1. **Resilient loop**: Network conditions never surface as errors; they become failed results
// 2. **No queuing**: Work that cannot take the busy gate is rejected or dropped, never deferred
// 3. **Fresh inputs**: Credentials are read at the start of every attempt
// 4. **Library-First**: Any front-end (daemon, GUI) drives the same scheduler

pub mod traits;
pub mod scheduler;
pub mod gate;
pub mod history;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Credentials, DnsUpdater, UpdateResult, UpdateStatus};
pub use scheduler::{SchedulerEvent, SchedulerState, SchedulerStatus, Trigger, UpdateScheduler};
pub use gate::{BusyGate, BusyGuard};
pub use history::HistoryLog;
pub use config::{ClientConfig, SchedulerConfig, UpdateSpan};
pub use error::{Error, RequestStage, Result};
