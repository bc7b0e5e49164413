//! # SendLater
//!
//! Delayed webhook delivery scheduler. Callers hand in a payload and a
//! relative fire time; SendLater persists the request, waits until the time
//! arrives, POSTs the payload to its destination once, and marks the request
//! terminal. Best-effort by design: a failed delivery is recorded, never
//! retried.
//!
//! ## Design Principles
//! - SQLite persistence — scheduled events survive restarts
//! - Tokio timers only — zero overhead when idle, no queue broker
//! - The store is the single source of truth; armed timers are an advisory
//!   per-process cache that a periodic sweep rebuilds after restarts
//!
//! ## Architecture
//! ```text
//! Scheduler (facade)
//!   ├── schedule("10m", payload) → EventStore.create → arm if due soon
//!   ├── cancel(id)               → TimerIndex.disarm + EventStore.delete
//!   └── list_pending / list_all  → EventStore projections
//!
//! Sweeper (tokio interval, runs at startup + every 30min)
//!   └── EventStore.find_due_within(horizon) → arm each unseen id
//!
//! Timer fires
//!   └── Deliverer.deliver (HTTP POST) → EventStore.mark_terminal
//!                                     → TimerIndex.disarm (cache cleanup)
//! ```

pub mod config;
pub mod deliver;
pub mod duration;
pub mod error;
pub mod event;
pub mod scheduler;
pub mod store;
pub mod sweep;
pub mod timers;

pub use config::{RetryPolicy, SchedulerConfig};
pub use error::{Result, SchedulerError};
pub use event::{DeliveryOutcome, Event, EventStatus};
pub use scheduler::Scheduler;
pub use store::EventStore;
pub use sweep::run_sweeper;
pub use timers::TimerIndex;
