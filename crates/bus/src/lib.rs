//! The Shared Bus abstraction and everything keyed off it: the Fleet
//! Registry, the Execution Ledger, the per-device command queues, and the
//! Direct-Command Channel bridge (§4 of the spec).
//!
//! `Bus` is the seam between the dispatcher and Redis — tests run against
//! [`FakeBus`] in `dispatch-test-support` instead of a live server.

mod client;
mod direct;
mod error;
pub mod keys;
mod ledger;
mod queue;
mod redis_bus;
mod registry;

pub use client::Bus;
pub use direct::{send_direct_command, DirectCommandError, DEFAULT_DIRECT_COMMAND_TIMEOUT};
pub use error::BusError;
pub use ledger::{ledger_key, mark_completed, mark_failed, mark_started};
pub use queue::{drain, pop_next, push_command};
pub use redis_bus::RedisBus;
pub use registry::{FleetRegistry, LogicalRecord, PhysicalRecord};
