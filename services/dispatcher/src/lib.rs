//! The Device Session Dispatcher binary's library half — kept separate
//! from `main.rs` so integration tests can drive the real acceptor and
//! session loops against a `FakeBus` (mirrors the teacher's
//! `services/server`'s `lib.rs`/`main.rs` split).

pub mod acceptor;
pub mod config;
pub mod error;
pub mod session;
pub mod status;
pub mod wire;

use std::sync::Arc;

use dispatch_bus::{Bus, FleetRegistry};

pub use config::Config;

/// Runs the dispatcher to completion (only returns once the acceptor sees
/// `tcp_server:status == stopped`, or on an unrecoverable bind error).
pub async fn run<B: Bus>(config: Config, bus: Arc<B>) -> std::io::Result<()> {
    let registry = Arc::new(FleetRegistry::new(bus.clone()));
    acceptor::run(&config, bus, registry).await
}
