//! HTTP surface of the zkETHer mixer demo.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{MixerConfig, DEFAULT_LISTEN};
pub use error::{ApiError, ErrorBody};
pub use routes::{app, AppState};

use ledger::{InMemoryLedger, MixerService};

/// Builds the in-memory service the server runs on.
pub fn build_service(config: &MixerConfig) -> MixerService<InMemoryLedger> {
    let store = if config.seed_metrics {
        InMemoryLedger::with_demo_seed()
    } else {
        InMemoryLedger::new()
    };
    MixerService::new(store, config.timings.clone())
}
