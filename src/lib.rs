//! Daypart labor-productivity engine: target productivity from sales, zone
//! classification against target, gauge geometry, a per-profile observation
//! log and delimited-text reports.

pub mod config;
pub mod error;
pub mod gauge;
pub mod input;
pub mod interpolate;
pub mod log;
pub mod logging;
pub mod models;
pub mod performance;
pub mod report;
pub mod store;
pub mod target;
pub mod tiers;
pub mod zone;

pub use config::{Profile, ProfileConfig};
pub use error::{EngineError, EngineResult};
pub use log::ObservationLog;
pub use target::TargetCalculator;
