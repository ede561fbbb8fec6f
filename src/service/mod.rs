//! Scheduling, merging and construction of ticker services.

pub mod merge;
pub mod registry;
pub mod ticker;
pub mod timer;

pub use registry::{ServiceRegistry, SourceInfo};
pub use ticker::{ItemsSnapshot, TickerEvent, TickerService};
