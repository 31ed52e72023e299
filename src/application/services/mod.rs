//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.

mod topology;

pub use topology::{ClosestEntry, LevelSummary, MaskReport, TopologyService};
