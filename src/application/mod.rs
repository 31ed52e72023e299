//! Application layer: services and use cases
//!
//! This layer loads topologies according to the settings and shapes query
//! results for presentation.

pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
