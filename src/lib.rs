//! topotree: hardware topology trees.
//!
//! A [`Topology`](domain::Topology) is built from a raw arrangement (usually a
//! synthetic description such as `"2 4 2"`), checked for consistency and then
//! queried: levels, locality, cpusets and OS affinity masks.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod render;

pub mod util {
    pub mod testing;
}

pub use domain::{CpuSet, DomainError, DomainResult, NodeSet, ObjId, ObjType, Object, Topology};
