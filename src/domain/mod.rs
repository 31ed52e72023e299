//! Domain layer: cpusets, the topology tree and the algorithms over it
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod arrangement;
pub mod builder;
pub mod checker;
pub mod cpuset;
pub mod error;
pub mod locality;
pub mod object;
pub mod synthetic;
pub mod topology;

pub use arena::{ObjectArena, PostOrderIterator, PreOrderIterator};
pub use arrangement::{ArrangementSupplier, RawObject, StaticSupplier};
pub use builder::{BuiltTree, TreeBuilder, MAX_DEPTH};
pub use checker::check_tree;
pub use cpuset::{CpuSet, NodeSet, MAX_INDEX};
pub use error::{DomainError, DomainResult};
pub use object::{ObjId, ObjType, Object, UserTag};
pub use synthetic::{SyntheticDescription, SyntheticSupplier};
pub use topology::{Topology, TopologyInfo};
