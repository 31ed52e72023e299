//! Infrastructure layer: conversions at the OS boundary
//!
//! Affinity masks and NUMA node masks in the raw layouts the kernel and
//! libnuma expect.

pub mod affinity;

pub use affinity::{
    cpuset_from_nodeset, cpuset_to_nodeset, from_node_mask, from_node_words, from_os_mask,
    from_os_words, to_node_mask, to_node_words, to_os_mask, to_os_words,
};
