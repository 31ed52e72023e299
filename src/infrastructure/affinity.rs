//! Conversions between cpusets and OS affinity masks.
//!
//! Two raw layouts are supported, both little-endian in bit order:
//! - byte buffers laid out like glibc `cpu_set_t` (bit `i` is bit `i % 8` of
//!   byte `i / 8`), sized by the caller as with `CPU_ALLOC_SIZE`
//! - `unsigned long` word arrays as used by libnuma node masks
//!
//! Converting *to* a mask fails with `CapacityExceeded` when an index does not
//! fit; the buffer is left zeroed. Converting *from* a mask silently drops bits
//! at or beyond `MAX_INDEX`.

use tracing::instrument;

use crate::domain::{CpuSet, DomainError, DomainResult, NodeSet, ObjType, Topology, MAX_INDEX};

const BYTE_BITS: usize = 8;
const WORD_BITS: usize = u64::BITS as usize;

/// Fills `mask` with the indices of `cpuset`.
pub fn to_os_mask(cpuset: &CpuSet, mask: &mut [u8]) -> DomainResult<()> {
    mask.fill(0);
    check_capacity(cpuset, mask.len() * BYTE_BITS)?;
    for index in cpuset {
        mask[index / BYTE_BITS] |= 1 << (index % BYTE_BITS);
    }
    Ok(())
}

/// Reads a cpuset out of `mask`.
pub fn from_os_mask(mask: &[u8]) -> CpuSet {
    let mut set = CpuSet::zero();
    for (byte_index, &byte) in mask.iter().enumerate() {
        for bit in 0..BYTE_BITS {
            let index = byte_index * BYTE_BITS + bit;
            if byte & (1 << bit) != 0 && index < MAX_INDEX {
                // index < MAX_INDEX, cannot fail
                let _ = set.set(index);
            }
        }
    }
    set
}

/// Fills a word array with the indices of `cpuset`.
pub fn to_os_words(cpuset: &CpuSet, words: &mut [u64]) -> DomainResult<()> {
    words.fill(0);
    check_capacity(cpuset, words.len() * WORD_BITS)?;
    for (dst, src) in words.iter_mut().zip(cpuset.words()) {
        *dst = *src;
    }
    Ok(())
}

/// Reads a cpuset out of a word array.
pub fn from_os_words(words: &[u64]) -> CpuSet {
    CpuSet::from_words(words)
}

fn check_capacity(set: &CpuSet, capacity: usize) -> DomainResult<()> {
    match set.last() {
        Some(index) if index >= capacity => Err(DomainError::CapacityExceeded { index, capacity }),
        _ => Ok(()),
    }
}

/// NUMA nodes whose processing units intersect `cpuset`.
///
/// A topology without NUMA nodes counts as a single node 0 spanning the
/// whole machine.
#[instrument(level = "debug", skip(topology))]
pub fn cpuset_to_nodeset(topology: &Topology, cpuset: &CpuSet) -> DomainResult<NodeSet> {
    let mut nodeset = NodeSet::zero();
    if topology.get_nbobjs_by_type(ObjType::Node)? == 0 {
        if !cpuset.is_zero() {
            nodeset.set(0)?;
        }
        return Ok(nodeset);
    }

    let mut prev = None;
    while let Some(node) = topology.get_next_obj(ObjType::Node, prev)? {
        if let Some(os_index) = node.os_index() {
            if node.cpuset().intersects(cpuset) {
                nodeset.set(os_index)?;
            }
        }
        prev = Some(node.id());
    }
    Ok(nodeset)
}

/// Processing units of the NUMA nodes listed in `nodeset`.
#[instrument(level = "debug", skip(topology))]
pub fn cpuset_from_nodeset(topology: &Topology, nodeset: &NodeSet) -> DomainResult<CpuSet> {
    if topology.get_nbobjs_by_type(ObjType::Node)? == 0 {
        if nodeset.is_set(0)? {
            return Ok(topology.get_system_obj()?.cpuset().clone());
        }
        return Ok(CpuSet::zero());
    }

    let mut cpuset = CpuSet::zero();
    let mut prev = None;
    while let Some(node) = topology.get_next_obj(ObjType::Node, prev)? {
        if let Some(os_index) = node.os_index() {
            if nodeset.is_set(os_index)? {
                cpuset.union_with(node.cpuset());
            }
        }
        prev = Some(node.id());
    }
    Ok(cpuset)
}

/// Fills a node mask byte buffer with the nodes covering `cpuset`.
pub fn to_node_mask(topology: &Topology, cpuset: &CpuSet, mask: &mut [u8]) -> DomainResult<()> {
    to_os_mask(&cpuset_to_nodeset(topology, cpuset)?, mask)
}

/// Processing units of the nodes set in a node mask byte buffer.
pub fn from_node_mask(topology: &Topology, mask: &[u8]) -> DomainResult<CpuSet> {
    cpuset_from_nodeset(topology, &from_os_mask(mask))
}

/// Fills a libnuma-style word array with the nodes covering `cpuset`.
///
/// Returns the `maxnode` bit count: highest node set plus one, 0 when no
/// node is set.
pub fn to_node_words(topology: &Topology, cpuset: &CpuSet, words: &mut [u64]) -> DomainResult<usize> {
    let nodeset = cpuset_to_nodeset(topology, cpuset)?;
    to_os_words(&nodeset, words)?;
    Ok(nodeset.last().map_or(0, |last| last + 1))
}

/// Processing units of the nodes set in a libnuma-style word array.
pub fn from_node_words(topology: &Topology, words: &[u64]) -> DomainResult<CpuSet> {
    cpuset_from_nodeset(topology, &from_os_words(words))
}
