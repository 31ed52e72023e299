//! Tree builder: consolidates a raw arrangement into a topology tree.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, instrument};

use crate::domain::arena::ObjectArena;
use crate::domain::arrangement::RawObject;
use crate::domain::cpuset::{CpuSet, MAX_INDEX};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::object::ObjId;

/// Deepest tree accepted, root level included.
pub const MAX_DEPTH: usize = 128;

/// Result of a build: the object arena plus the per-depth level arrays.
#[derive(Debug)]
pub struct BuiltTree {
    pub arena: ObjectArena,
    /// `levels[d][i]` is the object at depth `d` with logical index `i`
    pub levels: Vec<Vec<ObjId>>,
}

/// Constructs topology trees from raw arrangements.
///
/// The steps run in a fixed order; cpusets are only computed once the shape
/// is final:
/// 1. breadth-first instantiation assigns depth and per-depth logical index
/// 2. leaves without an OS index get one from a depth-first running counter
/// 3. cpusets propagate bottom-up, level by level
pub struct TreeBuilder {
    topology: u64,
}

impl TreeBuilder {
    pub fn new(topology: u64) -> Self {
        Self { topology }
    }

    #[instrument(level = "debug", skip(self, raw), fields(topology = self.topology))]
    pub fn build(&self, raw: &RawObject) -> DomainResult<BuiltTree> {
        let mut tree = BuiltTree {
            arena: ObjectArena::new(self.topology),
            levels: Vec::new(),
        };

        self.instantiate(&mut tree, raw)?;
        debug!(
            "instantiated {} objects on {} levels",
            tree.arena.len(),
            tree.levels.len()
        );

        self.assign_leaf_os_indices(&mut tree);
        self.propagate_cpusets(&mut tree)?;

        Ok(tree)
    }

    /// Breadth-first walk: objects of one depth are created left to right,
    /// so the running per-depth counter is the logical index.
    /// Explicit OS indices and depths are range-checked here, before any
    /// query can see them.
    fn instantiate(&self, tree: &mut BuiltTree, raw: &RawObject) -> DomainResult<()> {
        let mut queue: VecDeque<(&RawObject, Option<ObjId>, usize)> = VecDeque::new();
        queue.push_back((raw, None, 0));

        while let Some((current, parent, depth)) = queue.pop_front() {
            if depth >= MAX_DEPTH {
                return Err(DomainError::inconsistency(
                    current.obj_type,
                    format!("more than {} levels", MAX_DEPTH),
                ));
            }
            if let Some(os_index) = current.os_index.filter(|&i| i >= MAX_INDEX) {
                return Err(DomainError::IndexOutOfRange {
                    index: os_index,
                    max: MAX_INDEX,
                });
            }

            let id = tree
                .arena
                .insert_object(current.obj_type, current.os_index, parent);

            if tree.levels.len() <= depth {
                tree.levels.push(Vec::new());
            }
            let logical_index = tree.levels[depth].len();
            tree.levels[depth].push(id);

            if let Some(obj) = tree.arena.get_mut(id) {
                obj.depth = depth;
                obj.logical_index = logical_index;
                obj.arity = current.children.len();
            }

            for child in &current.children {
                queue.push_back((child, Some(id), depth + 1));
            }
        }
        Ok(())
    }

    fn assign_leaf_os_indices(&self, tree: &mut BuiltTree) {
        let leaves = tree.arena.leaves();
        let taken: HashSet<usize> = leaves
            .iter()
            .filter_map(|&id| tree.arena.get(id).and_then(|o| o.os_index))
            .collect();

        let mut next = 0;
        for id in leaves {
            if let Some(obj) = tree.arena.get_mut(id) {
                if obj.os_index.is_none() {
                    while taken.contains(&next) {
                        next += 1;
                    }
                    obj.os_index = Some(next);
                    next += 1;
                }
            }
        }
    }

    /// Deepest level first, so every child is final before its parent reads it.
    fn propagate_cpusets(&self, tree: &mut BuiltTree) -> DomainResult<()> {
        for level in tree.levels.iter().rev() {
            for &id in level {
                let cpuset = {
                    let obj = tree
                        .arena
                        .get(id)
                        .ok_or_else(|| DomainError::inconsistency("<unknown>", "dangling level entry"))?;
                    if obj.children.is_empty() {
                        let os_index = obj
                            .os_index
                            .ok_or_else(|| DomainError::inconsistency(obj, "leaf without OS index"))?;
                        CpuSet::singleton(os_index)?
                    } else {
                        let mut union = CpuSet::zero();
                        for &child in &obj.children {
                            if let Some(child) = tree.arena.get(child) {
                                union.union_with(&child.cpuset);
                            }
                        }
                        union
                    }
                };
                if let Some(obj) = tree.arena.get_mut(id) {
                    obj.cpuset = cpuset;
                }
            }
        }
        debug!("cpusets propagated");
        Ok(())
    }
}
