//! Consistency checker for built topologies.
//!
//! Diagnostic only: it reads the tree and reports the first violation found.
//! It never mutates or repairs anything.

use tracing::{debug, instrument};

use crate::domain::arena::ObjectArena;
use crate::domain::cpuset::CpuSet;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::object::{ObjId, Object};

/// Validates every structural invariant of a tree and its level arrays.
#[instrument(level = "debug", skip(arena, levels), fields(levels = levels.len()))]
pub fn check_tree(arena: &ObjectArena, levels: &[Vec<ObjId>]) -> DomainResult<()> {
    let root_id = arena
        .root()
        .ok_or_else(|| DomainError::inconsistency("topology", "no root object"))?;
    let root = lookup(arena, root_id)?;
    if root.parent.is_some() || root.depth != 0 {
        return Err(DomainError::inconsistency(root, "root must have depth 0 and no parent"));
    }
    if levels.first().map(Vec::as_slice) != Some(&[root_id][..]) {
        return Err(DomainError::inconsistency(root, "depth 0 must hold exactly the root"));
    }

    check_levels(arena, levels)?;

    let mut visited = 0;
    for obj in arena.iter() {
        visited += 1;
        check_object(arena, obj)?;
    }

    let listed: usize = levels.iter().map(Vec::len).sum();
    if visited != listed || visited != arena.len() {
        return Err(DomainError::inconsistency(
            "topology",
            format!(
                "{} objects reachable, {} listed in levels, {} allocated",
                visited,
                listed,
                arena.len()
            ),
        ));
    }

    debug!("topology consistent: {} objects", visited);
    Ok(())
}

fn lookup(arena: &ObjectArena, id: ObjId) -> DomainResult<&Object> {
    arena
        .get(id)
        .ok_or_else(|| DomainError::inconsistency(format!("{:?}", id), "dangling object handle"))
}

/// Same-depth objects are numbered 0..count-1 in order and share one type.
fn check_levels(arena: &ObjectArena, levels: &[Vec<ObjId>]) -> DomainResult<()> {
    for (depth, level) in levels.iter().enumerate() {
        if level.is_empty() {
            return Err(DomainError::inconsistency(
                format!("depth {}", depth),
                "empty level",
            ));
        }
        let level_type = lookup(arena, level[0])?.obj_type;
        for (i, &id) in level.iter().enumerate() {
            let obj = lookup(arena, id)?;
            if obj.depth != depth {
                return Err(DomainError::inconsistency(
                    obj,
                    format!("listed at depth {} but has depth {}", depth, obj.depth),
                ));
            }
            if obj.logical_index != i {
                return Err(DomainError::inconsistency(
                    obj,
                    format!("logical index {} found at position {}", obj.logical_index, i),
                ));
            }
            if obj.obj_type != level_type {
                return Err(DomainError::inconsistency(
                    obj,
                    format!("type differs from {} at the same depth", level_type),
                ));
            }
        }
    }
    Ok(())
}

fn check_object(arena: &ObjectArena, obj: &Object) -> DomainResult<()> {
    if obj.arity != obj.children.len() {
        return Err(DomainError::inconsistency(
            obj,
            format!("arity {} but {} children", obj.arity, obj.children.len()),
        ));
    }

    if obj.children.is_empty() {
        return check_leaf(obj);
    }

    let mut union = CpuSet::zero();
    for &child_id in &obj.children {
        let child = lookup(arena, child_id)?;
        if child.parent != Some(obj.id) {
            return Err(DomainError::inconsistency(child, "parent link does not point back"));
        }
        if child.depth != obj.depth + 1 {
            return Err(DomainError::inconsistency(
                child,
                format!("depth {} under parent of depth {}", child.depth, obj.depth),
            ));
        }
        if !obj.cpuset.includes(&child.cpuset) {
            return Err(DomainError::inconsistency(child, "cpuset not inside parent cpuset"));
        }
        if union.intersects(&child.cpuset) {
            return Err(DomainError::inconsistency(child, "cpuset overlaps a sibling"));
        }
        union.union_with(&child.cpuset);
    }

    if union != obj.cpuset {
        return Err(DomainError::inconsistency(
            obj,
            format!("cpuset {} but children cover {}", obj.cpuset, union),
        ));
    }
    Ok(())
}

fn check_leaf(obj: &Object) -> DomainResult<()> {
    if obj.cpuset.is_zero() {
        return Err(DomainError::inconsistency(obj, "leaf with empty cpuset"));
    }
    if let Some(os_index) = obj.os_index {
        if obj.cpuset != CpuSet::singleton(os_index)? {
            return Err(DomainError::inconsistency(
                obj,
                format!("leaf cpuset {} does not match OS index", obj.cpuset),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arrangement::RawObject;
    use crate::domain::builder::{BuiltTree, TreeBuilder};
    use crate::domain::object::ObjType;

    fn built() -> BuiltTree {
        let raw = RawObject::new(ObjType::System).with_children(vec![
            RawObject::new(ObjType::Core).with_children(vec![
                RawObject::new(ObjType::ProcessingUnit),
                RawObject::new(ObjType::ProcessingUnit),
            ]),
            RawObject::new(ObjType::Core).with_children(vec![
                RawObject::new(ObjType::ProcessingUnit),
                RawObject::new(ObjType::ProcessingUnit),
            ]),
        ]);
        TreeBuilder::new(3).build(&raw).unwrap()
    }

    fn object_named(err: DomainError) -> String {
        match err {
            DomainError::TopologyInconsistency { object, .. } => object,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_built_tree_is_consistent() {
        let tree = built();
        assert!(check_tree(&tree.arena, &tree.levels).is_ok());
    }

    #[test]
    fn test_wrong_arity_is_reported() {
        let mut tree = built();
        let core = tree.levels[1][1];
        tree.arena.get_mut(core).unwrap().arity = 3;

        let err = check_tree(&tree.arena, &tree.levels).unwrap_err();

        assert_eq!(object_named(err), "Core#1");
    }

    #[test]
    fn test_stale_parent_cpuset_is_reported() {
        let mut tree = built();
        let core = tree.levels[1][0];
        tree.arena.get_mut(core).unwrap().cpuset = CpuSet::from_indices([0, 1, 7]).unwrap();

        let err = check_tree(&tree.arena, &tree.levels).unwrap_err();

        // the root no longer includes the widened core
        assert_eq!(object_named(err), "Core#0");
    }

    #[test]
    fn test_overlapping_siblings_are_reported() {
        let mut tree = built();
        let pu = tree.levels[2][3];
        tree.arena.get_mut(pu).unwrap().cpuset = CpuSet::singleton(2).unwrap();

        let err = check_tree(&tree.arena, &tree.levels).unwrap_err();

        assert!(matches!(err, DomainError::TopologyInconsistency { .. }));
    }

    #[test]
    fn test_logical_index_gap_is_reported() {
        let mut tree = built();
        let pu = tree.levels[2][2];
        tree.arena.get_mut(pu).unwrap().logical_index = 5;

        let err = check_tree(&tree.arena, &tree.levels).unwrap_err();

        assert_eq!(object_named(err), "PU#5(P#2)");
    }

    #[test]
    fn test_mixed_types_on_one_level_are_reported() {
        let mut tree = built();
        let core = tree.levels[1][1];
        tree.arena.get_mut(core).unwrap().obj_type = ObjType::Package;

        let err = check_tree(&tree.arena, &tree.levels).unwrap_err();

        assert_eq!(object_named(err), "Package#1");
    }
}
