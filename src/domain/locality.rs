//! Locality queries over a loaded topology.
//!
//! Nothing here is cached: ancestors and distances are recomputed from the
//! parent links on every call.

use tracing::instrument;

use crate::domain::cpuset::CpuSet;
use crate::domain::error::DomainResult;
use crate::domain::object::{ObjId, ObjType, Object};
use crate::domain::topology::Topology;

impl Topology {
    fn parent_of(&self, obj: &Object) -> DomainResult<Option<&Object>> {
        obj.parent.map(|p| self.get_obj(p)).transpose()
    }

    /// Deepest object containing both `a` and `b`.
    ///
    /// Both chains are first brought to the same depth, then stepped upward
    /// in lockstep until they meet. The root is always a valid answer.
    #[instrument(level = "trace", skip(self))]
    pub fn get_common_ancestor_obj(&self, a: ObjId, b: ObjId) -> DomainResult<&Object> {
        let mut a = self.get_obj(a)?;
        let mut b = self.get_obj(b)?;

        while a.depth > b.depth {
            a = self.step_up(a)?;
        }
        while b.depth > a.depth {
            b = self.step_up(b)?;
        }
        while a.id != b.id {
            a = self.step_up(a)?;
            b = self.step_up(b)?;
        }
        Ok(a)
    }

    /// Parent of a non-root object; the root maps to itself.
    fn step_up<'a>(&'a self, obj: &'a Object) -> DomainResult<&'a Object> {
        Ok(self.parent_of(obj)?.unwrap_or(obj))
    }

    /// True iff `ancestor` is `obj` or one of its ancestors.
    pub fn is_in_subtree(&self, obj: ObjId, ancestor: ObjId) -> DomainResult<bool> {
        let ancestor = self.get_obj(ancestor)?;
        let mut current = Some(self.get_obj(obj)?);
        while let Some(cur) = current {
            if cur.id == ancestor.id {
                return Ok(true);
            }
            if cur.depth <= ancestor.depth {
                return Ok(false);
            }
            current = self.parent_of(cur)?;
        }
        Ok(false)
    }

    /// Number of edges on the path between `a` and `b`.
    ///
    /// For two objects of the same depth this is
    /// `2 * (depth - depth(common ancestor))`.
    pub fn tree_distance(&self, a: ObjId, b: ObjId) -> DomainResult<usize> {
        let ancestor = self.get_common_ancestor_obj(a, b)?;
        let a = self.get_obj(a)?;
        let b = self.get_obj(b)?;
        Ok((a.depth - ancestor.depth) + (b.depth - ancestor.depth))
    }

    /// Up to `max_count` objects of the target's depth, nearest first.
    ///
    /// Rings widen one ancestor at a time: siblings under the parent, then
    /// the rest of the grandparent's subtree, and so on up to the root.
    /// Within a ring objects come in ascending logical index. The target
    /// itself is never returned.
    #[instrument(level = "debug", skip(self))]
    pub fn get_closest_objs(&self, target: ObjId, max_count: usize) -> DomainResult<Vec<&Object>> {
        let target = self.get_obj(target)?;
        let mut closest = Vec::new();
        let mut inner = target;

        while closest.len() < max_count {
            let Some(ancestor) = self.parent_of(inner)? else {
                break;
            };
            self.collect_ring(ancestor, inner.id, target.depth, max_count, &mut closest)?;
            inner = ancestor;
        }
        Ok(closest)
    }

    /// Appends the objects at `depth` below `ancestor`, skipping the subtree
    /// of `already_ranked`, in left-to-right order.
    fn collect_ring<'a>(
        &'a self,
        ancestor: &'a Object,
        already_ranked: ObjId,
        depth: usize,
        max_count: usize,
        out: &mut Vec<&'a Object>,
    ) -> DomainResult<()> {
        let mut stack: Vec<ObjId> = ancestor.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if out.len() >= max_count {
                break;
            }
            if id == already_ranked {
                continue;
            }
            let obj = self.get_obj(id)?;
            if obj.depth == depth {
                out.push(obj);
            } else {
                stack.extend(obj.children.iter().rev().copied());
            }
        }
        Ok(())
    }

    /// Ancestor of `obj` at `depth`; `obj` itself when the depths match.
    pub fn get_ancestor_obj_by_depth(&self, obj: ObjId, depth: usize) -> DomainResult<Option<&Object>> {
        let mut current = self.get_obj(obj)?;
        if depth > current.depth {
            return Ok(None);
        }
        while current.depth > depth {
            current = self.step_up(current)?;
        }
        Ok(Some(current))
    }

    /// Closest strict ancestor of `obj` with type `obj_type`.
    pub fn get_ancestor_obj_by_type(&self, obj: ObjId, obj_type: ObjType) -> DomainResult<Option<&Object>> {
        let mut current = self.parent_of(self.get_obj(obj)?)?;
        while let Some(cur) = current {
            if cur.obj_type == obj_type {
                return Ok(Some(cur));
            }
            current = self.parent_of(cur)?;
        }
        Ok(None)
    }

    /// Deepest object whose cpuset includes all of `set`.
    ///
    /// None for an empty set or a set reaching outside the root.
    pub fn get_obj_covering_cpuset(&self, set: &CpuSet) -> DomainResult<Option<&Object>> {
        let root = self.get_system_obj()?;
        if set.is_zero() || !root.cpuset.includes(set) {
            return Ok(None);
        }
        let mut current = root;
        'descend: loop {
            for &child in &current.children {
                let child = self.get_obj(child)?;
                if child.cpuset.includes(set) {
                    current = child;
                    continue 'descend;
                }
            }
            return Ok(Some(current));
        }
    }

    /// Largest object entirely inside `set` that contains the lowest index of
    /// `set` known to the topology.
    pub fn get_first_largest_obj_inside_cpuset(&self, set: &CpuSet) -> DomainResult<Option<&Object>> {
        let root = self.get_system_obj()?;
        let Some(first) = set.intersect(&root.cpuset).first() else {
            return Ok(None);
        };
        let mut current = root;
        while !set.includes(&current.cpuset) {
            let mut next = None;
            for &child in &current.children {
                let child = self.get_obj(child)?;
                if child.cpuset.is_set(first)? {
                    next = Some(child);
                    break;
                }
            }
            match next {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Fewest objects whose cpusets exactly partition `set ∩ root.cpuset`,
    /// in ascending order of their first index.
    pub fn get_largest_objs_inside_cpuset(&self, set: &CpuSet) -> DomainResult<Vec<&Object>> {
        let root = self.get_system_obj()?;
        let mut remaining = set.intersect(&root.cpuset);
        let mut objs = Vec::new();
        while !remaining.is_zero() {
            let Some(obj) = self.get_first_largest_obj_inside_cpuset(&remaining)? else {
                break;
            };
            remaining = remaining.difference(&obj.cpuset);
            objs.push(obj);
        }
        Ok(objs)
    }
}
