//! Topology: owner of the object tree and its per-depth level arrays.
//!
//! Lifecycle: [`Topology::new`] (empty) -> configure a supplier ->
//! [`Topology::load`] (build + check, all-or-nothing) -> read-only queries.
//! Dropping the topology releases the whole arena at once.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, instrument};

use crate::domain::arena::{ObjectArena, PostOrderIterator, PreOrderIterator};
use crate::domain::arrangement::ArrangementSupplier;
use crate::domain::builder::TreeBuilder;
use crate::domain::checker::check_tree;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::object::{ObjId, ObjType, Object, UserTag};
use crate::domain::synthetic::SyntheticSupplier;

/// Every load gets a fresh identity so handles never alias across loads.
static NEXT_TOPOLOGY_ID: AtomicU64 = AtomicU64::new(1);

/// Summary returned by [`Topology::get_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyInfo {
    /// Number of levels, root level included
    pub depth_count: usize,
}

/// A successfully built and checked tree.
#[derive(Debug)]
pub(crate) struct Loaded {
    pub(crate) arena: ObjectArena,
    pub(crate) levels: Vec<Vec<ObjId>>,
}

#[derive(Debug)]
pub struct Topology {
    supplier: Box<dyn ArrangementSupplier>,
    loaded: Option<Loaded>,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Creates an empty topology. Until another supplier is configured, a
    /// load produces the single processing unit of the empty synthetic
    /// description.
    pub fn new() -> Self {
        Self {
            supplier: Box::new(SyntheticSupplier::new(Default::default())),
            loaded: None,
        }
    }

    /// Selects a synthetic description as the supplier for the next load.
    ///
    /// The description is parsed immediately; on error the previous supplier
    /// stays selected.
    pub fn set_synthetic(&mut self, description: &str) -> DomainResult<()> {
        let supplier = SyntheticSupplier::parse(description)?;
        self.set_supplier(Box::new(supplier));
        Ok(())
    }

    pub fn set_supplier(&mut self, supplier: Box<dyn ArrangementSupplier>) {
        debug!("supplier: {}", supplier.name());
        self.supplier = supplier;
    }

    pub fn supplier_name(&self) -> &str {
        self.supplier.name()
    }

    /// Builds and checks a tree from the configured supplier.
    ///
    /// The tree is committed only if both steps succeed; otherwise the
    /// topology keeps whatever state it had before the call.
    #[instrument(level = "debug", skip(self), fields(supplier = self.supplier.name()))]
    pub fn load(&mut self) -> DomainResult<()> {
        let raw = self.supplier.arrangement()?;
        let id = NEXT_TOPOLOGY_ID.fetch_add(1, Ordering::Relaxed);

        let tree = TreeBuilder::new(id).build(&raw)?;
        check_tree(&tree.arena, &tree.levels)?;

        info!(
            "loaded topology: {} objects, depth {}",
            tree.arena.len(),
            tree.levels.len()
        );
        self.loaded = Some(Loaded {
            arena: tree.arena,
            levels: tree.levels,
        });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub(crate) fn loaded(&self) -> DomainResult<&Loaded> {
        self.loaded.as_ref().ok_or(DomainError::NotLoaded)
    }

    /// Re-runs the consistency checker on the loaded tree.
    pub fn check(&self) -> DomainResult<()> {
        let loaded = self.loaded()?;
        check_tree(&loaded.arena, &loaded.levels)
    }

    pub fn get_info(&self) -> DomainResult<TopologyInfo> {
        Ok(TopologyInfo {
            depth_count: self.loaded()?.levels.len(),
        })
    }

    /// Number of objects at `depth`; 0 for depths below the deepest level.
    pub fn get_nbobjs_by_depth(&self, depth: usize) -> DomainResult<usize> {
        Ok(self.loaded()?.levels.get(depth).map_or(0, Vec::len))
    }

    pub fn get_obj_by_depth(&self, depth: usize, logical_index: usize) -> DomainResult<&Object> {
        let loaded = self.loaded()?;
        let level = loaded.levels.get(depth).ok_or(DomainError::IndexOutOfRange {
            index: depth,
            max: loaded.levels.len(),
        })?;
        let id = level.get(logical_index).ok_or(DomainError::IndexOutOfRange {
            index: logical_index,
            max: level.len(),
        })?;
        self.get_obj(*id)
    }

    /// The root object.
    pub fn get_system_obj(&self) -> DomainResult<&Object> {
        self.get_obj_by_depth(0, 0)
    }

    /// Resolves a handle; handles from another topology or an earlier load
    /// fail with `CrossTopologyQuery`.
    pub fn get_obj(&self, id: ObjId) -> DomainResult<&Object> {
        self.loaded()?
            .arena
            .get(id)
            .ok_or(DomainError::CrossTopologyQuery)
    }

    /// Depth holding objects of `obj_type`, if any.
    pub fn get_type_depth(&self, obj_type: ObjType) -> DomainResult<Option<usize>> {
        let loaded = self.loaded()?;
        for (depth, level) in loaded.levels.iter().enumerate() {
            let first = self.get_obj(level[0])?;
            if first.obj_type == obj_type {
                return Ok(Some(depth));
            }
        }
        Ok(None)
    }

    pub fn get_nbobjs_by_type(&self, obj_type: ObjType) -> DomainResult<usize> {
        match self.get_type_depth(obj_type)? {
            Some(depth) => self.get_nbobjs_by_depth(depth),
            None => Ok(0),
        }
    }

    pub fn get_obj_by_type(&self, obj_type: ObjType, logical_index: usize) -> DomainResult<Option<&Object>> {
        match self.get_type_depth(obj_type)? {
            Some(depth) if logical_index < self.get_nbobjs_by_depth(depth)? => {
                self.get_obj_by_depth(depth, logical_index).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Next object of `obj_type` in ascending logical order.
    ///
    /// `None` as `previous` starts from the first object; the end of the level
    /// (or a `previous` of another type) yields `None`.
    pub fn get_next_obj(&self, obj_type: ObjType, previous: Option<ObjId>) -> DomainResult<Option<&Object>> {
        let next_index = match previous {
            None => 0,
            Some(prev) => {
                let prev = self.get_obj(prev)?;
                if prev.obj_type != obj_type {
                    return Ok(None);
                }
                prev.logical_index + 1
            }
        };
        self.get_obj_by_type(obj_type, next_index)
    }

    /// All objects, parents before children, left to right.
    pub fn objects(&self) -> DomainResult<PreOrderIterator<'_>> {
        Ok(self.loaded()?.arena.iter())
    }

    /// All objects, children before parents.
    pub fn objects_postorder(&self) -> DomainResult<PostOrderIterator<'_>> {
        Ok(self.loaded()?.arena.iter_postorder())
    }

    /// Attaches (or clears) the caller's opaque tag.
    ///
    /// Takes `&mut self`: readers sharing `&Topology` never observe a tag
    /// change mid-query.
    pub fn set_user_tag(&mut self, id: ObjId, tag: Option<UserTag>) -> DomainResult<()> {
        let loaded = self.loaded.as_mut().ok_or(DomainError::NotLoaded)?;
        let obj = loaded
            .arena
            .get_mut(id)
            .ok_or(DomainError::CrossTopologyQuery)?;
        obj.user_tag = tag;
        Ok(())
    }
}
