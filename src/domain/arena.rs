use generational_arena::Arena;
use tracing::instrument;

use crate::domain::cpuset::CpuSet;
use crate::domain::object::{ObjId, ObjType, Object};

/// Arena-based storage for one topology tree.
///
/// Objects refer to their parent and children by [`ObjId`], never by owning
/// pointers, so the whole tree is released at once when the arena drops.
#[derive(Debug)]
pub struct ObjectArena {
    /// Identity stamped into every [`ObjId`] handed out by this arena
    topology: u64,
    /// Arena storage for all objects
    arena: Arena<Object>,
    /// Root object, None for an empty arena
    root: Option<ObjId>,
}

impl ObjectArena {
    pub fn new(topology: u64) -> Self {
        Self {
            topology,
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn topology(&self) -> u64 {
        self.topology
    }

    /// Inserts a bare object below `parent` (or as the root).
    ///
    /// Depth, logical index, arity and cpuset are left for the builder to
    /// fill in once the shape is complete.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_object(
        &mut self,
        obj_type: ObjType,
        os_index: Option<usize>,
        parent: Option<ObjId>,
    ) -> ObjId {
        let topology = self.topology;
        let index = self.arena.insert_with(|index| Object {
            id: ObjId { topology, index },
            obj_type,
            depth: 0,
            logical_index: 0,
            os_index,
            cpuset: CpuSet::zero(),
            arity: 0,
            parent,
            children: Vec::new(),
            user_tag: None,
        });
        let id = ObjId { topology, index };

        if let Some(parent_id) = parent {
            if let Some(parent) = self.get_mut(parent_id) {
                parent.children.push(id);
            }
        } else {
            self.root = Some(id);
        }

        id
    }

    /// Looks up an object; handles minted by another arena resolve to None.
    pub fn get(&self, id: ObjId) -> Option<&Object> {
        if id.topology != self.topology {
            return None;
        }
        self.arena.get(id.index)
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        if id.topology != self.topology {
            return None;
        }
        self.arena.get_mut(id.index)
    }

    pub fn root(&self) -> Option<ObjId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> PreOrderIterator<'_> {
        PreOrderIterator::new(self)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Leaves in depth-first, left-to-right order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<ObjId> {
        self.iter()
            .filter(|obj| obj.children.is_empty())
            .map(|obj| obj.id)
            .collect()
    }
}

/// Depth-first pre-order traversal (parents before children, left to right).
pub struct PreOrderIterator<'a> {
    arena: &'a ObjectArena,
    stack: Vec<ObjId>,
}

impl<'a> PreOrderIterator<'a> {
    fn new(arena: &'a ObjectArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PreOrderIterator<'a> {
    type Item = &'a Object;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(obj) = self.arena.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(obj.children.iter().rev().copied());
                return Some(obj);
            }
        }
        None
    }
}

/// Depth-first post-order traversal (children before parents).
pub struct PostOrderIterator<'a> {
    arena: &'a ObjectArena,
    stack: Vec<(ObjId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a ObjectArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push((root, false));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = &'a Object;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(obj) = self.arena.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in obj.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(obj);
                }
            }
        }
        None
    }
}
