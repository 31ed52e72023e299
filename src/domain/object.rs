//! Topology objects: one node of the containment tree.

use std::fmt;
use std::str::FromStr;

use generational_arena::Index;

use crate::domain::cpuset::CpuSet;

/// Kind of resource an object stands for.
///
/// Hardware kinds are ordered from the outermost container to the innermost
/// resource; `Misc` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjType {
    /// The whole machine; always the root.
    System,
    /// NUMA node: a set of processing units sharing local memory
    Node,
    /// Physical package (socket)
    Package,
    Cache,
    Core,
    /// Hardware thread, the leaf of every fully built topology
    ProcessingUnit,
    /// Grouping level with no hardware meaning
    Misc,
}

impl ObjType {
    pub fn name(&self) -> &'static str {
        match self {
            ObjType::System => "System",
            ObjType::Node => "Node",
            ObjType::Package => "Package",
            ObjType::Cache => "Cache",
            ObjType::Core => "Core",
            ObjType::ProcessingUnit => "PU",
            ObjType::Misc => "Misc",
        }
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for ObjType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" | "machine" => Ok(ObjType::System),
            "node" | "numanode" => Ok(ObjType::Node),
            "package" | "socket" => Ok(ObjType::Package),
            "cache" => Ok(ObjType::Cache),
            "core" => Ok(ObjType::Core),
            "pu" | "proc" | "processingunit" => Ok(ObjType::ProcessingUnit),
            "misc" => Ok(ObjType::Misc),
            other => Err(format!("unknown object type: {}", other)),
        }
    }
}

/// Handle to an object inside one loaded topology.
///
/// Carries the identity of the load that produced it, so handles from another
/// topology (or an earlier load) are rejected instead of aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId {
    pub(crate) topology: u64,
    pub(crate) index: Index,
}

/// Opaque caller-owned value attached to an object. Never interpreted here.
pub type UserTag = u64;

/// One node of the topology tree, stored in the topology's arena.
#[derive(Debug, Clone)]
pub struct Object {
    pub(crate) id: ObjId,
    pub(crate) obj_type: ObjType,
    pub(crate) depth: usize,
    pub(crate) logical_index: usize,
    pub(crate) os_index: Option<usize>,
    pub(crate) cpuset: CpuSet,
    pub(crate) arity: usize,
    pub(crate) parent: Option<ObjId>,
    pub(crate) children: Vec<ObjId>,
    pub(crate) user_tag: Option<UserTag>,
}

impl Object {
    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn obj_type(&self) -> ObjType {
        self.obj_type
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position among the objects of the same depth, in tree order.
    pub fn logical_index(&self) -> usize {
        self.logical_index
    }

    pub fn os_index(&self) -> Option<usize> {
        self.os_index
    }

    pub fn cpuset(&self) -> &CpuSet {
        &self.cpuset
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn parent(&self) -> Option<ObjId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn user_tag(&self) -> Option<UserTag> {
        self.user_tag
    }
}

/// Short label, e.g. `Core#3` or `PU#7(P#7)`.
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.obj_type, self.logical_index)?;
        if let Some(os) = self.os_index {
            write!(f, "(P#{})", os)?;
        }
        Ok(())
    }
}
