//! Raw arrangement: the nested description a supplier hands to the builder.
//!
//! A supplier only describes shape and identity (types, OS indices, nesting).
//! Depths, logical indices, arities and cpusets are always computed by the
//! builder, so every supplier goes through the same consolidation.

use std::fmt;

use crate::domain::error::DomainResult;
use crate::domain::object::ObjType;

/// One object of a raw arrangement, with its children in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub obj_type: ObjType,
    /// External identifier; leaves without one get a running counter
    pub os_index: Option<usize>,
    pub children: Vec<RawObject>,
}

impl RawObject {
    pub fn new(obj_type: ObjType) -> Self {
        Self {
            obj_type,
            os_index: None,
            children: Vec::new(),
        }
    }

    pub fn with_os_index(mut self, os_index: usize) -> Self {
        self.os_index = Some(os_index);
        self
    }

    pub fn with_children(mut self, children: Vec<RawObject>) -> Self {
        self.children = children;
        self
    }

    /// Total number of objects in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RawObject::count).sum::<usize>()
    }
}

/// Source of a raw arrangement: the synthetic parser or a discovery backend.
///
/// Selected on the topology before load; the topology never inspects which
/// implementation it was given.
pub trait ArrangementSupplier: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produces the nested description to build from.
    fn arrangement(&self) -> DomainResult<RawObject>;
}

/// Supplier that hands out a fixed, caller-built arrangement.
#[derive(Debug, Clone)]
pub struct StaticSupplier {
    root: RawObject,
}

impl StaticSupplier {
    pub fn new(root: RawObject) -> Self {
        Self { root }
    }
}

impl ArrangementSupplier for StaticSupplier {
    fn name(&self) -> &str {
        "static"
    }

    fn arrangement(&self) -> DomainResult<RawObject> {
        Ok(self.root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_includes_all_descendants() {
        let raw = RawObject::new(ObjType::System).with_children(vec![
            RawObject::new(ObjType::Core).with_children(vec![
                RawObject::new(ObjType::ProcessingUnit),
                RawObject::new(ObjType::ProcessingUnit),
            ]),
            RawObject::new(ObjType::Core),
        ]);
        assert_eq!(raw.count(), 5);
    }

    #[test]
    fn test_static_supplier_returns_its_arrangement() {
        let raw = RawObject::new(ObjType::System).with_os_index(0);
        let supplier = StaticSupplier::new(raw.clone());
        assert_eq!(supplier.arrangement().unwrap(), raw);
        assert_eq!(supplier.name(), "static");
    }
}
