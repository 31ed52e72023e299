//! Synthetic topologies described by a list of arities.
//!
//! `"2 3 4"` means: the root has 2 children, each of those has 3, each of
//! those has 4. The last level holds the processing units.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::domain::arrangement::{ArrangementSupplier, RawObject};
use crate::domain::builder::MAX_DEPTH;
use crate::domain::cpuset::MAX_INDEX;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::object::ObjType;

/// Types given to synthetic levels, innermost first.
const LEVEL_TYPES_BOTTOM_UP: [ObjType; 5] = [
    ObjType::ProcessingUnit,
    ObjType::Core,
    ObjType::Cache,
    ObjType::Package,
    ObjType::Node,
];

/// Parsed synthetic description. The default is the empty description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticDescription {
    arities: Vec<usize>,
}

impl SyntheticDescription {
    /// Parses whitespace-separated positive integers.
    #[instrument(level = "debug")]
    pub fn parse(description: &str) -> DomainResult<Self> {
        let mut arities = Vec::new();
        for token in description.split_whitespace() {
            let arity: usize = token.parse().map_err(|_| {
                DomainError::synthetic(description, format!("{:?} is not a positive integer", token))
            })?;
            if arity == 0 {
                return Err(DomainError::synthetic(
                    description,
                    "arity 0 leaves a level without objects",
                ));
            }
            if arities.len() + 1 >= MAX_DEPTH {
                return Err(DomainError::synthetic(
                    description,
                    format!("more than {} levels", MAX_DEPTH),
                ));
            }
            arities.push(arity);
        }

        let leaves = arities
            .iter()
            .try_fold(1usize, |acc, &a| acc.checked_mul(a))
            .filter(|&n| n <= MAX_INDEX)
            .ok_or_else(|| {
                DomainError::synthetic(
                    description,
                    format!("more than {} processing units", MAX_INDEX),
                )
            })?;
        debug!("synthetic: {} levels, {} leaves", arities.len(), leaves);

        Ok(Self { arities })
    }

    pub fn arities(&self) -> &[usize] {
        &self.arities
    }

    /// Number of processing units the description produces.
    pub fn leaf_count(&self) -> usize {
        self.arities.iter().product()
    }

    /// Type of the objects at `depth` (root = 0).
    pub fn level_type(&self, depth: usize) -> ObjType {
        if depth == 0 {
            return ObjType::System;
        }
        let from_bottom = self.arities.len() - depth;
        LEVEL_TYPES_BOTTOM_UP
            .get(from_bottom)
            .copied()
            .unwrap_or(ObjType::Misc)
    }

    /// Expands the description into a nested arrangement.
    ///
    /// Recursion depth is bounded by `MAX_DEPTH` through `parse`.
    /// Leaves get OS indices from a running counter in depth-first order;
    /// NUMA nodes get their position among nodes.
    pub fn to_arrangement(&self) -> RawObject {
        let mut leaf_counter = 0;
        let mut node_counter = 0;
        self.expand(0, &mut leaf_counter, &mut node_counter)
    }

    fn expand(&self, depth: usize, leaf_counter: &mut usize, node_counter: &mut usize) -> RawObject {
        let mut raw = RawObject::new(self.level_type(depth));
        if raw.obj_type == ObjType::Node {
            raw.os_index = Some(*node_counter);
            *node_counter += 1;
        }
        match self.arities.get(depth) {
            Some(&arity) => {
                raw.children = (0..arity)
                    .map(|_| self.expand(depth + 1, leaf_counter, node_counter))
                    .collect();
            }
            None => {
                raw.os_index = Some(*leaf_counter);
                *leaf_counter += 1;
            }
        }
        raw
    }
}

impl FromStr for SyntheticDescription {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SyntheticDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.arities.iter().map(|a| a.to_string()).collect();
        f.write_str(&parts.join(" "))
    }
}

/// Supplier backed by a synthetic description.
#[derive(Debug, Clone)]
pub struct SyntheticSupplier {
    description: SyntheticDescription,
}

impl SyntheticSupplier {
    pub fn new(description: SyntheticDescription) -> Self {
        Self { description }
    }

    pub fn parse(description: &str) -> DomainResult<Self> {
        SyntheticDescription::parse(description).map(Self::new)
    }

    pub fn description(&self) -> &SyntheticDescription {
        &self.description
    }
}

impl ArrangementSupplier for SyntheticSupplier {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn arrangement(&self) -> DomainResult<RawObject> {
        Ok(self.description.to_arrangement())
    }
}
