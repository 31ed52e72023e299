//! Topology service
//!
//! Loads a topology from the settings and answers the queries the CLI
//! exposes, resolving textual object references on the way.

use std::sync::Arc;

use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{CpuSet, NodeSet, ObjId, ObjType, Object, Topology};
use crate::infrastructure::affinity;
use crate::render::TopologyRender;

/// One row of the per-depth summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub depth: usize,
    pub obj_type: ObjType,
    pub count: usize,
    /// Children per object at this depth (0 for the leaf level)
    pub arity: usize,
}

/// One result of a closest-objects query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosestEntry {
    pub label: String,
    pub logical_index: usize,
    pub distance: usize,
}

/// Every representation of a cpuset the `mask` command prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskReport {
    pub cpuset: CpuSet,
    pub nodeset: NodeSet,
    pub maxnode: usize,
    /// `cpu_set_t` bytes, just long enough for the highest index
    pub os_mask: Vec<u8>,
    pub covering: Option<String>,
    pub largest: Vec<String>,
}

/// Service for loading and querying topologies.
pub struct TopologyService {
    settings: Arc<Settings>,
}

impl TopologyService {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Builds a topology from the configured supplier.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self) -> ApplicationResult<Topology> {
        let mut topology = Topology::new();
        topology.set_supplier(self.settings.supplier()?);
        topology.load()?;
        Ok(topology)
    }

    /// One entry per depth, root first.
    pub fn levels(&self, topology: &Topology) -> ApplicationResult<Vec<LevelSummary>> {
        let depth_count = topology.get_info()?.depth_count;
        let mut levels = Vec::with_capacity(depth_count);
        for depth in 0..depth_count {
            let first = topology.get_obj_by_depth(depth, 0)?;
            levels.push(LevelSummary {
                depth,
                obj_type: first.obj_type(),
                count: topology.get_nbobjs_by_depth(depth)?,
                arity: first.arity(),
            });
        }
        Ok(levels)
    }

    /// The whole tree rendered with the configured options.
    pub fn render(&self, topology: &Topology) -> ApplicationResult<Tree<String>> {
        Ok(topology.to_tree(&self.settings.render)?)
    }

    /// Resolves `<depth>:<index>` or `<type>:<index>` (e.g. `3:7`, `pu:7`).
    pub fn resolve(&self, topology: &Topology, reference: &str) -> ApplicationResult<ObjId> {
        let invalid = |reason: &str| ApplicationError::InvalidObjectRef {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let (level, index) = reference
            .split_once(':')
            .ok_or_else(|| invalid("expected <depth>:<index> or <type>:<index>"))?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|_| invalid("index is not a number"))?;

        let level = level.trim();
        let depth = match level.parse::<usize>() {
            Ok(depth) => depth,
            Err(_) => {
                let obj_type: ObjType = level.parse().map_err(|e: String| invalid(&e))?;
                topology
                    .get_type_depth(obj_type)?
                    .ok_or_else(|| invalid("no objects of this type"))?
            }
        };

        let id = topology.get_obj_by_depth(depth, index)?.id();
        debug!("resolved {} to {:?}", reference, id);
        Ok(id)
    }

    /// Objects at the target's depth ordered by tree distance.
    ///
    /// `count` falls back to `closest.default_count`.
    #[instrument(level = "debug", skip(self, topology))]
    pub fn closest(
        &self,
        topology: &Topology,
        target: ObjId,
        count: Option<usize>,
    ) -> ApplicationResult<Vec<ClosestEntry>> {
        let count = count.unwrap_or(self.settings.closest.default_count);
        topology
            .get_closest_objs(target, count)?
            .into_iter()
            .map(|obj| {
                Ok(ClosestEntry {
                    label: obj.to_string(),
                    logical_index: obj.logical_index(),
                    distance: topology.tree_distance(target, obj.id())?,
                })
            })
            .collect()
    }

    pub fn common_ancestor<'t>(
        &self,
        topology: &'t Topology,
        a: ObjId,
        b: ObjId,
    ) -> ApplicationResult<&'t Object> {
        Ok(topology.get_common_ancestor_obj(a, b)?)
    }

    /// Affinity and node-mask views of a cpuset given in list form (`0-3,8`).
    #[instrument(level = "debug", skip(self, topology))]
    pub fn mask(&self, topology: &Topology, list: &str) -> ApplicationResult<MaskReport> {
        let cpuset = CpuSet::parse_list(list)?;

        let mut os_mask = vec![0u8; cpuset.last().map_or(1, |last| last / 8 + 1)];
        affinity::to_os_mask(&cpuset, &mut os_mask)?;

        let nodeset = affinity::cpuset_to_nodeset(topology, &cpuset)?;
        let maxnode = nodeset.last().map_or(0, |last| last + 1);

        let covering = topology
            .get_obj_covering_cpuset(&cpuset)?
            .map(ToString::to_string);
        let largest = topology
            .get_largest_objs_inside_cpuset(&cpuset)?
            .into_iter()
            .map(ToString::to_string)
            .collect();

        Ok(MaskReport {
            cpuset,
            nodeset,
            maxnode,
            os_mask,
            covering,
            largest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(synthetic: &str) -> TopologyService {
        TopologyService::new(Arc::new(Settings {
            synthetic: Some(synthetic.to_string()),
            ..Settings::default()
        }))
    }

    #[test]
    fn test_levels_summarize_each_depth() {
        let service = service("2 3");
        let topology = service.load().unwrap();

        let levels = service.levels(&topology).unwrap();

        assert_eq!(
            levels,
            vec![
                LevelSummary { depth: 0, obj_type: ObjType::System, count: 1, arity: 2 },
                LevelSummary { depth: 1, obj_type: ObjType::Core, count: 2, arity: 3 },
                LevelSummary { depth: 2, obj_type: ObjType::ProcessingUnit, count: 6, arity: 0 },
            ]
        );
    }

    #[test]
    fn test_resolve_by_depth_and_by_type() {
        let service = service("2 3");
        let topology = service.load().unwrap();

        let by_depth = service.resolve(&topology, "2:4").unwrap();
        let by_type = service.resolve(&topology, "pu:4").unwrap();

        assert_eq!(by_depth, by_type);
        assert!(matches!(
            service.resolve(&topology, "package:0"),
            Err(ApplicationError::InvalidObjectRef { .. })
        ));
        assert!(matches!(
            service.resolve(&topology, "2"),
            Err(ApplicationError::InvalidObjectRef { .. })
        ));
        assert!(matches!(
            service.resolve(&topology, "2:6"),
            Err(ApplicationError::Domain(_))
        ));
    }

    #[test]
    fn test_closest_uses_default_count() {
        let service = service("4 4");
        let topology = service.load().unwrap();
        let target = service.resolve(&topology, "pu:0").unwrap();

        let entries = service.closest(&topology, target, None).unwrap();

        assert_eq!(entries.len(), 8);
        assert_eq!(entries[0].distance, 2);
        assert_eq!(entries[3].distance, 4);
    }

    #[test]
    fn test_mask_report() {
        let service = service("2 2 2 2 2");
        let topology = service.load().unwrap();

        let report = service.mask(&topology, "0-3,17").unwrap();

        assert_eq!(report.os_mask, vec![0x0f, 0x00, 0x02]);
        assert_eq!(report.nodeset.to_list_string(), "0-1");
        assert_eq!(report.maxnode, 2);
        assert_eq!(report.covering.as_deref(), Some("System#0"));
        assert_eq!(report.largest, vec!["Cache#0", "PU#17(P#17)"]);
    }
}
