//! Tree rendering of a loaded topology with `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::config::RenderConfig;
use crate::domain::{DomainResult, ObjId, Object, Topology};

pub trait TopologyRender {
    fn to_tree(&self, opts: &RenderConfig) -> DomainResult<Tree<String>>;
}

impl TopologyRender for Topology {
    #[instrument(level = "debug", skip(self))]
    fn to_tree(&self, opts: &RenderConfig) -> DomainResult<Tree<String>> {
        let root = self.get_system_obj()?;
        build_tree(self, root.id(), opts)
    }
}

fn build_tree(topology: &Topology, id: ObjId, opts: &RenderConfig) -> DomainResult<Tree<String>> {
    let obj = topology.get_obj(id)?;
    let mut tree = Tree::new(label(obj, opts));
    for &child in obj.children() {
        tree.push(build_tree(topology, child, opts)?);
    }
    Ok(tree)
}

/// e.g. `Core#1 (P#1) 0-1`
pub fn label(obj: &Object, opts: &RenderConfig) -> String {
    let mut label = format!("{}#{}", obj.obj_type(), obj.logical_index());
    if opts.show_os_index {
        if let Some(os) = obj.os_index() {
            label.push_str(&format!(" (P#{})", os));
        }
    }
    if opts.show_cpuset {
        label.push(' ');
        label.push_str(&obj.cpuset().to_list_string());
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(description: &str) -> Topology {
        let mut topology = Topology::new();
        topology.set_synthetic(description).unwrap();
        topology.load().unwrap();
        topology
    }

    #[test]
    fn test_tree_lists_every_object() {
        let topology = loaded("2 2");
        let opts = RenderConfig::default();

        let rendered = topology.to_tree(&opts).unwrap().to_string();

        assert_eq!(rendered.lines().count(), 7);
        assert!(rendered.starts_with("System#0 0-3"));
        assert!(rendered.contains("PU#3 (P#3) 3"));
    }

    #[test]
    fn test_label_honours_options() {
        let topology = loaded("2");
        let pu = topology.get_obj_by_depth(1, 1).unwrap();
        let bare = RenderConfig {
            show_cpuset: false,
            show_os_index: false,
        };

        assert_eq!(label(pu, &bare), "PU#1");
        assert_eq!(label(pu, &RenderConfig::default()), "PU#1 (P#1) 1");
    }
}
