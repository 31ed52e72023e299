//! Integration tests for locality queries: common ancestors, subtrees and
//! closest-object ranking.

use rstest::rstest;

use topotree::domain::{DomainError, ObjId, ObjType, Topology};
use topotree::util::testing;

fn load(description: &str) -> Topology {
    testing::init_test_setup();
    let mut topology = Topology::new();
    topology.set_synthetic(description).expect("valid description");
    topology.load().expect("load");
    topology
}

fn leaf(topology: &Topology, index: usize) -> ObjId {
    topology
        .get_obj_by_type(ObjType::ProcessingUnit, index)
        .unwrap()
        .unwrap()
        .id()
}

// ============================================================
// Closest objects
// ============================================================

#[test]
fn given_two_three_four_five_when_ranking_last_leaf_then_tiers_widen_to_other_half() {
    // Arrange
    let topology = load("2 3 4 5");
    let depth = topology.get_info().unwrap().depth_count - 1;
    let last = topology.get_obj_by_depth(depth, 119).unwrap().id();

    // Act
    let closest = topology.get_closest_objs(last, 119).unwrap();

    // Assert
    assert_eq!(closest.len(), 119);
    let first_tier: Vec<usize> = closest[..4].iter().map(|o| o.logical_index()).collect();
    assert_eq!(first_tier, vec![115, 116, 117, 118]);
    assert_eq!(closest[0].logical_index(), 115);
    assert_eq!(closest[118].logical_index(), 59);

    let last_tier: Vec<usize> = closest[59..].iter().map(|o| o.logical_index()).collect();
    assert_eq!(last_tier, (0..60).collect::<Vec<_>>());
    assert_eq!(topology.tree_distance(last, leaf(&topology, 0)).unwrap(), 8);

    let ancestor = topology
        .get_common_ancestor_obj(last, closest[118].id())
        .unwrap();
    assert_eq!(ancestor.id(), topology.get_system_obj().unwrap().id());
}

#[rstest]
#[case("2 3 4 5", 0, 200)]
#[case("2 3 4 5", 57, 10)]
#[case("4 4 4", 21, 63)]
#[case("3 1 3", 4, 1)]
fn given_any_target_when_ranking_then_distances_never_decrease(
    #[case] description: &str,
    #[case] index: usize,
    #[case] max_count: usize,
) {
    // Arrange
    let topology = load(description);
    let target = leaf(&topology, index);
    let at_depth = topology.get_nbobjs_by_type(ObjType::ProcessingUnit).unwrap();

    // Act
    let closest = topology.get_closest_objs(target, max_count).unwrap();

    // Assert
    assert_eq!(closest.len(), max_count.min(at_depth - 1));
    assert!(closest.iter().all(|o| o.id() != target));
    let distances: Vec<usize> = closest
        .iter()
        .map(|o| topology.tree_distance(target, o.id()).unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]), "{:?}", distances);
}

#[test]
fn given_inner_object_when_ranking_then_only_same_depth_objects_are_returned() {
    let topology = load("2 3 4");
    let core = topology.get_obj_by_type(ObjType::Core, 4).unwrap().unwrap();

    let closest = topology.get_closest_objs(core.id(), 100).unwrap();

    assert_eq!(closest.len(), 5);
    assert!(closest.iter().all(|o| o.depth() == core.depth()));
    let order: Vec<usize> = closest.iter().map(|o| o.logical_index()).collect();
    assert_eq!(order, vec![3, 5, 0, 1, 2]);
}

#[test]
fn given_zero_max_count_when_ranking_then_empty() {
    let topology = load("2 2");

    let closest = topology.get_closest_objs(leaf(&topology, 1), 0).unwrap();

    assert!(closest.is_empty());
}

// ============================================================
// Common ancestor and subtree
// ============================================================

#[rstest]
#[case(0, 0)]
#[case(0, 1)]
#[case(3, 17)]
#[case(47, 12)]
#[case(23, 24)]
fn given_two_leaves_when_finding_ancestor_then_symmetric_and_contains_both(
    #[case] x: usize,
    #[case] y: usize,
) {
    // Arrange
    let topology = load("2 3 4 2");
    let (x, y) = (leaf(&topology, x), leaf(&topology, y));

    // Act
    let xy = topology.get_common_ancestor_obj(x, y).unwrap();
    let yx = topology.get_common_ancestor_obj(y, x).unwrap();

    // Assert
    assert_eq!(xy.id(), yx.id());
    assert!(topology.is_in_subtree(x, xy.id()).unwrap());
    assert!(topology.is_in_subtree(y, xy.id()).unwrap());
    let both = topology.get_obj(x).unwrap().cpuset() | topology.get_obj(y).unwrap().cpuset();
    assert!(xy.cpuset().includes(&both));
}

#[test]
fn given_same_object_when_finding_ancestor_then_returns_itself() {
    let topology = load("2 2 2");
    let core = topology.get_obj_by_type(ObjType::Core, 2).unwrap().unwrap().id();

    let ancestor = topology.get_common_ancestor_obj(core, core).unwrap();

    assert_eq!(ancestor.id(), core);
}

#[test]
fn given_objects_of_different_depths_when_testing_subtree_then_follows_parent_chain() {
    let topology = load("2 2 2");
    let cache1 = topology.get_obj_by_type(ObjType::Cache, 1).unwrap().unwrap().id();
    let root = topology.get_system_obj().unwrap().id();

    assert!(topology.is_in_subtree(leaf(&topology, 5), cache1).unwrap());
    assert!(!topology.is_in_subtree(leaf(&topology, 2), cache1).unwrap());
    assert!(topology.is_in_subtree(cache1, root).unwrap());
    assert!(!topology.is_in_subtree(root, cache1).unwrap());
}

#[test]
fn given_handles_from_two_topologies_when_finding_ancestor_then_cross_topology_error() {
    let first = load("2 2");
    let second = load("2 2");
    let a = leaf(&first, 0);
    let b = leaf(&second, 1);

    let err = first.get_common_ancestor_obj(a, b).unwrap_err();

    assert_eq!(err, DomainError::CrossTopologyQuery);
    assert_eq!(first.is_in_subtree(b, a).unwrap_err(), DomainError::CrossTopologyQuery);
}

// ============================================================
// Ancestors and cpuset coverage
// ============================================================

#[test]
fn given_leaf_when_asking_ancestor_by_type_then_nearest_match() {
    let topology = load("2 2 2 2");
    let pu = leaf(&topology, 13);

    let package = topology.get_ancestor_obj_by_type(pu, ObjType::Package).unwrap().unwrap();
    let at_depth_2 = topology.get_ancestor_obj_by_depth(pu, 2).unwrap().unwrap();

    assert_eq!(package.logical_index(), 1);
    assert_eq!(at_depth_2.obj_type(), ObjType::Cache);
    assert_eq!(at_depth_2.logical_index(), 3);
    assert!(topology.get_ancestor_obj_by_type(pu, ObjType::Node).unwrap().is_none());
}
