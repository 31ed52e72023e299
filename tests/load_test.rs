//! Integration tests for loading: suppliers, atomic commit and consistency checks.

use topotree::domain::{ArrangementSupplier, DomainError, ObjType, RawObject, StaticSupplier, Topology};
use topotree::util::testing;

fn pu() -> RawObject {
    RawObject::new(ObjType::ProcessingUnit)
}

fn core(children: Vec<RawObject>) -> RawObject {
    RawObject::new(ObjType::Core).with_children(children)
}

fn system(children: Vec<RawObject>) -> RawObject {
    RawObject::new(ObjType::System).with_children(children)
}

#[test]
fn given_static_arrangement_with_explicit_os_indices_when_loading_then_counter_skips_them() {
    // Arrange
    testing::init_test_setup();
    let raw = system(vec![
        core(vec![pu(), pu().with_os_index(0)]),
        core(vec![pu(), pu().with_os_index(2)]),
    ]);
    let mut topology = Topology::new();
    topology.set_supplier(Box::new(StaticSupplier::new(raw)));

    // Act
    topology.load().unwrap();

    // Assert
    let os: Vec<Option<usize>> = (0..4)
        .map(|i| topology.get_obj_by_depth(2, i).unwrap().os_index())
        .collect();
    assert_eq!(os, vec![Some(1), Some(0), Some(3), Some(2)]);
    assert_eq!(topology.get_system_obj().unwrap().cpuset().to_list_string(), "0-3");
    assert_eq!(topology.supplier_name(), "static");
    assert!(topology.check().is_ok());
}

#[test]
fn given_loaded_topology_when_reload_fails_then_previous_tree_is_kept() {
    // Arrange
    testing::init_test_setup();
    let mut topology = Topology::new();
    topology.set_synthetic("2 2").unwrap();
    topology.load().unwrap();
    let before = topology.get_system_obj().unwrap().id();

    // leaves at two different depths: the level check rejects it
    let ragged = system(vec![core(vec![pu(), pu()]), pu()]);
    topology.set_supplier(Box::new(StaticSupplier::new(ragged)));

    // Act
    let err = topology.load().unwrap_err();

    // Assert
    assert!(matches!(err, DomainError::TopologyInconsistency { .. }));
    assert_eq!(topology.get_system_obj().unwrap().id(), before);
    assert_eq!(topology.get_nbobjs_by_depth(2).unwrap(), 4);
    assert!(topology.check().is_ok());
}

#[test]
fn given_duplicate_os_indices_when_loading_then_inconsistency_and_nothing_loaded() {
    // Arrange
    let raw = system(vec![pu().with_os_index(3), pu().with_os_index(3)]);
    let mut topology = Topology::new();
    topology.set_supplier(Box::new(StaticSupplier::new(raw)));

    // Act
    let err = topology.load().unwrap_err();

    // Assert
    assert!(matches!(err, DomainError::TopologyInconsistency { .. }));
    assert!(!topology.is_loaded());
    assert_eq!(topology.get_info().unwrap_err(), DomainError::NotLoaded);
}

#[test]
fn given_os_index_beyond_capacity_when_loading_then_index_out_of_range() {
    let raw = system(vec![pu().with_os_index(1024)]);
    let mut topology = Topology::new();
    topology.set_supplier(Box::new(StaticSupplier::new(raw)));

    let err = topology.load().unwrap_err();

    assert!(matches!(err, DomainError::IndexOutOfRange { index: 1024, .. }));
}

#[test]
fn given_node_os_index_beyond_capacity_when_loading_then_index_out_of_range() {
    // Arrange
    let node = RawObject::new(ObjType::Node).with_os_index(5000).with_children(vec![pu()]);
    let mut topology = Topology::new();
    topology.set_supplier(Box::new(StaticSupplier::new(system(vec![node]))));

    // Act
    let err = topology.load().unwrap_err();

    // Assert
    assert!(matches!(err, DomainError::IndexOutOfRange { index: 5000, .. }));
    assert!(!topology.is_loaded());
}

#[test]
fn given_deep_synthetic_description_when_configuring_then_rejected_before_load() {
    let mut topology = Topology::new();

    let err = topology.set_synthetic(&vec!["1"; 200_000].join(" ")).unwrap_err();

    assert!(matches!(err, DomainError::InvalidSyntheticDescription { .. }));
    assert!(topology.load().is_ok());
    assert_eq!(topology.get_info().unwrap().depth_count, 1);
}

#[derive(Debug)]
struct FailingSupplier;

impl ArrangementSupplier for FailingSupplier {
    fn name(&self) -> &str {
        "failing"
    }

    fn arrangement(&self) -> Result<RawObject, DomainError> {
        Err(DomainError::NotLoaded)
    }
}

#[test]
fn given_supplier_error_when_loading_then_error_is_propagated() {
    let mut topology = Topology::new();
    topology.set_supplier(Box::new(FailingSupplier));

    assert_eq!(topology.load().unwrap_err(), DomainError::NotLoaded);
    assert!(!topology.is_loaded());
}

#[test]
fn given_invalid_synthetic_when_configuring_then_previous_supplier_stays() {
    let mut topology = Topology::new();
    topology.set_synthetic("4").unwrap();

    assert!(topology.set_synthetic("4 0").is_err());
    topology.load().unwrap();

    assert_eq!(topology.get_nbobjs_by_type(ObjType::ProcessingUnit).unwrap(), 4);
}

#[test]
fn given_tags_when_setting_then_only_target_changes_and_reload_clears() {
    // Arrange
    let mut topology = Topology::new();
    topology.set_synthetic("2 2").unwrap();
    topology.load().unwrap();
    let core = topology.get_obj_by_type(ObjType::Core, 1).unwrap().unwrap().id();

    // Act
    topology.set_user_tag(core, Some(7)).unwrap();

    // Assert
    let tagged: Vec<_> = topology
        .objects()
        .unwrap()
        .filter_map(|o| o.user_tag().map(|t| (o.to_string(), t)))
        .collect();
    assert_eq!(tagged, vec![("Core#1".to_string(), 7)]);

    topology.load().unwrap();
    assert!(topology.objects().unwrap().all(|o| o.user_tag().is_none()));
}
