use super::rig;
use crate::scene::node::NodeId;
use crate::skin::{
    BindingTable, PruneReport, SkinConfig, SkinError, prune_membership_by_weights,
    prune_small_weights,
};

fn seeded_table() -> (super::Rig, BindingTable, crate::skin::BindingId) {
    let mut rig = rig();
    let mut table = BindingTable::new();
    let id = table
        .create(&mut rig.scene, &[rig.body], &[rig.sheet], SkinConfig::default(), "skin")
        .unwrap();
    table
        .add_transform_influence(&mut rig.scene, id, &[rig.joint], 1.0, false)
        .unwrap();

    let binding = table.get_mut(id).unwrap();
    binding
        .set_index_array(rig.body, rig.sheet, vec![0, 1, 2, 3])
        .unwrap();
    binding
        .set_weight_array(rig.body, rig.sheet, vec![0.9, 0.0, 0.4, 0.02])
        .unwrap();
    binding
        .set_u_array(rig.body, rig.sheet, vec![0.05, 0.15, 0.25, 0.35])
        .unwrap();
    binding
        .set_v_array(rig.body, rig.sheet, vec![0.5; 4])
        .unwrap();
    (rig, table, id)
}

#[test]
fn pruning_membership_removes_light_members() {
    let (rig, mut table, id) = seeded_table();
    let binding = table.get_mut(id).unwrap();

    let report = prune_membership_by_weights(binding, &[], &[rig.sheet], 0.05).unwrap();

    assert_eq!(binding.get_index_array(rig.body, rig.sheet).unwrap(), &[0, 2]);
    assert_eq!(binding.get_weight_array(rig.body, rig.sheet).unwrap(), &[0.9, 0.4]);
    assert_eq!(binding.get_u_array(rig.body, rig.sheet).unwrap(), &[0.05, 0.25]);
    assert_eq!(
        report,
        PruneReport {
            records_visited: 1,
            weights_zeroed: 0,
            members_removed: 2,
        }
    );
}

#[test]
fn pruning_small_weights_keeps_membership() {
    let (rig, mut table, id) = seeded_table();
    let binding = table.get_mut(id).unwrap();

    let report = prune_small_weights(binding, &[rig.body], &[], 0.05).unwrap();

    assert_eq!(binding.get_index_array(rig.body, rig.sheet).unwrap(), &[0, 1, 2, 3]);
    assert_eq!(
        binding.get_weight_array(rig.body, rig.sheet).unwrap(),
        &[0.9, 0.0, 0.4, 0.0]
    );
    // Both records were visited; the joint's weights are all 1.0.
    assert_eq!(report.records_visited, 2);
    assert_eq!(report.weights_zeroed, 1);
    assert_eq!(binding.get_weight_array(rig.body, rig.joint).unwrap(), &[1.0; 10]);
}

#[test]
fn empty_filters_cover_every_record() {
    let (rig, mut table, id) = seeded_table();
    let binding = table.get_mut(id).unwrap();
    binding
        .set_weight_array(rig.body, rig.joint, vec![0.01; 10])
        .unwrap();

    let report = prune_membership_by_weights(binding, &[], &[], 0.05).unwrap();
    assert_eq!(report.records_visited, 2);
    assert_eq!(report.members_removed, 12);
    assert!(binding.get_index_array(rig.body, rig.joint).unwrap().is_empty());
}

#[test]
fn unknown_filter_entries_are_errors() {
    let (rig, mut table, id) = seeded_table();
    let binding = table.get_mut(id).unwrap();

    assert_eq!(
        prune_small_weights(binding, &[NodeId::new(77)], &[], 0.1).unwrap_err(),
        SkinError::GeometryNotAffected(NodeId::new(77))
    );
    assert_eq!(
        prune_membership_by_weights(binding, &[], &[rig.body], 0.1).unwrap_err(),
        SkinError::UnknownInfluence(rig.body)
    );
}

#[test]
fn corrupted_records_stop_pruning() {
    let (rig, mut table, id) = seeded_table();
    let binding = table.get_mut(id).unwrap();
    binding.set_v_array(rig.body, rig.sheet, vec![0.5]).unwrap();

    let err = prune_membership_by_weights(binding, &[], &[rig.sheet], 0.05).unwrap_err();
    assert!(matches!(err, SkinError::ArrayLengthMismatch { lengths: [4, 4, 4, 1], .. }));
}
