use super::{approx, rig};
use crate::geom::{Point3, Transform, Vec3};
use crate::scene::node::{NodeId, SceneNode};
use crate::skin::{
    Influence, InfluenceIndex, InfluenceKind, SkinConfig, SkinError, SolveOptions,
    SurfaceSampling, compute_coordinates,
};

fn surface_influence(driver: NodeId, base: Option<NodeId>) -> Influence {
    Influence {
        index: InfluenceIndex(0),
        driver,
        kind: InfluenceKind::Surface(SurfaceSampling::from_config(&SkinConfig::default())),
        base,
    }
}

#[test]
fn coordinates_follow_the_projection() {
    let rig = rig();
    let coords = compute_coordinates(
        &rig.scene,
        rig.body,
        &[0, 3, 9],
        &surface_influence(rig.sheet, None),
        SolveOptions::default(),
    )
    .unwrap();
    assert_eq!(coords.keys().copied().collect::<Vec<_>>(), vec![0, 3, 9]);
    let (u, v) = coords[&3];
    assert!(approx(u, 0.35));
    assert!(approx(v, 0.5));
}

#[test]
fn coordinates_never_touch_the_domain_edges() {
    let mut rig = rig();
    let corners = rig
        .scene
        .add_node(SceneNode::mesh(
            "corners",
            vec![
                Point3::new(0.0, 0.0, 0.5),
                Point3::new(10.0, 10.0, 0.5),
                Point3::new(-3.0, 5.0, 0.0),
                Point3::new(5.0, 14.0, -2.0),
                Point3::new(10.0, 0.0, 0.0),
            ],
        ))
        .unwrap();
    let options = SolveOptions::default().tolerance(0.001);
    let coords = compute_coordinates(
        &rig.scene,
        corners,
        &[0, 1, 2, 3, 4],
        &surface_influence(rig.sheet, None),
        options,
    )
    .unwrap();

    assert_eq!(coords.len(), 5);
    for (u, v) in coords.values() {
        for value in [*u, *v] {
            assert!((0.001..=0.999).contains(&value), "{value} escaped the inset domain");
            assert!(value != 0.0 && value != 1.0);
        }
    }
    assert!(approx(coords[&0].0, 0.001));
    assert!(approx(coords[&1].1, 0.999));
}

#[test]
fn far_components_are_rejected() {
    let mut rig = rig();
    let cloud = rig
        .scene
        .add_node(SceneNode::mesh(
            "cloud",
            vec![
                Point3::new(2.0, 2.0, 0.5),
                Point3::new(4.0, 4.0, 2.0),
                Point3::new(6.0, 6.0, -5.0),
                Point3::new(8.0, 8.0, 1.49),
            ],
        ))
        .unwrap();
    let influence = surface_influence(rig.sheet, None);

    let limited = compute_coordinates(
        &rig.scene,
        cloud,
        &[0, 1, 2, 3],
        &influence,
        SolveOptions::default().max_distance(1.5),
    )
    .unwrap();
    assert_eq!(limited.keys().copied().collect::<Vec<_>>(), vec![0, 3]);

    let unlimited = compute_coordinates(
        &rig.scene,
        cloud,
        &[0, 1, 2, 3],
        &influence,
        SolveOptions::default().max_distance(0.0),
    )
    .unwrap();
    assert_eq!(unlimited.len(), 4);
}

#[test]
fn transform_influences_yield_placeholders() {
    let rig = rig();
    let influence = Influence {
        index: InfluenceIndex(1),
        driver: rig.joint,
        kind: InfluenceKind::Transform {
            prebind_matrix: None,
        },
        base: None,
    };
    let coords = compute_coordinates(
        &rig.scene,
        rig.body,
        &[1, 2, 7],
        &influence,
        SolveOptions::default().max_distance(0.01),
    )
    .unwrap();
    assert_eq!(coords.len(), 3);
    assert!(coords.values().all(|uv| *uv == (0.0, 0.0)));
}

#[test]
fn pre_bind_pose_projects_against_the_base() {
    let mut rig = rig();
    let base = rig.scene.duplicate_frozen(rig.sheet, "sheetBase").unwrap();
    rig.scene
        .set_world(rig.sheet, Transform::translate(Vec3::new(2.0, 0.0, 0.0)))
        .unwrap();
    let influence = surface_influence(rig.sheet, Some(base));

    let live = compute_coordinates(&rig.scene, rig.body, &[5], &influence, SolveOptions::default())
        .unwrap();
    let bound = compute_coordinates(
        &rig.scene,
        rig.body,
        &[5],
        &influence,
        SolveOptions::default().use_pre_bind_pose(true),
    )
    .unwrap();

    assert!(approx(live[&5].0, 0.35));
    assert!(approx(bound[&5].0, 0.55));
}

#[test]
fn missing_components_are_skipped() {
    let rig = rig();
    let coords = compute_coordinates(
        &rig.scene,
        rig.body,
        &[8, 42],
        &surface_influence(rig.sheet, None),
        SolveOptions::default(),
    )
    .unwrap();
    assert_eq!(coords.keys().copied().collect::<Vec<_>>(), vec![8]);
}

#[test]
fn transform_influences_skip_missing_components_too() {
    let rig = rig();
    let joint = Influence {
        index: InfluenceIndex(1),
        driver: rig.joint,
        kind: InfluenceKind::Transform { prebind_matrix: None },
        base: None,
    };
    let coords =
        compute_coordinates(&rig.scene, rig.body, &[8, 42], &joint, SolveOptions::default()).unwrap();
    assert_eq!(coords.keys().copied().collect::<Vec<_>>(), vec![8]);
    assert_eq!(coords[&8], (0.0, 0.0));
}

#[test]
fn non_surface_driver_is_rejected() {
    let rig = rig();
    let err = compute_coordinates(
        &rig.scene,
        rig.body,
        &[0],
        &surface_influence(rig.joint, None),
        SolveOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, SkinError::InvalidDriver(rig.joint));
}
