mod test_pruning;
mod test_solver;

use crate::geom::{NurbsSurface, Point3, Transform, Vec3};
use crate::scene::Scene;
use crate::scene::node::{NodeId, SceneNode};

/// Shared scene: a flat 10x10 sheet at z = 0 whose parameters map linearly to
/// x / 10 and y / 10, a row of ten vertices hovering one unit above it, and a
/// joint.
pub(super) struct Rig {
    pub scene: Scene,
    pub sheet: NodeId,
    pub body: NodeId,
    pub joint: NodeId,
}

pub(super) fn flat_sheet(size: f64) -> NurbsSurface {
    NurbsSurface::clamped(
        1,
        1,
        2,
        2,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(0.0, size, 0.0),
            Point3::new(size, size, 0.0),
        ],
    )
    .unwrap()
}

pub(super) fn rig() -> Rig {
    let mut scene = Scene::new();
    let sheet = scene
        .add_node(SceneNode::surface("sheet", flat_sheet(10.0)))
        .unwrap();
    let points = (0..10)
        .map(|i| Point3::new(f64::from(i) + 0.5, 5.0, 1.0))
        .collect();
    let body = scene.add_node(SceneNode::mesh("body", points)).unwrap();
    let joint = scene
        .add_node(SceneNode::transform(
            "joint",
            Transform::translate(Vec3::new(0.0, 0.0, 2.0)),
        ))
        .unwrap();
    Rig {
        scene,
        sheet,
        body,
        joint,
    }
}

pub(super) fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
