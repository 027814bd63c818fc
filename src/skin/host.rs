//! The scene-graph collaborator the engine reads geometry from.

use crate::geom::{Point3, ProjectionOptions, SurfacePoint, Transform, closest_point_on_surface};
use crate::scene::node::{NodeId, ShapeKind};
use crate::scene::{Scene, SceneError};

use super::error::SkinResult;

/// Geometry queries and node edits the engine needs from its host.
///
/// [`Scene`] is the in-crate implementation; an embedding application can
/// implement this over its own scene graph.
pub trait GeometryHost {
    fn contains(&self, node: NodeId) -> bool;

    fn node_name(&self, node: NodeId) -> Option<&str>;

    fn shape_kind(&self, node: NodeId) -> Option<ShapeKind>;

    /// Canonical component indices of `node`, ascending.
    fn enumerate_components(&self, node: NodeId) -> SkinResult<Vec<usize>>;

    fn world_position(&self, node: NodeId, component: usize) -> Option<Point3>;

    fn world_matrix(&self, node: NodeId) -> Option<Transform>;

    /// Project every position onto the world-space surface of `surface`.
    /// `None` when the node carries no surface.
    fn project_onto_surface(
        &self,
        surface: NodeId,
        positions: &[Point3],
        hint: ProjectionOptions,
    ) -> Option<Vec<SurfacePoint>>;

    fn surface_domain(&self, node: NodeId) -> Option<((f64, f64), (f64, f64))>;

    /// Bind-pose copy of `node` with the world matrix baked in and
    /// non-shape attributes stripped.
    fn duplicate_frozen(&mut self, node: NodeId, name: &str) -> SkinResult<NodeId>;

    /// Shape-less node holding `matrix`.
    fn create_locator(&mut self, name: &str, matrix: Transform) -> SkinResult<NodeId>;

    fn delete_node(&mut self, node: NodeId) -> SkinResult<()>;

    fn closest_point_on_surface(
        &self,
        surface: NodeId,
        position: Point3,
        hint: ProjectionOptions,
    ) -> Option<SurfacePoint> {
        self.project_onto_surface(surface, &[position], hint)
            .and_then(|hits| hits.into_iter().next())
    }
}

impl GeometryHost for Scene {
    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.name.as_str())
    }

    fn shape_kind(&self, node: NodeId) -> Option<ShapeKind> {
        self.node(node).map(|n| n.shape.kind())
    }

    fn enumerate_components(&self, node: NodeId) -> SkinResult<Vec<usize>> {
        let node = self.node(node).ok_or(SceneError::UnknownNode(node))?;
        Ok((0..node.shape.component_count()).collect())
    }

    fn world_position(&self, node: NodeId, component: usize) -> Option<Point3> {
        self.node(node)?.world_position(component)
    }

    fn world_matrix(&self, node: NodeId) -> Option<Transform> {
        self.node(node).map(|n| n.world)
    }

    fn project_onto_surface(
        &self,
        surface: NodeId,
        positions: &[Point3],
        hint: ProjectionOptions,
    ) -> Option<Vec<SurfacePoint>> {
        let world = self.node(surface)?.world_surface()?;
        Some(
            positions
                .iter()
                .map(|p| closest_point_on_surface(&world, *p, hint))
                .collect(),
        )
    }

    fn surface_domain(&self, node: NodeId) -> Option<((f64, f64), (f64, f64))> {
        self.node(node)?.surface_domain()
    }

    fn duplicate_frozen(&mut self, node: NodeId, name: &str) -> SkinResult<NodeId> {
        Ok(Scene::duplicate_frozen(self, node, name)?)
    }

    fn create_locator(&mut self, name: &str, matrix: Transform) -> SkinResult<NodeId> {
        Ok(self.add_locator(name, matrix)?)
    }

    fn delete_node(&mut self, node: NodeId) -> SkinResult<()> {
        self.remove_node(node)?;
        Ok(())
    }
}
