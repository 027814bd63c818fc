//! Scene nodes: named shapes with a world matrix and free-form attributes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geom::{NurbsSurface, Point3, Surface, Transform};

/// Identifier for a node within the scene.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of shape a node carries, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Mesh,
    Curve,
    Surface,
    Transform,
}

impl ShapeKind {
    /// Component label used in addressable component names (`name.vtx[3]`).
    #[must_use]
    pub const fn component_label(self) -> Option<&'static str> {
        match self {
            Self::Mesh => Some("vtx"),
            Self::Curve | Self::Surface => Some("cv"),
            Self::Transform => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mesh => "mesh",
            Self::Curve => "curve",
            Self::Surface => "nurbs surface",
            Self::Transform => "transform",
        };
        f.write_str(label)
    }
}

/// Geometry owned by a node, in object space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Mesh { points: Vec<Point3> },
    Curve { points: Vec<Point3> },
    Surface(NurbsSurface),
    Transform,
}

impl Shape {
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Mesh { .. } => ShapeKind::Mesh,
            Self::Curve { .. } => ShapeKind::Curve,
            Self::Surface(_) => ShapeKind::Surface,
            Self::Transform => ShapeKind::Transform,
        }
    }

    /// Object-space positions of the addressable components.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        match self {
            Self::Mesh { points } | Self::Curve { points } => points,
            Self::Surface(surface) => &surface.control_points,
            Self::Transform => &[],
        }
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        self.points().len()
    }

    /// Copy of the shape with `matrix` baked into its points.
    #[must_use]
    pub fn frozen(&self, matrix: Transform) -> Self {
        let bake = |points: &[Point3]| -> Vec<Point3> {
            points.iter().map(|p| matrix.apply_point(*p)).collect()
        };
        match self {
            Self::Mesh { points } => Self::Mesh { points: bake(points) },
            Self::Curve { points } => Self::Curve { points: bake(points) },
            Self::Surface(surface) => Self::Surface(surface.transformed(matrix)),
            Self::Transform => Self::Transform,
        }
    }
}

/// Free-form attribute value stored on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Node representation within the scene.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Unique identifier, assigned by the scene when left at the default.
    pub id: NodeId,
    pub name: String,
    /// Object-to-world matrix.
    pub world: Transform,
    pub shape: Shape,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl SceneNode {
    #[must_use]
    pub fn new<S: Into<String>>(name: S, shape: Shape) -> Self {
        Self {
            id: NodeId::default(),
            name: name.into(),
            world: Transform::identity(),
            shape,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn mesh<S: Into<String>>(name: S, points: Vec<Point3>) -> Self {
        Self::new(name, Shape::Mesh { points })
    }

    #[must_use]
    pub fn curve<S: Into<String>>(name: S, points: Vec<Point3>) -> Self {
        Self::new(name, Shape::Curve { points })
    }

    #[must_use]
    pub fn surface<S: Into<String>>(name: S, surface: NurbsSurface) -> Self {
        Self::new(name, Shape::Surface(surface))
    }

    #[must_use]
    pub fn transform<S: Into<String>>(name: S, world: Transform) -> Self {
        Self::new(name, Shape::Transform).with_world(world)
    }

    #[must_use]
    pub fn with_world(mut self, world: Transform) -> Self {
        self.world = world;
        self
    }

    pub fn set_attribute<S: Into<String>, V: Into<AttributeValue>>(&mut self, key: S, value: V) {
        self.attributes.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn world_position(&self, component: usize) -> Option<Point3> {
        self.shape
            .points()
            .get(component)
            .map(|p| self.world.apply_point(*p))
    }

    /// World-space copy of the surface, if this node carries one.
    #[must_use]
    pub fn world_surface(&self) -> Option<NurbsSurface> {
        match &self.shape {
            Shape::Surface(surface) => Some(surface.transformed(self.world)),
            _ => None,
        }
    }

    #[must_use]
    pub fn surface_domain(&self) -> Option<((f64, f64), (f64, f64))> {
        match &self.shape {
            Shape::Surface(surface) => Some((surface.domain_u(), surface.domain_v())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    #[test]
    fn world_position_applies_matrix() {
        let node = SceneNode::mesh("skin", vec![Point3::new(1.0, 0.0, 0.0)])
            .with_world(Transform::translate(Vec3::new(0.0, 2.0, 0.0)));
        assert_eq!(node.world_position(0), Some(Point3::new(1.0, 2.0, 0.0)));
        assert_eq!(node.world_position(1), None);
    }

    #[test]
    fn frozen_shape_bakes_matrix() {
        let shape = Shape::Curve {
            points: vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)],
        };
        let frozen = shape.frozen(Transform::scale(2.0, 1.0, 1.0));
        assert_eq!(frozen.points()[1], Point3::new(2.0, 0.0, 0.0));
        assert_eq!(frozen.kind(), ShapeKind::Curve);
    }

    #[test]
    fn attributes_roundtrip() {
        let mut node = SceneNode::transform("ctrl", Transform::identity());
        node.set_attribute("visibility", true);
        node.set_attribute("label", "arm");
        assert_eq!(node.attribute("visibility"), Some(&AttributeValue::Boolean(true)));
        assert_eq!(
            node.attribute("label"),
            Some(&AttributeValue::Text("arm".to_owned()))
        );
        assert_eq!(node.shape.component_count(), 0);
    }
}
