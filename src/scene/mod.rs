//! In-memory scene-graph host: the nodes a binding reads positions from,
//! projects onto, and duplicates for its bind-pose bases.

use std::collections::HashMap;
use std::fmt;

use wildmatch::WildMatch;

pub mod node;

use crate::geom::Transform;
use node::{NodeId, SceneNode, Shape};

/// Scene container with indices for fast lookups.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    node_index: HashMap<NodeId, usize>,
    name_index: HashMap<String, NodeId>,
    next_id: usize,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. When `node.id` is left at the default a fresh id is issued.
    pub fn add_node(&mut self, mut node: SceneNode) -> Result<NodeId, SceneError> {
        let id = if node.id == NodeId::default() {
            let assigned = NodeId::new(self.next_id.max(1));
            self.next_id = assigned.0 + 1;
            node.id = assigned;
            assigned
        } else {
            self.next_id = self.next_id.max(node.id.0 + 1);
            node.id
        };

        if self.node_index.contains_key(&id) {
            return Err(SceneError::DuplicateNode(id));
        }
        if self.name_index.contains_key(&node.name) {
            return Err(SceneError::DuplicateName(node.name));
        }

        self.node_index.insert(id, self.nodes.len());
        self.name_index.insert(node.name.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Remove a node, returning it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<SceneNode, SceneError> {
        let idx = self
            .node_index
            .remove(&id)
            .ok_or(SceneError::UnknownNode(id))?;
        let node = self.nodes.swap_remove(idx);
        if let Some(moved) = self.nodes.get(idx) {
            self.node_index.insert(moved.id, idx);
        }
        self.name_index.remove(&node.name);
        Ok(node)
    }

    /// Copy `source` under `name` with its world matrix baked into the shape and
    /// every attribute stripped.
    pub fn duplicate_frozen(&mut self, source: NodeId, name: &str) -> Result<NodeId, SceneError> {
        let node = self.node(source).ok_or(SceneError::UnknownNode(source))?;
        if matches!(node.shape, Shape::Transform) {
            return Err(SceneError::NotDuplicable(source));
        }
        let shape = node.shape.frozen(node.world);
        let name = self.unique_name(name);
        self.add_node(SceneNode::new(name, shape))
    }

    /// Add a shape-less transform node named `name` (made unique if taken).
    pub fn add_locator(&mut self, name: &str, world: Transform) -> Result<NodeId, SceneError> {
        let name = self.unique_name(name);
        self.add_node(SceneNode::transform(name, world))
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.node_index.get(&id).and_then(|idx| self.nodes.get(*idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.node_index
            .get(&id)
            .copied()
            .and_then(move |idx| self.nodes.get_mut(idx))
    }

    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    /// Ids of every node whose name matches a `*`/`?` wildcard pattern, in id order.
    #[must_use]
    pub fn find_matching(&self, pattern: &str) -> Vec<NodeId> {
        let wm = WildMatch::new(pattern);
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|node| wm.matches(&node.name))
            .map(|node| node.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Replace the world matrix of a node.
    pub fn set_world(&mut self, id: NodeId, world: Transform) -> Result<(), SceneError> {
        let node = self.node_mut(id).ok_or(SceneError::UnknownNode(id))?;
        node.world = world;
        Ok(())
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.name_index.contains_key(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.name_index.contains_key(candidate))
            .unwrap_or_else(|| base.to_owned())
    }
}

/// Errors raised while editing the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    DuplicateNode(NodeId),
    DuplicateName(String),
    UnknownNode(NodeId),
    NotDuplicable(NodeId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNode(id) => write!(f, "node {id} already exists in the scene"),
            Self::DuplicateName(name) => write!(f, "a node named '{name}' already exists"),
            Self::UnknownNode(id) => write!(f, "node {id} not found in the scene"),
            Self::NotDuplicable(id) => write!(f, "node {id} has no shape to duplicate"),
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Point3, Vec3};

    #[test]
    fn inserting_nodes_creates_indices() {
        let mut scene = Scene::new();
        let id = scene
            .add_node(SceneNode::mesh("body", vec![Point3::ORIGIN]))
            .unwrap();
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.find_by_name("body"), Some(id));
        assert_eq!(scene.node(id).unwrap().name, "body");
    }

    #[test]
    fn duplicate_names_error() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::mesh("body", Vec::new())).unwrap();
        let err = scene
            .add_node(SceneNode::mesh("body", Vec::new()))
            .unwrap_err();
        assert_eq!(err, SceneError::DuplicateName("body".to_owned()));
    }

    #[test]
    fn remove_keeps_remaining_indices_valid() {
        let mut scene = Scene::new();
        let a = scene.add_node(SceneNode::mesh("a", Vec::new())).unwrap();
        let b = scene.add_node(SceneNode::mesh("b", Vec::new())).unwrap();
        let c = scene.add_node(SceneNode::mesh("c", Vec::new())).unwrap();
        scene.remove_node(a).unwrap();
        assert!(scene.node(a).is_none());
        assert_eq!(scene.node(b).unwrap().name, "b");
        assert_eq!(scene.node(c).unwrap().name, "c");
        assert_eq!(scene.find_by_name("a"), None);
        assert_eq!(scene.remove_node(a).unwrap_err(), SceneError::UnknownNode(a));
    }

    #[test]
    fn duplicate_frozen_bakes_world_and_strips_attributes() {
        let mut scene = Scene::new();
        let mut node = SceneNode::curve("wire", vec![Point3::new(1.0, 0.0, 0.0)])
            .with_world(Transform::translate(Vec3::new(0.0, 0.0, 4.0)));
        node.set_attribute("dropoff", 2.0);
        let src = scene.add_node(node).unwrap();

        let copy = scene.duplicate_frozen(src, "wireBase").unwrap();
        let copy_node = scene.node(copy).unwrap();
        assert_eq!(copy_node.world, Transform::identity());
        assert!(copy_node.attributes.is_empty());
        assert_eq!(copy_node.world_position(0), Some(Point3::new(1.0, 0.0, 4.0)));

        let again = scene.duplicate_frozen(src, "wireBase").unwrap();
        assert_eq!(scene.node(again).unwrap().name, "wireBase1");
    }

    #[test]
    fn wildcard_lookup() {
        let mut scene = Scene::new();
        let l = scene.add_node(SceneNode::mesh("arm_L", Vec::new())).unwrap();
        let r = scene.add_node(SceneNode::mesh("arm_R", Vec::new())).unwrap();
        scene.add_node(SceneNode::mesh("leg_L", Vec::new())).unwrap();
        assert_eq!(scene.find_matching("arm_*"), vec![l, r]);
        assert_eq!(scene.find_matching("*_L").len(), 2);
    }
}
