use crate::scene::SceneError;
use crate::scene::node::{NodeId, ShapeKind};

use super::ids::{BindingId, GeometryIndex, InfluenceIndex};

/// Result type for skinning operations.
pub type SkinResult<T> = Result<T, SkinError>;

/// Errors raised by the skinning engine.
///
/// Every variant except [`SkinError::ArrayLengthMismatch`] and
/// [`SkinError::Host`] is a validation error: it is raised immediately and
/// leaves the binding unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkinError {
    #[error("binding {0} does not exist")]
    InvalidBinding(BindingId),
    #[error("no binding named '{0}'")]
    UnknownBindingName(String),
    #[error("node {0} is not an influence of this binding")]
    UnknownInfluence(NodeId),
    #[error("influence index {0} is not registered on this binding")]
    UnknownInfluenceIndex(InfluenceIndex),
    #[error("no affected geometry was supplied")]
    NoAffectedGeometry,
    #[error("node {0} is not affected by this binding")]
    GeometryNotAffected(NodeId),
    #[error("node {geometry} has no component {component}")]
    UnknownComponent { geometry: NodeId, component: usize },
    #[error("node {0} has no usable geometry to drive a binding")]
    InvalidDriver(NodeId),
    #[error("node {node} is a {found}, expected a {expected}")]
    InfluenceKindMismatch {
        node: NodeId,
        expected: ShapeKind,
        found: ShapeKind,
    },
    #[error("unknown membership mode '{0}'")]
    InvalidMode(String),
    #[error(
        "membership arrays for geometry {geometry} / influence {influence} have inconsistent lengths {lengths:?}"
    )]
    ArrayLengthMismatch {
        geometry: GeometryIndex,
        influence: InfluenceIndex,
        /// Lengths of the index, weight, u and v arrays.
        lengths: [usize; 4],
    },
    #[error("scene error: {0}")]
    Host(#[from] SceneError),
}
