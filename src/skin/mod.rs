//! Surface-attachment skinning engine.
//!
//! A [`Binding`] ties components of affected geometry (mesh vertices, curve and
//! surface control vertices) to parametric locations on driving NURBS surfaces
//! or to transforms. Each `(geometry, influence)` pair owns a
//! [`MembershipRecord`] of four parallel arrays sorted by component index.
//! [`BindingTable`] orchestrates the lifecycle against a [`GeometryHost`].

pub mod binding;
pub mod config;
pub mod error;
pub mod host;
pub mod ids;
pub mod lifecycle;
pub mod membership;
pub mod prune;
pub mod registry;
pub mod solver;

pub use binding::{Binding, BindingSummary, ComponentRef};
pub use config::{SkinConfig, SolveOptions, TangentAlignment};
pub use error::{SkinError, SkinResult};
pub use host::GeometryHost;
pub use ids::{BindingId, GeometryIndex, InfluenceIndex, RecordKey};
pub use lifecycle::BindingTable;
pub use membership::{Member, MembershipMode, MembershipRecord, MembershipStore};
pub use prune::{PruneReport, prune_membership_by_weights, prune_small_weights};
pub use registry::{Influence, InfluenceKind, InfluenceRegistry, SurfaceSampling};
pub use solver::{Coordinates, compute_coordinates};

#[cfg(test)]
mod tests;
