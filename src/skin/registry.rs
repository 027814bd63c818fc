//! Ordered influence list of one binding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::geom::Transform;
use crate::scene::node::{NodeId, ShapeKind};

use super::config::{SkinConfig, TangentAlignment};
use super::error::{SkinError, SkinResult};
use super::host::GeometryHost;
use super::ids::InfluenceIndex;

/// Sampling hints carried by a surface influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSampling {
    pub samples_u: usize,
    pub samples_v: usize,
    pub tangent_alignment: TangentAlignment,
}

impl SurfaceSampling {
    #[must_use]
    pub const fn from_config(config: &SkinConfig) -> Self {
        Self {
            samples_u: config.samples_u,
            samples_v: config.samples_v,
            tangent_alignment: config.tangent_alignment,
        }
    }
}

/// What drives an influence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InfluenceKind {
    /// NURBS surface driver; members carry parametric coordinates.
    Surface(SurfaceSampling),
    /// Matrix-only driver; member coordinates are placeholders.
    Transform {
        /// Bind matrix captured directly on the influence when no locator base
        /// was created.
        prebind_matrix: Option<Transform>,
    },
}

impl InfluenceKind {
    #[must_use]
    pub const fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }
}

/// One entry in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Influence {
    pub index: InfluenceIndex,
    pub driver: NodeId,
    pub kind: InfluenceKind,
    /// Back-reference to the bind-pose base node. The influence does not own it.
    pub base: Option<NodeId>,
}

impl Influence {
    #[must_use]
    pub const fn is_transform(&self) -> bool {
        self.kind.is_transform()
    }
}

/// Influences of one binding, keyed by their monotonically assigned index.
#[derive(Debug, Clone, Default)]
pub struct InfluenceRegistry {
    influences: BTreeMap<InfluenceIndex, Influence>,
    by_driver: HashMap<NodeId, InfluenceIndex>,
    next_index: u32,
}

impl InfluenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `driver` can act as an influence of the given kind.
    pub fn validate_driver<H: GeometryHost>(
        host: &H,
        driver: NodeId,
        transform: bool,
    ) -> SkinResult<()> {
        let kind = host.shape_kind(driver).ok_or(SkinError::InvalidDriver(driver))?;
        if transform {
            return Ok(());
        }
        if kind != ShapeKind::Surface {
            return Err(SkinError::InfluenceKindMismatch {
                node: driver,
                expected: ShapeKind::Surface,
                found: kind,
            });
        }
        match host.surface_domain(driver) {
            Some(((u0, u1), (v0, v1))) if u1 > u0 && v1 > v0 => Ok(()),
            _ => Err(SkinError::InvalidDriver(driver)),
        }
    }

    /// Register `driver` under the next free index. A driver that is already
    /// registered keeps its index.
    pub fn add<H: GeometryHost>(
        &mut self,
        host: &H,
        driver: NodeId,
        kind: InfluenceKind,
        base: Option<NodeId>,
    ) -> SkinResult<InfluenceIndex> {
        if let Some(existing) = self.by_driver.get(&driver) {
            return Ok(*existing);
        }
        Self::validate_driver(host, driver, kind.is_transform())?;

        let index = InfluenceIndex(self.next_index);
        self.next_index += 1;
        self.by_driver.insert(driver, index);
        self.influences.insert(
            index,
            Influence {
                index,
                driver,
                kind,
                base,
            },
        );
        Ok(index)
    }

    /// Detach an influence from the registry and return it.
    pub fn remove(&mut self, index: InfluenceIndex) -> SkinResult<Influence> {
        let influence = self
            .influences
            .remove(&index)
            .ok_or(SkinError::UnknownInfluenceIndex(index))?;
        self.by_driver.remove(&influence.driver);
        Ok(influence)
    }

    pub fn resolve_index(&self, driver: NodeId) -> SkinResult<InfluenceIndex> {
        self.by_driver
            .get(&driver)
            .copied()
            .ok_or(SkinError::UnknownInfluence(driver))
    }

    #[must_use]
    pub fn find(&self, driver: NodeId) -> Option<&Influence> {
        self.by_driver
            .get(&driver)
            .and_then(|index| self.influences.get(index))
    }

    pub fn get(&self, index: InfluenceIndex) -> SkinResult<&Influence> {
        self.influences
            .get(&index)
            .ok_or(SkinError::UnknownInfluenceIndex(index))
    }

    pub fn get_mut(&mut self, index: InfluenceIndex) -> SkinResult<&mut Influence> {
        self.influences
            .get_mut(&index)
            .ok_or(SkinError::UnknownInfluenceIndex(index))
    }

    /// True iff the influence driven by `driver` has only a matrix driver.
    pub fn is_transform_influence(&self, driver: NodeId) -> SkinResult<bool> {
        self.find(driver)
            .map(Influence::is_transform)
            .ok_or(SkinError::UnknownInfluence(driver))
    }

    /// Influences sorted by index.
    #[must_use]
    pub fn ordered_list(&self) -> Vec<&Influence> {
        self.influences.values().collect()
    }

    #[must_use]
    pub fn indices(&self) -> Vec<InfluenceIndex> {
        self.influences.keys().copied().collect()
    }

    /// Every base node referenced by an influence, ascending, without repeats.
    #[must_use]
    pub fn bases(&self) -> Vec<NodeId> {
        let mut bases: Vec<NodeId> = self.influences.values().filter_map(|inf| inf.base).collect();
        bases.sort_unstable();
        bases.dedup();
        bases
    }

    /// Number of influences that reference `base`.
    #[must_use]
    pub fn base_consumers(&self, base: NodeId) -> usize {
        self.influences
            .values()
            .filter(|inf| inf.base == Some(base))
            .count()
    }

    #[must_use]
    pub fn base_for_driver(&self, driver: NodeId) -> Option<NodeId> {
        self.find(driver).and_then(|inf| inf.base)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.influences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }
}
