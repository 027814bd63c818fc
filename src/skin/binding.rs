//! One skinning binding: influences, affected geometry and their memberships.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::scene::node::NodeId;

use super::config::{SkinConfig, SolveOptions, TangentAlignment};
use super::error::{SkinError, SkinResult};
use super::host::GeometryHost;
use super::ids::{BindingId, GeometryIndex, InfluenceIndex, RecordKey};
use super::membership::{MembershipMode, MembershipStore};
use super::registry::{Influence, InfluenceKind, InfluenceRegistry};
use super::solver::{Coordinates, compute_coordinates};

/// Addressable reference to a bound component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ComponentRef {
    Index(usize),
    /// `geometry.vtx[i]` / `geometry.cv[i]`.
    Path(String),
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// A deformer instance.
#[derive(Debug, Clone)]
pub struct Binding {
    id: BindingId,
    name: String,
    config: SkinConfig,
    registry: InfluenceRegistry,
    geometry: BTreeMap<NodeId, GeometryIndex>,
    next_geometry: u32,
    store: MembershipStore,
    active_influence: Option<InfluenceIndex>,
}

impl Binding {
    pub(crate) fn new(id: BindingId, name: String, config: SkinConfig) -> Self {
        Self {
            id,
            name,
            config,
            registry: InfluenceRegistry::new(),
            geometry: BTreeMap::new(),
            next_geometry: 0,
            store: MembershipStore::new(),
            active_influence: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn config(&self) -> &SkinConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SkinConfig) {
        self.config = config;
    }

    #[must_use]
    pub const fn registry(&self) -> &InfluenceRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &MembershipStore {
        &self.store
    }

    pub(crate) const fn registry_mut(&mut self) -> &mut InfluenceRegistry {
        &mut self.registry
    }

    pub(crate) const fn store_mut(&mut self) -> &mut MembershipStore {
        &mut self.store
    }

    /// Affected geometry and its stable index.
    #[must_use]
    pub const fn get_affected_geometry(&self) -> &BTreeMap<NodeId, GeometryIndex> {
        &self.geometry
    }

    pub fn geometry_index(&self, geometry: NodeId) -> SkinResult<GeometryIndex> {
        self.geometry
            .get(&geometry)
            .copied()
            .ok_or(SkinError::GeometryNotAffected(geometry))
    }

    /// Node carrying the given geometry index.
    #[must_use]
    pub fn geometry_node(&self, index: GeometryIndex) -> Option<NodeId> {
        self.geometry
            .iter()
            .find_map(|(node, gi)| (*gi == index).then_some(*node))
    }

    pub(crate) fn register_geometry(&mut self, geometry: NodeId) -> GeometryIndex {
        if let Some(existing) = self.geometry.get(&geometry) {
            return *existing;
        }
        let index = GeometryIndex(self.next_geometry);
        self.next_geometry += 1;
        self.geometry.insert(geometry, index);
        index
    }

    pub(crate) fn unregister_geometry(&mut self, geometry: NodeId) -> SkinResult<GeometryIndex> {
        let index = self
            .geometry
            .remove(&geometry)
            .ok_or(SkinError::GeometryNotAffected(geometry))?;
        self.store.clear_geometry(index);
        Ok(index)
    }

    pub fn influence_of(&self, driver: NodeId) -> SkinResult<&Influence> {
        self.registry
            .find(driver)
            .ok_or(SkinError::UnknownInfluence(driver))
    }

    /// Drivers of every influence, in index order.
    #[must_use]
    pub fn influence_drivers(&self) -> Vec<NodeId> {
        self.registry
            .ordered_list()
            .into_iter()
            .map(|inf| inf.driver)
            .collect()
    }

    pub fn record_key(&self, geometry: NodeId, driver: NodeId) -> SkinResult<RecordKey> {
        Ok((
            self.geometry_index(geometry)?,
            self.registry.resolve_index(driver)?,
        ))
    }

    /// The influence flagged for interactive weight editing.
    #[must_use]
    pub fn active_influence(&self) -> Option<&Influence> {
        self.active_influence
            .and_then(|index| self.registry.get(index).ok())
    }

    pub fn set_active_influence(&mut self, driver: NodeId) -> SkinResult<()> {
        self.active_influence = Some(self.registry.resolve_index(driver)?);
        Ok(())
    }

    pub(crate) fn claim_active_if_unset(&mut self, index: InfluenceIndex) {
        if self.active_influence.is_none() {
            self.active_influence = Some(index);
        }
    }

    /// Point the active flag at the lowest remaining influence when `removed`
    /// held it.
    pub(crate) fn reassign_active(&mut self, removed: InfluenceIndex) {
        if self.active_influence == Some(removed) {
            self.active_influence = self.registry.indices().first().copied();
            log::debug!(
                "binding '{}': active influence {removed} removed, now {:?}",
                self.name,
                self.active_influence
            );
        }
    }

    /// Edit the membership of `driver` on `geometry`. Every id in
    /// `components` must name a component of `geometry`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_membership<H: GeometryHost>(
        &mut self,
        host: &H,
        geometry: NodeId,
        driver: NodeId,
        components: &[usize],
        default_weight: f64,
        mode: MembershipMode,
        options: SolveOptions,
    ) -> SkinResult<()> {
        let key = self.record_key(geometry, driver)?;
        let influence = self.registry.get(key.1)?.clone();
        let known = host.enumerate_components(geometry)?;
        if let Some(&component) = components.iter().find(|&&c| known.binary_search(&c).is_err()) {
            return Err(SkinError::UnknownComponent {
                geometry,
                component,
            });
        }
        self.store.update(key, components, default_weight, mode, |todo| {
            compute_coordinates(host, geometry, todo, &influence, options)
        })
    }

    /// Apply `mode` over every component of `geometry` for the influence at
    /// `index`.
    pub(crate) fn update_all_components<H: GeometryHost>(
        &mut self,
        host: &H,
        geometry: NodeId,
        index: InfluenceIndex,
        default_weight: f64,
        mode: MembershipMode,
        options: SolveOptions,
    ) -> SkinResult<()> {
        let key = (self.geometry_index(geometry)?, index);
        let influence = self.registry.get(index)?.clone();
        let components = host.enumerate_components(geometry)?;
        self.store.update(key, &components, default_weight, mode, |todo| {
            compute_coordinates(host, geometry, todo, &influence, options)
        })
    }

    /// Remove every member of `index` on every geometry, then drop the
    /// emptied records.
    pub(crate) fn wipe_influence(&mut self, index: InfluenceIndex) -> SkinResult<()> {
        for gi in self.geometry.values().copied().collect::<Vec<_>>() {
            let key = (gi, index);
            let members = self.store.get_index_array(key).to_vec();
            self.store
                .update(key, &members, 0.0, MembershipMode::Remove, |_| {
                    Ok(Coordinates::new())
                })?;
        }
        self.store.clear_influence(index);
        Ok(())
    }

    /// Components of `driver`'s membership, optionally restricted to
    /// `geometry_filter` (empty means every affected geometry).
    pub fn get_influence_membership<H: GeometryHost>(
        &self,
        host: &H,
        driver: NodeId,
        geometry_filter: &[NodeId],
        index_only: bool,
    ) -> SkinResult<Vec<ComponentRef>> {
        let index = self.registry.resolve_index(driver)?;
        let geometries = self.resolve_geometry_filter(geometry_filter)?;

        let mut out = Vec::new();
        for (node, gi) in geometries {
            let members = self.store.get_index_array((gi, index));
            if index_only {
                out.extend(members.iter().map(|&c| ComponentRef::Index(c)));
                continue;
            }
            let name = host
                .node_name(node)
                .map_or_else(|| node.to_string(), str::to_owned);
            let label = host.shape_kind(node).and_then(|k| k.component_label());
            out.extend(members.iter().map(|&c| {
                ComponentRef::Path(match label {
                    Some(label) => format!("{name}.{label}[{c}]"),
                    None => format!("{name}[{c}]"),
                })
            }));
        }
        Ok(out)
    }

    pub(crate) fn resolve_geometry_filter(
        &self,
        filter: &[NodeId],
    ) -> SkinResult<Vec<(NodeId, GeometryIndex)>> {
        if filter.is_empty() {
            return Ok(self.geometry.iter().map(|(n, g)| (*n, *g)).collect());
        }
        filter
            .iter()
            .map(|node| Ok((*node, self.geometry_index(*node)?)))
            .collect()
    }

    pub(crate) fn resolve_influence_filter(
        &self,
        filter: &[NodeId],
    ) -> SkinResult<Vec<InfluenceIndex>> {
        if filter.is_empty() {
            return Ok(self.registry.indices());
        }
        filter
            .iter()
            .map(|driver| self.registry.resolve_index(*driver))
            .collect()
    }

    pub fn get_index_array(&self, geometry: NodeId, driver: NodeId) -> SkinResult<&[usize]> {
        Ok(self.store.get_index_array(self.record_key(geometry, driver)?))
    }

    pub fn get_weight_array(&self, geometry: NodeId, driver: NodeId) -> SkinResult<&[f64]> {
        Ok(self.store.get_weight_array(self.record_key(geometry, driver)?))
    }

    pub fn get_u_array(&self, geometry: NodeId, driver: NodeId) -> SkinResult<&[f64]> {
        Ok(self.store.get_u_array(self.record_key(geometry, driver)?))
    }

    pub fn get_v_array(&self, geometry: NodeId, driver: NodeId) -> SkinResult<&[f64]> {
        Ok(self.store.get_v_array(self.record_key(geometry, driver)?))
    }

    pub fn set_index_array(
        &mut self,
        geometry: NodeId,
        driver: NodeId,
        values: Vec<usize>,
    ) -> SkinResult<()> {
        let key = self.record_key(geometry, driver)?;
        self.store.set_index_array(key, values);
        Ok(())
    }

    pub fn set_weight_array(
        &mut self,
        geometry: NodeId,
        driver: NodeId,
        values: Vec<f64>,
    ) -> SkinResult<()> {
        let key = self.record_key(geometry, driver)?;
        self.store.set_weight_array(key, values);
        Ok(())
    }

    pub fn set_u_array(&mut self, geometry: NodeId, driver: NodeId, values: Vec<f64>) -> SkinResult<()> {
        let key = self.record_key(geometry, driver)?;
        self.store.set_u_array(key, values);
        Ok(())
    }

    pub fn set_v_array(&mut self, geometry: NodeId, driver: NodeId, values: Vec<f64>) -> SkinResult<()> {
        let key = self.record_key(geometry, driver)?;
        self.store.set_v_array(key, values);
        Ok(())
    }

    /// Serialisable snapshot for tooling.
    #[must_use]
    pub fn summary(&self) -> BindingSummary {
        BindingSummary {
            id: self.id.0,
            name: self.name.clone(),
            active_influence: self.active_influence.map(|i| i.0),
            influences: self
                .registry
                .ordered_list()
                .into_iter()
                .map(|inf| InfluenceSummary {
                    index: inf.index.0,
                    driver: inf.driver.0,
                    base: inf.base.map(|b| b.0),
                    transform: inf.is_transform(),
                    tangent_alignment: match inf.kind {
                        InfluenceKind::Surface(s) => Some(s.tangent_alignment),
                        InfluenceKind::Transform { .. } => None,
                    },
                })
                .collect(),
            geometry: self
                .geometry
                .iter()
                .map(|(node, gi)| GeometrySummary {
                    node: node.0,
                    index: gi.0,
                })
                .collect(),
            records: self
                .store
                .records()
                .into_iter()
                .map(|((gi, ii), record)| RecordSummary {
                    geometry: gi.0,
                    influence: ii.0,
                    members: record.len(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingSummary {
    pub id: u32,
    pub name: String,
    pub active_influence: Option<u32>,
    pub influences: Vec<InfluenceSummary>,
    pub geometry: Vec<GeometrySummary>,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceSummary {
    pub index: u32,
    pub driver: usize,
    pub base: Option<usize>,
    pub transform: bool,
    pub tangent_alignment: Option<TangentAlignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeometrySummary {
    pub node: usize,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub geometry: u32,
    pub influence: u32,
    pub members: usize,
}
