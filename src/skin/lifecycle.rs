//! Binding creation, influence management and influence-base bookkeeping.

use std::collections::BTreeMap;

use crate::scene::SceneError;
use crate::scene::node::{NodeId, ShapeKind};

use super::binding::Binding;
use super::config::{SkinConfig, SolveOptions};
use super::error::{SkinError, SkinResult};
use super::host::GeometryHost;
use super::ids::{BindingId, GeometryIndex, InfluenceIndex};
use super::membership::MembershipMode;
use super::registry::{InfluenceKind, InfluenceRegistry, SurfaceSampling};

const DEFAULT_BINDING_NAME: &str = "surfaceSkin";

/// Every binding of a scene, addressed by [`BindingId`].
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: BTreeMap<BindingId, Binding>,
    next_id: u32,
}

impl BindingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BindingId) -> SkinResult<&Binding> {
        self.bindings.get(&id).ok_or(SkinError::InvalidBinding(id))
    }

    pub fn get_mut(&mut self, id: BindingId) -> SkinResult<&mut Binding> {
        self.bindings
            .get_mut(&id)
            .ok_or(SkinError::InvalidBinding(id))
    }

    pub fn find_by_name(&self, name: &str) -> SkinResult<BindingId> {
        self.bindings
            .values()
            .find(|b| b.name() == name)
            .map(Binding::id)
            .ok_or_else(|| SkinError::UnknownBindingName(name.to_owned()))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<BindingId> {
        self.bindings.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Give every binding `config`; influences bound later sample with it.
    pub fn apply_config(&mut self, config: SkinConfig) {
        for binding in self.bindings.values_mut() {
            binding.set_config(config);
        }
    }

    /// Build a binding over `geometry` and bind every surface in `influences`
    /// with the defaults of `config`.
    pub fn create<H: GeometryHost>(
        &mut self,
        host: &mut H,
        geometry: &[NodeId],
        influences: &[NodeId],
        config: SkinConfig,
        name: &str,
    ) -> SkinResult<BindingId> {
        if geometry.is_empty() {
            return Err(SkinError::NoAffectedGeometry);
        }
        for node in geometry {
            check_geometry(&*host, *node)?;
        }
        for driver in influences {
            InfluenceRegistry::validate_driver(&*host, *driver, false)?;
        }

        let id = BindingId(self.next_id);
        self.next_id += 1;
        let name = self.unique_name(name);
        let mut binding = Binding::new(id, name, config);
        for node in geometry {
            binding.register_geometry(*node);
        }
        log::debug!(
            "created binding '{}' ({id}) over {} geometr(y/ies)",
            binding.name(),
            binding.get_affected_geometry().len()
        );
        self.bindings.insert(id, binding);

        if !influences.is_empty() {
            if let Err(err) = self.add_influence(
                host,
                id,
                influences,
                config.default_weight,
                config.solve_options(false),
            ) {
                self.bindings.remove(&id);
                self.next_id = id.0;
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Bind surface drivers. Each gets an influence base (shared with any
    /// binding already holding one for the same driver) and a full membership
    /// over every affected geometry.
    ///
    /// Nothing is kept on failure: the binding is restored and bases created
    /// by the call are released.
    pub fn add_influence<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        drivers: &[NodeId],
        default_weight: f64,
        options: SolveOptions,
    ) -> SkinResult<Vec<InfluenceIndex>> {
        let snapshot = self.get(binding)?.clone();
        let sampling = SurfaceSampling::from_config(snapshot.config());
        let mut created = Vec::new();

        let result = self.bind_surfaces(
            host,
            binding,
            drivers,
            InfluenceKind::Surface(sampling),
            default_weight,
            options,
            &mut created,
        );
        if result.is_err() {
            self.rollback(host, snapshot, &created);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_surfaces<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        drivers: &[NodeId],
        kind: InfluenceKind,
        default_weight: f64,
        options: SolveOptions,
        created: &mut Vec<NodeId>,
    ) -> SkinResult<Vec<InfluenceIndex>> {
        let mut added = Vec::with_capacity(drivers.len());
        for &driver in drivers {
            if let Some(existing) = self.get(binding)?.registry().find(driver) {
                log::warn!("{driver} already influences binding {binding}; skipped");
                added.push(existing.index);
                continue;
            }
            InfluenceRegistry::validate_driver(&*host, driver, false)?;

            let base = match self.live_base(&*host, driver) {
                Some(base) => base,
                None => {
                    let name = base_name(&*host, driver);
                    let base = host.duplicate_frozen(driver, &name)?;
                    created.push(base);
                    base
                }
            };
            let index = self.register(
                &*host,
                binding,
                driver,
                kind,
                Some(base),
                default_weight,
                options,
            )?;
            added.push(index);
        }
        Ok(added)
    }

    /// Bind transform drivers. With `create_base` each gets a locator base
    /// holding its current matrix; otherwise the matrix is captured onto the
    /// influence itself. Rolls back like [`Self::add_influence`].
    pub fn add_transform_influence<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        drivers: &[NodeId],
        default_weight: f64,
        create_base: bool,
    ) -> SkinResult<Vec<InfluenceIndex>> {
        let snapshot = self.get(binding)?.clone();
        let options = snapshot.config().solve_options(false);
        let mut created = Vec::new();

        let result = self.bind_transforms(
            host,
            binding,
            drivers,
            default_weight,
            create_base,
            options,
            &mut created,
        );
        if result.is_err() {
            self.rollback(host, snapshot, &created);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_transforms<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        drivers: &[NodeId],
        default_weight: f64,
        create_base: bool,
        options: SolveOptions,
        created: &mut Vec<NodeId>,
    ) -> SkinResult<Vec<InfluenceIndex>> {
        let mut added = Vec::with_capacity(drivers.len());
        for &driver in drivers {
            if let Some(existing) = self.get(binding)?.registry().find(driver) {
                log::warn!("{driver} already influences binding {binding}; skipped");
                added.push(existing.index);
                continue;
            }
            InfluenceRegistry::validate_driver(&*host, driver, true)?;
            let matrix = host
                .world_matrix(driver)
                .ok_or(SkinError::InvalidDriver(driver))?;

            let (kind, base) = if create_base {
                let base = match self.live_base(&*host, driver) {
                    Some(base) => base,
                    None => {
                        let name = base_name(&*host, driver);
                        let base = host.create_locator(&name, matrix)?;
                        created.push(base);
                        base
                    }
                };
                (InfluenceKind::Transform { prebind_matrix: None }, Some(base))
            } else {
                (
                    InfluenceKind::Transform {
                        prebind_matrix: Some(matrix),
                    },
                    None,
                )
            };
            let index = self.register(&*host, binding, driver, kind, base, default_weight, options)?;
            added.push(index);
        }
        Ok(added)
    }

    /// Put `snapshot` back in place and drop the bases in `created` that
    /// nothing references any more.
    fn rollback<H: GeometryHost>(&mut self, host: &mut H, snapshot: Binding, created: &[NodeId]) {
        log::debug!("binding {}: influence edit failed; rolled back", snapshot.id());
        self.bindings.insert(snapshot.id(), snapshot);
        for &base in created {
            self.release_base(host, base);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn register<H: GeometryHost>(
        &mut self,
        host: &H,
        binding: BindingId,
        driver: NodeId,
        kind: InfluenceKind,
        base: Option<NodeId>,
        default_weight: f64,
        options: SolveOptions,
    ) -> SkinResult<InfluenceIndex> {
        let entry = self.get_mut(binding)?;
        let index = entry.registry_mut().add(host, driver, kind, base)?;
        entry.claim_active_if_unset(index);

        let geometry: Vec<NodeId> = entry.get_affected_geometry().keys().copied().collect();
        for node in geometry {
            entry.update_all_components(
                host,
                node,
                index,
                default_weight,
                MembershipMode::Set,
                options,
            )?;
        }
        log::debug!("binding {binding}: {driver} registered as influence {index}");
        Ok(index)
    }

    /// Unbind `driver`: wipe its memberships, drop it from the registry, delete
    /// its base once nothing references it and move the active flag if needed.
    pub fn remove_influence<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        driver: NodeId,
    ) -> SkinResult<()> {
        let entry = self.get_mut(binding)?;
        let index = entry.registry().resolve_index(driver)?;
        entry.wipe_influence(index)?;
        let influence = entry.registry_mut().remove(index)?;
        entry.reassign_active(index);
        log::debug!("binding {binding}: influence {index} ({driver}) removed");

        if let Some(base) = influence.base {
            self.release_base(host, base);
        }
        Ok(())
    }

    /// Remove every influence of `binding`, then the binding itself.
    pub fn delete<H: GeometryHost>(&mut self, host: &mut H, binding: BindingId) -> SkinResult<Binding> {
        let drivers = self.get(binding)?.influence_drivers();
        for driver in drivers {
            self.remove_influence(host, binding, driver)?;
        }
        self.bindings
            .remove(&binding)
            .ok_or(SkinError::InvalidBinding(binding))
    }

    /// Attach `geometry` after bind time; every influence gets a full membership
    /// over it.
    pub fn add_geometry<H: GeometryHost>(
        &mut self,
        host: &H,
        binding: BindingId,
        geometry: NodeId,
    ) -> SkinResult<GeometryIndex> {
        check_geometry(host, geometry)?;
        let entry = self.get_mut(binding)?;
        if let Ok(existing) = entry.geometry_index(geometry) {
            log::warn!("{geometry} is already affected by binding {binding}; skipped");
            return Ok(existing);
        }

        let gi = entry.register_geometry(geometry);
        let config = *entry.config();
        let indices = entry.registry().indices();
        for index in indices {
            entry.update_all_components(
                host,
                geometry,
                index,
                config.default_weight,
                MembershipMode::Set,
                config.solve_options(false),
            )?;
        }
        Ok(gi)
    }

    pub fn remove_geometry(&mut self, binding: BindingId, geometry: NodeId) -> SkinResult<()> {
        self.get_mut(binding)?.unregister_geometry(geometry)?;
        Ok(())
    }

    /// Re-capture the bind pose of `driver`. Returns the new base, if any.
    pub fn reset_influence_base<H: GeometryHost>(
        &mut self,
        host: &mut H,
        binding: BindingId,
        driver: NodeId,
    ) -> SkinResult<Option<NodeId>> {
        let influence = self.get(binding)?.influence_of(driver)?.clone();
        let name = base_name(&*host, driver);

        let (kind, base) = match influence.kind {
            InfluenceKind::Surface(_) => (influence.kind, Some(host.duplicate_frozen(driver, &name)?)),
            InfluenceKind::Transform { prebind_matrix } => {
                let matrix = host
                    .world_matrix(driver)
                    .ok_or(SkinError::InvalidDriver(driver))?;
                if prebind_matrix.is_some() {
                    (
                        InfluenceKind::Transform {
                            prebind_matrix: Some(matrix),
                        },
                        None,
                    )
                } else {
                    (influence.kind, Some(host.create_locator(&name, matrix)?))
                }
            }
        };

        let entry = self.get_mut(binding)?.registry_mut().get_mut(influence.index)?;
        entry.kind = kind;
        entry.base = base;
        if let Some(old) = influence.base {
            self.release_base(host, old);
        }
        Ok(base)
    }

    /// Existing base of `driver` in any binding, if it still lives in the host.
    fn live_base<H: GeometryHost>(&self, host: &H, driver: NodeId) -> Option<NodeId> {
        self.bindings
            .values()
            .filter_map(|b| b.registry().base_for_driver(driver))
            .find(|base| host.contains(*base))
    }

    fn base_consumers(&self, base: NodeId) -> usize {
        self.bindings
            .values()
            .map(|b| b.registry().base_consumers(base))
            .sum()
    }

    /// Delete `base` when no influence of any binding references it.
    fn release_base<H: GeometryHost>(&self, host: &mut H, base: NodeId) {
        let consumers = self.base_consumers(base);
        if consumers > 0 {
            log::debug!("base {base} still used by {consumers} influence(s); kept");
            return;
        }
        if let Err(err) = host.delete_node(base) {
            log::warn!("could not delete orphaned base {base}: {err}");
        }
    }

    fn unique_name(&self, requested: &str) -> String {
        let base = if requested.is_empty() {
            DEFAULT_BINDING_NAME
        } else {
            requested
        };
        let taken = |candidate: &str| self.bindings.values().any(|b| b.name() == candidate);
        if !taken(base) {
            return base.to_owned();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_owned())
    }
}

fn base_name<H: GeometryHost>(host: &H, driver: NodeId) -> String {
    host.node_name(driver)
        .map_or_else(|| format!("influence{}Base", driver.0), |n| format!("{n}Base"))
}

/// Affected geometry must exist and carry components.
fn check_geometry<H: GeometryHost>(host: &H, node: NodeId) -> SkinResult<()> {
    match host.shape_kind(node) {
        None => Err(SceneError::UnknownNode(node).into()),
        Some(ShapeKind::Transform) => Err(SkinError::InfluenceKindMismatch {
            node,
            expected: ShapeKind::Mesh,
            found: ShapeKind::Transform,
        }),
        Some(_) => Ok(()),
    }
}
