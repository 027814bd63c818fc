//! Parametric attachment coordinates for geometry components.

use std::collections::BTreeMap;

use crate::geom::{Point3, ProjectionOptions, clamp_to_domain};
use crate::scene::node::NodeId;

use super::config::SolveOptions;
use super::error::{SkinError, SkinResult};
use super::host::GeometryHost;
use super::registry::{Influence, InfluenceKind};

/// Attachment coordinate per component index.
pub type Coordinates = BTreeMap<usize, (f64, f64)>;

/// Compute `(u, v)` for each of `components` of `geometry` against the driver of
/// `influence`.
///
/// Components farther than `options.max_distance` from their projection are
/// omitted when the limit is positive. Components the host cannot position are
/// omitted as well, for either influence kind. Transform influences yield
/// `(0, 0)` for every remaining component.
pub fn compute_coordinates<H: GeometryHost>(
    host: &H,
    geometry: NodeId,
    components: &[usize],
    influence: &Influence,
    options: SolveOptions,
) -> SkinResult<Coordinates> {
    let (ids, positions) = positioned(host, geometry, components);
    let sampling = match influence.kind {
        InfluenceKind::Transform { .. } => {
            return Ok(ids.into_iter().map(|c| (c, (0.0, 0.0))).collect());
        }
        InfluenceKind::Surface(sampling) => sampling,
    };

    let target = projection_target(influence, options.use_pre_bind_pose);
    let (domain_u, domain_v) = host
        .surface_domain(target)
        .ok_or(SkinError::InvalidDriver(target))?;

    let hint = ProjectionOptions::new(sampling.samples_u, sampling.samples_v);
    let hits = host
        .project_onto_surface(target, &positions, hint)
        .ok_or(SkinError::InvalidDriver(target))?;

    let mut out = Coordinates::new();
    let mut rejected = 0usize;
    for (component, hit) in ids.into_iter().zip(hits) {
        if options.max_distance > 0.0 && hit.distance > options.max_distance {
            rejected += 1;
            continue;
        }
        let u = clamp_to_domain(hit.u, domain_u, options.tolerance);
        let v = clamp_to_domain(hit.v, domain_v, options.tolerance);
        out.insert(component, (u, v));
    }

    if rejected > 0 {
        log::debug!(
            "{rejected} component(s) of {geometry} beyond max distance {} from {target}",
            options.max_distance
        );
    }
    Ok(out)
}

/// Components the host can position, with their world positions.
fn positioned<H: GeometryHost>(
    host: &H,
    geometry: NodeId,
    components: &[usize],
) -> (Vec<usize>, Vec<Point3>) {
    let mut ids = Vec::with_capacity(components.len());
    let mut positions = Vec::with_capacity(components.len());
    for &component in components {
        match host.world_position(geometry, component) {
            Some(p) => {
                ids.push(component);
                positions.push(p);
            }
            None => log::debug!("component {component} of {geometry} has no position; skipped"),
        }
    }
    (ids, positions)
}

/// The node projected against: the bind-pose base when requested and present.
fn projection_target(influence: &Influence, use_pre_bind_pose: bool) -> NodeId {
    if !use_pre_bind_pose {
        return influence.driver;
    }
    if let Some(base) = influence.base {
        base
    } else {
        log::warn!(
            "influence {} has no base; using the live driver {}",
            influence.index,
            influence.driver
        );
        influence.driver
    }
}
