//! Closest-point projection onto parametric surfaces.
//!
//! The projection runs in two phases:
//!
//! - **Seed**: sample a regular grid over the surface domain and keep the
//!   sample nearest to the query point. The grid density follows the
//!   per-influence U/V sample hints.
//! - **Refine**: Gauss-Newton iterations on the squared distance, clamped to
//!   the domain (or wrapped on closed directions). A step that does not reduce
//!   the distance is halved until it does or becomes negligible.

use super::core::{Point3, Tolerance};
use super::surface::{Surface, wrap_param};

const SEED_DENSITY: usize = 4;
/// Upper bound on the per-direction sample hint.
pub const MAX_SAMPLES: usize = 64;
const MAX_STEP_HALVINGS: usize = 12;

/// Result of projecting a point onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub u: f64,
    pub v: f64,
    /// Surface point at `(u, v)`.
    pub point: Point3,
    /// Euclidean distance between the query point and `point`.
    pub distance: f64,
}

/// Options for [`closest_point_on_surface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
    /// Seed grid hint along U, used within `2..=MAX_SAMPLES`.
    pub samples_u: usize,
    /// Seed grid hint along V, used within `2..=MAX_SAMPLES`.
    pub samples_v: usize,
    pub max_iterations: usize,
}

impl ProjectionOptions {
    #[must_use]
    pub const fn new(samples_u: usize, samples_v: usize) -> Self {
        Self {
            samples_u,
            samples_v,
            max_iterations: 32,
        }
    }

    #[must_use]
    pub const fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Hard clamp of a parameter into `[min + tolerance, max - tolerance]`.
///
/// A domain narrower than `2 * tolerance` collapses to its midpoint.
#[must_use]
pub fn clamp_to_domain(value: f64, (min, max): (f64, f64), tolerance: f64) -> f64 {
    let tolerance = tolerance.max(0.0);
    let lo = min + tolerance;
    let hi = max - tolerance;
    if lo > hi {
        return 0.5 * (min + max);
    }
    value.clamp(lo, hi)
}

fn constrain(value: f64, (start, end): (f64, f64), closed: bool) -> f64 {
    if closed {
        wrap_param(value, start, end)
    } else {
        value.clamp(start, end)
    }
}

/// Find the point on `surface` closest to `query`.
#[must_use]
pub fn closest_point_on_surface<S: Surface + ?Sized>(
    surface: &S,
    query: Point3,
    options: ProjectionOptions,
) -> SurfacePoint {
    let domain_u = surface.domain_u();
    let domain_v = surface.domain_v();
    let (mut u, mut v) = seed(surface, query, options, domain_u, domain_v);
    let mut best = surface.point_at(u, v).distance_squared_to(query);

    for _ in 0..options.max_iterations {
        let p = surface.point_at(u, v);
        let r = p.sub_point(query);
        let (su, sv) = surface.partial_derivatives_at(u, v);

        let a = su.dot(su);
        let b = su.dot(sv);
        let c = sv.dot(sv);
        let gu = r.dot(su);
        let gv = r.dot(sv);
        let det = a * c - b * b;
        if !det.is_finite() || det.abs() <= f64::EPSILON * (a * c).abs().max(1.0) {
            break;
        }
        let mut step_u = -(c * gu - b * gv) / det;
        let mut step_v = -(a * gv - b * gu) / det;

        let mut improved = false;
        for _ in 0..MAX_STEP_HALVINGS {
            let nu = constrain(u + step_u, domain_u, surface.is_u_closed());
            let nv = constrain(v + step_v, domain_v, surface.is_v_closed());
            let d = surface.point_at(nu, nv).distance_squared_to(query);
            if d < best {
                let moved = (nu - u).abs() + (nv - v).abs();
                u = nu;
                v = nv;
                best = d;
                improved = moved > Tolerance::PARAMETRIC.eps;
                break;
            }
            step_u *= 0.5;
            step_v *= 0.5;
        }
        if !improved {
            break;
        }
    }

    let point = surface.point_at(u, v);
    SurfacePoint {
        u,
        v,
        point,
        distance: point.distance_to(query),
    }
}

fn seed<S: Surface + ?Sized>(
    surface: &S,
    query: Point3,
    options: ProjectionOptions,
    (u0, u1): (f64, f64),
    (v0, v1): (f64, f64),
) -> (f64, f64) {
    let nu = options.samples_u.clamp(2, MAX_SAMPLES) * SEED_DENSITY;
    let nv = options.samples_v.clamp(2, MAX_SAMPLES) * SEED_DENSITY;
    let mut best = (u0, v0, f64::INFINITY);
    for j in 0..=nv {
        let v = v0 + (v1 - v0) * j as f64 / nv as f64;
        for i in 0..=nu {
            let u = u0 + (u1 - u0) * i as f64 / nu as f64;
            let d = surface.point_at(u, v).distance_squared_to(query);
            if d < best.2 {
                best = (u, v, d);
            }
        }
    }
    (best.0, best.1)
}
