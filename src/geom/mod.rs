//! Geometry primitives used by the scene host and the coordinate solver.

mod closest;
mod core;
mod surface;

pub use closest::{MAX_SAMPLES, ProjectionOptions, SurfacePoint, clamp_to_domain, closest_point_on_surface};
pub use core::{Point3, Tolerance, Transform, Vec3};
pub use surface::{NurbsSurface, PlaneSurface, Surface, SurfaceError, clamped_uniform_knots};

#[cfg(test)]
mod tests;
