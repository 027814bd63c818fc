use super::core::{Point3, Tolerance, Transform, Vec3};

fn is_non_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

pub(crate) fn wrap_param(value: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if !span.is_finite() || span == 0.0 {
        return start;
    }
    let mut t = (value - start) % span;
    if t < 0.0 {
        t += span;
    }
    start + t
}

/// Errors raised while constructing a surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("nurbs surface requires at least a 2x2 control net")]
    ControlNetTooSmall,
    #[error("nurbs surface degrees must be >= 1 and < control point counts")]
    InvalidDegree,
    #[error("control point count {actual} does not match {u_count}x{v_count}")]
    ControlPointCount {
        u_count: usize,
        v_count: usize,
        actual: usize,
    },
    #[error("{direction} knot vector length must be {expected}, got {actual}")]
    KnotCount {
        direction: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("knot vectors must be non-decreasing")]
    KnotOrder,
    #[error("weights must match the control point count and be finite and > 0")]
    InvalidWeights,
    #[error("surface inputs must be finite")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HPoint4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl HPoint4 {
    const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self::new(
            self.x * s + rhs.x * t,
            self.y * s + rhs.y * t,
            self.z * s + rhs.z * t,
            self.w * s + rhs.w * t,
        )
    }

    fn project(self) -> Option<Point3> {
        (self.w.is_finite() && self.w != 0.0)
            .then(|| Point3::new(self.x / self.w, self.y / self.w, self.z / self.w))
    }
}

fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

fn de_boor(d: &mut [HPoint4], span: usize, p: usize, u: f64, knots: &[f64]) {
    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = span - p + j;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}

/// Clamped uniform knot vector for `count` control points of degree `degree`.
#[must_use]
pub fn clamped_uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    let spans = count.saturating_sub(degree).max(1);
    let mut knots = Vec::with_capacity(count + degree + 1);
    knots.extend(std::iter::repeat_n(0.0, degree + 1));
    for i in 1..spans {
        knots.push(i as f64 / spans as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, degree + 1));
    knots
}

/// Parametric surface evaluated in world space.
pub trait Surface {
    fn point_at(&self, u: f64, v: f64) -> Point3;

    #[must_use]
    fn domain_u(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn domain_v(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn is_u_closed(&self) -> bool {
        false
    }

    #[must_use]
    fn is_v_closed(&self) -> bool {
        false
    }

    /// First partial derivatives by one-sided/central finite differences.
    #[must_use]
    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let du = directional_difference(self.domain_u(), self.is_u_closed(), u, |t| {
            self.point_at(t, v)
        });
        let dv = directional_difference(self.domain_v(), self.is_v_closed(), v, |t| {
            self.point_at(u, t)
        });
        (du, dv)
    }

    #[must_use]
    fn normal_at(&self, u: f64, v: f64) -> Option<Vec3> {
        let (du, dv) = self.partial_derivatives_at(u, v);
        du.cross(dv).normalized()
    }
}

fn directional_difference(
    (start, end): (f64, f64),
    closed: bool,
    t: f64,
    eval: impl Fn(f64) -> Point3,
) -> Vec3 {
    let span = end - start;
    if !span.is_finite() || span == 0.0 {
        return Vec3::ZERO;
    }
    let h = Tolerance::DERIVATIVE.relative_to(span);
    let t = if closed { wrap_param(t, start, end) } else { t.clamp(start, end) };
    let (a, b) = if closed {
        (t - h, t + h)
    } else {
        ((t - h).max(start), (t + h).min(end))
    };
    if a == b {
        return Vec3::ZERO;
    }
    eval(b).sub_point(eval(a)).mul_scalar(1.0 / (b - a))
}

// ─────────────────────────────────────────────────────────────────────────────
// PlaneSurface
// ─────────────────────────────────────────────────────────────────────────────

/// Bilinear parallelogram `origin + u * u_axis + v * v_axis` over `[0,1]^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneSurface {
    pub origin: Point3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl PlaneSurface {
    #[must_use]
    pub const fn new(origin: Point3, u_axis: Vec3, v_axis: Vec3) -> Self {
        Self {
            origin,
            u_axis,
            v_axis,
        }
    }
}

impl Surface for PlaneSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin
            .add_vec(self.u_axis.mul_scalar(u))
            .add_vec(self.v_axis.mul_scalar(v))
    }

    fn partial_derivatives_at(&self, _u: f64, _v: f64) -> (Vec3, Vec3) {
        (self.u_axis, self.v_axis)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NurbsSurface
// ─────────────────────────────────────────────────────────────────────────────

/// Rational B-spline surface. Control points are stored u-fastest
/// (`index = v * u_count + u`).
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub u_count: usize,
    pub v_count: usize,
    pub control_points: Vec<Point3>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub weights: Option<Vec<f64>>,
    u_closed: bool,
    v_closed: bool,
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<Point3>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, SurfaceError> {
        if u_count < 2 || v_count < 2 {
            return Err(SurfaceError::ControlNetTooSmall);
        }
        if degree_u == 0 || degree_v == 0 || degree_u >= u_count || degree_v >= v_count {
            return Err(SurfaceError::InvalidDegree);
        }
        if control_points.len() != u_count * v_count {
            return Err(SurfaceError::ControlPointCount {
                u_count,
                v_count,
                actual: control_points.len(),
            });
        }
        if control_points.iter().any(|p| !p.is_finite())
            || knots_u.iter().chain(&knots_v).any(|k| !k.is_finite())
        {
            return Err(SurfaceError::NonFinite);
        }
        for (direction, knots, count, degree) in
            [("u", &knots_u, u_count, degree_u), ("v", &knots_v, v_count, degree_v)]
        {
            let expected = count + degree + 1;
            if knots.len() != expected {
                return Err(SurfaceError::KnotCount {
                    direction,
                    expected,
                    actual: knots.len(),
                });
            }
            if !is_non_decreasing(knots) {
                return Err(SurfaceError::KnotOrder);
            }
        }
        if let Some(weights) = &weights {
            if weights.len() != control_points.len()
                || weights.iter().any(|w| !w.is_finite() || *w <= 0.0)
            {
                return Err(SurfaceError::InvalidWeights);
            }
        }

        let mut surface = Self {
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            knots_u,
            knots_v,
            weights,
            u_closed: false,
            v_closed: false,
        };
        let tol = Tolerance::default_geom();
        surface.u_closed = surface.edges_coincide(true, tol);
        surface.v_closed = surface.edges_coincide(false, tol);
        Ok(surface)
    }

    /// Non-rational surface with clamped uniform knots over `[0,1]^2`.
    pub fn clamped(
        degree_u: usize,
        degree_v: usize,
        u_count: usize,
        v_count: usize,
        control_points: Vec<Point3>,
    ) -> Result<Self, SurfaceError> {
        Self::new(
            degree_u,
            degree_v,
            u_count,
            v_count,
            control_points,
            clamped_uniform_knots(u_count, degree_u),
            clamped_uniform_knots(v_count, degree_v),
            None,
        )
    }

    /// Copy with every control point mapped through `transform`. Affine maps
    /// commute with B-spline evaluation, so the result is the transformed surface.
    #[must_use]
    pub fn transformed(&self, transform: Transform) -> Self {
        let mut copy = self.clone();
        for p in &mut copy.control_points {
            *p = transform.apply_point(*p);
        }
        copy
    }

    fn control_hpoint(&self, u_index: usize, v_index: usize) -> HPoint4 {
        let idx = v_index * self.u_count + u_index;
        let p = self.control_points[idx];
        let w = self
            .weights
            .as_ref()
            .and_then(|weights| weights.get(idx).copied())
            .unwrap_or(1.0);
        HPoint4::new(p.x * w, p.y * w, p.z * w, w)
    }

    fn point_at_clamped(&self, u: f64, v: f64) -> Point3 {
        let p = self.degree_u;
        let q = self.degree_v;
        let span_u = find_span(self.u_count - 1, p, u, &self.knots_u);
        let span_v = find_span(self.v_count - 1, q, v, &self.knots_v);

        let mut column = Vec::with_capacity(q + 1);
        for l in 0..=q {
            let v_index = span_v - q + l;
            let mut row: Vec<HPoint4> = (0..=p)
                .map(|j| self.control_hpoint(span_u - p + j, v_index))
                .collect();
            de_boor(&mut row, span_u, p, u, &self.knots_u);
            column.push(row[p]);
        }
        de_boor(&mut column, span_v, q, v, &self.knots_v);
        column[q].project().unwrap_or(self.control_points[0])
    }

    fn edges_coincide(&self, along_u: bool, tol: Tolerance) -> bool {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        [0.0, 0.5, 1.0].iter().all(|&s| {
            let (a, b) = if along_u {
                let v = v0 + s * (v1 - v0);
                (self.point_at_clamped(u0, v), self.point_at_clamped(u1, v))
            } else {
                let u = u0 + s * (u1 - u0);
                (self.point_at_clamped(u, v0), self.point_at_clamped(u, v1))
            };
            tol.approx_eq_point3(a, b)
        })
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let u = if self.u_closed { wrap_param(u, u0, u1) } else { u.clamp(u0, u1) };
        let v = if self.v_closed { wrap_param(v, v0, v1) } else { v.clamp(v0, v1) };
        self.point_at_clamped(u, v)
    }

    fn domain_u(&self) -> (f64, f64) {
        (self.knots_u[self.degree_u], self.knots_u[self.u_count])
    }

    fn domain_v(&self) -> (f64, f64) {
        (self.knots_v[self.degree_v], self.knots_v[self.v_count])
    }

    fn is_u_closed(&self) -> bool {
        self.u_closed
    }

    fn is_v_closed(&self) -> bool {
        self.v_closed
    }
}
