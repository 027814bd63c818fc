use crate::geom::{
    NurbsSurface, PlaneSurface, Point3, Surface, SurfaceError, Tolerance, Transform, Vec3,
    clamped_uniform_knots,
};

fn unit_patch() -> NurbsSurface {
    NurbsSurface::clamped(
        1,
        1,
        2,
        2,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
        ],
    )
    .unwrap()
}

#[test]
fn nurbs_surface_bilinear_patch_matches_expected_point() {
    let surface = unit_patch();
    let p = surface.point_at(0.5, 0.5);
    assert!(Tolerance::new(1e-9).approx_eq_point3(p, Point3::new(0.5, 0.5, 0.25)));
    assert_eq!(surface.domain_u(), (0.0, 1.0));
    assert_eq!(surface.domain_v(), (0.0, 1.0));
    assert!(!surface.is_u_closed());
}

#[test]
fn clamped_knots_have_expected_shape() {
    assert_eq!(clamped_uniform_knots(2, 1), vec![0.0, 0.0, 1.0, 1.0]);
    assert_eq!(
        clamped_uniform_knots(5, 3),
        vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn nurbs_constructor_rejects_bad_inputs() {
    let pts = vec![Point3::ORIGIN; 3];
    assert_eq!(
        NurbsSurface::clamped(1, 1, 2, 2, pts).unwrap_err(),
        SurfaceError::ControlPointCount {
            u_count: 2,
            v_count: 2,
            actual: 3
        }
    );
    assert_eq!(
        NurbsSurface::clamped(2, 1, 2, 2, vec![Point3::ORIGIN; 4]).unwrap_err(),
        SurfaceError::InvalidDegree
    );
    let err = NurbsSurface::new(
        1,
        1,
        2,
        2,
        vec![Point3::ORIGIN; 4],
        vec![0.0, 1.0, 0.0, 1.0],
        vec![0.0, 0.0, 1.0, 1.0],
        None,
    )
    .unwrap_err();
    assert_eq!(err, SurfaceError::KnotOrder);
}

#[test]
fn transformed_surface_moves_every_point() {
    let surface = unit_patch();
    let moved = surface.transformed(Transform::translate(Vec3::new(0.0, 0.0, 5.0)));
    let a = surface.point_at(0.3, 0.7);
    let b = moved.point_at(0.3, 0.7);
    assert!(Tolerance::new(1e-9).approx_eq_point3(b, Point3::new(a.x, a.y, a.z + 5.0)));
}

#[test]
fn plane_surface_normal_points_along_cross_product() {
    let plane = PlaneSurface::new(Point3::ORIGIN, Vec3::X, Vec3::Y);
    assert_eq!(plane.normal_at(0.2, 0.2), Some(Vec3::Z));
    assert_eq!(plane.point_at(1.0, 0.5), Point3::new(1.0, 0.5, 0.0));
}

#[test]
fn finite_difference_derivatives_match_plane_axes() {
    let surface = NurbsSurface::clamped(
        1,
        1,
        2,
        2,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
            Point3::new(2.0, 3.0, 0.0),
        ],
    )
    .unwrap();
    let (du, dv) = surface.partial_derivatives_at(0.5, 0.5);
    assert!((du.x - 2.0).abs() < 1e-6 && du.y.abs() < 1e-6);
    assert!((dv.y - 3.0).abs() < 1e-6 && dv.x.abs() < 1e-6);
}
