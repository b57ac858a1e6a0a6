//! Property-based tests for coordinate conversion, transforms and projection.

use proptest::prelude::*;

use construct_kernel::coords::normalize;
use construct_kernel::geometry::carrier::{CircleCarrier, LineCarrier, PolygonCarrier};
use construct_kernel::geometry::projection::{project_to_circle, project_to_line_raw, project_to_polygon};
use construct_kernel::{Coords, Tolerance, Transform, View};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_point() -> impl Strategy<Value = (f64, f64)> {
    (-1000.0f64..1000.0, -1000.0f64..1000.0)
}

/// Pixels per unit, origin and canvas size.
fn arb_view() -> impl Strategy<Value = View> {
    (1.0f64..200.0, 1.0f64..200.0, -500.0f64..500.0, -500.0f64..500.0)
        .prop_map(|(ux, uy, ox, oy)| View::new(ux, uy, [ox, oy], 800.0, 600.0))
}

fn arb_angle() -> impl Strategy<Value = f64> {
    -std::f64::consts::PI..std::f64::consts::PI
}

/// Non-degenerate scale factor, either sign.
fn arb_scale() -> impl Strategy<Value = f64> {
    prop_oneof![0.1f64..10.0, -10.0f64..-0.1]
}

const TOL: f64 = 1e-6;

// ---------------------------------------------------------------------------
// 1. Screen and user coordinates convert back and forth
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn screen_user_roundtrip((x, y) in arb_point(), view in arb_view()) {
        let c = Coords::from_affine(1.0, x, y, Some(&view));
        let scr = c.scr();
        let back = Coords::from_screen(scr[1], scr[2], Some(&view));
        prop_assert!((back.x() - x).abs() < TOL, "x: {} != {}", back.x(), x);
        prop_assert!((back.y() - y).abs() < TOL, "y: {} != {}", back.y(), y);
    }
}

// ---------------------------------------------------------------------------
// 2. Finite homogeneous input is normalized to w == 1
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn homogeneous_input_is_normalized((x, y) in arb_point(), w in 0.01f64..100.0) {
        let n = normalize([w, x * w, y * w]);
        prop_assert_eq!(n[0], 1.0);
        prop_assert!((n[1] - x).abs() < TOL * (1.0 + x.abs()));
        prop_assert!((n[2] - y).abs() < TOL * (1.0 + y.abs()));
    }
}

// ---------------------------------------------------------------------------
// 3. A composed transform followed by its inverse is the identity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn transform_inverse_roundtrip(
        (x, y) in arb_point(),
        (dx, dy) in arb_point(),
        angle in arb_angle(),
        sx in arb_scale(),
        sy in arb_scale(),
    ) {
        let t = Transform::scaling(sx, sy)
            .then(&Transform::rotation(angle))
            .then(&Transform::translation(dx, dy));
        let inverse = t.inverse().unwrap();
        let p = [1.0, x, y];
        let back = normalize(inverse.apply(&normalize(t.apply(&p))));
        prop_assert!((back[1] - x).abs() < TOL, "x: {} != {}", back[1], x);
        prop_assert!((back[2] - y).abs() < TOL, "y: {} != {}", back[2], y);
    }
}

// ---------------------------------------------------------------------------
// 4. Lines through an ideal point keep the parameter in (-1, 1)
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ideal_line_parameter_is_bounded_and_invertible(
        (qx, qy) in arb_point(),
        (ax, ay) in (-10.0f64..10.0, -10.0f64..10.0),
        theta in 0.1f64..1.4,
    ) {
        let tol = Tolerance::default();
        let line = LineCarrier::line([1.0, ax, ay], [0.0, theta.cos(), theta.sin()]);
        let proj = project_to_line_raw(&[1.0, qx, qy], &line, &tol);
        prop_assert!(proj.t.is_finite());
        prop_assert!(proj.t > -1.0 && proj.t < 1.0, "t = {}", proj.t);

        let p = normalize(line.point_at(proj.t));
        let scale = 1.0 + qx.abs() + qy.abs();
        prop_assert!((p[1] - proj.coords[1]).abs() < TOL * scale);
        prop_assert!((p[2] - proj.coords[2]).abs() < TOL * scale);
    }
}

proptest! {
    #[test]
    fn ideal_line_parameter_is_monotonic(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
        prop_assume!((a - b).abs() > 1e-3);
        let tol = Tolerance::default();
        let line = LineCarrier::line([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let ta = project_to_line_raw(&[1.0, a, 3.0], &line, &tol).t;
        let tb = project_to_line_raw(&[1.0, b, -2.0], &line, &tol).t;
        prop_assert_eq!(a < b, ta < tb, "t({}) = {}, t({}) = {}", a, ta, b, tb);
    }
}

// ---------------------------------------------------------------------------
// 5. Circle projection lands on the circle at its own parameter
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn circle_projection_is_on_circle(
        (qx, qy) in arb_point(),
        (cx, cy) in (-50.0f64..50.0, -50.0f64..50.0),
        r in 0.1f64..100.0,
    ) {
        prop_assume!((qx - cx).hypot(qy - cy) > 1e-3);
        let circle = CircleCarrier::new([cx, cy], r);
        let proj = project_to_circle(&[1.0, qx, qy], &circle, false);
        let d = (proj.coords[1] - cx).hypot(proj.coords[2] - cy);
        prop_assert!((d - r).abs() < TOL * (1.0 + r));
        prop_assert!((0.0..1.0).contains(&proj.t) || (proj.t - 1.0).abs() < TOL);

        let p = circle.point_at(proj.t, std::f64::consts::TAU);
        prop_assert!((p[1] - proj.coords[1]).abs() < TOL * (1.0 + r));
        prop_assert!((p[2] - proj.coords[2]).abs() < TOL * (1.0 + r));
    }
}

// ---------------------------------------------------------------------------
// 6. Polygon projection reports a border and a parameter on it
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn polygon_projection_stays_on_a_border((qx, qy) in arb_point()) {
        let tol = Tolerance::default();
        let square = PolygonCarrier::new(vec![
            [1.0, 0.0, 0.0],
            [1.0, 4.0, 0.0],
            [1.0, 4.0, 4.0],
            [1.0, 0.0, 4.0],
        ]);
        let proj = project_to_polygon(&[1.0, qx, qy], &square, &tol);
        let edge = proj.edge.unwrap();
        prop_assert!(edge < 4);
        prop_assert!((0.0..=1.0).contains(&proj.t), "t = {}", proj.t);

        let p = square.border(edge).point_at(proj.t);
        prop_assert!((p[1] - proj.coords[1]).abs() < TOL);
        prop_assert!((p[2] - proj.coords[2]).abs() < TOL);
    }
}
