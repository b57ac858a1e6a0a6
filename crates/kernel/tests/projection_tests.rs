//! Projection scenarios on every carrier type.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::Arc;

use approx::assert_abs_diff_eq;

use construct_kernel::geometry::carrier::{
    ArcCarrier, ArcSelection, CircleCarrier, CurveCarrier, LineCarrier, ParametricCurve,
};
use construct_kernel::geometry::projection::{project, ProjectOptions};
use construct_kernel::{Carrier, Transform};

fn opts() -> ProjectOptions {
    ProjectOptions::default()
}

#[test]
fn segment_clamps_to_its_ends() {
    let seg = Carrier::Line(LineCarrier::segment([1.0, 0.0, 0.0], [1.0, 2.0, 0.0]));
    let proj = project(&[1.0, 5.0, 1.0], &seg, &opts());
    assert_abs_diff_eq!(proj.t, 1.0);
    assert_abs_diff_eq!(proj.coords[1], 2.0);
    assert_abs_diff_eq!(proj.coords[2], 0.0);

    let proj = project(&[1.0, -3.0, 1.0], &seg, &opts());
    assert_abs_diff_eq!(proj.t, 0.0);
    assert_abs_diff_eq!(proj.coords[1], 0.0);
}

#[test]
fn ray_extends_past_its_last_point_only() {
    let ray = Carrier::Line(LineCarrier::new([1.0, 0.0, 0.0], [1.0, 2.0, 0.0], false, true));
    let proj = project(&[1.0, 5.0, 1.0], &ray, &opts());
    assert_abs_diff_eq!(proj.t, 2.5, epsilon = 1e-12);
    assert_abs_diff_eq!(proj.coords[1], 5.0, epsilon = 1e-12);

    let proj = project(&[1.0, -5.0, 1.0], &ray, &opts());
    assert_abs_diff_eq!(proj.t, 0.0);
}

#[test]
fn ideal_first_point_uses_zero_to_two() {
    let line = LineCarrier::line([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
    let range = Carrier::Line(line).range(false);
    assert_eq!(range, (0.0, 2.0));

    // On the finite point the parameter is exactly 1.
    let proj = project(&[1.0, 0.0, 4.0], &Carrier::Line(line), &opts());
    assert_abs_diff_eq!(proj.t, 1.0, epsilon = 1e-12);

    for x in [-100.0, -1.0, 1.0, 100.0] {
        let proj = project(&[1.0, x, 0.0], &Carrier::Line(line), &opts());
        assert!(proj.t > 0.0 && proj.t < 2.0, "t({x}) = {}", proj.t);
        let p = line.point_at(proj.t);
        assert_abs_diff_eq!(p[1] / p[0], x, epsilon = 1e-6);
    }
}

#[test]
fn circle_parameter_counts_turns() {
    let circle = Carrier::Circle(CircleCarrier::new([1.0, 1.0], 2.0));
    let proj = project(&[1.0, 1.0, 5.0], &circle, &opts());
    assert_abs_diff_eq!(proj.t, 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(proj.coords[2], 3.0, epsilon = 1e-12);

    let legacy = ProjectOptions {
        legacy_full_turn: true,
        ..opts()
    };
    let proj = project(&[1.0, 1.0, 5.0], &circle, &legacy);
    assert_abs_diff_eq!(proj.t, PI / 2.0, epsilon = 1e-12);
}

#[test]
fn arc_snaps_outside_points_to_the_nearer_end() {
    let arc = ArcCarrier {
        center: [0.0, 0.0],
        radius_point: [1.0, 0.0],
        angle_point: [0.0, 1.0],
        selection: ArcSelection::Auto,
    };
    let carrier = Carrier::Arc(arc);

    let inside = project(&[1.0, 2.0, 2.0], &carrier, &opts());
    assert!(!inside.reproject);
    assert_abs_diff_eq!(inside.t, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(inside.coords[1], FRAC_1_SQRT_2, epsilon = 1e-12);

    // Just below the start: back to the radius point.
    let below = project(&[1.0, 1.0, -0.1], &carrier, &opts());
    assert!(below.reproject);
    assert_abs_diff_eq!(below.t, 0.0);
    assert_abs_diff_eq!(below.coords[1], 1.0, epsilon = 1e-12);

    // Just past the end: onto the angle point.
    let past = project(&[1.0, -0.1, 1.0], &carrier, &opts());
    assert!(past.reproject);
    assert_abs_diff_eq!(past.t, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(past.coords[2], 1.0, epsilon = 1e-12);
}

#[test]
fn sampled_curve_uses_segment_index_parameter() {
    let curve = Carrier::Curve(CurveCarrier::data(vec![
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 1.0],
    ]));
    let proj = project(&[1.0, 2.0, 0.25], &curve, &opts());
    assert_abs_diff_eq!(proj.t, 1.25, epsilon = 1e-12);
    assert_abs_diff_eq!(proj.coords[1], 1.0, epsilon = 1e-12);
}

#[test]
fn closed_curve_finds_the_global_minimum() {
    let circle = ParametricCurve::new(
        Arc::new(|t: f64| 3.0 * t.cos()),
        Arc::new(|t: f64| 3.0 * t.sin()),
        0.0,
        2.0 * PI,
    )
    .closed();
    let carrier = Carrier::Curve(CurveCarrier::parametric(circle));
    // Seeded on the far side of the circle.
    let options = ProjectOptions {
        previous_t: 0.1,
        ..opts()
    };
    let proj = project(&[1.0, -5.0, 0.0], &carrier, &options);
    assert_abs_diff_eq!(proj.t, PI, epsilon = 1e-4);
    assert_abs_diff_eq!(proj.coords[1], -3.0, epsilon = 1e-6);
}

#[test]
fn transformed_curve_projects_through_the_inverse() {
    let axis = ParametricCurve::new(Arc::new(|t: f64| t), Arc::new(|_: f64| 0.0), -5.0, 5.0);
    let copy = CurveCarrier::parametric(axis).with_transform(Transform::translation(0.0, 2.0));
    let proj = project(&[1.0, 1.5, 3.0], &Carrier::Curve(copy), &opts());
    assert_abs_diff_eq!(proj.t, 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(proj.coords[1], 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(proj.coords[2], 2.0, epsilon = 1e-9);
}

#[test]
fn singular_copy_falls_back_to_sampling() {
    let axis = ParametricCurve::new(Arc::new(|t: f64| t), Arc::new(|t: f64| t), 0.0, 4.0);
    let flat = CurveCarrier::parametric(axis).with_transform(Transform::scaling(1.0, 0.0));
    let proj = project(&[1.0, 2.0, 5.0], &Carrier::Curve(flat), &opts());
    assert!(proj.t.is_finite());
    assert_abs_diff_eq!(proj.coords[1], 2.0, epsilon = 1e-6);
    assert_abs_diff_eq!(proj.coords[2], 0.0, epsilon = 1e-9);
}
