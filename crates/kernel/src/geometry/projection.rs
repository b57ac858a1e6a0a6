//! Projection of a query point onto a carrier.
//!
//! Every function is pure and deterministic: it returns the projected
//! coordinate together with the glider parameter of that coordinate.

use tracing::debug;

use super::carrier::{
    full_turn, ArcCarrier, Carrier, CircleCarrier, CurveCarrier, CurveShape, LineCarrier,
    ParametricCurve, PolygonCarrier,
};
use super::point::{self, Hom};
use crate::coords::normalize;
use crate::Tolerance;

/// Result of projecting onto a carrier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Projected homogeneous coordinate.
    pub coords: Hom,
    /// Glider parameter of `coords` on the carrier.
    pub t: f64,
    /// Polygon border that won, if the carrier is a polygon.
    pub edge: Option<usize>,
    /// The raw projection left the valid range and was pulled back; the
    /// caller has to re-derive the coordinate from `t`.
    pub reproject: bool,
}

impl Projection {
    pub fn new(coords: Hom, t: f64) -> Self {
        Self {
            coords,
            t,
            edge: None,
            reproject: false,
        }
    }
}

/// Inputs shared by all projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectOptions {
    pub tolerance: Tolerance,
    /// Circle parameters count radians instead of turns.
    pub legacy_full_turn: bool,
    /// Parameter of the glider before this projection, used as the seed of
    /// the local curve search and passed through by point carriers.
    pub previous_t: f64,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            legacy_full_turn: false,
            previous_t: 0.0,
        }
    }
}

/// Project onto any carrier.
pub fn project(q: &Hom, carrier: &Carrier, opts: &ProjectOptions) -> Projection {
    match carrier {
        Carrier::Point(p) => project_to_point(p, opts.previous_t),
        Carrier::Line(l) => clamp_to_segment(l, project_to_line_raw(q, l, &opts.tolerance)),
        Carrier::Circle(c) => project_to_circle(q, c, opts.legacy_full_turn),
        Carrier::Arc(a) => project_to_arc(q, a, opts.legacy_full_turn),
        Carrier::Curve(c) => project_to_curve(q, c, opts),
        Carrier::Polygon(p) => project_to_polygon(q, p, &opts.tolerance),
    }
}

/// Projecting onto a point yields the point itself; the parameter passes through.
pub fn project_to_point(target: &Hom, previous_t: f64) -> Projection {
    Projection::new(*target, previous_t)
}

/// Orthogonal foot of `q` on the homogeneous line `stdform`.
pub fn foot_on_line(q: &Hom, stdform: &Hom) -> Hom {
    let normal = [0.0, stdform[1], stdform[2]];
    let perpendicular = point::cross(&normal, q);
    normalize(point::cross(&perpendicular, stdform))
}

/// Orthogonal projection onto a line without segment clamping.
pub fn project_to_line_raw(q: &Hom, line: &LineCarrier, tol: &Tolerance) -> Projection {
    let (p1, p2) = (line.p1, line.p2);

    if point::is_void(&p1) || point::is_void(&p2) {
        return Projection::new([0.0, 0.0, 0.0], 0.0);
    }

    // Coincident defining points: the line degenerates to p1.
    let same_weight = tol.is_ideal(p1[0]) == tol.is_ideal(p2[0]);
    if same_weight && tol.is_zero_length((p1[1] - p2[1]).hypot(p1[2] - p2[2])) {
        return Projection::new(p1, 0.0);
    }

    let foot = foot_on_line(q, &line.stdform());

    let t = if tol.is_ideal(p2[0]) {
        let i = if p2[1].abs() < tol.eps { 2 } else { 1 };
        let d = (foot[i] - p1[i]) / p2[i];
        let sgn = if d >= 0.0 { 1.0 } else { -1.0 };
        let d = d.abs();
        sgn * d / (d + 1.0)
    } else if tol.is_ideal(p1[0]) {
        let i = if p1[1].abs() < tol.eps { 2 } else { 1 };
        let d = (foot[i] - p2[i]) / p1[i];
        if d < 0.0 {
            (1.0 - 2.0 * d) / (1.0 - d)
        } else {
            1.0 / (d + 1.0)
        }
    } else {
        let dx = p2[1] - p1[1];
        let i = if dx.abs() < tol.eps { 2 } else { 1 };
        (foot[i] - p1[i]) / (p2[i] - p1[i])
    };

    Projection::new(foot, t)
}

/// Pull a raw line projection back onto the finite ends of a segment or ray.
pub fn clamp_to_segment(line: &LineCarrier, mut proj: Projection) -> Projection {
    if !line.straight_first && !point::is_ideal(&line.p1) && proj.t < 0.0 {
        proj.coords = line.p1;
        proj.t = 0.0;
    }
    if !line.straight_last && !point::is_ideal(&line.p2) && proj.t > 1.0 {
        proj.coords = line.p2;
        proj.t = 1.0;
    }
    proj
}

/// Projection onto a line, clamped to the segment where the line does not extend.
pub fn project_to_line(q: &Hom, line: &LineCarrier, tol: &Tolerance) -> Projection {
    clamp_to_segment(line, project_to_line_raw(q, line, tol))
}

/// Projection onto a finite segment `p1`-`p2` with the unclamped segment parameter.
pub fn project_to_segment(q: &Hom, p1: &Hom, p2: &Hom, tol: &Tolerance) -> (Hom, f64) {
    let s = [p2[1] - p1[1], p2[2] - p1[2]];
    if s[0].abs() < tol.eps && s[1].abs() < tol.eps {
        return (*p1, 0.0);
    }
    let q = normalize(*q);
    let v = [q[1] - p1[1], q[2] - p1[2]];
    let t = (v[0] * s[0] + v[1] * s[1]) / (s[0] * s[0] + s[1] * s[1]);
    ([1.0, p1[1] + t * s[0], p1[2] + t * s[1]], t)
}

/// Radial projection onto a circle; the parameter is the angle from the
/// positive x axis divided by a full turn.
pub fn project_to_circle(q: &Hom, circle: &CircleCarrier, legacy_full_turn: bool) -> Projection {
    let q = normalize(*q);
    let [cx, cy] = circle.center;
    let mut dist = (q[1] - cx).hypot(q[2] - cy);
    if dist.abs() < crate::EPS {
        dist = crate::EPS;
    }
    let factor = circle.radius / dist;
    let coords = [1.0, cx + factor * (q[1] - cx), cy + factor * (q[2] - cy)];
    let angle = point::rad([cx + 1.0, cy], circle.center, [q[1], q[2]]);
    Projection::new(coords, angle / full_turn(legacy_full_turn))
}

/// Projection onto an arc or sector, restricted to its angular range.
///
/// Angles outside `[alpha, beta]` snap to the nearer bound and the result is
/// flagged for re-projection from the parameter.
pub fn project_to_arc(q: &Hom, arc: &ArcCarrier, legacy_full_turn: bool) -> Projection {
    let q = normalize(*q);
    let circle = CircleCarrier::new(arc.center, arc.radius());
    let on_circle = project_to_circle(&q, &circle, legacy_full_turn);

    let angle = point::rad(arc.radius_point, arc.center, [q[1], q[2]]);
    let (alpha, beta) = arc.angular_range();
    let mut position = angle;
    let mut reproject = false;

    if angle < alpha || angle > beta {
        position = beta;
        if (angle < alpha && angle > alpha * 0.5)
            || (angle > beta && angle > beta * 0.5 + std::f64::consts::PI)
        {
            position = alpha;
        }
        reproject = true;
    }

    let delta = if legacy_full_turn { 1.0 } else { beta - alpha };
    let mut t = position - alpha;
    if delta.abs() > crate::EPS {
        t /= delta;
    }

    let coords = if reproject {
        arc.point_at(t, legacy_full_turn)
    } else {
        on_circle.coords
    };

    Projection {
        coords,
        t,
        edge: None,
        reproject,
    }
}

/// Projection onto a curve.
///
/// Transformed curves are handled by mapping the query back through the
/// inverse transform, projecting onto the source shape and mapping forward.
pub fn project_to_curve(q: &Hom, curve: &CurveCarrier, opts: &ProjectOptions) -> Projection {
    let q = normalize(*q);
    match &curve.transform {
        None => project_to_shape(&q, &curve.shape, opts),
        Some(m) => match m.inverse() {
            Ok(inv) => {
                let source_q = normalize(inv.apply(&q));
                let mut proj = project_to_shape(&source_q, &curve.shape, opts);
                proj.coords = normalize(m.apply(&proj.coords));
                proj
            }
            // Singular copy: scan the transformed samples directly.
            Err(e) => {
                debug!(error = %e, "singular curve transform, scanning samples");
                let (min, max) = curve.range();
                let samples = opts.tolerance.scan_samples.max(2);
                let points: Vec<Hom> = (0..=samples)
                    .map(|k| curve.point_at(min + (max - min) * k as f64 / samples as f64))
                    .collect();
                let mut proj = project_to_polyline(&q, &points, &opts.tolerance);
                proj.t = min + (max - min) * proj.t / samples as f64;
                proj
            }
        },
    }
}

fn project_to_shape(q: &Hom, shape: &CurveShape, opts: &ProjectOptions) -> Projection {
    match shape {
        CurveShape::Data(points) => project_to_polyline(q, points, &opts.tolerance),
        CurveShape::Parametric(c) => project_to_parametric(q, c, opts),
    }
}

/// Nearest point on a sampled path. The parameter is `i + s` on segment `i`.
pub fn project_to_polyline(q: &Hom, points: &[Hom], tol: &Tolerance) -> Projection {
    let Some(first) = points.first() else {
        return Projection::new([0.0, 1.0, 1.0], 0.0);
    };
    let mut best = Projection::new(*first, 0.0);
    if points.len() == 1 {
        return best;
    }

    let mut min_dist = f64::INFINITY;
    let last_segment = points.len() - 2;
    for (i, pair) in points.windows(2).enumerate() {
        let (p1, p2) = (&pair[0], &pair[1]);
        let (foot, s) = project_to_segment(q, p1, p2, tol);
        let (coords, t) = if (0.0..=1.0).contains(&s) {
            (foot, i as f64 + s)
        } else if s < 0.0 {
            (*p1, i as f64)
        } else if i == last_segment {
            (*p2, (i + 1) as f64)
        } else {
            // Past the end of an inner segment: the next segment covers it.
            continue;
        };
        let dist = point::distance(&coords, q);
        if dist < min_dist {
            min_dist = dist;
            best = Projection::new(coords, t);
        }
    }
    best
}

fn squared_distance(curve: &ParametricCurve, q: &Hom, t: f64) -> f64 {
    if t < curve.min || t > curve.max {
        return f64::INFINITY;
    }
    let dx = q[1] - (curve.x)(t);
    let dy = q[2] - (curve.y)(t);
    dx * dx + dy * dy
}

/// Newton iteration on the derivative of the squared distance, seeded at `t0`.
///
/// Returns `None` if the iteration leaves the domain, hits a maximum of the
/// distance, or fails to converge.
fn newton_refine(curve: &ParametricCurve, q: &Hom, t0: f64, tol: &Tolerance) -> Option<f64> {
    let span = curve.max - curve.min;
    let h = (span.abs() * 1e-6).max(1e-9);
    let mut t = t0.clamp(curve.min, curve.max);

    for _ in 0..tol.newton_iterations {
        let lo = (t - h).max(curve.min);
        let hi = (t + h).min(curve.max);
        let f_lo = squared_distance(curve, q, lo);
        let f_mid = squared_distance(curve, q, t);
        let f_hi = squared_distance(curve, q, hi);
        let step_lo = t - lo;
        let step_hi = hi - t;
        if step_lo <= 0.0 || step_hi <= 0.0 {
            // At the domain boundary: accept when the distance grows inward.
            let inward = if step_lo <= 0.0 { f_hi } else { f_lo };
            return (inward >= f_mid).then_some(t);
        }
        let d1 = (f_hi - f_lo) / (step_lo + step_hi);
        let d2 = 2.0 * (f_hi * step_lo - f_mid * (step_lo + step_hi) + f_lo * step_hi)
            / (step_lo * step_hi * (step_lo + step_hi));
        if !d1.is_finite() || !d2.is_finite() || d2 <= 0.0 {
            return None;
        }
        let step = d1 / d2;
        let next = (t - step).clamp(curve.min, curve.max);
        if (next - t).abs() < tol.newton {
            return Some(next);
        }
        t = next;
    }
    None
}

fn scan_parametric(curve: &ParametricCurve, q: &Hom, tol: &Tolerance) -> f64 {
    let samples = tol.scan_samples.max(2);
    let span = curve.max - curve.min;
    let mut best_t = curve.min;
    let mut best = f64::INFINITY;
    for k in 0..=samples {
        let t = curve.min + span * k as f64 / samples as f64;
        let d = squared_distance(curve, q, t);
        if d < best {
            best = d;
            best_t = t;
        }
    }
    best_t
}

/// Projection onto a parametric curve.
///
/// A local Newton search seeded at the previous parameter is tried first.
/// Closed curves, and curves where the local search fails, fall back to a
/// global scan followed by a local refinement around the best sample.
pub fn project_to_parametric(q: &Hom, curve: &ParametricCurve, opts: &ProjectOptions) -> Projection {
    let tol = &opts.tolerance;
    let local = if curve.closed {
        None
    } else {
        newton_refine(curve, q, opts.previous_t, tol)
    };

    let t = match local {
        Some(t) => t,
        None => {
            let seed = scan_parametric(curve, q, tol);
            debug!(seed, closed = curve.closed, "local curve search failed, using scan");
            match newton_refine(curve, q, seed, tol) {
                Some(t) if squared_distance(curve, q, t) <= squared_distance(curve, q, seed) => t,
                _ => seed,
            }
        }
    };

    Projection::new(curve.evaluate(t), t)
}

/// Projection onto the nearest polygon border.
///
/// Borders are compared by distance to their clamped segment projection; the
/// first border with the strictly smallest distance wins.
pub fn project_to_polygon(q: &Hom, polygon: &PolygonCarrier, tol: &Tolerance) -> Projection {
    let q = normalize(*q);
    let mut best: Option<(f64, Projection)> = None;
    for i in 0..polygon.border_count() {
        let border = polygon.border(i);
        let mut proj = project_to_line(&q, &border, tol);
        proj.edge = Some(i);
        let dist = point::distance(&proj.coords, &q);
        match best {
            Some((min, _)) if dist >= min => {}
            _ => best = Some((dist, proj)),
        }
    }
    best.map(|(_, proj)| proj)
        .unwrap_or_else(|| Projection::new([f64::NAN; 3], 0.0))
}
