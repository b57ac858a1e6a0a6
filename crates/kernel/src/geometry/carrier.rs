//! Snapshots of the objects a glider can be bound to.
//!
//! A carrier snapshot is built from the live scene right before projecting,
//! so every type here is plain data (plus the evaluators of parametric curves).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::point::{self, Hom};
use super::transform::Transform;
use crate::coords::normalize;
use crate::EPS;

/// Scalar function of the curve parameter.
pub type CurveFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

#[derive(Debug, Clone)]
pub enum Carrier {
    Point(Hom),
    Line(LineCarrier),
    Circle(CircleCarrier),
    Arc(ArcCarrier),
    Curve(CurveCarrier),
    Polygon(PolygonCarrier),
}

/// A line, ray or segment through two homogeneous points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineCarrier {
    pub p1: Hom,
    pub p2: Hom,
    /// The line extends beyond `p1`.
    pub straight_first: bool,
    /// The line extends beyond `p2`.
    pub straight_last: bool,
}

impl LineCarrier {
    pub fn new(p1: Hom, p2: Hom, straight_first: bool, straight_last: bool) -> Self {
        Self {
            p1: normalize(p1),
            p2: normalize(p2),
            straight_first,
            straight_last,
        }
    }

    pub fn line(p1: Hom, p2: Hom) -> Self {
        Self::new(p1, p2, true, true)
    }

    pub fn segment(p1: Hom, p2: Hom) -> Self {
        Self::new(p1, p2, false, false)
    }

    /// Homogeneous line coordinates `[c, a, b]`.
    pub fn stdform(&self) -> Hom {
        point::line_through(&self.p1, &self.p2)
    }

    /// Point at glider parameter `t`.
    ///
    /// Ideal endpoints use the bounded reparametrization: an ideal `p2` maps
    /// `(-1, 1)` onto the whole line, an ideal `p1` maps `(0, 2)`.
    pub fn point_at(&self, t: f64) -> Hom {
        let (p1, p2) = (&self.p1, &self.p2);
        if point::is_void(p1) || point::is_void(p2) {
            return [0.0, 0.0, 0.0];
        }
        if point::is_ideal(p2) {
            let mut lambda = t.abs().min(1.0 - EPS);
            lambda /= 1.0 - lambda;
            if t < 0.0 {
                lambda = -lambda;
            }
            return [p1[0] + lambda * p2[0], p1[1] + lambda * p2[1], p1[2] + lambda * p2[2]];
        }
        if point::is_ideal(p1) {
            let mut lambda = t.clamp(EPS, 2.0 - EPS);
            lambda = if lambda > 1.0 {
                (lambda - 1.0) / (lambda - 2.0)
            } else {
                (1.0 - lambda) / lambda
            };
            return [p2[0] + lambda * p1[0], p2[1] + lambda * p1[1], p2[2] + lambda * p1[2]];
        }
        point::lerp(p1, p2, t)
    }

    /// Natural parameter range of the glider on this line.
    pub fn range(&self) -> (f64, f64) {
        if point::is_ideal(&self.p2) {
            (-1.0, 1.0)
        } else if point::is_ideal(&self.p1) {
            (0.0, 2.0)
        } else {
            (0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleCarrier {
    pub center: [f64; 2],
    pub radius: f64,
}

impl CircleCarrier {
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Self { center, radius }
    }

    /// Point at `t`, where `t * full_turn` is the angle from the positive x axis.
    pub fn point_at(&self, t: f64, full_turn: f64) -> Hom {
        let angle = t * full_turn;
        [
            1.0,
            self.center[0] + self.radius * angle.cos(),
            self.center[1] + self.radius * angle.sin(),
        ]
    }
}

/// Which of the two arcs between the defining points is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArcSelection {
    /// Counter-clockwise from the radius point to the angle point.
    #[default]
    Auto,
    Minor,
    Major,
}

/// Arc or sector: center, start (radius) point and end (angle) point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcCarrier {
    pub center: [f64; 2],
    pub radius_point: [f64; 2],
    pub angle_point: [f64; 2],
    pub selection: ArcSelection,
}

impl ArcCarrier {
    pub fn radius(&self) -> f64 {
        (self.radius_point[0] - self.center[0]).hypot(self.radius_point[1] - self.center[1])
    }

    /// Valid angular sub-range `[alpha, beta]`, measured from the radius point.
    pub fn angular_range(&self) -> (f64, f64) {
        let beta = point::rad(self.radius_point, self.center, self.angle_point);
        let swap = match self.selection {
            ArcSelection::Minor => beta > std::f64::consts::PI,
            ArcSelection::Major => beta < std::f64::consts::PI,
            ArcSelection::Auto => false,
        };
        if swap {
            (beta, std::f64::consts::TAU)
        } else {
            (0.0, beta)
        }
    }

    /// Angle of the radius point, measured from the positive x axis.
    pub fn base_angle(&self) -> f64 {
        point::rad(
            [self.center[0] + 1.0, self.center[1]],
            self.center,
            self.radius_point,
        )
    }

    /// Point at normalized parameter `t` within the angular range.
    ///
    /// With `legacy_full_turn` the parameter is the raw angle offset.
    pub fn point_at(&self, t: f64, legacy_full_turn: bool) -> Hom {
        let (alpha, beta) = self.angular_range();
        let delta = if legacy_full_turn { 1.0 } else { beta - alpha };
        let angle = t * delta + alpha + self.base_angle();
        let r = self.radius();
        [1.0, self.center[0] + r * angle.cos(), self.center[1] + r * angle.sin()]
    }
}

/// A parametric curve `t -> (x(t), y(t))` on `[min, max]`.
#[derive(Clone)]
pub struct ParametricCurve {
    pub x: CurveFn,
    pub y: CurveFn,
    pub min: f64,
    pub max: f64,
    /// The curve is periodic: `t == min` and `t == max` are the same point.
    pub closed: bool,
}

impl ParametricCurve {
    pub fn new(x: CurveFn, y: CurveFn, min: f64, max: f64) -> Self {
        Self {
            x,
            y,
            min,
            max,
            closed: false,
        }
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    pub fn evaluate(&self, t: f64) -> Hom {
        [1.0, (self.x)(t), (self.y)(t)]
    }
}

impl fmt::Debug for ParametricCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametricCurve")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum CurveShape {
    Parametric(ParametricCurve),
    /// Sampled path; the parameter `i + s` lies on the segment from point `i`.
    Data(Vec<Hom>),
}

/// A curve, optionally a transformed copy of its source shape.
#[derive(Debug, Clone)]
pub struct CurveCarrier {
    pub shape: CurveShape,
    pub transform: Option<Transform>,
}

impl CurveCarrier {
    pub fn parametric(curve: ParametricCurve) -> Self {
        Self {
            shape: CurveShape::Parametric(curve),
            transform: None,
        }
    }

    pub fn data(points: Vec<Hom>) -> Self {
        Self {
            shape: CurveShape::Data(points.into_iter().map(normalize).collect()),
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(match self.transform {
            Some(existing) => existing.then(&transform),
            None => transform,
        });
        self
    }

    pub fn range(&self) -> (f64, f64) {
        match &self.shape {
            CurveShape::Parametric(c) => (c.min, c.max),
            CurveShape::Data(points) => (0.0, points.len().saturating_sub(1) as f64),
        }
    }

    /// Point of the untransformed source shape at `t`.
    pub fn source_point_at(&self, t: f64) -> Hom {
        match &self.shape {
            CurveShape::Parametric(c) => c.evaluate(t),
            CurveShape::Data(points) => {
                if points.is_empty() {
                    return [f64::NAN; 3];
                }
                let last = points.len() - 1;
                let t = t.clamp(0.0, last as f64);
                let i = (t.floor() as usize).min(last.saturating_sub(1));
                if last == 0 {
                    return points[0];
                }
                point::lerp(&points[i], &points[i + 1], t - i as f64)
            }
        }
    }

    pub fn point_at(&self, t: f64) -> Hom {
        let p = self.source_point_at(t);
        match &self.transform {
            Some(m) => normalize(m.apply(&p)),
            None => p,
        }
    }
}

/// A closed polygon; border `i` runs from vertex `i` to vertex `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonCarrier {
    pub vertices: Vec<Hom>,
}

impl PolygonCarrier {
    pub fn new(vertices: Vec<Hom>) -> Self {
        Self {
            vertices: vertices.into_iter().map(normalize).collect(),
        }
    }

    pub fn border_count(&self) -> usize {
        if self.vertices.len() < 2 {
            0
        } else {
            self.vertices.len()
        }
    }

    pub fn border(&self, i: usize) -> LineCarrier {
        let n = self.vertices.len();
        LineCarrier::segment(self.vertices[i % n], self.vertices[(i + 1) % n])
    }
}

impl Carrier {
    /// Point at glider parameter `t`; `edge` selects the polygon border.
    pub fn point_at(&self, t: f64, edge: usize, legacy_full_turn: bool) -> Hom {
        match self {
            Carrier::Point(p) => *p,
            Carrier::Line(l) => l.point_at(t),
            Carrier::Circle(c) => c.point_at(t, full_turn(legacy_full_turn)),
            Carrier::Arc(a) => a.point_at(t, legacy_full_turn),
            Carrier::Curve(c) => c.point_at(t),
            Carrier::Polygon(p) => {
                if p.border_count() == 0 {
                    return [f64::NAN; 3];
                }
                p.border(edge).point_at(t)
            }
        }
    }

    /// Natural parameter range of a glider on this carrier.
    pub fn range(&self, legacy_full_turn: bool) -> (f64, f64) {
        match self {
            Carrier::Point(_) => (0.0, 0.0),
            Carrier::Line(l) => l.range(),
            Carrier::Circle(_) => (0.0, if legacy_full_turn { std::f64::consts::TAU } else { 1.0 }),
            Carrier::Arc(a) => {
                if legacy_full_turn {
                    let (alpha, beta) = a.angular_range();
                    (0.0, beta - alpha)
                } else {
                    (0.0, 1.0)
                }
            }
            Carrier::Curve(c) => c.range(),
            Carrier::Polygon(_) => (0.0, 1.0),
        }
    }

    /// Pull `t` back into the part of the parameter domain the carrier covers.
    ///
    /// Lines are only clamped at finite ends that do not extend; circles and
    /// closed curves wrap and are left alone.
    pub fn clamp_parameter(&self, t: f64, legacy_full_turn: bool) -> f64 {
        match self {
            Carrier::Line(l) => {
                let mut t = t;
                if !l.straight_first && !point::is_ideal(&l.p1) {
                    t = t.max(0.0);
                }
                if !l.straight_last && !point::is_ideal(&l.p2) {
                    t = t.min(1.0);
                }
                t
            }
            Carrier::Polygon(_) => t.clamp(0.0, 1.0),
            Carrier::Arc(_) => {
                let (lo, hi) = self.range(legacy_full_turn);
                t.clamp(lo, hi)
            }
            Carrier::Curve(c) => match &c.shape {
                CurveShape::Parametric(p) if p.closed => t,
                _ => {
                    let (lo, hi) = c.range();
                    t.clamp(lo, hi)
                }
            },
            Carrier::Point(_) | Carrier::Circle(_) => t,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Carrier::Point(_) => "Point",
            Carrier::Line(_) => "Line",
            Carrier::Circle(_) => "Circle",
            Carrier::Arc(_) => "Arc",
            Carrier::Curve(_) => "Curve",
            Carrier::Polygon(_) => "Polygon",
        }
    }
}

/// Parameter value of one full turn on a circle.
pub fn full_turn(legacy_full_turn: bool) -> f64 {
    if legacy_full_turn {
        1.0
    } else {
        std::f64::consts::TAU
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_line_point_at_interpolates() {
        let l = LineCarrier::segment([1.0, 0.0, 0.0], [1.0, 4.0, 2.0]);
        let p = l.point_at(0.5);
        assert!((p[1] - 2.0).abs() < 1e-12);
        assert!((p[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_with_ideal_second_point() {
        let l = LineCarrier::line([1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        // t = 0.5 -> lambda = 1
        let p = normalize(l.point_at(0.5));
        assert!((p[1] - 2.0).abs() < 1e-12);
        let q = normalize(l.point_at(-0.5));
        assert!((q[1] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_with_ideal_first_point() {
        let l = LineCarrier::line([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        // t = 1 sits on p2
        let p = normalize(l.point_at(1.0));
        assert!(p[1].abs() < 1e-12);
        // t = 0.5 -> lambda = 1
        let q = normalize(l.point_at(0.5));
        assert!((q[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_void_endpoint_gives_void_point() {
        let l = LineCarrier::line([0.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert_eq!(l.point_at(0.3), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_circle_point_at() {
        let c = CircleCarrier::new([1.0, 1.0], 2.0);
        let p = c.point_at(0.25, full_turn(false));
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_arc_ranges() {
        let arc = ArcCarrier {
            center: [0.0, 0.0],
            radius_point: [1.0, 0.0],
            angle_point: [0.0, -1.0],
            selection: ArcSelection::Auto,
        };
        let (alpha, beta) = arc.angular_range();
        assert_eq!(alpha, 0.0);
        assert!((beta - 3.0 * FRAC_PI_2).abs() < 1e-12);

        let minor = ArcCarrier {
            selection: ArcSelection::Minor,
            ..arc
        };
        let (alpha, beta) = minor.angular_range();
        assert!((alpha - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((beta - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_data_curve_point_at() {
        let c = CurveCarrier::data(vec![[1.0, 0.0, 0.0], [1.0, 2.0, 0.0], [1.0, 2.0, 2.0]]);
        let p = c.point_at(1.5);
        assert!((p[1] - 2.0).abs() < 1e-12);
        assert!((p[2] - 1.0).abs() < 1e-12);
        assert_eq!(c.range(), (0.0, 2.0));
    }

    #[test]
    fn test_clamp_respects_extension_flags() {
        let ray = Carrier::Line(LineCarrier::new([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], false, true));
        assert_eq!(ray.clamp_parameter(-0.5, false), 0.0);
        assert_eq!(ray.clamp_parameter(3.0, false), 3.0);
        let circle = Carrier::Circle(CircleCarrier::new([0.0, 0.0], 1.0));
        assert_eq!(circle.clamp_parameter(1.5, false), 1.5);
    }

    #[test]
    fn test_polygon_borders_wrap() {
        let poly = PolygonCarrier::new(vec![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]]);
        assert_eq!(poly.border_count(), 3);
        let closing = poly.border(2);
        assert_eq!(closing.p2, [1.0, 0.0, 0.0]);
    }
}
