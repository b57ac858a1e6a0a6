//! Homogeneous point and line helpers.
//!
//! Points and lines share the `[w, x, y]` layout. A line `[c, a, b]` is the set
//! of points with `c*w + a*x + b*y == 0`.

use crate::EPS;

/// A homogeneous coordinate `[w, x, y]`.
pub type Hom = [f64; 3];

pub fn cross(a: &Hom, b: &Hom) -> Hom {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn inner(a: &Hom, b: &Hom) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn is_ideal(p: &Hom) -> bool {
    p[0].abs() < EPS
}

/// The all-zero vector denotes "no point at all".
pub fn is_void(p: &Hom) -> bool {
    p[0] == 0.0 && p[1] == 0.0 && p[2] == 0.0
}

/// Line through two homogeneous points.
pub fn line_through(p1: &Hom, p2: &Hom) -> Hom {
    cross(p1, p2)
}

/// Euclidean distance of two finite points (weights are divided out).
pub fn distance(a: &Hom, b: &Hom) -> f64 {
    let (ax, ay) = (a[1] / a[0], a[2] / a[0]);
    let (bx, by) = (b[1] / b[0], b[2] / b[0]);
    (ax - bx).hypot(ay - by)
}

/// Distance of a finite point from a homogeneous line.
pub fn distance_to_line(p: &Hom, line: &Hom) -> f64 {
    let norm = line[1].hypot(line[2]);
    if norm < EPS {
        return f64::INFINITY;
    }
    (inner(p, line) / p[0]).abs() / norm
}

/// Counter-clockwise angle `a`-`b`-`c` in `[0, 2pi)`.
pub fn rad(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    let phi = (c[1] - b[1]).atan2(c[0] - b[0]) - (a[1] - b[1]).atan2(a[0] - b[0]);
    if phi < 0.0 {
        phi + std::f64::consts::TAU
    } else {
        phi
    }
}

pub fn lerp(a: &Hom, b: &Hom, t: f64) -> Hom {
    [
        a[0] + t * (b[0] - a[0]),
        a[1] + t * (b[1] - a[1]),
        a[2] + t * (b[2] - a[2]),
    ]
}

pub fn euclidean(p: &Hom) -> [f64; 2] {
    [p[1] / p[0], p[2] / p[0]]
}
