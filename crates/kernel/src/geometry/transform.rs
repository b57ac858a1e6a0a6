use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::point::Hom;
use crate::error::KernelError;

/// Determinants below this magnitude are treated as singular.
const SINGULAR_DET: f64 = 1e-12;

/// A projective transformation of the plane acting on `[w, x, y]` columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m: Matrix3<f64>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// Build from row-major entries.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        #[rustfmt::skip]
        let m = Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2],
            rows[1][0], rows[1][1], rows[1][2],
            rows[2][0], rows[2][1], rows[2][2],
        );
        Self { m }
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [dx, 1.0, 0.0], [dy, 0.0, 1.0]])
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, sx, 0.0], [0.0, 0.0, sy]])
    }

    /// Counter-clockwise rotation about the origin by `angle` radians.
    pub fn rotation(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]])
    }

    /// Counter-clockwise rotation about `center`.
    pub fn rotation_about(angle: f64, center: [f64; 2]) -> Self {
        Self::translation(-center[0], -center[1])
            .then(&Self::rotation(angle))
            .then(&Self::translation(center[0], center[1]))
    }

    pub fn shear(kx: f64, ky: f64) -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, kx], [0.0, ky, 1.0]])
    }

    pub fn apply(&self, p: &Hom) -> Hom {
        let v = self.m * Vector3::new(p[0], p[1], p[2]);
        [v[0], v[1], v[2]]
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        Transform { m: next.m * self.m }
    }

    pub fn determinant(&self) -> f64 {
        self.m.determinant()
    }

    /// Inverse transform, or `Singular` if the matrix cannot be inverted.
    pub fn inverse(&self) -> Result<Self, KernelError> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DET {
            return Err(KernelError::Singular { det });
        }
        self.m
            .try_inverse()
            .map(|m| Transform { m })
            .ok_or(KernelError::Singular { det })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Cumulative matrix of steps applied in order: `M_n * ... * M_2 * M_1`.
pub fn compose(steps: &[Transform]) -> Transform {
    steps
        .iter()
        .fold(Transform::identity(), |acc, step| acc.then(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_transform() {
        let p = Transform::identity().apply(&[1.0, 2.0, 3.0]);
        assert_eq!(p, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_translation() {
        let p = Transform::translation(10.0, 20.0).apply(&[1.0, 1.0, 2.0]);
        assert!((p[1] - 11.0).abs() < 1e-12);
        assert!((p[2] - 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_translation_keeps_ideal_points() {
        let p = Transform::translation(10.0, 20.0).apply(&[0.0, 1.0, 0.0]);
        assert_eq!(p, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_rotation_90() {
        let p = Transform::rotation(FRAC_PI_2).apply(&[1.0, 1.0, 0.0]);
        assert!(p[1].abs() < 1e-12);
        assert!((p[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_about_center() {
        let p = Transform::rotation_about(FRAC_PI_2, [1.0, 1.0]).apply(&[1.0, 2.0, 1.0]);
        assert!((p[1] - 1.0).abs() < 1e-12);
        assert!((p[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_order() {
        // Scale first, then translate: (1,0) -> (2,0) -> (3,0).
        let chain = compose(&[Transform::scaling(2.0, 2.0), Transform::translation(1.0, 0.0)]);
        let p = chain.apply(&[1.0, 1.0, 0.0]);
        assert!((p[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        let t = Transform::translation(5.0, -3.0).then(&Transform::rotation(0.3));
        let inv = t.inverse().unwrap();
        let round_trip = inv.apply(&t.apply(&[1.0, 2.0, 3.0]));
        assert!((round_trip[1] - 2.0).abs() < 1e-12);
        assert!((round_trip[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_inverse_is_an_error() {
        let t = Transform::scaling(0.0, 1.0);
        assert!(matches!(t.inverse(), Err(KernelError::Singular { .. })));
    }
}
