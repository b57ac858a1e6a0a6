//! Pure geometry for the construction engine.
//!
//! Everything in this crate is stateless: coordinate conversion, homogeneous
//! point helpers, projective transforms, carrier snapshots and the projection
//! functions that drive glider motion.

pub mod coords;
pub mod error;
pub mod geometry;
pub mod interpolation;

pub use coords::{CoordMethod, Coords, View};
pub use error::KernelError;
pub use geometry::carrier::Carrier;
pub use geometry::projection::Projection;
pub use geometry::transform::Transform;

use serde::{Deserialize, Serialize};

/// Threshold below which a homogeneous weight or a length counts as zero.
pub const EPS: f64 = 1e-6;

/// Global tolerance configuration for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Homogeneous weights smaller than this denote an ideal point.
    pub eps: f64,
    /// Points closer than this (user units) are considered coincident.
    pub coincidence: f64,
    /// Convergence threshold for the Newton refinement on curves.
    pub newton: f64,
    /// Iteration cap for the Newton refinement.
    pub newton_iterations: usize,
    /// Number of samples used by the global scan on curves.
    pub scan_samples: usize,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            eps: EPS,
            coincidence: EPS,
            newton: 1e-10,
            newton_iterations: 30,
            scan_samples: 256,
        }
    }
}

impl Tolerance {
    pub fn is_ideal(&self, w: f64) -> bool {
        w.abs() < self.eps
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.coincidence
    }
}

/// Default tolerance used by the convenience wrappers.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}
