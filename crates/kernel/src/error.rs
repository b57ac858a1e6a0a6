use thiserror::Error;

/// Errors raised by kernel operations.
///
/// Geometric degeneracies are never errors; these only cover misuse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("transform matrix is singular (determinant {det:e})")]
    Singular { det: f64 },

    #[error("invalid easing effect {effect:?}: valid effects are '==', '<>', '>' and '<'")]
    InvalidEffect { effect: String },

    #[error("interpolation needs at least one path point")]
    EmptyPath,
}
