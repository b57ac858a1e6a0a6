use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use construct_kernel::KernelError;

new_key_type! {
    /// Stable handle of an element on a board.
    pub struct ElementId;
}

/// Declared kind of a coordinate-bearing element.
///
/// Binding to a carrier turns a point into a glider; releasing restores the
/// kind the element was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionKind {
    Point,
    Glider,
    Text,
    Image,
}

impl PositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::Point => "point",
            PositionKind::Glider => "glider",
            PositionKind::Text => "text",
            PositionKind::Image => "image",
        }
    }
}

/// Errors from the construction engine.
///
/// Only misuse of the state machine is reported here. Degenerate geometry
/// produces NaN or ideal coordinates instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("element not found: {id:?}")]
    ElementNotFound { id: ElementId },

    #[error("element {id:?} has no position")]
    NotPositioned { id: ElementId },

    #[error("a glider cannot be bound to a {kind} element")]
    ForbiddenCarrier { kind: &'static str },

    #[error("element {id:?} ({kind}) cannot carry a glider")]
    NotACarrier { id: ElementId, kind: &'static str },

    #[error("transformation chain is bound to {bound:?}, refusing to rebase onto {requested:?}")]
    TransformRebase {
        bound: ElementId,
        requested: ElementId,
    },

    #[error("unknown element kind: {kind}")]
    UnknownKind { kind: String },

    #[error("element {id:?} is not a glider")]
    NotAGlider { id: ElementId },

    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("invalid board configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl EngineError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        EngineError::InvalidArguments {
            reason: reason.into(),
        }
    }
}
