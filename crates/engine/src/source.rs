//! Where a positioned element takes its coordinate from.

use std::fmt;
use std::sync::Arc;

use crate::board::Board;
use crate::types::{ElementId, EngineError};

/// Scalar evaluated against the live board.
pub type TermFn = Arc<dyn Fn(&Board) -> f64 + Send + Sync>;

/// Whole coordinate evaluated against the live board: `[x, y]` or `[w, x, y]`.
pub type VectorFn = Arc<dyn Fn(&Board) -> Vec<f64> + Send + Sync>;

/// A scalar operand: a constant, a coordinate of another element, or a function.
#[derive(Clone)]
pub enum Term {
    Const(f64),
    X(ElementId),
    Y(ElementId),
    Func(TermFn),
}

impl Term {
    pub fn func(f: impl Fn(&Board) -> f64 + Send + Sync + 'static) -> Self {
        Term::Func(Arc::new(f))
    }

    pub fn eval(&self, board: &Board) -> f64 {
        match self {
            Term::Const(v) => *v,
            Term::X(id) => board.coords(*id).map(|c| c.x()).unwrap_or(f64::NAN),
            Term::Y(id) => board.coords(*id).map(|c| c.y()).unwrap_or(f64::NAN),
            Term::Func(f) => f(board),
        }
    }

    /// Element this term reads from, if it names one.
    pub fn parent(&self) -> Option<ElementId> {
        match self {
            Term::X(id) | Term::Y(id) => Some(*id),
            Term::Const(_) | Term::Func(_) => None,
        }
    }
}

impl From<f64> for Term {
    fn from(v: f64) -> Self {
        Term::Const(v)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(v) => write!(f, "Const({v})"),
            Term::X(id) => write!(f, "X({id:?})"),
            Term::Y(id) => write!(f, "Y({id:?})"),
            Term::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Evaluators of a constrained element.
#[derive(Clone)]
pub enum Constraint {
    Affine { x: Term, y: Term },
    Homogeneous { z: Term, x: Term, y: Term },
    Vector(VectorFn),
}

impl Constraint {
    /// Two terms give `x, y`; three give `z, x, y`.
    pub fn from_terms(terms: Vec<Term>) -> Result<Self, EngineError> {
        let mut it = terms.into_iter();
        match (it.next(), it.next(), it.next(), it.next()) {
            (Some(x), Some(y), None, None) => Ok(Constraint::Affine { x, y }),
            (Some(z), Some(x), Some(y), None) => Ok(Constraint::Homogeneous { z, x, y }),
            _ => Err(EngineError::invalid(
                "a constraint takes two (x, y) or three (z, x, y) terms",
            )),
        }
    }

    pub fn vector(f: impl Fn(&Board) -> Vec<f64> + Send + Sync + 'static) -> Self {
        Constraint::Vector(Arc::new(f))
    }

    pub fn evaluate(&self, board: &Board) -> Vec<f64> {
        match self {
            Constraint::Affine { x, y } => vec![1.0, x.eval(board), y.eval(board)],
            Constraint::Homogeneous { z, x, y } => {
                vec![z.eval(board), x.eval(board), y.eval(board)]
            }
            Constraint::Vector(f) => f(board),
        }
    }

    pub fn parents(&self) -> Vec<ElementId> {
        match self {
            Constraint::Affine { x, y } => [x, y].iter().filter_map(|t| t.parent()).collect(),
            Constraint::Homogeneous { z, x, y } => {
                [z, x, y].iter().filter_map(|t| t.parent()).collect()
            }
            Constraint::Vector(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Affine { x, y } => f.debug_struct("Affine").field("x", x).field("y", y).finish(),
            Constraint::Homogeneous { z, x, y } => f
                .debug_struct("Homogeneous")
                .field("z", z)
                .field("x", x)
                .field("y", y)
                .finish(),
            Constraint::Vector(_) => f.write_str("Vector(..)"),
        }
    }
}

/// Glider bookkeeping: the carrier stack and the parameter on the active carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct GliderState {
    /// Only the last entry is active.
    pub carriers: Vec<ElementId>,
    pub position: f64,
    /// Border of a polygon carrier the glider currently sits on.
    pub edge: Option<usize>,
}

impl GliderState {
    pub fn active(&self) -> Option<ElementId> {
        self.carriers.last().copied()
    }
}

/// Offset from another element's anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub target: ElementId,
    /// Pixels with the y axis up for labels, user units otherwise.
    pub offset: [f64; 2],
    pub is_label: bool,
}

#[derive(Debug, Clone, Default)]
pub enum PositionSource {
    #[default]
    Free,
    Constrained(Constraint),
    Glider(GliderState),
    Anchored(Anchor),
}

impl PositionSource {
    pub fn name(&self) -> &'static str {
        match self {
            PositionSource::Free => "free",
            PositionSource::Constrained(_) => "constrained",
            PositionSource::Glider(_) => "glider",
            PositionSource::Anchored(_) => "anchored",
        }
    }

    /// Drags move free elements and gliders; other sources own the position.
    pub fn accepts_drag(&self) -> bool {
        matches!(self, PositionSource::Free | PositionSource::Glider(_))
    }

    pub fn as_glider(&self) -> Option<&GliderState> {
        match self {
            PositionSource::Glider(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_glider_mut(&mut self) -> Option<&mut GliderState> {
        match self {
            PositionSource::Glider(g) => Some(g),
            _ => None,
        }
    }

    /// Elements this source reads from.
    pub fn parents(&self) -> Vec<ElementId> {
        match self {
            PositionSource::Free => Vec::new(),
            PositionSource::Constrained(c) => c.parents(),
            PositionSource::Glider(g) => g.carriers.clone(),
            PositionSource::Anchored(a) => vec![a.target],
        }
    }
}
