//! Transformation chains whose operands may follow other elements.

use nalgebra::Matrix3;

use construct_kernel::geometry::transform::{Transform, compose};

use crate::board::Board;
use crate::source::Term;
use crate::types::{ElementId, EngineError};

/// One step of a chain, re-evaluated on every update.
#[derive(Debug, Clone)]
pub enum TransformStep {
    Translate { dx: Term, dy: Term },
    Scale { sx: Term, sy: Term },
    /// Counter-clockwise rotation about `center`, or the origin.
    Rotate { angle: Term, center: Option<ElementId> },
    /// Row-major matrix acting on `[w, x, y]`.
    Matrix(Box<[[Term; 3]; 3]>),
}

impl TransformStep {
    pub fn translate(dx: impl Into<Term>, dy: impl Into<Term>) -> Self {
        TransformStep::Translate {
            dx: dx.into(),
            dy: dy.into(),
        }
    }

    pub fn scale(sx: impl Into<Term>, sy: impl Into<Term>) -> Self {
        TransformStep::Scale {
            sx: sx.into(),
            sy: sy.into(),
        }
    }

    pub fn rotate(angle: impl Into<Term>, center: Option<ElementId>) -> Self {
        TransformStep::Rotate {
            angle: angle.into(),
            center,
        }
    }

    pub fn matrix(rows: [[f64; 3]; 3]) -> Self {
        TransformStep::Matrix(Box::new(rows.map(|row| row.map(Term::Const))))
    }

    /// Current matrix of this step.
    pub fn evaluate(&self, board: &Board) -> Transform {
        match self {
            TransformStep::Translate { dx, dy } => Transform::translation(dx.eval(board), dy.eval(board)),
            TransformStep::Scale { sx, sy } => Transform::scaling(sx.eval(board), sy.eval(board)),
            TransformStep::Rotate { angle, center } => {
                let angle = angle.eval(board);
                match center {
                    Some(id) => {
                        let c = board.coords(*id).map(|c| [c.x(), c.y()]).unwrap_or([f64::NAN; 2]);
                        Transform::rotation_about(angle, c)
                    }
                    None => Transform::rotation(angle),
                }
            }
            TransformStep::Matrix(rows) => Transform {
                m: Matrix3::from_fn(|r, c| rows[r][c].eval(board)),
            },
        }
    }

    pub fn parents(&self) -> Vec<ElementId> {
        match self {
            TransformStep::Translate { dx, dy } => [dx, dy].iter().filter_map(|t| t.parent()).collect(),
            TransformStep::Scale { sx, sy } => [sx, sy].iter().filter_map(|t| t.parent()).collect(),
            TransformStep::Rotate { angle, center } => angle.parent().into_iter().chain(*center).collect(),
            TransformStep::Matrix(rows) => rows.iter().flatten().filter_map(|t| t.parent()).collect(),
        }
    }
}

/// Ordered steps applied to a base element.
#[derive(Debug, Clone, Default)]
pub struct TransformChain {
    steps: Vec<TransformStep>,
    base: Option<ElementId>,
}

impl TransformChain {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn base(&self) -> Option<ElementId> {
        self.base
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// Append steps. The first bind records the base; later binds must reuse it.
    pub fn bind(&mut self, base: ElementId, steps: Vec<TransformStep>) -> Result<(), EngineError> {
        match self.base {
            Some(bound) if bound != base => {
                return Err(EngineError::TransformRebase {
                    bound,
                    requested: base,
                });
            }
            _ => self.base = Some(base),
        }
        self.steps.extend(steps);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.base = None;
    }

    /// Cumulative matrix, steps applied in order.
    pub fn matrix(&self, board: &Board) -> Transform {
        let evaluated: Vec<Transform> = self.steps.iter().map(|s| s.evaluate(board)).collect();
        compose(&evaluated)
    }

    /// Inverse of the cumulative matrix; fails on a singular chain.
    pub fn invert(&self, board: &Board) -> Result<Transform, EngineError> {
        Ok(self.matrix(board).inverse()?)
    }

    /// Base element and step operands.
    pub fn parents(&self) -> Vec<ElementId> {
        self.base
            .into_iter()
            .chain(self.steps.iter().flat_map(|s| s.parents()))
            .collect()
    }
}
