//! Position and constraint resolution for dynamic-geometry constructions.
//!
//! A [`Board`] owns the elements. Points, labels and images carry a position
//! that is free, computed by a constraint, glued to a carrier (a glider) or
//! offset from an anchor, and optionally mapped through a transformation
//! chain. The board recomputes positions parents-first on every update.

pub mod animation;
pub mod board;
pub mod config;
pub mod element;
pub mod graph;
pub mod registry;
pub mod snap;
pub mod source;
pub mod state;
pub mod transform;
pub mod types;

pub use animation::{AlongOptions, AnimationDirection, AnimationPath, MoveOptions, VisitOptions};
pub use board::Board;
pub use config::{AttractorUnit, BoardConfig, PositionAttributes};
pub use element::{HasPosition, Positioned, Radius};
pub use registry::{KindRegistry, Parent};
pub use source::{Constraint, PositionSource, Term};
pub use transform::{TransformChain, TransformStep};
pub use types::{ElementId, EngineError, PositionKind};

pub use construct_kernel::{CoordMethod, Coords, View};
