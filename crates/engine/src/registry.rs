//! Constructible element kinds, looked up by name.

use std::collections::HashMap;

use crate::board::Board;
use crate::config::PositionAttributes;
use crate::types::{ElementId, EngineError};

/// A construction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Number(f64),
    Element(ElementId),
    Text(String),
}

/// Builds an element of one kind from its parents.
pub type Factory = fn(&mut Board, &[Parent]) -> Result<ElementId, EngineError>;

/// Kind names mapped to factories, owned by a board.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    factories: HashMap<String, Factory>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `point`, `glider`, `text` and `image`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("point", create_point);
        registry.register("glider", create_glider);
        registry.register("text", create_text);
        registry.register("image", create_image);
        registry
    }

    /// Add or replace a kind. Names are case-insensitive.
    pub fn register(&mut self, kind: &str, factory: Factory) {
        self.factories.insert(kind.to_lowercase(), factory);
    }

    pub fn get(&self, kind: &str) -> Option<Factory> {
        self.factories.get(&kind.to_lowercase()).copied()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&kind.to_lowercase())
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

fn numbers(parents: &[Parent]) -> Vec<f64> {
    parents
        .iter()
        .filter_map(|p| match p {
            Parent::Number(v) => Some(*v),
            _ => None,
        })
        .collect()
}

fn text(parents: &[Parent]) -> Option<&str> {
    parents.iter().find_map(|p| match p {
        Parent::Text(s) => Some(s.as_str()),
        _ => None,
    })
}

/// `[x, y]` or `[w, x, y]`.
fn create_point(board: &mut Board, parents: &[Parent]) -> Result<ElementId, EngineError> {
    let values = numbers(parents);
    if !(2..=3).contains(&values.len()) || values.len() != parents.len() {
        return Err(EngineError::invalid("point expects [x, y] or [w, x, y]"));
    }
    Ok(board.add_point_with(&values, PositionAttributes::draggable()))
}

/// `[x, y, carrier]` or `[carrier]`, which starts at the origin.
fn create_glider(board: &mut Board, parents: &[Parent]) -> Result<ElementId, EngineError> {
    let Some(Parent::Element(carrier)) = parents.last() else {
        return Err(EngineError::invalid("glider expects a carrier as its last parent"));
    };
    let values = numbers(parents);
    let start = match values.as_slice() {
        [] => [0.0, 0.0],
        [x, y] => [*x, *y],
        _ => return Err(EngineError::invalid("glider expects [x, y, carrier] or [carrier]")),
    };
    // Validate before creating so a refused carrier leaves no element behind.
    board.carrier_snapshot(*carrier)?;
    let id = board.add_point_with(&start, PositionAttributes::draggable());
    board.bind_carrier(id, *carrier)?;
    Ok(id)
}

/// `[x, y, "text"]`.
fn create_text(board: &mut Board, parents: &[Parent]) -> Result<ElementId, EngineError> {
    let values = numbers(parents);
    let (Some(content), [x, y]) = (text(parents), values.as_slice()) else {
        return Err(EngineError::invalid("text expects [x, y, \"text\"]"));
    };
    Ok(board.add_label(content.to_string(), *x, *y))
}

/// `["url", x, y, width, height]`.
fn create_image(board: &mut Board, parents: &[Parent]) -> Result<ElementId, EngineError> {
    let values = numbers(parents);
    let (Some(url), [x, y, w, h]) = (text(parents), values.as_slice()) else {
        return Err(EngineError::invalid("image expects [\"url\", x, y, width, height]"));
    };
    Ok(board.add_image(url.to_string(), *x, *y, [*w, *h]))
}
