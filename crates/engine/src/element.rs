//! Elements on a board.
//!
//! Points, labels and images share the positioned-element behaviour through
//! the [`HasPosition`] capability; each of them owns a [`Positioned`] core.
//! Lines, circles, arcs, curves, polygons and ticks carry no position of
//! their own and are described by the elements they are built from.

use construct_kernel::geometry::carrier::{ArcSelection, CurveCarrier};
use construct_kernel::Coords;

use crate::config::PositionAttributes;
use crate::source::{PositionSource, Term};
use crate::transform::{TransformChain, TransformStep};
use crate::types::{ElementId, PositionKind};

/// State shared by every coordinate-bearing element.
#[derive(Debug, Clone)]
pub struct Positioned {
    /// Output of the position source, before the transformation chain.
    pub coords: Coords,
    /// Pre-transform input of a free element with its own chain.
    pub initial_coords: Coords,
    /// Renderable coordinate after the chain; what other elements read.
    pub actual_coords: Coords,
    pub source: PositionSource,
    pub chain: TransformChain,
    pub needs_update: bool,
    pub needs_redraw: bool,
    pub kind: PositionKind,
    pub original_kind: PositionKind,
    pub attributes: PositionAttributes,
}

impl Positioned {
    pub fn new(coords: Coords, kind: PositionKind, attributes: PositionAttributes) -> Self {
        Self {
            coords,
            initial_coords: coords,
            actual_coords: coords,
            source: PositionSource::Free,
            chain: TransformChain::default(),
            needs_update: true,
            needs_redraw: true,
            kind,
            original_kind: kind,
            attributes,
        }
    }

    pub fn is_draggable(&self) -> bool {
        !self.attributes.fixed && self.source.accepts_drag()
    }

    /// The chain maps this element's own coordinate.
    pub fn has_self_chain(&self, id: ElementId) -> bool {
        !self.chain.is_empty() && self.chain.base() == Some(id)
    }

    /// The element is a transformed image of another element.
    pub fn is_copy(&self, id: ElementId) -> bool {
        !self.chain.is_empty() && matches!(self.chain.base(), Some(b) if b != id)
    }

    /// Glider parameter, if the element is a glider.
    pub fn glider_position(&self) -> Option<f64> {
        self.source.as_glider().map(|g| g.position)
    }
}

/// Capability of elements that own a coordinate.
pub trait HasPosition {
    fn positioned(&self) -> &Positioned;
    fn positioned_mut(&mut self) -> &mut Positioned;

    /// Snapping and attraction only consider point-like elements.
    fn is_point_like(&self) -> bool {
        false
    }

    /// Size of the rendered element in pixels.
    fn extent(&self) -> [f64; 2];
}

#[derive(Debug, Clone)]
pub struct Point {
    pub positioned: Positioned,
    /// Radius of the drawn marker in pixels.
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub positioned: Positioned,
    pub text: String,
    pub font_size: f64,
}

#[derive(Debug, Clone)]
pub struct Image {
    pub positioned: Positioned,
    pub url: String,
    /// Width and height in user units.
    pub size: [f64; 2],
}

impl HasPosition for Point {
    fn positioned(&self) -> &Positioned {
        &self.positioned
    }

    fn positioned_mut(&mut self) -> &mut Positioned {
        &mut self.positioned
    }

    fn is_point_like(&self) -> bool {
        true
    }

    fn extent(&self) -> [f64; 2] {
        [2.0 * self.size, 2.0 * self.size]
    }
}

impl HasPosition for Label {
    fn positioned(&self) -> &Positioned {
        &self.positioned
    }

    fn positioned_mut(&mut self) -> &mut Positioned {
        &mut self.positioned
    }

    fn extent(&self) -> [f64; 2] {
        // Rough average glyph width.
        let glyphs = self.text.chars().count() as f64;
        [0.6 * self.font_size * glyphs, self.font_size]
    }
}

impl HasPosition for Image {
    fn positioned(&self) -> &Positioned {
        &self.positioned
    }

    fn positioned_mut(&mut self) -> &mut Positioned {
        &mut self.positioned
    }

    fn extent(&self) -> [f64; 2] {
        self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineShape {
    pub p1: ElementId,
    pub p2: ElementId,
    pub straight_first: bool,
    pub straight_last: bool,
}

#[derive(Debug, Clone)]
pub enum Radius {
    Fixed(f64),
    /// Distance from the center to another element.
    Through(ElementId),
    Term(Term),
}

#[derive(Debug, Clone)]
pub struct CircleShape {
    pub center: ElementId,
    pub radius: Radius,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcShape {
    pub center: ElementId,
    pub radius_point: ElementId,
    pub angle_point: ElementId,
    pub selection: ArcSelection,
    /// Drawn as a sector; gliders only see the arc.
    pub sector: bool,
}

#[derive(Debug, Clone)]
pub enum CurveShape {
    /// A curve given directly.
    Plain(CurveCarrier),
    /// Transformed image of another curve element.
    Copy {
        source: ElementId,
        steps: Vec<TransformStep>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    pub vertices: Vec<ElementId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TicksShape {
    pub line: ElementId,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub enum ElementBody {
    Point(Point),
    Label(Label),
    Image(Image),
    Line(LineShape),
    Circle(CircleShape),
    Arc(ArcShape),
    Curve(CurveShape),
    Polygon(PolygonShape),
    Ticks(TicksShape),
}

impl ElementBody {
    pub fn as_positioned(&self) -> Option<&dyn HasPosition> {
        match self {
            ElementBody::Point(p) => Some(p),
            ElementBody::Label(l) => Some(l),
            ElementBody::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_positioned_mut(&mut self) -> Option<&mut dyn HasPosition> {
        match self {
            ElementBody::Point(p) => Some(p),
            ElementBody::Label(l) => Some(l),
            ElementBody::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ElementBody::Point(_) => "point",
            ElementBody::Label(_) => "text",
            ElementBody::Image(_) => "image",
            ElementBody::Line(_) => "line",
            ElementBody::Circle(_) => "circle",
            ElementBody::Arc(a) if a.sector => "sector",
            ElementBody::Arc(_) => "arc",
            ElementBody::Curve(_) => "curve",
            ElementBody::Polygon(_) => "polygon",
            ElementBody::Ticks(_) => "ticks",
        }
    }

    /// Elements this one is constructed from.
    pub fn parents(&self) -> Vec<ElementId> {
        match self {
            ElementBody::Point(_) | ElementBody::Label(_) | ElementBody::Image(_) => Vec::new(),
            ElementBody::Line(l) => vec![l.p1, l.p2],
            ElementBody::Circle(c) => match &c.radius {
                Radius::Through(p) => vec![c.center, *p],
                Radius::Term(t) => std::iter::once(c.center).chain(t.parent()).collect(),
                Radius::Fixed(_) => vec![c.center],
            },
            ElementBody::Arc(a) => vec![a.center, a.radius_point, a.angle_point],
            ElementBody::Curve(CurveShape::Plain(_)) => Vec::new(),
            ElementBody::Curve(CurveShape::Copy { source, steps }) => std::iter::once(*source)
                .chain(steps.iter().flat_map(|s| s.parents()))
                .collect(),
            ElementBody::Polygon(p) => p.vertices.clone(),
            ElementBody::Ticks(t) => vec![t.line],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub body: ElementBody,
}

impl Element {
    pub fn new(name: impl Into<String>, body: ElementBody) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn positioned(&self) -> Option<&Positioned> {
        self.body.as_positioned().map(|p| p.positioned())
    }

    pub fn positioned_mut(&mut self) -> Option<&mut Positioned> {
        self.body.as_positioned_mut().map(|p| p.positioned_mut())
    }

    pub fn is_point_like(&self) -> bool {
        self.body.as_positioned().is_some_and(|p| p.is_point_like())
    }

    /// Only positioned elements can be hidden.
    pub fn is_visible(&self) -> bool {
        self.positioned().is_none_or(|p| p.attributes.visible)
    }
}
