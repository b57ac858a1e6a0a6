//! The element arena and the global update sweep.

use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, info, instrument};

use construct_kernel::coords::{BoundingBox, normalize};
use construct_kernel::geometry::carrier::{
    ArcCarrier, ArcSelection, Carrier, CircleCarrier, CurveCarrier, LineCarrier, PolygonCarrier,
};
use construct_kernel::geometry::transform::compose;
use construct_kernel::{CoordMethod, Coords, View};

use crate::animation::{GliderAnimation, Tween};
use crate::config::{BoardConfig, PositionAttributes};
use crate::element::{
    ArcShape, CircleShape, CurveShape, Element, ElementBody, Image, Label, LineShape, Point,
    PolygonShape, Positioned, Radius, TicksShape,
};
use crate::graph::DependencyGraph;
use crate::registry::{KindRegistry, Parent};
use crate::transform::TransformStep;
use crate::types::{ElementId, EngineError, PositionKind};

/// Owner of all elements, the view and the update scheduling.
pub struct Board {
    elements: SlotMap<ElementId, Element>,
    /// Creation order; parents always precede their children.
    order: Vec<ElementId>,
    pub(crate) graph: DependencyGraph,
    view: View,
    pub config: BoardConfig,
    registry: KindRegistry,
    suspended: bool,
    deferred: Vec<ElementId>,
    update_requested: bool,
    pub(crate) tweens: SecondaryMap<ElementId, Tween>,
    pub(crate) glider_animations: SecondaryMap<ElementId, GliderAnimation>,
}

impl Board {
    pub fn new(view: View, config: BoardConfig) -> Self {
        Self {
            elements: SlotMap::with_key(),
            order: Vec::new(),
            graph: DependencyGraph::new(),
            view,
            config,
            registry: KindRegistry::with_defaults(),
            suspended: false,
            deferred: Vec::new(),
            update_requested: false,
            tweens: SecondaryMap::new(),
            glider_animations: SecondaryMap::new(),
        }
    }

    pub fn with_registry(mut self, registry: KindRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut KindRegistry {
        &mut self.registry
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.view.bounding_box()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Element handles in creation order.
    pub fn ids(&self) -> &[ElementId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, EngineError> {
        self.elements.get(id).ok_or(EngineError::ElementNotFound { id })
    }

    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, EngineError> {
        self.elements.get_mut(id).ok_or(EngineError::ElementNotFound { id })
    }

    pub fn positioned(&self, id: ElementId) -> Result<&Positioned, EngineError> {
        self.element(id)?
            .positioned()
            .ok_or(EngineError::NotPositioned { id })
    }

    pub fn positioned_mut(&mut self, id: ElementId) -> Result<&mut Positioned, EngineError> {
        self.element_mut(id)?
            .positioned_mut()
            .ok_or(EngineError::NotPositioned { id })
    }

    /// Renderable coordinate of a positioned element.
    pub fn coords(&self, id: ElementId) -> Result<Coords, EngineError> {
        Ok(self.positioned(id)?.actual_coords)
    }

    pub fn glider_position(&self, id: ElementId) -> Result<f64, EngineError> {
        self.positioned(id)?
            .glider_position()
            .ok_or(EngineError::NotAGlider { id })
    }

    pub fn kind(&self, id: ElementId) -> Result<PositionKind, EngineError> {
        Ok(self.positioned(id)?.kind)
    }

    /// Clear the redraw flag, returning whether it was set.
    pub fn take_redraw(&mut self, id: ElementId) -> Result<bool, EngineError> {
        let p = self.positioned_mut(id)?;
        Ok(std::mem::take(&mut p.needs_redraw))
    }

    /// Replace the view; screen coordinates of every element follow.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        for element in self.elements.values_mut() {
            if let Some(p) = element.positioned_mut() {
                p.coords.refresh(Some(&view));
                p.initial_coords.refresh(Some(&view));
                p.actual_coords.refresh(Some(&view));
                p.needs_redraw = true;
            }
        }
        self.request_update();
    }

    // ── Construction ─────────────────────────────────────────────────────

    /// Insert an element whose parents already exist.
    pub fn insert(&mut self, name: impl Into<String>, body: ElementBody) -> Result<ElementId, EngineError> {
        let parents = body.parents();
        for parent in &parents {
            self.element(*parent)?;
        }
        let id = self.elements.insert(Element::new(name, body));
        self.order.push(id);
        for parent in parents {
            self.graph.add_edge(parent, id);
        }
        debug!(?id, kind = self.elements[id].body.type_name(), "element added");
        Ok(id)
    }

    fn auto_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.order.len())
    }

    fn new_positioned(&self, values: &[f64], kind: PositionKind, attributes: PositionAttributes) -> Positioned {
        let coords = Coords::new(CoordMethod::User, values, Some(&self.view));
        Positioned::new(coords, kind, attributes)
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> ElementId {
        self.add_point_with(&[x, y], PositionAttributes::draggable())
    }

    /// Point at `[x, y]` or homogeneous `[w, x, y]`.
    pub fn add_point_with(&mut self, values: &[f64], attributes: PositionAttributes) -> ElementId {
        let positioned = self.new_positioned(values, PositionKind::Point, attributes);
        let name = self.auto_name("P");
        let id = self.elements.insert(Element::new(
            name,
            ElementBody::Point(Point {
                positioned,
                size: 3.0,
            }),
        ));
        self.order.push(id);
        id
    }

    pub fn add_label(&mut self, text: impl Into<String>, x: f64, y: f64) -> ElementId {
        let positioned = self.new_positioned(&[x, y], PositionKind::Text, PositionAttributes::label());
        let name = self.auto_name("T");
        let id = self.elements.insert(Element::new(
            name,
            ElementBody::Label(Label {
                positioned,
                text: text.into(),
                font_size: 12.0,
            }),
        ));
        self.order.push(id);
        id
    }

    pub fn add_image(&mut self, url: impl Into<String>, x: f64, y: f64, size: [f64; 2]) -> ElementId {
        let positioned = self.new_positioned(&[x, y], PositionKind::Image, PositionAttributes::default());
        let name = self.auto_name("I");
        let id = self.elements.insert(Element::new(
            name,
            ElementBody::Image(Image {
                positioned,
                url: url.into(),
                size,
            }),
        ));
        self.order.push(id);
        id
    }

    pub fn add_line(&mut self, p1: ElementId, p2: ElementId) -> Result<ElementId, EngineError> {
        self.add_line_with(p1, p2, true, true)
    }

    pub fn add_segment(&mut self, p1: ElementId, p2: ElementId) -> Result<ElementId, EngineError> {
        self.add_line_with(p1, p2, false, false)
    }

    pub fn add_line_with(
        &mut self,
        p1: ElementId,
        p2: ElementId,
        straight_first: bool,
        straight_last: bool,
    ) -> Result<ElementId, EngineError> {
        self.positioned(p1)?;
        self.positioned(p2)?;
        let name = self.auto_name("L");
        self.insert(
            name,
            ElementBody::Line(LineShape {
                p1,
                p2,
                straight_first,
                straight_last,
            }),
        )
    }

    pub fn add_circle(&mut self, center: ElementId, radius: Radius) -> Result<ElementId, EngineError> {
        self.positioned(center)?;
        if let Radius::Through(p) = radius {
            self.positioned(p)?;
        }
        let name = self.auto_name("C");
        self.insert(name, ElementBody::Circle(CircleShape { center, radius }))
    }

    /// Change a circle's radius; dependents follow on the next update.
    pub fn set_radius(&mut self, circle: ElementId, radius: Radius) -> Result<(), EngineError> {
        if let Radius::Through(p) = radius {
            self.positioned(p)?;
        }
        let ElementBody::Circle(shape) = &mut self.element_mut(circle)?.body else {
            return Err(EngineError::invalid("set_radius expects a circle"));
        };
        let center = shape.center;
        shape.radius = radius;
        self.graph.remove_parents(circle);
        let parents = self.element(circle)?.body.parents();
        for parent in parents {
            self.graph.add_edge(parent, circle);
        }
        debug!(?circle, ?center, "circle radius changed");
        self.request_update();
        Ok(())
    }

    pub fn add_arc(
        &mut self,
        center: ElementId,
        radius_point: ElementId,
        angle_point: ElementId,
        selection: ArcSelection,
    ) -> Result<ElementId, EngineError> {
        self.add_arc_shape(center, radius_point, angle_point, selection, false)
    }

    pub fn add_sector(
        &mut self,
        center: ElementId,
        radius_point: ElementId,
        angle_point: ElementId,
        selection: ArcSelection,
    ) -> Result<ElementId, EngineError> {
        self.add_arc_shape(center, radius_point, angle_point, selection, true)
    }

    fn add_arc_shape(
        &mut self,
        center: ElementId,
        radius_point: ElementId,
        angle_point: ElementId,
        selection: ArcSelection,
        sector: bool,
    ) -> Result<ElementId, EngineError> {
        for p in [center, radius_point, angle_point] {
            self.positioned(p)?;
        }
        let name = self.auto_name(if sector { "S" } else { "A" });
        self.insert(
            name,
            ElementBody::Arc(ArcShape {
                center,
                radius_point,
                angle_point,
                selection,
                sector,
            }),
        )
    }

    pub fn add_curve(&mut self, curve: CurveCarrier) -> ElementId {
        let name = self.auto_name("K");
        let id = self
            .elements
            .insert(Element::new(name, ElementBody::Curve(CurveShape::Plain(curve))));
        self.order.push(id);
        id
    }

    /// Transformed image of an existing curve.
    pub fn add_curve_copy(&mut self, source: ElementId, steps: Vec<TransformStep>) -> Result<ElementId, EngineError> {
        if !matches!(self.element(source)?.body, ElementBody::Curve(_)) {
            return Err(EngineError::invalid("a curve copy needs a curve as its source"));
        }
        let name = self.auto_name("K");
        self.insert(name, ElementBody::Curve(CurveShape::Copy { source, steps }))
    }

    pub fn add_polygon(&mut self, vertices: Vec<ElementId>) -> Result<ElementId, EngineError> {
        if vertices.len() < 2 {
            return Err(EngineError::invalid("a polygon needs at least two vertices"));
        }
        for v in &vertices {
            self.positioned(*v)?;
        }
        let name = self.auto_name("Poly");
        self.insert(name, ElementBody::Polygon(PolygonShape { vertices }))
    }

    pub fn add_ticks(&mut self, line: ElementId, distance: f64) -> Result<ElementId, EngineError> {
        if !matches!(self.element(line)?.body, ElementBody::Line(_)) {
            return Err(EngineError::invalid("ticks are attached to a line"));
        }
        let name = self.auto_name("Ticks");
        self.insert(name, ElementBody::Ticks(TicksShape { line, distance }))
    }

    /// Create an element by registered kind name.
    pub fn create(
        &mut self,
        kind: &str,
        parents: &[Parent],
        attributes: Option<PositionAttributes>,
    ) -> Result<ElementId, EngineError> {
        let factory = self
            .registry
            .get(kind)
            .ok_or_else(|| EngineError::UnknownKind {
                kind: kind.to_string(),
            })?;
        let id = factory(self, parents)?;
        if let Some(attributes) = attributes {
            if let Some(p) = self.element_mut(id)?.positioned_mut() {
                p.attributes = attributes;
            }
        }
        Ok(id)
    }

    // ── Geometry snapshots ───────────────────────────────────────────────

    fn usr(&self, id: ElementId) -> Result<[f64; 3], EngineError> {
        Ok(self.coords(id)?.usr())
    }

    fn euclidean(&self, id: ElementId) -> Result<[f64; 2], EngineError> {
        let c = normalize(self.usr(id)?);
        Ok([c[1] / c[0], c[2] / c[0]])
    }

    pub fn circle_radius(&self, shape: &CircleShape) -> Result<f64, EngineError> {
        Ok(match &shape.radius {
            Radius::Fixed(r) => *r,
            Radius::Term(t) => t.eval(self),
            Radius::Through(p) => {
                let c = self.euclidean(shape.center)?;
                let q = self.euclidean(*p)?;
                (c[0] - q[0]).hypot(c[1] - q[1])
            }
        })
    }

    /// Plain-data carrier built from the current geometry of `id`.
    pub fn carrier_snapshot(&self, id: ElementId) -> Result<Carrier, EngineError> {
        let element = self.element(id)?;
        match &element.body {
            ElementBody::Point(p) => Ok(Carrier::Point(p.positioned.actual_coords.usr())),
            ElementBody::Label(_) | ElementBody::Image(_) => Err(EngineError::NotACarrier {
                id,
                kind: element.body.type_name(),
            }),
            ElementBody::Line(l) => Ok(Carrier::Line(LineCarrier::new(
                self.usr(l.p1)?,
                self.usr(l.p2)?,
                l.straight_first,
                l.straight_last,
            ))),
            ElementBody::Circle(c) => Ok(Carrier::Circle(CircleCarrier::new(
                self.euclidean(c.center)?,
                self.circle_radius(c)?,
            ))),
            ElementBody::Arc(a) => Ok(Carrier::Arc(ArcCarrier {
                center: self.euclidean(a.center)?,
                radius_point: self.euclidean(a.radius_point)?,
                angle_point: self.euclidean(a.angle_point)?,
                selection: a.selection,
            })),
            ElementBody::Curve(CurveShape::Plain(c)) => Ok(Carrier::Curve(c.clone())),
            ElementBody::Curve(CurveShape::Copy { source, steps }) => {
                let Carrier::Curve(base) = self.carrier_snapshot(*source)? else {
                    return Err(EngineError::invalid("curve copy source is not a curve"));
                };
                let matrices: Vec<_> = steps.iter().map(|s| s.evaluate(self)).collect();
                Ok(Carrier::Curve(base.with_transform(compose(&matrices))))
            }
            ElementBody::Polygon(p) => {
                let vertices = p
                    .vertices
                    .iter()
                    .map(|v| self.usr(*v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Carrier::Polygon(PolygonCarrier::new(vertices)))
            }
            ElementBody::Ticks(_) => Err(EngineError::ForbiddenCarrier { kind: "ticks" }),
        }
    }

    /// Reference position that anchored elements are offset from.
    pub fn anchor_point(&self, id: ElementId) -> Result<Coords, EngineError> {
        let element = self.element(id)?;
        let usr = match &element.body {
            ElementBody::Point(_) | ElementBody::Label(_) | ElementBody::Image(_) => {
                return self.coords(id);
            }
            ElementBody::Line(l) => {
                let (a, b) = (normalize(self.usr(l.p1)?), normalize(self.usr(l.p2)?));
                [1.0, 0.5 * (a[1] + b[1]), 0.5 * (a[2] + b[2])]
            }
            ElementBody::Circle(CircleShape { center, .. }) | ElementBody::Arc(ArcShape { center, .. }) => {
                self.usr(*center)?
            }
            ElementBody::Curve(_) => {
                let Carrier::Curve(c) = self.carrier_snapshot(id)? else {
                    return Err(EngineError::NotPositioned { id });
                };
                c.point_at(c.range().0)
            }
            ElementBody::Polygon(p) => {
                let n = p.vertices.len() as f64;
                let mut sum = [0.0, 0.0];
                for v in &p.vertices {
                    let c = self.euclidean(*v)?;
                    sum[0] += c[0];
                    sum[1] += c[1];
                }
                [1.0, sum[0] / n, sum[1] / n]
            }
            ElementBody::Ticks(t) => return self.anchor_point(t.line),
        };
        Ok(Coords::new(CoordMethod::User, &usr, Some(&self.view)))
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    /// Ask the host for a global update at its next opportunity.
    pub fn request_update(&mut self) {
        self.update_requested = true;
    }

    pub fn update_requested(&self) -> bool {
        self.update_requested
    }

    pub fn is_batch_suspended(&self) -> bool {
        self.suspended
    }

    /// Open a batch window: updates are recorded instead of run.
    pub fn suspend_updates(&mut self) {
        self.suspended = true;
    }

    /// Close the batch window and run everything that was deferred.
    #[instrument(skip(self))]
    pub fn unsuspend_updates(&mut self) -> Result<(), EngineError> {
        self.suspended = false;
        let mut deferred = std::mem::take(&mut self.deferred);
        deferred.sort_by_key(|id| self.order.iter().position(|o| o == id));
        deferred.dedup();
        info!(deferred = deferred.len(), "resuming updates");
        self.sweep(&deferred)
    }

    /// Recompute every positioned element, parents before children.
    ///
    /// The dragged element re-derives its state from its own coordinate,
    /// everything else from its parents.
    #[instrument(skip(self))]
    pub fn update(&mut self, dragged: Option<ElementId>) -> Result<(), EngineError> {
        if self.suspended {
            debug!("update deferred by batch window");
            self.deferred.extend(dragged);
            self.update_requested = true;
            return Ok(());
        }
        self.sweep(dragged.as_slice())
    }

    fn sweep(&mut self, dragged: &[ElementId]) -> Result<(), EngineError> {
        self.update_requested = false;
        for element in self.elements.values_mut() {
            if let Some(p) = element.positioned_mut() {
                p.needs_update = true;
            }
        }
        let order = self.graph.topological_order(&self.order);
        for id in order {
            if self.elements[id].positioned().is_some() {
                self.update_coords(id, !dragged.contains(&id))?;
            }
        }
        Ok(())
    }

    pub(crate) fn defer(&mut self, id: ElementId) {
        self.deferred.push(id);
        self.update_requested = true;
    }
}
