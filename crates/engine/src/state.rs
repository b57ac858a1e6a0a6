//! State transitions and the per-element recompute.

use tracing::{debug, info, instrument, warn};

use construct_kernel::geometry::carrier::Carrier;
use construct_kernel::geometry::point::Hom;
use construct_kernel::geometry::projection::{self, ProjectOptions, Projection};
use construct_kernel::{CoordMethod, Coords};

use crate::board::Board;
use crate::config::PositionAttributes;
use crate::snap;
use crate::source::{Anchor, Constraint, GliderState, PositionSource};
use crate::transform::TransformStep;
use crate::types::{ElementId, EngineError, PositionKind};

/// New state output of a position source.
struct SourceUpdate {
    usr: Vec<f64>,
    glider: Option<(f64, Option<usize>)>,
}

impl Board {
    pub(crate) fn project_options(&self, previous_t: f64) -> ProjectOptions {
        ProjectOptions {
            tolerance: self.config.tolerance,
            legacy_full_turn: self.config.legacy_full_turn,
            previous_t,
        }
    }

    /// Project `query` onto `carrier`, then snap and clamp the parameter.
    ///
    /// Returns the coordinate, the parameter and the polygon border in use.
    fn glide(
        &self,
        query: &Hom,
        carrier: &Carrier,
        previous_t: f64,
        previous_edge: Option<usize>,
        attributes: &PositionAttributes,
    ) -> (Hom, f64, Option<usize>) {
        let legacy = self.config.legacy_full_turn;
        let Projection {
            coords,
            t: raw,
            edge,
            reproject,
        } = projection::project(query, carrier, &self.project_options(previous_t));
        let edge = edge.or(previous_edge);

        let mut t = carrier.clamp_parameter(raw, legacy);
        if let Some(snapped) = snap::snap_parameter(
            t,
            carrier.range(legacy),
            attributes,
            self.config.tolerance.eps,
        ) {
            debug!(raw, snapped, "glider parameter snapped");
            t = snapped;
        }
        t = carrier.clamp_parameter(t, legacy);

        let coords = if reproject || t != raw {
            carrier.point_at(t, edge.unwrap_or(0), legacy)
        } else {
            coords
        };
        (coords, t, edge)
    }

    fn source_update(&self, id: ElementId, from_parent: bool) -> Result<Option<SourceUpdate>, EngineError> {
        let p = self.positioned(id)?;
        let update = match &p.source {
            PositionSource::Free => None,
            PositionSource::Constrained(c) => Some(SourceUpdate {
                usr: c.evaluate(self),
                glider: None,
            }),
            PositionSource::Glider(g) => {
                let Some(carrier_id) = g.active() else {
                    return Ok(None);
                };
                let carrier = self.carrier_snapshot(carrier_id)?;
                let edge = g.edge.unwrap_or(0);
                if from_parent {
                    // The carrier moved: keep the parameter, move the point.
                    let usr = carrier.point_at(g.position, edge, self.config.legacy_full_turn);
                    Some(SourceUpdate {
                        usr: usr.to_vec(),
                        glider: Some((g.position, g.edge)),
                    })
                } else {
                    let (usr, t, edge) =
                        self.glide(&p.coords.usr(), &carrier, g.position, g.edge, &p.attributes);
                    Some(SourceUpdate {
                        usr: usr.to_vec(),
                        glider: Some((t, edge)),
                    })
                }
            }
            PositionSource::Anchored(a) => Some(SourceUpdate {
                usr: self.anchored_position(a)?.usr().to_vec(),
                glider: None,
            }),
        };
        Ok(update)
    }

    fn anchored_position(&self, anchor: &Anchor) -> Result<Coords, EngineError> {
        let base = self.anchor_point(anchor.target)?;
        let [ox, oy] = anchor.offset;
        Ok(if anchor.is_label {
            let scr = base.scr();
            Coords::from_screen(scr[1] + ox, scr[2] - oy, Some(self.view()))
        } else {
            let usr = base.usr();
            Coords::from_affine(1.0, usr[1] / usr[0] + ox, usr[2] / usr[0] + oy, Some(self.view()))
        })
    }

    /// Run the state recompute of `id` regardless of its dirty flag.
    fn recompute_source(&mut self, id: ElementId, from_parent: bool) -> Result<(), EngineError> {
        let Some(update) = self.source_update(id, from_parent)? else {
            return Ok(());
        };
        let view = *self.view();
        let p = self.positioned_mut(id)?;
        p.coords.set_coordinates(CoordMethod::User, &update.usr, Some(&view));
        if let (Some((t, edge)), Some(g)) = (update.glider, p.source.as_glider_mut()) {
            if g.edge != edge {
                debug!(?id, from = ?g.edge, to = ?edge, "glider moved to another border");
            }
            g.position = t;
            g.edge = edge;
        }
        Ok(())
    }

    /// Bring `id` up to date. A clean element is left untouched.
    pub fn update_coords(&mut self, id: ElementId, from_parent: bool) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        if !p.needs_update {
            return Ok(());
        }
        if !p.attributes.frozen {
            self.recompute_source(id, from_parent)?;
        }
        self.update_transform(id)?;
        self.positioned_mut(id)?.needs_update = false;
        Ok(())
    }

    /// Apply the transformation chain to produce the renderable coordinate.
    pub fn update_transform(&mut self, id: ElementId) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        let actual = if p.chain.is_empty() {
            p.coords
        } else {
            let input = match p.chain.base() {
                Some(base) if base != id => self.coords(base)?,
                _ if matches!(p.source, PositionSource::Free) => p.initial_coords,
                _ => p.coords,
            };
            let usr = p.chain.matrix(self).apply(&input.usr());
            Coords::new(CoordMethod::User, &usr, Some(self.view()))
        };
        let p = self.positioned_mut(id)?;
        if p.actual_coords.usr() != actual.usr() || p.actual_coords.scr() != actual.scr() {
            p.needs_redraw = true;
        }
        p.actual_coords = actual;
        Ok(())
    }

    /// Drop the parent edges of the current source, keeping those of the chain.
    fn detach_source(&mut self, id: ElementId) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        let keep: Vec<ElementId> = p.chain.parents();
        self.graph.remove_parents(id);
        for parent in keep {
            self.graph.add_edge(parent, id);
        }
        Ok(())
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Make `id` a glider on `carrier`, pushing it on the carrier stack.
    ///
    /// Fails without touching `id` if the carrier kind cannot carry gliders.
    #[instrument(skip(self))]
    pub fn bind_carrier(&mut self, id: ElementId, carrier: ElementId) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        if carrier == id {
            warn!(?id, "element cannot glide on itself");
            return Err(EngineError::invalid("an element cannot be its own carrier"));
        }
        let snapshot = match self.carrier_snapshot(carrier) {
            Ok(s) => s,
            Err(e) => {
                warn!(?id, ?carrier, error = %e, "refusing to bind glider");
                return Err(e);
            }
        };

        let previous = p.source.as_glider().map(|g| g.position).unwrap_or(0.0);
        // Polygons resolve the nearest border here.
        let (usr, t, edge) = self.glide(&p.coords.usr(), &snapshot, previous, None, &p.attributes);
        let was_glider = p.source.as_glider().is_some();

        if !was_glider {
            self.detach_source(id)?;
        }
        let view = *self.view();
        let p = self.positioned_mut(id)?;
        match p.source.as_glider_mut() {
            Some(g) => {
                if g.active() != Some(carrier) {
                    g.carriers.push(carrier);
                }
                g.position = t;
                g.edge = edge;
            }
            None => {
                p.source = PositionSource::Glider(GliderState {
                    carriers: vec![carrier],
                    position: t,
                    edge,
                });
            }
        }
        p.kind = PositionKind::Glider;
        p.coords.set_coordinates(CoordMethod::User, &usr, Some(&view));
        p.needs_update = true;
        self.graph.add_edge(carrier, id);
        info!(?id, ?carrier, kind = snapshot.type_name(), t, "bound glider");

        self.update_coords(id, true)?;
        self.request_update();
        Ok(())
    }

    /// Leave the active carrier; an empty stack releases the element.
    #[instrument(skip(self))]
    pub fn pop_carrier(&mut self, id: ElementId) -> Result<(), EngineError> {
        let p = self.positioned_mut(id)?;
        let Some(g) = p.source.as_glider_mut() else {
            return Err(EngineError::NotAGlider { id });
        };
        let popped = g.carriers.pop();
        g.edge = None;
        let remaining = g.carriers.clone();

        if let Some(popped) = popped {
            if !remaining.contains(&popped) {
                self.graph.remove_edge(popped, id);
            }
        }
        if remaining.is_empty() {
            return self.release(id);
        }
        info!(?id, ?popped, active = ?remaining.last(), "glider left carrier");
        self.positioned_mut(id)?.needs_update = true;
        self.update_coords(id, false)?;
        self.request_update();
        Ok(())
    }

    /// Return to a free element where it currently appears.
    ///
    /// Clears the carrier stack, constraints, anchor and transformation chain,
    /// drops every edge from a parent, and restores the original kind.
    #[instrument(skip(self))]
    pub fn release(&mut self, id: ElementId) -> Result<(), EngineError> {
        let p = self.positioned_mut(id)?;
        let previous = p.source.name();
        let actual = p.actual_coords;
        p.source = PositionSource::Free;
        p.chain.clear();
        p.kind = p.original_kind;
        p.coords = actual;
        p.initial_coords = actual;
        p.needs_update = true;
        self.graph.remove_parents(id);
        self.glider_animations.remove(id);
        info!(?id, from = previous, "released to free");
        self.update_coords(id, false)?;
        self.request_update();
        Ok(())
    }

    /// Let `constraint` compute the position; drags are ignored afterwards.
    #[instrument(skip(self, constraint))]
    pub fn attach_constraint(&mut self, id: ElementId, constraint: Constraint) -> Result<(), EngineError> {
        self.positioned(id)?;
        let parents = constraint.parents();
        for parent in &parents {
            self.element(*parent)?;
        }
        if parents.contains(&id) {
            return Err(EngineError::invalid("a constraint cannot read its own element"));
        }
        self.detach_source(id)?;
        self.glider_animations.remove(id);
        let p = self.positioned_mut(id)?;
        p.source = PositionSource::Constrained(constraint);
        p.kind = p.original_kind;
        p.needs_update = true;
        for parent in parents {
            self.graph.add_edge(parent, id);
        }
        info!(?id, "attached constraint");
        self.update_coords(id, false)?;
        self.request_update();
        Ok(())
    }

    /// Follow `target` at a fixed offset.
    ///
    /// Labels measure the offset in pixels with the y axis up, everything else
    /// in user units.
    #[instrument(skip(self))]
    pub fn attach_anchor(
        &mut self,
        id: ElementId,
        target: ElementId,
        offset: [f64; 2],
        is_label: bool,
    ) -> Result<(), EngineError> {
        self.positioned(id)?;
        if target == id {
            return Err(EngineError::invalid("an element cannot anchor to itself"));
        }
        self.anchor_point(target)?;
        self.detach_source(id)?;
        self.glider_animations.remove(id);
        let p = self.positioned_mut(id)?;
        p.source = PositionSource::Anchored(Anchor {
            target,
            offset,
            is_label,
        });
        p.kind = p.original_kind;
        p.needs_update = true;
        self.graph.add_edge(target, id);
        info!(?id, ?target, is_label, "attached anchor");
        self.update_coords(id, false)?;
        self.request_update();
        Ok(())
    }

    /// Append `steps` to the chain of `id`, applied to `base`.
    ///
    /// A chain keeps the base it was first bound to.
    #[instrument(skip(self, steps))]
    pub fn add_transform(
        &mut self,
        id: ElementId,
        base: ElementId,
        steps: Vec<TransformStep>,
    ) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        if let Some(bound) = p.chain.base() {
            if bound != base {
                warn!(?id, ?bound, requested = ?base, "refusing to rebase transformation chain");
                return Err(EngineError::TransformRebase {
                    bound,
                    requested: base,
                });
            }
        }
        if base != id {
            self.positioned(base)?;
        }
        let parents: Vec<ElementId> = steps.iter().flat_map(|s| s.parents()).collect();
        for parent in &parents {
            self.element(*parent)?;
        }

        let p = self.positioned_mut(id)?;
        if p.chain.is_empty() && base == id {
            p.initial_coords = p.coords;
        }
        let count = steps.len();
        p.chain.bind(base, steps)?;
        p.needs_update = true;
        for parent in std::iter::once(base).chain(parents) {
            self.graph.add_edge(parent, id);
        }
        info!(?id, ?base, count, "bound transformations");
        self.update_coords(id, true)?;
        self.request_update();
        Ok(())
    }

    // ── Moves ────────────────────────────────────────────────────────────

    /// Move `id` to a new position given in user or screen coordinates.
    ///
    /// Grid snapping, point snapping and attractors apply, in that order.
    /// Elements whose position is derived ignore the move. With a chain on the
    /// element itself the target is mapped back through the inverse chain.
    #[instrument(skip(self, values))]
    pub fn set_position(&mut self, id: ElementId, method: CoordMethod, values: &[f64]) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        if !p.is_draggable() || p.is_copy(id) {
            debug!(?id, source = p.source.name(), "position is not movable");
            return Ok(());
        }
        let view = *self.view();
        let mut target = Coords::new(method, values, Some(&view));
        target = self.snap_to_grid_target(&p.attributes, target);
        if p.attributes.snap_to_points {
            if let Some(point) = self.nearest_snap_point(id, &target)? {
                target = point;
            }
        }

        let preimage = if p.has_self_chain(id) {
            let inverse = p.chain.invert(self)?;
            Some(Coords::new(CoordMethod::User, &inverse.apply(&target.usr()), Some(&view)))
        } else {
            None
        };

        let p = self.positioned_mut(id)?;
        match preimage {
            Some(pre) => {
                p.initial_coords = pre;
                p.coords = if matches!(p.source, PositionSource::Free) { target } else { pre };
            }
            None => p.coords = target,
        }
        p.needs_update = true;

        if !self.positioned(id)?.attributes.attractors.is_empty() {
            self.handle_attractors(id)?;
        }

        if self.is_batch_suspended() {
            // Gliders must stay on their carrier even while updates wait.
            if self.positioned(id)?.source.as_glider().is_some() {
                self.recompute_source(id, false)?;
            }
            self.defer(id);
            return Ok(());
        }
        self.update_coords(id, false)?;
        self.request_update();
        Ok(())
    }

    /// Translate by `delta` user units.
    pub fn move_by(&mut self, id: ElementId, delta: [f64; 2]) -> Result<(), EngineError> {
        let c = self.coords(id)?;
        self.set_position(id, CoordMethod::User, &[c.x() + delta[0], c.y() + delta[1]])
    }

    /// Put a glider at parameter `t` on its active carrier.
    #[instrument(skip(self))]
    pub fn set_glider_position(&mut self, id: ElementId, t: f64) -> Result<(), EngineError> {
        let p = self.positioned_mut(id)?;
        let Some(g) = p.source.as_glider_mut() else {
            return Err(EngineError::NotAGlider { id });
        };
        g.position = t;
        p.needs_update = true;
        if self.is_batch_suspended() {
            self.recompute_source(id, true)?;
            self.defer(id);
            return Ok(());
        }
        self.update_coords(id, true)?;
        self.request_update();
        Ok(())
    }
}
