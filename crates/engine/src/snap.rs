//! Grid snapping, point snapping, attractors and glider value snapping.
//!
//! Candidates are compared with a strict `<` against the running minimum, so
//! among equally near candidates the first one scanned wins.

use tracing::debug;

use construct_kernel::coords::BoundingBox;
use construct_kernel::geometry::projection;
use construct_kernel::{CoordMethod, Coords};

use crate::board::Board;
use crate::config::{AttractorUnit, PositionAttributes};
use crate::types::{ElementId, EngineError};

fn method(unit: AttractorUnit) -> CoordMethod {
    match unit {
        AttractorUnit::User => CoordMethod::User,
        AttractorUnit::Screen => CoordMethod::Screen,
    }
}

/// Index of the value nearest to `value`, if it lies within `max_distance`.
pub fn nearest_snap_value(value: f64, values: &[f64], max_distance: f64) -> Option<usize> {
    let mut best = None;
    let mut min = f64::INFINITY;
    for (i, v) in values.iter().enumerate() {
        let d = (value - v).abs();
        if d < max_distance && d < min {
            min = d;
            best = Some(i);
        }
    }
    best
}

pub fn round_to_width(value: f64, width: f64) -> f64 {
    (value / width).round() * width
}

/// Snapped glider parameter, or `None` when nothing applies.
///
/// `range` is the carrier's natural parameter range and a degenerate one
/// disables snapping. Without a slider range the parameter is snapped in the
/// carrier's own units. With one, the carrier range is mapped onto it before
/// the parameter is compared with the snap values or rounded to the snap
/// width. The width only applies when no snap values are given.
pub fn snap_parameter(
    t: f64,
    range: (f64, f64),
    attributes: &PositionAttributes,
    eps: f64,
) -> Option<f64> {
    let (a, b) = range;
    let natural = b - a;
    if !(natural.abs() >= eps) {
        return None;
    }
    let slider = match attributes.slider_range {
        None => None,
        Some((lo, hi)) => {
            let span = hi - lo;
            if !(span.abs() >= eps) {
                return None;
            }
            Some((lo, span))
        }
    };
    let value = match slider {
        Some((lo, span)) => lo + (t - a) / natural * span,
        None => t,
    };
    let snapped = if !attributes.snap_values.is_empty() {
        let i = nearest_snap_value(value, &attributes.snap_values, attributes.snap_value_distance)?;
        attributes.snap_values[i]
    } else if attributes.snap_width > 0.0 {
        round_to_width(value, attributes.snap_width)
    } else {
        return None;
    };
    Some(match slider {
        Some((lo, span)) => a + (snapped - lo) / span * natural,
        None => snapped,
    })
}

/// Round to the nearest grid point.
///
/// With a bounding box, a rounded coordinate that falls outside is moved one
/// cell back inside.
pub fn grid_round(x: f64, y: f64, size_x: f64, size_y: f64, bbox: Option<&BoundingBox>) -> [f64; 2] {
    let sx = if size_x > 0.0 { size_x } else { 1.0 };
    let sy = if size_y > 0.0 { size_y } else { 1.0 };
    let mut rx = (x / sx).round() * sx;
    let mut ry = (y / sy).round() * sy;
    if let Some(b) = bbox {
        if rx < b.min[0] {
            rx += sx;
        } else if rx > b.max[0] {
            rx -= sx;
        }
        if ry < b.min[1] {
            ry += sy;
        } else if ry > b.max[1] {
            ry -= sy;
        }
    }
    [rx, ry]
}

impl Board {
    /// Apply grid snapping or grid attraction to a drag target.
    pub(crate) fn snap_to_grid_target(&self, attributes: &PositionAttributes, target: Coords) -> Coords {
        if !(attributes.snap_to_grid || attributes.attract_to_grid) || target.is_ideal() {
            return target;
        }
        let bbox = self.config.snap_to_grid_clamped.then(|| self.bounding_box());
        let [x, y] = grid_round(
            target.x(),
            target.y(),
            attributes.snap_size_x,
            attributes.snap_size_y,
            bbox.as_ref(),
        );
        let snapped = Coords::from_affine(1.0, x, y, Some(self.view()));
        if attributes.attract_to_grid {
            let d = snapped.distance(method(attributes.attractor_unit), &target);
            if !(d < attributes.attractor_distance) {
                return target;
            }
        }
        snapped
    }

    /// First visible point within the attractor distance of `target`.
    pub(crate) fn nearest_snap_point(&self, id: ElementId, target: &Coords) -> Result<Option<Coords>, EngineError> {
        let attributes = &self.positioned(id)?.attributes;
        let unit = method(attributes.attractor_unit);
        let mut best = None;
        let mut min = f64::INFINITY;
        for &other in self.ids() {
            if other == id || attributes.ignored_snap_to_points.contains(&other) {
                continue;
            }
            let element = self.element(other)?;
            if !element.is_point_like() || !element.is_visible() {
                continue;
            }
            let candidate = self.coords(other)?;
            let d = candidate.distance(unit, target);
            if d < attributes.attractor_distance && d < min {
                min = d;
                best = Some((other, candidate));
            }
        }
        if let Some((other, _)) = best {
            debug!(?id, snapped_to = ?other, distance = min, "snapped to point");
        }
        Ok(best.map(|(_, c)| c))
    }

    /// Capture by the first attractor in range, or leave an attractor carrier
    /// that is farther than the snatch distance.
    pub fn handle_attractors(&mut self, id: ElementId) -> Result<(), EngineError> {
        let p = self.positioned(id)?;
        let attributes = p.attributes.clone();
        if attributes.attractor_distance == 0.0 {
            return Ok(());
        }
        let unit = method(attributes.attractor_unit);
        let here = p.coords;
        let mut active = p.source.as_glider().and_then(|g| g.active());
        let previous_t = p.glider_position().unwrap_or(0.0);

        for &attractor in &attributes.attractors {
            if attractor == id {
                continue;
            }
            let carrier = match self.carrier_snapshot(attractor) {
                Ok(c) => c,
                Err(e) => {
                    debug!(?id, ?attractor, error = %e, "skipping attractor");
                    continue;
                }
            };
            let options = self.project_options(previous_t);
            let proj = projection::project(&here.usr(), &carrier, &options);
            let on_carrier = Coords::new(CoordMethod::User, &proj.coords, Some(self.view()));
            let d = on_carrier.distance(unit, &here);

            if d < attributes.attractor_distance {
                if active != Some(attractor) {
                    debug!(?id, ?attractor, distance = d, "captured by attractor");
                    self.bind_carrier(id, attractor)?;
                }
                break;
            }
            if d >= attributes.snatch_distance && active == Some(attractor) {
                debug!(?id, ?attractor, distance = d, "snatched from attractor");
                self.pop_carrier(id)?;
                let p = self.positioned_mut(id)?;
                active = p.source.as_glider().and_then(|g| g.active());
                if active.is_none() {
                    // Released: stay where the drag put us.
                    p.coords = here;
                    p.initial_coords = here;
                    p.needs_update = true;
                }
            }
        }
        Ok(())
    }
}
