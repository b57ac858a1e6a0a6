//! Coordinate sequences for animated moves, and their per-tick playback.
//!
//! The engine owns no timer. `move_to`, `visit` and `move_along` queue a
//! frame sequence on the board; the host calls [`Board::animate`] every
//! `animation_delay_ms` to play one frame per element.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use construct_kernel::interpolation::{polyline_at, Effect, Neville};
use construct_kernel::CoordMethod;

use crate::board::Board;
use crate::types::{ElementId, EngineError};

/// Runs once after the last frame of a queued move.
pub type Completion = Box<dyn FnOnce(&mut Board, ElementId) + Send>;

/// Position as a function of elapsed milliseconds.
pub type PathFn = Arc<dyn Fn(f64) -> [f64; 2] + Send + Sync>;

#[derive(Default)]
pub struct MoveOptions {
    pub effect: Effect,
    pub on_complete: Option<Completion>,
}

pub struct VisitOptions {
    pub effect: Effect,
    /// Number of round trips.
    pub repeat: usize,
    pub on_complete: Option<Completion>,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            effect: Effect::default(),
            repeat: 1,
            on_complete: None,
        }
    }
}

pub struct AlongOptions {
    /// Interpolating polynomial through the points instead of straight pieces.
    pub interpolate: bool,
    pub on_complete: Option<Completion>,
}

impl Default for AlongOptions {
    fn default() -> Self {
        Self {
            interpolate: true,
            on_complete: None,
        }
    }
}

#[derive(Clone)]
pub enum AnimationPath {
    Points(Vec<[f64; 2]>),
    Function(PathFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    Forward,
    Backward,
}

/// Pending frames of one element.
pub struct Tween {
    frames: VecDeque<[f64; 2]>,
    on_complete: Option<Completion>,
}

/// Stepping of a glider along its carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct GliderAnimation {
    pub direction: AnimationDirection,
    pub steps: usize,
    pub delay_ms: u64,
    pub max_rounds: Option<usize>,
    counter: usize,
    rounds: usize,
}

impl GliderAnimation {
    /// Advance one tick; the fraction of the carrier range to go to, or `None`
    /// once the last round is done.
    fn advance(&mut self) -> Option<f64> {
        self.counter += 1;
        if self.counter > self.steps {
            self.counter = 0;
            self.rounds += 1;
            if self.max_rounds.is_some_and(|max| self.rounds >= max) {
                return None;
            }
        }
        let frac = self.counter as f64 / self.steps as f64;
        Some(match self.direction {
            AnimationDirection::Forward => frac,
            AnimationDirection::Backward => 1.0 - frac,
        })
    }
}

/// Ticks needed to cover `ms` milliseconds.
pub fn step_count(ms: f64, delay_ms: u64) -> usize {
    ((ms / delay_ms.max(1) as f64).ceil() as usize).max(1)
}

fn mix(from: [f64; 2], to: [f64; 2], s: f64) -> [f64; 2] {
    [from[0] + s * (to[0] - from[0]), from[1] + s * (to[1] - from[1])]
}

/// `steps + 1` frames from `from` to `to`, both ends included.
pub fn move_to_frames(from: [f64; 2], to: [f64; 2], steps: usize, effect: Effect) -> Vec<[f64; 2]> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| mix(from, to, effect.ease(i as f64 / steps as f64)))
        .collect()
}

/// Round trips from `from` to `to` and back, eased symmetrically about the
/// turning point.
pub fn visit_frames(from: [f64; 2], to: [f64; 2], steps: usize, effect: Effect, repeat: usize) -> Vec<[f64; 2]> {
    let steps = steps.max(1);
    let mut frames = vec![from];
    for _ in 0..repeat.max(1) {
        for i in 1..=steps {
            let x = i as f64 / steps as f64;
            let s = if x <= 0.5 {
                effect.ease(2.0 * x)
            } else {
                effect.ease(2.0 - 2.0 * x)
            };
            frames.push(mix(from, to, s));
        }
    }
    frames
}

/// `steps + 1` samples along a path lasting `ms` milliseconds.
pub fn along_frames(path: &AnimationPath, steps: usize, ms: f64, interpolate: bool) -> Result<Vec<[f64; 2]>, EngineError> {
    let steps = steps.max(1);
    let frames = match path {
        AnimationPath::Function(f) => (0..=steps).map(|i| f(ms * i as f64 / steps as f64)).collect(),
        AnimationPath::Points(points) if interpolate => {
            let curve = Neville::new(points.clone())?;
            let max = curve.max_param();
            (0..=steps)
                .map(|i| curve.evaluate(max * i as f64 / steps as f64))
                .collect()
        }
        AnimationPath::Points(points) => {
            if points.is_empty() {
                return Err(construct_kernel::KernelError::EmptyPath.into());
            }
            (0..=steps)
                .filter_map(|i| polyline_at(points, i as f64 / steps as f64))
                .collect()
        }
    };
    Ok(frames)
}

impl Board {
    fn current_xy(&self, id: ElementId) -> Result<[f64; 2], EngineError> {
        let c = self.coords(id)?;
        Ok([c.x(), c.y()])
    }

    fn queue(&mut self, id: ElementId, frames: &[[f64; 2]], on_complete: Option<Completion>) {
        self.tweens.insert(
            id,
            Tween {
                frames: frames.iter().skip(1).copied().collect(),
                on_complete,
            },
        );
    }

    /// Move to `target` over `ms` milliseconds; returns the queued frames.
    ///
    /// Without a duration, or from an ideal point, the move is immediate.
    #[instrument(skip(self, options))]
    pub fn move_to(
        &mut self,
        id: ElementId,
        target: [f64; 2],
        ms: f64,
        options: MoveOptions,
    ) -> Result<Vec<[f64; 2]>, EngineError> {
        let coords = self.coords(id)?;
        if ms <= 0.0 || coords.is_ideal() {
            self.set_position(id, CoordMethod::User, &target)?;
            self.update(Some(id))?;
            if let Some(done) = options.on_complete {
                done(self, id);
            }
            return Ok(vec![target]);
        }
        let from = [coords.x(), coords.y()];
        if (from[0] - target[0]).hypot(from[1] - target[1]) < self.config.tolerance.eps {
            if let Some(done) = options.on_complete {
                done(self, id);
            }
            return Ok(vec![from]);
        }
        let steps = step_count(ms, self.config.animation_delay_ms);
        let frames = move_to_frames(from, target, steps, options.effect);
        self.queue(id, &frames, options.on_complete);
        debug!(?id, steps, effect = options.effect.flag(), "queued move");
        Ok(frames)
    }

    /// Go to `target` and come back, `repeat` times.
    #[instrument(skip(self, options))]
    pub fn visit(
        &mut self,
        id: ElementId,
        target: [f64; 2],
        ms: f64,
        options: VisitOptions,
    ) -> Result<Vec<[f64; 2]>, EngineError> {
        let from = self.current_xy(id)?;
        let steps = step_count(ms, self.config.animation_delay_ms);
        let frames = visit_frames(from, target, steps, options.effect, options.repeat);
        self.queue(id, &frames, options.on_complete);
        debug!(?id, steps, repeat = options.repeat, "queued visit");
        Ok(frames)
    }

    /// Follow `path` over `ms` milliseconds.
    #[instrument(skip(self, path, options))]
    pub fn move_along(
        &mut self,
        id: ElementId,
        path: AnimationPath,
        ms: f64,
        options: AlongOptions,
    ) -> Result<Vec<[f64; 2]>, EngineError> {
        self.positioned(id)?;
        let steps = step_count(ms, self.config.animation_delay_ms);
        let mut frames = along_frames(&path, steps, ms, options.interpolate)?;
        // Playback starts from where the element is now.
        frames.insert(0, self.current_xy(id)?);
        self.queue(id, &frames, options.on_complete);
        debug!(?id, steps, "queued path");
        Ok(frames)
    }

    /// Step a glider along its carrier, `steps` ticks per round.
    #[instrument(skip(self))]
    pub fn start_animation(
        &mut self,
        id: ElementId,
        direction: AnimationDirection,
        steps: usize,
        delay_ms: u64,
        max_rounds: Option<usize>,
    ) -> Result<(), EngineError> {
        self.glider_position(id)?;
        if steps == 0 {
            return Err(EngineError::invalid("a glider animation needs at least one step"));
        }
        self.glider_animations.insert(
            id,
            GliderAnimation {
                direction,
                steps,
                delay_ms,
                max_rounds,
                counter: 0,
                rounds: 0,
            },
        );
        info!(?id, ?direction, steps, "glider animation started");
        Ok(())
    }

    /// Cancel pending frames and glider stepping; completions do not run.
    pub fn stop_animation(&mut self, id: ElementId) -> Result<(), EngineError> {
        self.element(id)?;
        let had_tween = self.tweens.remove(id).is_some();
        let had_glider = self.glider_animations.remove(id).is_some();
        if had_tween || had_glider {
            info!(?id, "animation stopped");
        }
        Ok(())
    }

    pub fn is_animated(&self, id: ElementId) -> bool {
        self.tweens.contains_key(id) || self.glider_animations.contains_key(id)
    }

    /// Play one tick of every running animation, then update the board.
    ///
    /// Returns whether any animation is still running.
    pub fn animate(&mut self) -> Result<bool, EngineError> {
        let animated: Vec<ElementId> = self
            .ids()
            .iter()
            .copied()
            .filter(|id| self.is_animated(*id))
            .collect();
        let mut completed = Vec::new();

        for id in animated {
            let frame = self.tweens.get_mut(id).and_then(|t| t.frames.pop_front());
            if let Some(frame) = frame {
                self.set_position(id, CoordMethod::User, &frame)?;
            }
            if self.tweens.get(id).is_some_and(|t| t.frames.is_empty()) {
                if let Some(tween) = self.tweens.remove(id) {
                    completed.push((id, tween.on_complete));
                }
            }

            let Some(step) = self.glider_animations.get_mut(id).map(|a| a.advance()) else {
                continue;
            };
            match step {
                Some(frac) => {
                    let Some(carrier) = self.positioned(id)?.source.as_glider().and_then(|g| g.active()) else {
                        self.glider_animations.remove(id);
                        continue;
                    };
                    let (lo, hi) = self.carrier_snapshot(carrier)?.range(self.config.legacy_full_turn);
                    self.set_glider_position(id, lo + (hi - lo) * frac)?;
                }
                None => {
                    self.glider_animations.remove(id);
                    info!(?id, "glider animation finished");
                }
            }
        }

        self.update(None)?;
        for (id, done) in completed {
            if let Some(done) = done {
                done(self, id);
            }
        }
        Ok(!self.tweens.is_empty() || !self.glider_animations.is_empty())
    }
}
