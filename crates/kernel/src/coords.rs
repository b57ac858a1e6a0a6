//! The dual user/screen coordinate pair and the view that links them.
//!
//! User coordinates are homogeneous `[w, x, y]`; `w == 0` is an ideal point.
//! Screen coordinates mirror the weight: `[w, sx, sy]` in device pixels with
//! the y axis pointing down.

use serde::{Deserialize, Serialize};

use crate::EPS;

/// Which representation a coordinate value is given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordMethod {
    User,
    Screen,
}

/// Scale and offset of the drawing surface.
///
/// `unit_x`/`unit_y` are pixels per user unit, `origin` is the screen position
/// of the user origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub unit_x: f64,
    pub unit_y: f64,
    pub origin: [f64; 2],
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl View {
    pub fn new(unit_x: f64, unit_y: f64, origin: [f64; 2], canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            unit_x,
            unit_y,
            origin,
            canvas_width,
            canvas_height,
        }
    }

    /// A view whose pixel scale has not been set up yet.
    ///
    /// Every screen coordinate computed against it is NaN.
    pub fn unset() -> Self {
        Self {
            unit_x: f64::NAN,
            unit_y: f64::NAN,
            origin: [0.0, 0.0],
            canvas_width: 0.0,
            canvas_height: 0.0,
        }
    }

    /// Visible user-space rectangle.
    pub fn bounding_box(&self) -> BoundingBox {
        let min_x = -self.origin[0] / self.unit_x;
        let max_x = (self.canvas_width - self.origin[0]) / self.unit_x;
        let max_y = self.origin[1] / self.unit_y;
        let min_y = (self.origin[1] - self.canvas_height) / self.unit_y;
        BoundingBox::new([min_x, min_y], [max_x, max_y])
    }

    /// Build a view that shows `bbox` on a canvas of the given size.
    pub fn from_bounding_box(bbox: BoundingBox, canvas_width: f64, canvas_height: f64) -> Self {
        let unit_x = canvas_width / (bbox.max[0] - bbox.min[0]);
        let unit_y = canvas_height / (bbox.max[1] - bbox.min[1]);
        Self {
            unit_x,
            unit_y,
            origin: [-bbox.min[0] * unit_x, bbox.max[1] * unit_y],
            canvas_width,
            canvas_height,
        }
    }
}

/// Axis-aligned rectangle in user space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl BoundingBox {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min[0] && x <= self.max[0] && y >= self.min[1] && y <= self.max[1]
    }
}

/// A position held in both user and screen representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    usr: [f64; 3],
    scr: [f64; 3],
}

impl Coords {
    /// Build from a homogeneous user coordinate.
    pub fn from_affine(w: f64, x: f64, y: f64, view: Option<&View>) -> Self {
        Self::new(CoordMethod::User, &[w, x, y], view)
    }

    /// Build from a screen position in pixels.
    pub fn from_screen(sx: f64, sy: f64, view: Option<&View>) -> Self {
        Self::new(CoordMethod::Screen, &[sx, sy], view)
    }

    pub fn new(method: CoordMethod, values: &[f64], view: Option<&View>) -> Self {
        let mut coords = Self {
            usr: [1.0, 0.0, 0.0],
            scr: [1.0, 0.0, 0.0],
        };
        coords.set_coordinates(method, values, view);
        coords
    }

    /// Set the pair by one representation and recompute the other.
    ///
    /// Two values are Euclidean (`w` defaults to 1), three are homogeneous.
    /// Finite homogeneous user coordinates are normalized to `w == 1`.
    /// Fewer than two values yield an all-NaN coordinate.
    pub fn set_coordinates(&mut self, method: CoordMethod, values: &[f64], view: Option<&View>) {
        match method {
            CoordMethod::User => {
                self.usr = match values {
                    [x, y] => [1.0, *x, *y],
                    [w, x, y, ..] => normalize([*w, *x, *y]),
                    _ => [f64::NAN; 3],
                };
                self.usr_to_screen(view);
            }
            CoordMethod::Screen => {
                let (sx, sy) = match values {
                    [sx, sy] => (*sx, *sy),
                    [_, sx, sy, ..] => (*sx, *sy),
                    _ => (f64::NAN, f64::NAN),
                };
                self.scr = [1.0, sx, sy];
                self.screen_to_usr(view);
            }
        }
    }

    /// Recompute the screen coordinate after the view changed.
    pub fn refresh(&mut self, view: Option<&View>) {
        self.usr_to_screen(view);
    }

    fn usr_to_screen(&mut self, view: Option<&View>) {
        let [w, x, y] = self.usr;
        self.scr = match view {
            Some(v) => [w, w * v.origin[0] + x * v.unit_x, w * v.origin[1] - y * v.unit_y],
            None => [w, f64::NAN, f64::NAN],
        };
    }

    fn screen_to_usr(&mut self, view: Option<&View>) {
        let [_, sx, sy] = self.scr;
        self.usr = match view {
            Some(v) => [1.0, (sx - v.origin[0]) / v.unit_x, (v.origin[1] - sy) / v.unit_y],
            None => [1.0, f64::NAN, f64::NAN],
        };
    }

    pub fn usr(&self) -> [f64; 3] {
        self.usr
    }

    pub fn scr(&self) -> [f64; 3] {
        self.scr
    }

    pub fn x(&self) -> f64 {
        self.usr[1]
    }

    pub fn y(&self) -> f64 {
        self.usr[2]
    }

    pub fn is_ideal(&self) -> bool {
        self.usr[0].abs() < EPS
    }

    /// True when every homogeneous component is finite and not all vanish.
    pub fn is_real(&self) -> bool {
        self.usr.iter().all(|c| c.is_finite()) && self.usr.iter().any(|c| c.abs() > 0.0)
    }

    /// Euclidean distance in the chosen representation.
    ///
    /// User distance between points of different weight (an ideal point and a
    /// finite one) is `+inf`. Screen distance involving an ideal point is NaN
    /// because an ideal point has no pixel position. NaN components propagate.
    pub fn distance(&self, method: CoordMethod, other: &Coords) -> f64 {
        match method {
            CoordMethod::User => {
                let dw = self.usr[0] - other.usr[0];
                if dw * dw > EPS * EPS {
                    return f64::INFINITY;
                }
                (self.usr[1] - other.usr[1]).hypot(self.usr[2] - other.usr[2])
            }
            CoordMethod::Screen => {
                if self.is_ideal() || other.is_ideal() {
                    return f64::NAN;
                }
                (self.scr[1] - other.scr[1]).hypot(self.scr[2] - other.scr[2])
            }
        }
    }
}

/// Scale a finite homogeneous coordinate to `w == 1`; ideal points are kept.
pub fn normalize(c: [f64; 3]) -> [f64; 3] {
    if c[0].abs() > EPS {
        [1.0, c[1] / c[0], c[2] / c[0]]
    } else {
        c
    }
}
